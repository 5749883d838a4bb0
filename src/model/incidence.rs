//! The incidence matrix C[p,t] = weight(t→p) − weight(p→t) (spec §3).
//!
//! Built once per `PetriNet` snapshot and cached on it; every structural
//! analyzer (§4.2, §4.3) borrows the same dense `nalgebra` matrix.

use nalgebra::DMatrix;

use super::PetriNet;

#[derive(Debug, Clone)]
pub struct IncidenceMatrix {
    /// Rows = places, columns = transitions.
    matrix: DMatrix<f64>,
}

impl IncidenceMatrix {
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn cols(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn get(&self, place: usize, transition: usize) -> f64 {
        self.matrix[(place, transition)]
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

pub(crate) fn build(net: &PetriNet) -> IncidenceMatrix {
    let rows = net.place_count();
    let cols = net.transition_count();
    let mut matrix = DMatrix::<f64>::zeros(rows.max(1), cols.max(1));
    if rows == 0 || cols == 0 {
        return IncidenceMatrix {
            matrix: DMatrix::<f64>::zeros(rows, cols),
        };
    }
    for t in 0..cols {
        let t_idx = super::TransitionIndex(t);
        for &p_idx in net.transition_preset(t_idx) {
            matrix[(p_idx.0, t)] -= net.weight_place_to_transition(p_idx, t_idx) as f64;
        }
        for &p_idx in net.transition_postset(t_idx) {
            matrix[(p_idx.0, t)] += net.weight_transition_to_place(t_idx, p_idx) as f64;
        }
    }
    IncidenceMatrix { matrix }
}
