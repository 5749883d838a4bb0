//! `PetriNetBuilder` — the external build interface from spec §6.
//!
//! Callers add places, transitions, and arcs in any order; `build()` performs
//! the §3 invariant validation once, up front, instead of scattering checks
//! through every analyzer.

use std::collections::HashMap;

use super::{
    hash_structural, Place, PetriNet, PlaceIndex, Transition, TransitionClass, TransitionIndex,
};
use crate::error::{Result, TopologyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointKind {
    Place,
    Transition,
}

#[derive(Debug, Clone)]
struct ArcSpec {
    source: String,
    target: String,
    weight: u32,
}

#[derive(Default)]
pub struct PetriNetBuilder {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<ArcSpec>,
}

impl PetriNetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, id: impl Into<String>, name: impl Into<String>, tokens: u64) -> &mut Self {
        self.places.push(Place {
            id: id.into(),
            name: name.into(),
            tokens,
            capacity: None,
        });
        self
    }

    pub fn set_capacity(&mut self, place_id: &str, capacity: u64) -> &mut Self {
        if let Some(p) = self.places.iter_mut().find(|p| p.id == place_id) {
            p.capacity = Some(capacity);
        }
        self
    }

    pub fn add_transition(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        class: TransitionClass,
    ) -> &mut Self {
        self.transitions.push(Transition {
            id: id.into(),
            name: name.into(),
            class,
            priority: None,
        });
        self
    }

    pub fn set_priority(&mut self, transition_id: &str, priority: i32) -> &mut Self {
        if let Some(t) = self.transitions.iter_mut().find(|t| t.id == transition_id) {
            t.priority = Some(priority);
        }
        self
    }

    /// Adds a weighted arc between a place and a transition, in either
    /// direction. `weight` defaults to 1 via `add_arc_weighted` callers that
    /// don't care; this method always takes an explicit weight.
    pub fn add_arc(&mut self, source: impl Into<String>, target: impl Into<String>, weight: u32) -> &mut Self {
        self.arcs.push(ArcSpec {
            source: source.into(),
            target: target.into(),
            weight,
        });
        self
    }

    pub fn build(self) -> Result<PetriNet> {
        let mut place_index = HashMap::with_capacity(self.places.len());
        for (i, p) in self.places.iter().enumerate() {
            if place_index.insert(p.id.clone(), PlaceIndex(i)).is_some() {
                return Err(TopologyError::InvalidModel(format!(
                    "duplicate place identifier '{}'",
                    p.id
                )));
            }
        }
        let mut transition_index = HashMap::with_capacity(self.transitions.len());
        for (i, t) in self.transitions.iter().enumerate() {
            if transition_index.insert(t.id.clone(), TransitionIndex(i)).is_some() {
                return Err(TopologyError::InvalidModel(format!(
                    "duplicate transition identifier '{}'",
                    t.id
                )));
            }
        }
        if let Some(shared) = place_index.keys().find(|id| transition_index.contains_key(*id)) {
            return Err(TopologyError::InvalidModel(format!(
                "identifier '{shared}' used for both a place and a transition"
            )));
        }

        let mut place_inputs = vec![Vec::new(); self.places.len()];
        let mut place_outputs = vec![Vec::new(); self.places.len()];
        let mut transition_inputs = vec![Vec::new(); self.transitions.len()];
        let mut transition_outputs = vec![Vec::new(); self.transitions.len()];
        let mut weight_pt: HashMap<(PlaceIndex, TransitionIndex), u32> = HashMap::new();
        let mut weight_tp: HashMap<(TransitionIndex, PlaceIndex), u32> = HashMap::new();

        for arc in &self.arcs {
            if arc.weight == 0 {
                return Err(TopologyError::InvalidModel(format!(
                    "arc {} -> {} has non-positive weight",
                    arc.source, arc.target
                )));
            }
            let source_kind = endpoint_kind(&place_index, &transition_index, &arc.source)?;
            let target_kind = endpoint_kind(&place_index, &transition_index, &arc.target)?;
            match (source_kind, target_kind) {
                (EndpointKind::Place, EndpointKind::Transition) => {
                    let p = place_index[&arc.source];
                    let t = transition_index[&arc.target];
                    if weight_pt.insert((p, t), arc.weight).is_none() {
                        place_outputs[p.0].push(t);
                        transition_inputs[t.0].push(p);
                    }
                }
                (EndpointKind::Transition, EndpointKind::Place) => {
                    let t = transition_index[&arc.source];
                    let p = place_index[&arc.target];
                    if weight_tp.insert((t, p), arc.weight).is_none() {
                        transition_outputs[t.0].push(p);
                        place_inputs[p.0].push(t);
                    }
                }
                _ => {
                    return Err(TopologyError::InvalidModel(format!(
                        "arc {} -> {} does not connect a place to a transition",
                        arc.source, arc.target
                    )));
                }
            }
        }

        let structural_hash = hash_structural(&self.places, &self.transitions, &weight_pt, &weight_tp);

        Ok(PetriNet {
            places: self.places,
            transitions: self.transitions,
            place_index,
            transition_index,
            place_inputs,
            place_outputs,
            transition_inputs,
            transition_outputs,
            weight_pt,
            weight_tp,
            incidence: std::sync::OnceLock::new(),
            structural_hash,
        })
    }
}

fn endpoint_kind(
    places: &HashMap<String, PlaceIndex>,
    transitions: &HashMap<String, TransitionIndex>,
    id: &str,
) -> Result<EndpointKind> {
    if places.contains_key(id) {
        Ok(EndpointKind::Place)
    } else if transitions.contains_key(id) {
        Ok(EndpointKind::Transition)
    } else {
        Err(TopologyError::InvalidModel(format!("unknown node identifier '{id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_place_id() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "a", 0);
        b.add_place("P1", "b", 0);
        assert!(b.build().is_err());
    }

    #[test]
    fn rejects_non_bipartite_arc() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "a", 0);
        b.add_place("P2", "b", 0);
        b.add_arc("P1", "P2", 1);
        assert!(b.build().is_err());
    }

    #[test]
    fn rejects_zero_weight() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "a", 0);
        b.add_transition("T1", "t", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 0);
        assert!(b.build().is_err());
    }

    #[test]
    fn duplicate_arc_collapses_to_last_weight() {
        let mut b = PetriNetBuilder::new();
        b.add_place("P1", "a", 0);
        b.add_transition("T1", "t", TransitionClass::Immediate);
        b.add_arc("P1", "T1", 2);
        b.add_arc("P1", "T1", 5);
        let net = b.build().unwrap();
        let p1 = net.place_by_id("P1").unwrap();
        let t1 = net.transition_by_id("T1").unwrap();
        assert_eq!(net.weight_place_to_transition(p1, t1), 5);
        assert_eq!(net.place_postset(p1).len(), 1);
    }

    #[test]
    fn empty_model_builds() {
        let net = PetriNetBuilder::new().build().unwrap();
        assert_eq!(net.place_count(), 0);
        assert_eq!(net.transition_count(), 0);
    }
}
