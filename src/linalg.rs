//! Linear-algebra backend for the structural analyzers (spec §4.2, §4.3).
//!
//! `nalgebra` supplies the dense SVD; rational reconstruction (continued
//! fractions + gcd/lcm normalization) is the "small independent utility" the
//! design notes call for — there is no crate in the corpus for it, so it is
//! hand-rolled here rather than pulled in as a dependency.

use nalgebra::{DMatrix, DVector};

/// Relative threshold below which a singular value is treated as zero,
/// scaled by the largest singular value in the decomposition (spec §4.2).
const RANK_TOLERANCE: f64 = 1e-9;

/// SVD condition-number ceiling past which a matrix is flagged unstable
/// (spec §7, `NumericInstability`).
const CONDITION_NUMBER_CEILING: f64 = 1e12;

/// Relative error tolerance for rational reconstruction (spec §4.2).
const RATIONALIZATION_TOLERANCE: f64 = 1e-6;

const MAX_DENOMINATOR: i64 = 1 << 20;

/// The right null space of `mat`: vectors `x` with `mat * x ≈ 0`, plus the
/// largest singular value observed (callers use it both for the zero
/// threshold and to report `NumericInstability`).
///
/// Works regardless of whether `mat` is wide or tall: `nalgebra`'s SVD is
/// "thin" (it only returns `min(rows, cols)` singular vectors), which misses
/// part of the null space whenever `cols > rows`. Padding with zero rows
/// until the matrix is square makes `V` square too — implicit zero singular
/// values beyond the original rank — without changing `mat^T mat`, so this
/// is exact, not an approximation.
pub struct NullSpace {
    pub vectors: Vec<DVector<f64>>,
    pub sigma_max: f64,
    /// Smallest singular value considered non-zero by the rank threshold;
    /// `None` when the matrix has full rank-deficiency (everything is zero).
    pub smallest_nonzero_singular_value: Option<f64>,
}

impl NullSpace {
    pub fn is_ill_conditioned(&self) -> bool {
        match self.smallest_nonzero_singular_value {
            Some(s) if s > 0.0 => self.sigma_max / s > CONDITION_NUMBER_CEILING,
            _ => false,
        }
    }
}

pub fn right_null_space(mat: &DMatrix<f64>) -> NullSpace {
    let (rows, cols) = mat.shape();
    if cols == 0 {
        return NullSpace {
            vectors: Vec::new(),
            sigma_max: 0.0,
            smallest_nonzero_singular_value: None,
        };
    }
    let square = if rows < cols {
        let mut padded = DMatrix::<f64>::zeros(cols, cols);
        padded.view_mut((0, 0), (rows, cols)).copy_from(mat);
        padded
    } else {
        mat.clone()
    };

    let svd = nalgebra::linalg::SVD::new(square, false, true);
    let v_t = match svd.v_t {
        Some(v_t) => v_t,
        None => {
            return NullSpace {
                vectors: Vec::new(),
                sigma_max: 0.0,
                smallest_nonzero_singular_value: None,
            }
        }
    };
    let singular_values = svd.singular_values;
    let sigma_max = singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let threshold = RANK_TOLERANCE * sigma_max;

    let mut null_vectors = Vec::new();
    let mut smallest_nonzero = None;
    for i in 0..cols {
        if singular_values[i] <= threshold {
            let row = v_t.row(i);
            null_vectors.push(DVector::from_iterator(row.len(), row.iter().cloned()));
        } else {
            smallest_nonzero = Some(smallest_nonzero.map_or(singular_values[i], |s: f64| s.min(singular_values[i])));
        }
    }
    NullSpace {
        vectors: null_vectors,
        sigma_max,
        smallest_nonzero_singular_value: smallest_nonzero,
    }
}

/// Turn a (possibly sign-flipped, possibly non-integer) null space vector
/// into a minimal non-negative integer invariant, following spec §4.2:
/// flip sign so at least one entry is positive, discard if any entry is
/// still strictly negative, scale the smallest positive entry to 1, then
/// rationalize and clear denominators via LCM / GCD.
///
/// Returns `None` when the vector has a genuine sign conflict (not an
/// invariant) or cannot be rationalized within tolerance.
pub fn integerize_invariant(v: &DVector<f64>) -> Option<Vec<i64>> {
    const EPS: f64 = 1e-8;

    let mut v = v.clone();
    if let Some(&pivot) = v.iter().find(|x| x.abs() > EPS) {
        if pivot < 0.0 {
            v *= -1.0;
        }
    } else {
        // The zero vector carries no invariant.
        return None;
    }

    if v.iter().any(|&x| x < -EPS) {
        return None;
    }

    let min_positive = v.iter().cloned().filter(|&x| x > EPS).fold(f64::INFINITY, f64::min);
    if !min_positive.is_finite() {
        return None;
    }
    let scaled: Vec<f64> = v.iter().map(|&x| if x.abs() <= EPS { 0.0 } else { x / min_positive }).collect();

    let mut denominators = Vec::with_capacity(scaled.len());
    for &x in &scaled {
        if x == 0.0 {
            denominators.push(1);
            continue;
        }
        let (_, den) = approximate_fraction(x, MAX_DENOMINATOR)?;
        denominators.push(den);
    }
    let common_denominator = denominators.into_iter().fold(1i64, lcm);

    let mut integers: Vec<i64> = Vec::with_capacity(scaled.len());
    for &x in &scaled {
        let scaled_value = x * common_denominator as f64;
        let rounded = scaled_value.round();
        if (scaled_value - rounded).abs() > RATIONALIZATION_TOLERANCE * common_denominator as f64 {
            return None;
        }
        integers.push(rounded as i64);
    }

    let g = integers.iter().cloned().fold(0i64, gcd);
    if g > 1 {
        for x in &mut integers {
            *x /= g;
        }
    }
    Some(integers)
}

/// Continued-fraction rational approximation of `x` within
/// `RATIONALIZATION_TOLERANCE` relative error, bounded denominator.
fn approximate_fraction(x: f64, max_denominator: i64) -> Option<(i64, i64)> {
    if !x.is_finite() {
        return None;
    }
    let (mut h_prev, mut h_curr) = (1i64, 0i64);
    let (mut k_prev, mut k_curr) = (0i64, 1i64);
    let mut remainder = x;
    for _ in 0..64 {
        let a = remainder.floor();
        let a_i = a as i64;
        let h_next = a_i.saturating_mul(h_curr).saturating_add(h_prev);
        let k_next = a_i.saturating_mul(k_curr).saturating_add(k_prev);
        if k_next == 0 || k_next.abs() > max_denominator {
            break;
        }
        h_prev = h_curr;
        h_curr = h_next;
        k_prev = k_curr;
        k_curr = k_next;
        let approx = h_curr as f64 / k_curr as f64;
        if (approx - x).abs() <= RATIONALIZATION_TOLERANCE * x.abs().max(1.0) {
            return Some((h_curr, k_curr));
        }
        let frac = remainder - a;
        if frac.abs() < 1e-12 {
            break;
        }
        remainder = 1.0 / frac;
    }
    let approx = h_curr as f64 / k_curr as f64;
    if k_curr != 0 && (approx - x).abs() <= RATIONALIZATION_TOLERANCE * x.abs().max(1.0) {
        Some((h_curr, k_curr))
    } else {
        None
    }
}

pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

pub fn lcm(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b)).saturating_mul(b).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dmatrix;

    #[test]
    fn null_space_of_balanced_cycle() {
        // P1 -> T1 -> P2 -> T2 -> P1, incidence columns T1, T2:
        // T1: -1 at P1, +1 at P2. T2: -1 at P2, +1 at P1.
        let c = dmatrix![
            -1.0, 1.0;
             1.0, -1.0;
        ];
        let null_space = right_null_space(&c.transpose());
        assert_eq!(null_space.vectors.len(), 1);
        assert!(null_space.sigma_max > 0.0);
        let invariant = integerize_invariant(&null_space.vectors[0]).unwrap();
        assert_eq!(invariant, vec![1, 1]);
    }

    #[test]
    fn gcd_and_lcm() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(gcd(0, 5), 5);
    }

    #[test]
    fn approximate_fraction_recovers_simple_ratios() {
        let (n, d) = approximate_fraction(0.5, 1000).unwrap();
        assert_eq!((n, d), (1, 2));
        let (n, d) = approximate_fraction(2.0 / 3.0, 1000).unwrap();
        assert_eq!((n, d), (2, 3));
    }
}
