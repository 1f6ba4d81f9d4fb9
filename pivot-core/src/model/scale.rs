//! Scaling: solver-side equilibration and user power-of-two scaling.
//!
//! Two independent layers. The solver computes row/column scale factors to
//! balance matrix entry magnitudes before a solve and undoes them on
//! read-back. The user may additionally scale all bounds or all costs by 2^k
//! without reloading the model; requests that would push a finite value past
//! the infinite threshold are refused before anything changes.

use crate::linalg::SparseMatrix;

/// Row/column equilibration factors for the scaled solve.
#[derive(Debug, Clone, Default)]
pub struct Scale {
    pub has_scaling: bool,
    /// Per-column factors (length n).
    pub col: Vec<f64>,
    /// Per-row factors (length m).
    pub row: Vec<f64>,
}

impl Scale {
    /// Identity scaling.
    pub fn identity(num_col: usize, num_row: usize) -> Self {
        Self {
            has_scaling: false,
            col: vec![1.0; num_col],
            row: vec![1.0; num_row],
        }
    }

    pub fn clear(&mut self) {
        self.has_scaling = false;
        self.col.iter_mut().for_each(|v| *v = 1.0);
        self.row.iter_mut().for_each(|v| *v = 1.0);
    }

    /// Iterative max-norm equilibration of the matrix: each pass divides rows
    /// and columns by the square root of their largest magnitude. Factors are
    /// snapped to powers of two so scaling is exactly invertible.
    pub fn equilibrate(matrix: &SparseMatrix, iterations: usize) -> Self {
        let n = matrix.num_col;
        let m = matrix.num_row;
        let mut scale = Scale::identity(n, m);
        if matrix.num_nz() == 0 || iterations == 0 {
            return scale;
        }

        let mut work = matrix.clone();
        for _ in 0..iterations {
            let mut row_max = vec![0.0_f64; m];
            let mut col_max = vec![0.0_f64; n];
            for (i, j, v) in work.triplets() {
                let a = v.abs();
                row_max[i] = row_max[i].max(a);
                col_max[j] = col_max[j].max(a);
            }
            let row_factor: Vec<f64> = row_max
                .iter()
                .map(|&norm| {
                    if norm > 1e-12 {
                        pow2_near(1.0 / norm.sqrt())
                    } else {
                        1.0
                    }
                })
                .collect();
            let col_factor: Vec<f64> = col_max
                .iter()
                .map(|&norm| {
                    if norm > 1e-12 {
                        pow2_near(1.0 / norm.sqrt())
                    } else {
                        1.0
                    }
                })
                .collect();
            work.apply_row_scale(&row_factor);
            work.apply_col_scale(&col_factor);
            for i in 0..m {
                scale.row[i] *= row_factor[i];
            }
            for j in 0..n {
                scale.col[j] *= col_factor[j];
            }
        }
        scale.has_scaling = scale.row.iter().any(|&r| r != 1.0)
            || scale.col.iter().any(|&c| c != 1.0);
        scale
    }
}

/// Nearest power of two, for exactly invertible factors.
fn pow2_near(v: f64) -> f64 {
    if v <= 0.0 || !v.is_finite() {
        return 1.0;
    }
    let e = v.log2().round() as i32;
    (e.clamp(-60, 60) as f64).exp2()
}

/// Would scaling these bounds by 2^k keep every finite value below the
/// infinite threshold?
pub fn bound_scale_ok(lower: &[f64], upper: &[f64], scale: i32, infinite_bound: f64) -> bool {
    let factor = (scale as f64).exp2();
    lower
        .iter()
        .chain(upper.iter())
        .all(|&b| !b.is_finite() || (b * factor).abs() < infinite_bound)
}

/// Would scaling these costs by 2^k keep every finite value below the
/// infinite threshold?
pub fn cost_scale_ok(cost: &[f64], scale: i32, infinite_cost: f64) -> bool {
    let factor = (scale as f64).exp2();
    cost.iter()
        .all(|&c| !c.is_finite() || (c * factor).abs() < infinite_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::SparseMatrix;

    #[test]
    fn test_identity() {
        let s = Scale::identity(3, 2);
        assert!(!s.has_scaling);
        assert_eq!(s.col, vec![1.0; 3]);
        assert_eq!(s.row, vec![1.0; 2]);
    }

    #[test]
    fn test_equilibrate_balances() {
        let m = SparseMatrix::from_colwise(
            2,
            2,
            vec![0, 2, 4],
            vec![0, 1, 0, 1],
            vec![1000.0, 1.0, 1.0, 0.001],
        )
        .unwrap();
        let scale = Scale::equilibrate(&m, 6);
        assert!(scale.has_scaling);

        let mut scaled = m.clone();
        scaled.apply_row_scale(&scale.row);
        scaled.apply_col_scale(&scale.col);
        let mut max_a = 0.0_f64;
        let mut min_a = f64::INFINITY;
        for (_, _, v) in scaled.triplets() {
            max_a = max_a.max(v.abs());
            min_a = min_a.min(v.abs());
        }
        // Magnitude spread shrinks from 1e6 to something modest.
        assert!(max_a / min_a < 1e3);
    }

    #[test]
    fn test_factors_are_powers_of_two() {
        let m = SparseMatrix::from_colwise(1, 1, vec![0, 1], vec![0], vec![3.7]).unwrap();
        let scale = Scale::equilibrate(&m, 4);
        for &f in scale.row.iter().chain(scale.col.iter()) {
            assert_eq!(f.log2().fract(), 0.0, "factor {} not a power of two", f);
        }
    }

    #[test]
    fn test_bound_scale_guard() {
        let lower = vec![0.0, -1e15];
        let upper = vec![1e10, f64::INFINITY];
        assert!(bound_scale_ok(&lower, &upper, 4, 1e20));
        assert!(!bound_scale_ok(&lower, &upper, 20, 1e20));
        // Infinities are exempt.
        assert!(bound_scale_ok(&[f64::NEG_INFINITY], &[f64::INFINITY], 60, 1e20));
    }

    #[test]
    fn test_cost_scale_guard() {
        assert!(cost_scale_ok(&[1.0, -2.0], 10, 1e20));
        assert!(!cost_scale_ok(&[1e18], 10, 1e20));
    }
}
