//! Quadratic objective term ½·xᵀQx stored as a triangle.
//!
//! Q is symmetric; only entries with row ≥ col are stored, column-wise. An
//! empty Hessian means the model is linear.

use sprs::{CsMat, TriMat};

use crate::status::{CoreError, CoreResult};

/// Triangular Hessian of dimension `dim`.
#[derive(Debug, Clone, Default)]
pub struct Hessian {
    pub dim: usize,
    pub start: Vec<usize>,
    pub index: Vec<usize>,
    pub value: Vec<f64>,
}

impl Hessian {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            start: vec![0; dim + 1],
            index: Vec::new(),
            value: Vec::new(),
        }
    }

    pub fn num_nz(&self) -> usize {
        *self.start.last().unwrap_or(&0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_nz() == 0
    }

    pub fn clear(&mut self) {
        self.dim = 0;
        self.start = vec![0];
        self.index.clear();
        self.value.clear();
    }

    /// Monotone starts, in-range indices, and the triangular invariant
    /// row ≥ col for every stored entry.
    pub fn check_consistent(&self) -> CoreResult<()> {
        if self.start.len() != self.dim + 1 {
            return Err(CoreError::InvalidInput(
                "hessian start length does not match dimension".to_string(),
            ));
        }
        for j in 0..self.dim {
            if self.start[j + 1] < self.start[j] {
                return Err(CoreError::InvalidInput(format!(
                    "hessian start[{}] decreases",
                    j + 1
                )));
            }
            for el in self.start[j]..self.start[j + 1] {
                let i = self.index[el];
                if i >= self.dim {
                    return Err(CoreError::InvalidInput(format!(
                        "hessian index {} out of range",
                        i
                    )));
                }
                if i < j {
                    return Err(CoreError::InvalidInput(format!(
                        "hessian entry ({}, {}) above the diagonal",
                        i, j
                    )));
                }
            }
        }
        let nz = self.num_nz();
        if self.index.len() != nz || self.value.len() != nz {
            return Err(CoreError::InvalidInput(
                "hessian index/value length mismatch".to_string(),
            ));
        }
        Ok(())
    }

    /// ½·xᵀQx with symmetric expansion of the off-diagonal entries.
    pub fn quadratic_value(&self, x: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.dim);
        let mut sum = 0.0;
        for j in 0..self.dim {
            for el in self.start[j]..self.start[j + 1] {
                let i = self.index[el];
                let v = self.value[el];
                if i == j {
                    sum += 0.5 * v * x[j] * x[j];
                } else {
                    sum += v * x[i] * x[j];
                }
            }
        }
        sum
    }

    /// g = Q·x with symmetric expansion.
    pub fn gradient(&self, x: &[f64], g: &mut [f64]) {
        debug_assert_eq!(x.len(), self.dim);
        debug_assert_eq!(g.len(), self.dim);
        g.fill(0.0);
        for j in 0..self.dim {
            for el in self.start[j]..self.start[j + 1] {
                let i = self.index[el];
                let v = self.value[el];
                g[i] += v * x[j];
                if i != j {
                    g[j] += v * x[i];
                }
            }
        }
    }

    /// Export the stored triangle as CSC for sparse consumers.
    pub fn to_csc(&self) -> CsMat<f64> {
        let mut tri = TriMat::new((self.dim, self.dim));
        for j in 0..self.dim {
            for el in self.start[j]..self.start[j + 1] {
                tri.add_triplet(self.index[el], j, self.value[el]);
            }
        }
        tri.to_csc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q2() -> Hessian {
        // Q = [[2, 1], [1, 4]], stored as the lower triangle.
        Hessian {
            dim: 2,
            start: vec![0, 2, 3],
            index: vec![0, 1, 1],
            value: vec![2.0, 1.0, 4.0],
        }
    }

    #[test]
    fn test_consistency() {
        q2().check_consistent().unwrap();

        let mut bad = q2();
        bad.index[1] = 0;
        bad.start = vec![0, 1, 3];
        bad.index = vec![0, 0, 1]; // entry (0, 1) is above the diagonal
        assert!(bad.check_consistent().is_err());
    }

    #[test]
    fn test_quadratic_value() {
        let q = q2();
        // 0.5 * [1, 2] Q [1, 2]^T = 0.5 * (2 + 2*1*2*1 + 4*4) = 0.5 * 22 = 11
        let v = q.quadratic_value(&[1.0, 2.0]);
        assert!((v - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_gradient() {
        let q = q2();
        let mut g = vec![0.0; 2];
        q.gradient(&[1.0, 2.0], &mut g);
        assert!((g[0] - 4.0).abs() < 1e-12); // 2*1 + 1*2
        assert!((g[1] - 9.0).abs() < 1e-12); // 1*1 + 4*2
    }

    #[test]
    fn test_empty() {
        let q = Hessian::new(0);
        assert!(q.is_empty());
        q.check_consistent().unwrap();
    }
}
