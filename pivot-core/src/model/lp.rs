//! The LP data model: bounds, costs, constraint matrix, integrality, names.

use std::fmt;

use crate::linalg::SparseMatrix;
use crate::status::{CoreError, CoreResult};

/// Objective sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjSense {
    #[default]
    Minimize,
    Maximize,
}

impl ObjSense {
    /// +1 for minimize, −1 for maximize.
    pub fn sign(self) -> f64 {
        match self {
            ObjSense::Minimize => 1.0,
            ObjSense::Maximize => -1.0,
        }
    }
}

/// Variable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarKind {
    #[default]
    Continuous,
    Integer,
    /// Value in {0} ∪ [lower, upper]; enforced by the integer core, stored here.
    SemiContinuous,
    SemiInteger,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarKind::Continuous => "continuous",
            VarKind::Integer => "integer",
            VarKind::SemiContinuous => "semi-continuous",
            VarKind::SemiInteger => "semi-integer",
        };
        write!(f, "{}", name)
    }
}

/// Linear program in bounded form:
///
/// ```text
/// optimize  sense · (cᵀx + offset)
/// subject to  row_lower ≤ A x ≤ row_upper
///             col_lower ≤   x ≤ col_upper
/// ```
#[derive(Debug, Clone, Default)]
pub struct Lp {
    pub num_col: usize,
    pub num_row: usize,

    pub col_cost: Vec<f64>,
    pub col_lower: Vec<f64>,
    pub col_upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,

    pub a_matrix: SparseMatrix,

    pub sense: ObjSense,
    pub offset: f64,

    /// Empty when no integrality information is attached; otherwise one kind
    /// per column.
    pub integrality: Vec<VarKind>,

    pub model_name: String,
    pub objective_name: String,
    /// Empty or one name per column/row.
    pub col_names: Vec<String>,
    pub row_names: Vec<String>,

    /// User bound scaling: all bounds are stored multiplied by 2^k.
    pub user_bound_scale: i32,
    /// User cost scaling: all costs are stored multiplied by 2^k.
    pub user_cost_scale: i32,

    /// Cached: some column cost has magnitude at or beyond the infinite-cost
    /// threshold. Kept consistent by every mutation.
    pub has_infinite_cost: bool,
}

impl Lp {
    pub fn new(num_row: usize, num_col: usize) -> Self {
        Self {
            num_col,
            num_row,
            col_cost: vec![0.0; num_col],
            col_lower: vec![0.0; num_col],
            col_upper: vec![f64::INFINITY; num_col],
            row_lower: vec![f64::NEG_INFINITY; num_row],
            row_upper: vec![f64::INFINITY; num_row],
            a_matrix: SparseMatrix::new_colwise(num_row, num_col),
            ..Default::default()
        }
    }

    /// True when any column is non-continuous.
    pub fn is_mip(&self) -> bool {
        self.integrality
            .iter()
            .any(|&k| k != VarKind::Continuous)
    }

    /// Authoritative predicate for infinite-cost handling.
    pub fn compute_has_infinite_cost(&self, infinite_cost: f64) -> bool {
        self.col_cost.iter().any(|c| c.abs() >= infinite_cost)
    }

    pub fn ensure_colwise(&mut self) {
        self.a_matrix.ensure_colwise();
    }

    pub fn ensure_rowwise(&mut self) {
        self.a_matrix.ensure_rowwise();
    }

    /// Check the vectors agree with the dimensions and the matrix shape.
    pub fn check_consistent(&self) -> CoreResult<()> {
        let n = self.num_col;
        let m = self.num_row;
        if self.col_cost.len() != n
            || self.col_lower.len() != n
            || self.col_upper.len() != n
        {
            return Err(CoreError::InvalidInput(
                "column vector lengths do not match num_col".to_string(),
            ));
        }
        if self.row_lower.len() != m || self.row_upper.len() != m {
            return Err(CoreError::InvalidInput(
                "row vector lengths do not match num_row".to_string(),
            ));
        }
        if self.a_matrix.num_col != n || self.a_matrix.num_row != m {
            return Err(CoreError::InvalidInput(
                "matrix shape does not match LP dimensions".to_string(),
            ));
        }
        if !self.integrality.is_empty() && self.integrality.len() != n {
            return Err(CoreError::InvalidInput(
                "integrality length does not match num_col".to_string(),
            ));
        }
        if !self.col_names.is_empty() && self.col_names.len() != n {
            return Err(CoreError::InvalidInput(
                "column name table length mismatch".to_string(),
            ));
        }
        if !self.row_names.is_empty() && self.row_names.len() != m {
            return Err(CoreError::InvalidInput(
                "row name table length mismatch".to_string(),
            ));
        }
        self.a_matrix.check_consistent()
    }

    /// Objective value of `x` in user sense, including the offset.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.num_col);
        let linear: f64 = self
            .col_cost
            .iter()
            .zip(x.iter())
            .map(|(&c, &v)| c * v)
            .sum();
        linear + self.offset
    }
}

/// Normalize bound pairs against the infinite threshold.
///
/// Values at or beyond `infinite_bound` are snapped to ±∞; NaNs and crossed
/// pairs are rejected. Returns the number of snapped values.
pub fn assess_bounds(
    what: &str,
    lower: &mut [f64],
    upper: &mut [f64],
    infinite_bound: f64,
) -> CoreResult<usize> {
    debug_assert_eq!(lower.len(), upper.len());
    let mut snapped = 0usize;
    for k in 0..lower.len() {
        if lower[k].is_nan() || upper[k].is_nan() {
            return Err(CoreError::InvalidInput(format!(
                "{} bound {} is NaN",
                what, k
            )));
        }
        if lower[k] <= -infinite_bound {
            if lower[k] != f64::NEG_INFINITY {
                snapped += 1;
            }
            lower[k] = f64::NEG_INFINITY;
        }
        if upper[k] >= infinite_bound {
            if upper[k] != f64::INFINITY {
                snapped += 1;
            }
            upper[k] = f64::INFINITY;
        }
        if lower[k] > upper[k] {
            return Err(CoreError::InvalidInput(format!(
                "{} bound {}: lower {} exceeds upper {}",
                what, k, lower[k], upper[k]
            )));
        }
    }
    Ok(snapped)
}

/// Normalize costs against the infinite threshold. NaN is rejected; costs at
/// or beyond the threshold are kept (they drive infinite-cost handling) and
/// reported through the returned flag.
pub fn assess_costs(cost: &mut [f64], infinite_cost: f64) -> CoreResult<bool> {
    let mut has_infinite = false;
    for (k, c) in cost.iter_mut().enumerate() {
        if c.is_nan() {
            return Err(CoreError::InvalidInput(format!("cost {} is NaN", k)));
        }
        if c.abs() >= infinite_cost {
            *c = c.signum() * f64::INFINITY;
            has_infinite = true;
        }
    }
    Ok(has_infinite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lp_defaults() {
        let lp = Lp::new(2, 3);
        assert_eq!(lp.num_col, 3);
        assert_eq!(lp.num_row, 2);
        assert_eq!(lp.col_lower, vec![0.0; 3]);
        assert_eq!(lp.col_upper, vec![f64::INFINITY; 3]);
        assert_eq!(lp.row_lower, vec![f64::NEG_INFINITY; 2]);
        assert!(!lp.is_mip());
        lp.check_consistent().unwrap();
    }

    #[test]
    fn test_is_mip() {
        let mut lp = Lp::new(0, 2);
        lp.integrality = vec![VarKind::Continuous, VarKind::Continuous];
        assert!(!lp.is_mip());
        lp.integrality[1] = VarKind::Integer;
        assert!(lp.is_mip());
        lp.integrality[1] = VarKind::SemiContinuous;
        assert!(lp.is_mip());
    }

    #[test]
    fn test_assess_bounds_snaps_and_rejects() {
        let mut lower = vec![-1e21, 0.0, 2.0];
        let mut upper = vec![5.0, 1e25, 1.0];
        let err = assess_bounds("col", &mut lower, &mut upper, 1e20);
        assert!(err.is_err()); // entry 2 crossed

        let mut lower = vec![-1e21, 0.0];
        let mut upper = vec![5.0, 1e25];
        let snapped = assess_bounds("col", &mut lower, &mut upper, 1e20).unwrap();
        assert_eq!(snapped, 2);
        assert_eq!(lower[0], f64::NEG_INFINITY);
        assert_eq!(upper[1], f64::INFINITY);
    }

    #[test]
    fn test_assess_costs() {
        let mut cost = vec![1.0, -1e20, 3.0];
        let has_inf = assess_costs(&mut cost, 1e20).unwrap();
        assert!(has_inf);
        assert_eq!(cost[1], f64::NEG_INFINITY);

        let mut cost = vec![f64::NAN];
        assert!(assess_costs(&mut cost, 1e20).is_err());
    }

    #[test]
    fn test_objective_value_with_offset() {
        let mut lp = Lp::new(0, 2);
        lp.col_cost = vec![2.0, -1.0];
        lp.offset = 10.0;
        assert_eq!(lp.objective_value(&[3.0, 4.0]), 12.0);
    }
}
