//! Standard-form export: min cᵀx, A x = b, x ≥ 0.
//!
//! Downstream consumers (relaxation checks, conic subsolvers) want the LP in
//! equality form with nonnegative variables. Bounded columns are shifted or
//! negated, fixed columns are substituted out, free columns split, inequality
//! rows get slack columns, and boxed slacks get their own upper-bound rows.
//! The matrix is emitted as CSC for sparse consumers.

use sprs::{CsMat, TriMat};

use crate::model::lp::Lp;
use crate::model::Model;
use crate::status::{CoreError, CoreResult};

/// The standard-form image of an LP.
#[derive(Debug, Clone)]
pub struct StandardFormLp {
    pub num_col: usize,
    pub num_row: usize,
    /// Minimization costs.
    pub cost: Vec<f64>,
    /// Constant to add back to the standard-form objective to recover the
    /// original objective value (in the original sense).
    pub offset: f64,
    pub a_matrix: CsMat<f64>,
    pub rhs: Vec<f64>,
}

impl Model {
    /// Export the incumbent LP in standard form.
    pub fn form_standard_form_lp(&self) -> CoreResult<StandardFormLp> {
        form_standard_form(self.lp())
    }
}

/// Build the standard form of an LP.
pub fn form_standard_form(lp: &Lp) -> CoreResult<StandardFormLp> {
    let n = lp.num_col;
    let m = lp.num_row;
    let sense = lp.sense.sign();

    // Working copies in minimization form.
    let mut lp_col = lp.a_matrix.clone();
    lp_col.ensure_colwise();

    // Entries of the output, initially one row per original row.
    let mut tri_entries: Vec<(usize, usize, f64)> = Vec::new();
    let mut cost: Vec<f64> = Vec::new();
    let mut offset = lp.offset;
    let mut rhs: Vec<f64> = vec![0.0; m];
    let mut extra_rows: Vec<(usize, f64)> = Vec::new(); // (column, upper) pairs

    // Rows: decide the equality right-hand side and slack needs up front.
    // slack_kind: 0 none, −1 for a'x − s = L (s ≥ 0), +1 for a'x + s = U.
    let mut slack_specs: Vec<(usize, f64, Option<f64>)> = Vec::new(); // (row, sign, upper)
    for i in 0..m {
        let lower = lp.row_lower[i];
        let upper = lp.row_upper[i];
        if lower.is_finite() && upper.is_finite() {
            if lower == upper {
                rhs[i] = lower;
            } else {
                // Boxed: a'x − s = L with s ∈ [0, U − L].
                rhs[i] = lower;
                slack_specs.push((i, -1.0, Some(upper - lower)));
            }
        } else if lower.is_finite() {
            rhs[i] = lower;
            slack_specs.push((i, -1.0, None));
        } else if upper.is_finite() {
            rhs[i] = upper;
            slack_specs.push((i, 1.0, None));
        } else {
            return Err(CoreError::InvalidInput(format!(
                "row {} is free; standard form has no image for it",
                i
            )));
        }
    }

    // Columns: shift, negate, or split into nonnegative variables.
    let mut next_col = 0usize;
    for j in 0..n {
        let c = sense * lp.col_cost[j];
        let lower = lp.col_lower[j];
        let upper = lp.col_upper[j];
        let col_range = lp_col.start[j]..lp_col.start[j + 1];
        let entries: Vec<(usize, f64)> = col_range
            .map(|el| (lp_col.index[el], lp_col.value[el]))
            .collect();

        if lower.is_finite() && upper == lower {
            // Fixed: substitute the column out entirely, folding a_ij·l into
            // the right-hand side and c·l into the offset. Emitting a shifted
            // variable without its upper bound would relax x = l to x ≥ l.
            for &(i, v) in &entries {
                rhs[i] -= v * lower;
            }
            offset += sense * c * lower;
        } else if lower.is_finite() {
            // x = l + x̃, x̃ ≥ 0 (and x̃ ≤ u − l when boxed).
            for &(i, v) in &entries {
                tri_entries.push((i, next_col, v));
                rhs[i] -= v * lower;
            }
            // The rhs shift above subtracts from row activity; standard form
            // keeps b on the right: b_i := b_i − a_ij·l.
            cost.push(c);
            offset += sense * c * lower;
            if upper.is_finite() && upper > lower {
                extra_rows.push((next_col, upper - lower));
            }
            next_col += 1;
        } else if upper.is_finite() {
            // x = u − x̃, x̃ ≥ 0: negate the column.
            for &(i, v) in &entries {
                tri_entries.push((i, next_col, -v));
                rhs[i] -= v * upper;
            }
            cost.push(-c);
            offset += sense * c * upper;
            next_col += 1;
        } else {
            // Free: x = x⁺ − x⁻.
            for &(i, v) in &entries {
                tri_entries.push((i, next_col, v));
                tri_entries.push((i, next_col + 1, -v));
            }
            cost.push(c);
            cost.push(-c);
            next_col += 2;
        }
    }

    // Row slacks.
    for &(i, sign, upper) in &slack_specs {
        tri_entries.push((i, next_col, sign));
        cost.push(0.0);
        if let Some(u) = upper {
            extra_rows.push((next_col, u));
        }
        next_col += 1;
    }

    // Upper-bound rows: x̃_j + t = u, t ≥ 0.
    let mut num_row_out = m;
    for &(col, upper) in &extra_rows {
        tri_entries.push((num_row_out, col, 1.0));
        tri_entries.push((num_row_out, next_col, 1.0));
        cost.push(0.0);
        rhs.push(upper);
        next_col += 1;
        num_row_out += 1;
    }

    let mut tri = TriMat::new((num_row_out, next_col));
    for &(i, j, v) in &tri_entries {
        tri.add_triplet(i, j, v);
    }

    Ok(StandardFormLp {
        num_col: next_col,
        num_row: num_row_out,
        cost,
        offset,
        a_matrix: tri.to_csc(),
        rhs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::SparseMatrix;
    use crate::model::lp::ObjSense;

    #[test]
    fn test_equality_identity() {
        // min x  s.t.  x = 3, x >= 0: already standard.
        let mut lp = Lp::new(1, 1);
        lp.col_cost = vec![1.0];
        lp.row_lower = vec![3.0];
        lp.row_upper = vec![3.0];
        lp.a_matrix =
            SparseMatrix::from_colwise(1, 1, vec![0, 1], vec![0], vec![1.0]).unwrap();

        let sf = form_standard_form(&lp).unwrap();
        assert_eq!(sf.num_col, 1);
        assert_eq!(sf.num_row, 1);
        assert_eq!(sf.rhs, vec![3.0]);
        assert_eq!(sf.cost, vec![1.0]);
    }

    #[test]
    fn test_inequality_gets_slack() {
        // x <= 4 becomes x + s = 4.
        let mut lp = Lp::new(1, 1);
        lp.col_cost = vec![1.0];
        lp.row_lower = vec![f64::NEG_INFINITY];
        lp.row_upper = vec![4.0];
        lp.a_matrix =
            SparseMatrix::from_colwise(1, 1, vec![0, 1], vec![0], vec![1.0]).unwrap();

        let sf = form_standard_form(&lp).unwrap();
        assert_eq!(sf.num_col, 2);
        assert_eq!(sf.rhs, vec![4.0]);
        assert_eq!(sf.a_matrix.nnz(), 2);
    }

    #[test]
    fn test_shift_and_split() {
        // One shifted column (l = 2), one free column, one >= row.
        let mut lp = Lp::new(1, 2);
        lp.col_cost = vec![1.0, 2.0];
        lp.col_lower = vec![2.0, f64::NEG_INFINITY];
        lp.col_upper = vec![f64::INFINITY, f64::INFINITY];
        lp.row_lower = vec![5.0];
        lp.row_upper = vec![f64::INFINITY];
        lp.a_matrix = SparseMatrix::from_colwise(
            1,
            2,
            vec![0, 1, 2],
            vec![0, 0],
            vec![1.0, 1.0],
        )
        .unwrap();

        let sf = form_standard_form(&lp).unwrap();
        // Columns: shifted x0, split x1 (two), one surplus slack.
        assert_eq!(sf.num_col, 4);
        // rhs = 5 − 1·2 = 3.
        assert_eq!(sf.rhs, vec![3.0]);
        // Shifting contributes c·l to the offset.
        assert!((sf.offset - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_column_substituted_out() {
        // min x + y  s.t.  x + y >= 5, x fixed at 2, y >= 0.
        let mut lp = Lp::new(1, 2);
        lp.col_cost = vec![1.0, 1.0];
        lp.col_lower = vec![2.0, 0.0];
        lp.col_upper = vec![2.0, f64::INFINITY];
        lp.row_lower = vec![5.0];
        lp.row_upper = vec![f64::INFINITY];
        lp.a_matrix = SparseMatrix::from_colwise(
            1,
            2,
            vec![0, 1, 2],
            vec![0, 0],
            vec![1.0, 1.0],
        )
        .unwrap();

        let sf = form_standard_form(&lp).unwrap();
        // Columns: shifted y and the surplus slack; x is gone.
        assert_eq!(sf.num_col, 2);
        assert_eq!(sf.num_row, 1);
        assert_eq!(sf.cost, vec![1.0, 0.0]);
        // rhs = 5 − 1·2, offset = c_x·2; the image keeps x = 2 exact, so the
        // standard-form optimum (y = 3) recovers the original objective 5.
        assert_eq!(sf.rhs, vec![3.0]);
        assert!((sf.offset - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_maximize_negates_costs() {
        let mut lp = Lp::new(1, 1);
        lp.sense = ObjSense::Maximize;
        lp.col_cost = vec![3.0];
        lp.row_lower = vec![0.0];
        lp.row_upper = vec![0.0];
        lp.a_matrix =
            SparseMatrix::from_colwise(1, 1, vec![0, 1], vec![0], vec![1.0]).unwrap();
        let sf = form_standard_form(&lp).unwrap();
        assert_eq!(sf.cost, vec![-3.0]);
    }
}
