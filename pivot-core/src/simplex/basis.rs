//! Basis representations.
//!
//! The user-facing [`Basis`] is a status per column and per row (the row
//! status applies to the row's logical). The engine duplicates this as the
//! flag/move/index triple of [`SimplexBasis`], where variables are numbered
//! structurals first, then logicals.

use crate::model::lp::Lp;
use crate::status::{CoreError, CoreResult};

/// Status of a column or of a row's logical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasisStatus {
    Basic,
    #[default]
    Lower,
    Upper,
    /// Nonbasic free variable held at zero.
    Zero,
    /// Nonbasic with no committed bound; used by alien bases.
    Nonbasic,
}

/// User-facing basis: full-length status vectors.
///
/// A *useful* basis is any full-length pair of status vectors; a *valid* one
/// has exactly `num_row` basic entries and factorizes. An *alien* basis is
/// retained but must be repaired by the next factorization.
#[derive(Debug, Clone, Default)]
pub struct Basis {
    pub valid: bool,
    pub alien: bool,
    pub col_status: Vec<BasisStatus>,
    pub row_status: Vec<BasisStatus>,
}

impl Basis {
    /// The all-logical basis: every column nonbasic at a bound, every row
    /// basic.
    pub fn logical(lp: &Lp) -> Self {
        let col_status = (0..lp.num_col)
            .map(|j| nonbasic_status_for_bounds(lp.col_lower[j], lp.col_upper[j]))
            .collect();
        Self {
            valid: true,
            alien: false,
            col_status,
            row_status: vec![BasisStatus::Basic; lp.num_row],
        }
    }

    pub fn clear(&mut self) {
        self.valid = false;
        self.alien = false;
        self.col_status.clear();
        self.row_status.clear();
    }

    /// Number of basic entries across columns and rows.
    pub fn num_basic(&self) -> usize {
        self.col_status
            .iter()
            .chain(self.row_status.iter())
            .filter(|&&s| s == BasisStatus::Basic)
            .count()
    }

    /// Shape and count check against an LP.
    pub fn validate(&self, lp: &Lp) -> CoreResult<()> {
        if self.col_status.len() != lp.num_col || self.row_status.len() != lp.num_row {
            return Err(CoreError::InvalidInput(
                "basis status vector lengths do not match the LP".to_string(),
            ));
        }
        Ok(())
    }
}

/// Nonbasic status a variable naturally takes for its bound pattern.
pub fn nonbasic_status_for_bounds(lower: f64, upper: f64) -> BasisStatus {
    if lower.is_finite() {
        BasisStatus::Lower
    } else if upper.is_finite() {
        BasisStatus::Upper
    } else {
        BasisStatus::Zero
    }
}

/// Engine-internal basis triple.
#[derive(Debug, Clone, Default)]
pub struct SimplexBasis {
    /// 1 for nonbasic, 0 for basic; length n+m.
    pub nonbasic_flag: Vec<i8>,
    /// +1 may increase, −1 may decrease, 0 fixed or free; length n+m.
    pub nonbasic_move: Vec<i8>,
    /// Variable in each basis position; length m.
    pub basic_index: Vec<usize>,
}

impl SimplexBasis {
    /// Build from a user basis. Basic entries fill `basic_index` in variable
    /// order: structural columns first, then logicals.
    pub fn from_basis(basis: &Basis, lp: &Lp) -> CoreResult<Self> {
        basis.validate(lp)?;
        let n = lp.num_col;
        let m = lp.num_row;
        let mut nonbasic_flag = vec![1i8; n + m];
        let mut nonbasic_move = vec![0i8; n + m];
        let mut basic_index = Vec::with_capacity(m);

        for var in 0..n + m {
            let (status, lower, upper) = if var < n {
                (basis.col_status[var], lp.col_lower[var], lp.col_upper[var])
            } else {
                (
                    basis.row_status[var - n],
                    lp.row_lower[var - n],
                    lp.row_upper[var - n],
                )
            };
            match status {
                BasisStatus::Basic => {
                    nonbasic_flag[var] = 0;
                    basic_index.push(var);
                }
                other => {
                    nonbasic_move[var] = nonbasic_move_for(other, lower, upper);
                }
            }
        }

        if basic_index.len() != m {
            return Err(CoreError::InvalidInput(format!(
                "basis has {} basic entries, expected {}",
                basic_index.len(),
                m
            )));
        }
        Ok(Self {
            nonbasic_flag,
            nonbasic_move,
            basic_index,
        })
    }

    /// Convert back to a user basis.
    pub fn to_basis(&self, lp: &Lp) -> Basis {
        let n = lp.num_col;
        let m = lp.num_row;
        let mut basis = Basis {
            valid: true,
            alien: false,
            col_status: vec![BasisStatus::Lower; n],
            row_status: vec![BasisStatus::Lower; m],
        };
        for var in 0..n + m {
            let (lower, upper) = if var < n {
                (lp.col_lower[var], lp.col_upper[var])
            } else {
                (lp.row_lower[var - n], lp.row_upper[var - n])
            };
            let status = if self.nonbasic_flag[var] == 0 {
                BasisStatus::Basic
            } else {
                match self.nonbasic_move[var] {
                    1 => BasisStatus::Lower,
                    -1 => BasisStatus::Upper,
                    _ => {
                        if lower.is_finite() && lower == upper {
                            BasisStatus::Lower
                        } else if !lower.is_finite() && !upper.is_finite() {
                            BasisStatus::Zero
                        } else {
                            BasisStatus::Nonbasic
                        }
                    }
                }
            };
            if var < n {
                basis.col_status[var] = status;
            } else {
                basis.row_status[var - n] = status;
            }
        }
        basis
    }

    /// Consistency: one basic variable per position, flags matching.
    pub fn check_consistent(&self, num_col: usize, num_row: usize) -> CoreResult<()> {
        if self.nonbasic_flag.len() != num_col + num_row
            || self.nonbasic_move.len() != num_col + num_row
            || self.basic_index.len() != num_row
        {
            return Err(CoreError::InvalidInput(
                "simplex basis dimensions inconsistent".to_string(),
            ));
        }
        let basic_from_flag = self.nonbasic_flag.iter().filter(|&&f| f == 0).count();
        if basic_from_flag != num_row {
            return Err(CoreError::InvalidInput(format!(
                "{} basic flags for {} rows",
                basic_from_flag, num_row
            )));
        }
        for &var in &self.basic_index {
            if var >= num_col + num_row || self.nonbasic_flag[var] != 0 {
                return Err(CoreError::InvalidInput(
                    "basic_index disagrees with nonbasic_flag".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Move direction implied by a nonbasic status and the bound pattern.
pub fn nonbasic_move_for(status: BasisStatus, lower: f64, upper: f64) -> i8 {
    match status {
        BasisStatus::Lower => {
            if lower == upper {
                0
            } else {
                1
            }
        }
        BasisStatus::Upper => -1,
        BasisStatus::Zero | BasisStatus::Nonbasic => {
            if lower.is_finite() {
                1
            } else if upper.is_finite() {
                -1
            } else {
                0
            }
        }
        BasisStatus::Basic => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lp_2x2() -> Lp {
        let mut lp = Lp::new(2, 2);
        lp.col_lower = vec![0.0, f64::NEG_INFINITY];
        lp.col_upper = vec![1.0, f64::INFINITY];
        lp.row_lower = vec![0.0, f64::NEG_INFINITY];
        lp.row_upper = vec![4.0, 3.0];
        lp
    }

    #[test]
    fn test_logical_basis() {
        let lp = lp_2x2();
        let basis = Basis::logical(&lp);
        assert!(basis.valid);
        assert_eq!(basis.num_basic(), 2);
        assert_eq!(basis.col_status[0], BasisStatus::Lower);
        assert_eq!(basis.col_status[1], BasisStatus::Zero);
        assert_eq!(basis.row_status, vec![BasisStatus::Basic; 2]);
    }

    #[test]
    fn test_roundtrip_simplex_basis() {
        let lp = lp_2x2();
        let basis = Basis::logical(&lp);
        let sb = SimplexBasis::from_basis(&basis, &lp).unwrap();
        sb.check_consistent(2, 2).unwrap();
        assert_eq!(sb.basic_index, vec![2, 3]);
        assert_eq!(sb.nonbasic_flag, vec![1, 1, 0, 0]);
        assert_eq!(sb.nonbasic_move[0], 1);
        assert_eq!(sb.nonbasic_move[1], 0);

        let back = sb.to_basis(&lp);
        assert_eq!(back.col_status, basis.col_status);
        assert_eq!(back.row_status, basis.row_status);
    }

    #[test]
    fn test_wrong_basic_count_rejected() {
        let lp = lp_2x2();
        let mut basis = Basis::logical(&lp);
        basis.row_status[0] = BasisStatus::Lower;
        assert!(SimplexBasis::from_basis(&basis, &lp).is_err());
    }
}
