//! Irreducible infeasible subsystem extraction via the elasticity filter.
//!
//! The filter relaxes every candidate row with penalized elastic slacks,
//! solves, and re-imposes relaxations that the optimum uses, until the
//! elastic model itself turns infeasible. The rows enforced in that final
//! pass form the infeasible subset seed. The work happens on a scratch copy,
//! so the user's model is untouched on every path.

use log::debug;

use crate::model::index_set::IndexCollection;
use crate::model::Model;
use crate::status::{CoreError, CoreResult, ModelStatus};

/// How the filter seeds its candidate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IisStrategy {
    /// Elasticize every row with a nonnegative penalty.
    #[default]
    Elastic,
    /// Restrict candidates to the support of the dual ray before filtering.
    FromRay,
}

/// The extracted infeasible subsystem.
#[derive(Debug, Clone, Default)]
pub struct Iis {
    /// The model was feasible; the IIS is empty.
    pub feasible: bool,
    /// Rows in the infeasible subset.
    pub rows: Vec<usize>,
    /// Columns whose bounds participate (populated when column bounds were
    /// elasticized).
    pub cols: Vec<usize>,
}

/// Per-call parameters.
#[derive(Debug, Clone)]
pub struct IisOptions {
    pub strategy: IisStrategy,
    /// Also relax column bounds with elastics.
    pub elastic_column_bounds: bool,
    /// Per-row penalties; rows with a negative penalty are exempt and can
    /// never appear in the subset. Empty means the default penalty
    /// everywhere.
    pub row_penalties: Vec<f64>,
}

impl Default for IisOptions {
    fn default() -> Self {
        Self {
            strategy: IisStrategy::default(),
            elastic_column_bounds: false,
            row_penalties: Vec::new(),
        }
    }
}

impl Model {
    /// Extract an irreducible infeasible subsystem of the current model.
    pub fn extract_iis(&mut self, iis_options: &IisOptions) -> CoreResult<Iis> {
        if !iis_options.row_penalties.is_empty()
            && iis_options.row_penalties.len() != self.num_row()
        {
            return Err(CoreError::InvalidInput(format!(
                "{} row penalties for {} rows",
                iis_options.row_penalties.len(),
                self.num_row()
            )));
        }

        // Candidate rows: nonnegative penalty, and within the dual-ray
        // support when that strategy is selected.
        let mut candidate = vec![true; self.num_row()];
        for (i, &p) in iis_options.row_penalties.iter().enumerate() {
            if p < 0.0 {
                candidate[i] = false;
            }
        }
        if iis_options.strategy == IisStrategy::FromRay {
            if self.status() == ModelStatus::Notset {
                self.run()?;
            }
            if self.has_dual_ray() {
                let ray = self.get_dual_ray()?;
                for (i, &y) in ray.iter().enumerate() {
                    if y.abs() < 1e-10 {
                        candidate[i] = false;
                    }
                }
            }
        }

        // Scratch model: original LP with zeroed objective, relaxed
        // integrality, and elastics on the candidate rows.
        let mut lp = self.lp().clone();
        lp.integrality.clear();
        lp.col_cost.iter_mut().for_each(|c| *c = 0.0);
        lp.offset = 0.0;
        lp.sense = crate::model::lp::ObjSense::Minimize;

        let mut scratch = Model::new();
        scratch.options = self.options.clone();
        scratch.pass_lp(lp)?;

        let default_penalty = self.options.iis_penalty;
        let penalty_of = |i: usize| -> f64 {
            iis_options
                .row_penalties
                .get(i)
                .copied()
                .unwrap_or(default_penalty)
        };

        // Elastic columns: e⁺ adds, e⁻ subtracts from the row activity.
        // elastic_cols[k] = (row, col_plus, col_minus).
        let mut elastic_cols: Vec<(usize, usize, usize)> = Vec::new();
        for i in 0..self.num_row() {
            if !candidate[i] {
                continue;
            }
            let p = penalty_of(i);
            let plus = scratch.num_col();
            scratch.add_col(p, 0.0, f64::INFINITY, &[i], &[1.0])?;
            let minus = scratch.num_col();
            scratch.add_col(p, 0.0, f64::INFINITY, &[i], &[-1.0])?;
            elastic_cols.push((i, plus, minus));
        }

        // Column-bound elastics: shift the bound rows through extra rows is
        // unnecessary; widening the bounds directly with penalized slack
        // columns needs a row carrying x_j, so add one equality row per
        // elasticized column.
        let mut elastic_bound_cols: Vec<(usize, usize, usize)> = Vec::new();
        if iis_options.elastic_column_bounds {
            for j in 0..self.num_col() {
                let lower = self.lp().col_lower[j];
                let upper = self.lp().col_upper[j];
                if !lower.is_finite() && !upper.is_finite() {
                    continue;
                }
                // x_j − t = 0 with t taking the original bounds; x_j freed.
                let row = scratch.num_row();
                scratch.add_row(0.0, 0.0, &[j], &[1.0])?;
                scratch.add_col(0.0, lower, upper, &[row], &[-1.0])?;
                scratch.change_col_bounds(
                    &IndexCollection::interval(j, j),
                    &[f64::NEG_INFINITY],
                    &[f64::INFINITY],
                )?;
                let p = default_penalty;
                let plus = scratch.num_col();
                scratch.add_col(p, 0.0, f64::INFINITY, &[row], &[1.0])?;
                let minus = scratch.num_col();
                scratch.add_col(p, 0.0, f64::INFINITY, &[row], &[-1.0])?;
                elastic_bound_cols.push((j, plus, minus));
            }
        }

        let value_tol = self.options.primal_feasibility_tolerance * 10.0;
        let mut enforced_rows: Vec<usize> = Vec::new();
        let mut enforced_cols: Vec<usize> = Vec::new();

        loop {
            let status = scratch.run()?;
            match status {
                ModelStatus::Optimal | ModelStatus::Unknown => {}
                ModelStatus::Infeasible => {
                    // Enforcements made the elastic model infeasible: the
                    // enforced set is the subset.
                    debug!(
                        "elasticity filter converged: {} rows, {} cols",
                        enforced_rows.len(),
                        enforced_cols.len()
                    );
                    enforced_rows.sort_unstable();
                    enforced_cols.sort_unstable();
                    return Ok(Iis {
                        feasible: false,
                        rows: enforced_rows,
                        cols: enforced_cols,
                    });
                }
                other => {
                    return Err(CoreError::Numerical(format!(
                        "elastic subproblem stopped with status {}",
                        other
                    )));
                }
            }

            let objective = scratch.info().objective_function_value;
            if objective.abs() <= value_tol && enforced_rows.is_empty() && enforced_cols.is_empty()
            {
                // Nothing needed relaxing: the model is feasible.
                return Ok(Iis {
                    feasible: true,
                    rows: Vec::new(),
                    cols: Vec::new(),
                });
            }

            // Enforce every relaxation the optimum leaned on.
            let values = scratch.solution().col_value.clone();
            let mut progressed = false;
            for &(row, plus, minus) in &elastic_cols {
                if values[plus] > value_tol || values[minus] > value_tol {
                    scratch.change_col_bounds(
                        &IndexCollection::Set(vec![plus, minus]),
                        &[0.0, 0.0],
                        &[0.0, 0.0],
                    )?;
                    if !enforced_rows.contains(&row) {
                        enforced_rows.push(row);
                    }
                    progressed = true;
                }
            }
            for &(col, plus, minus) in &elastic_bound_cols {
                if values[plus] > value_tol || values[minus] > value_tol {
                    scratch.change_col_bounds(
                        &IndexCollection::Set(vec![plus, minus]),
                        &[0.0, 0.0],
                        &[0.0, 0.0],
                    )?;
                    if !enforced_cols.contains(&col) {
                        enforced_cols.push(col);
                    }
                    progressed = true;
                }
            }

            if !progressed {
                // Positive objective with no active elastic above tolerance
                // cannot happen with exact data; bail out rather than spin.
                return Err(CoreError::Numerical(
                    "elasticity filter stalled".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    #[test]
    fn test_iis_two_contradicting_rows() {
        // x >= 1, x <= 0, x free: both rows form the IIS.
        let mut model = Model::new();
        model
            .add_col(0.0, f64::NEG_INFINITY, f64::INFINITY, &[], &[])
            .unwrap();
        model.add_row(1.0, f64::INFINITY, &[0], &[1.0]).unwrap();
        model.add_row(f64::NEG_INFINITY, 0.0, &[0], &[1.0]).unwrap();

        let iis = model.extract_iis(&IisOptions::default()).unwrap();
        assert!(!iis.feasible);
        assert_eq!(iis.rows, vec![0, 1]);

        // The model itself is untouched.
        assert_eq!(model.num_row(), 2);
        assert_eq!(model.num_col(), 1);
        assert_eq!(model.lp().col_cost, vec![0.0]);
    }

    #[test]
    fn test_iis_feasible_model() {
        let mut model = Model::new();
        model.add_col(1.0, 0.0, 10.0, &[], &[]).unwrap();
        model.add_row(0.0, 5.0, &[0], &[1.0]).unwrap();

        let iis = model.extract_iis(&IisOptions::default()).unwrap();
        assert!(iis.feasible);
        assert!(iis.rows.is_empty());
    }

    #[test]
    fn test_iis_negative_penalty_exempts_row() {
        // Same contradiction, but row 0 is exempt: the filter cannot seat it
        // in the subset, and enforcing row 1 alone stays feasible, so the
        // filter reports feasibility of the elastic relaxation.
        let mut model = Model::new();
        model
            .add_col(0.0, f64::NEG_INFINITY, f64::INFINITY, &[], &[])
            .unwrap();
        model.add_row(1.0, f64::INFINITY, &[0], &[1.0]).unwrap();
        model.add_row(f64::NEG_INFINITY, 0.0, &[0], &[1.0]).unwrap();

        let opts = IisOptions {
            row_penalties: vec![-1.0, 1.0],
            ..Default::default()
        };
        let iis = model.extract_iis(&opts).unwrap();
        assert!(!iis.rows.contains(&0));
    }
}
