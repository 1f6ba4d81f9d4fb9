//! Degeneracy control: perturbation, cycling detection, taboo rows, and
//! edge-weight maintenance.

use log::debug;

use super::SimplexEngine;
use crate::linalg::WorkVector;

/// Floor for steepest-edge weights; denormalized weights destabilize CHUZR.
pub(crate) const WEIGHT_FLOOR: f64 = 1e-4;

/// Entries per basis position after which a Devex framework is stale.
const DEVEX_AGE_LIMIT_FACTOR: usize = 2;

const VISITED_BASIS_LIMIT: usize = 1 << 12;

impl SimplexEngine {
    // ----- perturbation ---------------------------------------------------

    /// Perturb the working costs by a tiny randomized amount biased to keep
    /// the current duals feasible. The exact costs are saved for cleanup.
    pub(crate) fn perturb_costs(&mut self) {
        if self.info.costs_perturbed || !self.options.allow_cost_perturbation {
            return;
        }
        let max_cost = self
            .info
            .work_cost
            .iter()
            .fold(0.0_f64, |acc, c| acc.max(c.abs()));
        let base = 1e-7 * (1.0 + max_cost);
        self.info.saved_cost = self.info.work_cost.clone();
        for var in 0..self.num_tot() {
            let noise = base
                * (0.5 + self.random.fraction())
                * (1.0 + self.info.work_cost[var].abs());
            match self.basis.nonbasic_move[var] {
                1 => self.info.work_cost[var] += noise,
                -1 => self.info.work_cost[var] -= noise,
                _ => {}
            }
        }
        self.info.costs_perturbed = true;
        debug!("costs perturbed with base {:.2e}", base);
    }

    /// Perturb the working bounds outward by a tiny randomized amount.
    pub(crate) fn perturb_bounds(&mut self) {
        if self.info.bounds_perturbed || !self.options.allow_bound_perturbation {
            return;
        }
        let tol = self.options.primal_feasibility_tolerance;
        self.info.saved_lower = self.info.work_lower.clone();
        self.info.saved_upper = self.info.work_upper.clone();
        for var in 0..self.num_tot() {
            if self.info.work_lower[var] == self.info.work_upper[var] {
                continue; // keep fixed variables exact
            }
            if self.info.work_lower[var].is_finite() {
                self.info.work_lower[var] -= tol * (0.5 + self.random.fraction());
            }
            if self.info.work_upper[var].is_finite() {
                self.info.work_upper[var] += tol * (0.5 + self.random.fraction());
            }
        }
        self.info.bounds_perturbed = true;
        debug!("bounds perturbed");
    }

    /// Remove cost perturbation and refresh the duals from scratch.
    pub(crate) fn unperturb_costs(&mut self) {
        if !self.info.costs_perturbed {
            return;
        }
        self.info.work_cost = std::mem::take(&mut self.info.saved_cost);
        self.info.costs_perturbed = false;
        self.compute_dual();
        self.compute_objective();
    }

    /// Remove bound perturbation, snap nonbasic values back, and refresh the
    /// primals.
    pub(crate) fn unperturb_bounds(&mut self) {
        if !self.info.bounds_perturbed {
            return;
        }
        self.info.work_lower = std::mem::take(&mut self.info.saved_lower);
        self.info.work_upper = std::mem::take(&mut self.info.saved_upper);
        self.info.bounds_perturbed = false;
        self.set_nonbasic_values();
        self.compute_primal();
        self.compute_objective();
    }

    // ----- cycling and taboo ----------------------------------------------

    /// Record the current basis; returns `true` when it was seen before in
    /// this solve (a revisit, so the last change cycles).
    pub(crate) fn record_basis_visit(&mut self) -> bool {
        if self.visited_bases.len() >= VISITED_BASIS_LIMIT {
            self.visited_bases.clear();
        }
        !self.visited_bases.insert(self.basis_hash())
    }

    /// Mark a row taboo for the configured number of iterations.
    pub(crate) fn add_taboo_row(&mut self, position: usize) {
        let expiry = self.iteration_count + self.options.taboo_iterations;
        self.taboo_rows.push((position, expiry));
    }

    pub(crate) fn is_taboo(&self, position: usize) -> bool {
        self.taboo_rows
            .iter()
            .any(|&(p, expiry)| p == position && expiry > self.iteration_count)
    }

    pub(crate) fn purge_taboo(&mut self) {
        let now = self.iteration_count;
        self.taboo_rows.retain(|&(_, expiry)| expiry > now);
    }

    /// Handle a detected basis revisit: taboo the offending row, and after
    /// repeated detections abandon steepest edge for a Devex framework.
    pub(crate) fn handle_cycling(&mut self, row_out: usize) {
        self.bad_basis_change_count += 1;
        self.add_taboo_row(row_out);
        if self.bad_basis_change_count > 3 && !self.using_devex {
            debug!("persistent cycling: switching to Devex weights");
            self.switch_to_devex();
        }
    }

    /// Install a fresh Devex reference framework.
    pub(crate) fn switch_to_devex(&mut self) {
        self.using_devex = true;
        let m = self.lp.num_row;
        self.devex_weight = vec![1.0; m];
        self.devex_framework = vec![true; m];
        self.devex_age = 0;
        self.status.has_dual_steepest_edge_weights = false;
    }

    /// Weight used by CHUZR for a basis position under the active scheme.
    pub(crate) fn chuzr_weight(&self, position: usize) -> f64 {
        if self.options.edge_weight_strategy == crate::options::EdgeWeightStrategy::Dantzig {
            1.0
        } else if self.using_devex {
            self.devex_weight[position]
        } else {
            self.dual_edge_weight[position]
        }
    }

    // ----- edge-weight updates --------------------------------------------

    /// Dual steepest-edge recursion after a pivot on `row_out` with tableau
    /// column `col_aq`, pivot `alpha`, and FTRANed pivotal row `tau`:
    ///
    /// w_i ← w_i − 2·(α_i/α_p)·τ_i + (α_i/α_p)²·w_p,  w_p ← w_p/α_p².
    pub(crate) fn update_steepest_edge_weights(
        &mut self,
        row_out: usize,
        col_aq: &WorkVector,
        alpha: f64,
        tau: &WorkVector,
    ) {
        let w_p = self.dual_edge_weight[row_out];
        for &i in &col_aq.index {
            if i == row_out {
                continue;
            }
            let ratio = col_aq.array[i] / alpha;
            let w_new =
                self.dual_edge_weight[i] - 2.0 * ratio * tau.array[i] + ratio * ratio * w_p;
            self.dual_edge_weight[i] = w_new.max(WEIGHT_FLOOR);
        }
        self.dual_edge_weight[row_out] = (w_p / (alpha * alpha)).max(WEIGHT_FLOOR);
    }

    /// Devex recursion: w_i ← max(w_i, (α_i/α_p)²·w_p). The pivotal row
    /// leaves the reference framework; once most rows have left, or the
    /// framework is old, weights are no longer trustworthy and it restarts.
    pub(crate) fn update_devex_weights(
        &mut self,
        row_out: usize,
        col_aq: &WorkVector,
        alpha: f64,
    ) {
        let w_p = self.devex_weight[row_out].max(1.0);
        for &i in &col_aq.index {
            if i == row_out {
                continue;
            }
            let ratio = col_aq.array[i] / alpha;
            let candidate = ratio * ratio * w_p;
            if candidate > self.devex_weight[i] {
                self.devex_weight[i] = candidate;
            }
        }
        self.devex_weight[row_out] = (w_p / (alpha * alpha)).max(1.0);
        self.devex_framework[row_out] = false;
        self.devex_age += 1;

        let m = self.lp.num_row.max(1);
        let outside = self.devex_framework.iter().filter(|&&f| !f).count();
        if self.devex_age > DEVEX_AGE_LIMIT_FACTOR * m || 2 * outside > m {
            debug!("devex framework stale; resetting");
            self.devex_weight.iter_mut().for_each(|w| *w = 1.0);
            self.devex_framework.iter_mut().for_each(|f| *f = true);
            self.devex_age = 0;
        }
    }

    /// Stagnation tracker: returns `true` when the primal infeasibility sum
    /// has not improved over the configured window of rebuilds.
    pub(crate) fn stagnating(
        &mut self,
        best_sum: &mut f64,
        stagnant_rebuilds: &mut usize,
    ) -> bool {
        let sum = self.info.sum_primal_infeasibilities;
        if sum < 0.99 * *best_sum {
            *best_sum = sum;
            *stagnant_rebuilds = 0;
            false
        } else {
            *stagnant_rebuilds += 1;
            *stagnant_rebuilds >= self.options.stagnation_window
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lp::Lp;
    use crate::options::SolverOptions;
    use crate::simplex::basis::{Basis, SimplexBasis};

    fn engine_with_rows(m: usize) -> SimplexEngine {
        let mut engine = SimplexEngine::new(SolverOptions::default());
        let lp = Lp::new(m, 0);
        engine.lp = lp.clone();
        let basis = Basis::logical(&lp);
        engine.basis = SimplexBasis::from_basis(&basis, &lp).unwrap();
        engine.dual_edge_weight = vec![1.0; m];
        engine.devex_weight = vec![1.0; m];
        engine.devex_framework = vec![true; m];
        engine
    }

    #[test]
    fn test_taboo_expiry() {
        let mut engine = engine_with_rows(3);
        engine.iteration_count = 5;
        engine.add_taboo_row(1);
        assert!(engine.is_taboo(1));
        assert!(!engine.is_taboo(0));
        engine.iteration_count = 5 + engine.options.taboo_iterations;
        assert!(!engine.is_taboo(1));
        engine.purge_taboo();
        assert!(engine.taboo_rows.is_empty());
    }

    #[test]
    fn test_perturb_bounds_widens_and_saves() {
        let mut engine = engine_with_rows(3);
        engine.info.work_lower = vec![0.0, f64::NEG_INFINITY, 2.0];
        engine.info.work_upper = vec![5.0, 3.0, 2.0];
        let lower = engine.info.work_lower.clone();
        let upper = engine.info.work_upper.clone();

        engine.perturb_bounds();
        assert!(engine.info.bounds_perturbed);
        assert_eq!(engine.info.saved_lower, lower);
        assert_eq!(engine.info.saved_upper, upper);
        // Finite bounds of non-fixed variables move outward.
        assert!(engine.info.work_lower[0] < lower[0]);
        assert!(engine.info.work_upper[0] > upper[0]);
        assert_eq!(engine.info.work_lower[1], f64::NEG_INFINITY);
        assert!(engine.info.work_upper[1] > upper[1]);
        // Fixed variables stay exact.
        assert_eq!(engine.info.work_lower[2], 2.0);
        assert_eq!(engine.info.work_upper[2], 2.0);

        // A second call is a no-op while the first is still installed.
        let perturbed = engine.info.work_lower.clone();
        engine.perturb_bounds();
        assert_eq!(engine.info.work_lower, perturbed);
    }

    #[test]
    fn test_cycling_switches_to_devex() {
        let mut engine = engine_with_rows(2);
        for _ in 0..5 {
            engine.handle_cycling(0);
        }
        assert!(engine.using_devex);
    }

    #[test]
    fn test_weight_floor() {
        let mut engine = engine_with_rows(2);
        engine.dual_edge_weight = vec![1.0, 1.0];
        let mut col = WorkVector::new(2);
        col.insert(0, 100.0);
        col.insert(1, 1.0);
        let tau = WorkVector::new(2);
        engine.update_steepest_edge_weights(1, &col, 1000.0, &tau);
        assert!(engine.dual_edge_weight[0] >= WEIGHT_FLOOR);
        assert!(engine.dual_edge_weight[1] >= WEIGHT_FLOOR);
    }

    #[test]
    fn test_basis_revisit_detected() {
        let mut engine = engine_with_rows(2);
        assert!(!engine.record_basis_visit());
        assert!(engine.record_basis_visit());
    }
}
