//! Dual revised simplex: phases 1 and 2.
//!
//! The iteration follows the classic state machine
//! rebuild → chuzr → btran → price → chuzc → ftran → ratio → update,
//! with steepest-edge (or Devex) row pricing and a two-stage bounded ratio
//! test. Phase 1 runs the same machinery over the artificial-bounds
//! subproblem that measures dual infeasibility.

use log::debug;

use super::{LoopOutcome, RayRecord, SimplexEngine};
use crate::callback::Callback;
use crate::linalg::WorkVector;
use crate::status::{CoreResult, ModelStatus};

/// Artificial phase-1 bounds by real bound pattern.
const PHASE1_FREE_BOUND: f64 = 1000.0;

pub(crate) enum DualPhaseResult {
    Optimal,
    Unbounded { row_out: usize, move_out: i8 },
    Stopped(ModelStatus),
}

impl SimplexEngine {
    /// Dual simplex driver: reach dual feasibility (flips, then phase 1 if
    /// needed), then run phase 2.
    pub(crate) fn solve_dual(
        &mut self,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<ModelStatus> {
        self.flip_to_dual_feasible();
        self.compute_dual_infeasibilities();

        if self.info.num_dual_infeasibilities > 0 {
            match self.dual_phase1(callback)? {
                DualPhaseResult::Optimal => {}
                DualPhaseResult::Unbounded { .. } => {
                    // The phase-1 subproblem is bounded; failure here is
                    // numerical.
                    return Ok(ModelStatus::Unknown);
                }
                DualPhaseResult::Stopped(status) => return Ok(status),
            }
            if self.info.num_dual_infeasibilities > 0 {
                // Dual infeasibility survived its own minimization.
                return Ok(ModelStatus::UnboundedOrInfeasible);
            }
        }

        match self.dual_phase2(callback)? {
            DualPhaseResult::Optimal => Ok(ModelStatus::Optimal),
            DualPhaseResult::Unbounded { row_out, move_out } => {
                // Dual unbounded in phase 2: the LP is primal infeasible and
                // the leaving row supplies the certificate.
                self.dual_ray = Some(RayRecord {
                    index: row_out,
                    sign: -(move_out as f64),
                    value: None,
                });
                Ok(ModelStatus::Infeasible)
            }
            DualPhaseResult::Stopped(status) => Ok(status),
        }
    }

    /// Flip boxed nonbasic variables onto their dual-feasible bound.
    pub(crate) fn flip_to_dual_feasible(&mut self) {
        let tol = self.options.dual_feasibility_tolerance;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            if !(lower.is_finite() && upper.is_finite()) || lower == upper {
                continue;
            }
            let d = self.info.work_dual[var];
            if self.basis.nonbasic_move[var] == 1 && d < -tol {
                self.basis.nonbasic_move[var] = -1;
                self.info.work_value[var] = upper;
            } else if self.basis.nonbasic_move[var] == -1 && d > tol {
                self.basis.nonbasic_move[var] = 1;
                self.info.work_value[var] = lower;
            }
        }
        self.compute_primal();
    }

    /// Phase 1: install the artificial-bounds subproblem whose optimum has
    /// zero dual infeasibility iff the LP is dual feasible at some basis.
    pub(crate) fn dual_phase1(
        &mut self,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<DualPhaseResult> {
        debug!("dual phase 1 entered");
        self.info.saved_lower = self.info.work_lower.clone();
        self.info.saved_upper = self.info.work_upper.clone();

        for var in 0..self.num_tot() {
            let lower = self.info.saved_lower[var];
            let upper = self.info.saved_upper[var];
            let (p1_lower, p1_upper) = match (lower.is_finite(), upper.is_finite()) {
                (false, false) => (-PHASE1_FREE_BOUND, PHASE1_FREE_BOUND),
                (true, false) => (0.0, 1.0),
                (false, true) => (-1.0, 0.0),
                (true, true) => (0.0, 0.0),
            };
            self.info.work_lower[var] = p1_lower;
            self.info.work_upper[var] = p1_upper;
            if self.basis.nonbasic_flag[var] == 1 {
                if p1_lower == p1_upper {
                    self.basis.nonbasic_move[var] = 0;
                } else if self.basis.nonbasic_move[var] == 0 {
                    // Formerly free: every variable is boxed now and needs a
                    // definite bound to sit on; pick the dual-feasible side.
                    self.basis.nonbasic_move[var] =
                        if self.info.work_dual[var] >= 0.0 { 1 } else { -1 };
                }
            }
        }
        self.set_nonbasic_values();

        // Every variable is boxed now, so flips alone give dual feasibility.
        self.compute_dual();
        self.flip_to_dual_feasible();

        let result = self.dual_phase_loop(1, callback)?;

        // Restore the real bounds and rebuild nonbasic state from the duals.
        self.info.work_lower = std::mem::take(&mut self.info.saved_lower);
        self.info.work_upper = std::mem::take(&mut self.info.saved_upper);
        let tol = self.options.dual_feasibility_tolerance;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            let d = self.info.work_dual[var];
            let move_dir = if lower.is_finite() && upper.is_finite() {
                if lower == upper {
                    0
                } else if d >= 0.0 {
                    1
                } else {
                    -1
                }
            } else if lower.is_finite() {
                1
            } else if upper.is_finite() {
                -1
            } else {
                0
            };
            self.basis.nonbasic_move[var] = move_dir;
        }
        self.set_nonbasic_values();
        self.compute_primal();
        self.compute_dual();

        // Count the dual infeasibilities that survived phase 1: reduced
        // costs pointing away from a missing bound.
        let mut residual = 0usize;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            if self.dual_infeasibility(var, self.info.work_dual[var]) > tol {
                residual += 1;
            }
        }
        self.info.num_dual_infeasibilities = residual;
        debug!("dual phase 1 done: residual dual infeasibilities {}", residual);
        Ok(result)
    }

    /// Phase 2 over the true bounds.
    pub(crate) fn dual_phase2(
        &mut self,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<DualPhaseResult> {
        self.dual_phase_loop(2, callback)
    }

    /// Outer rebuild loop shared by the two phases.
    fn dual_phase_loop(
        &mut self,
        phase: u8,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<DualPhaseResult> {
        let mut best_sum = f64::INFINITY;
        let mut stagnant = 0usize;
        let mut cleanup_rounds = 0usize;
        loop {
            self.rebuild(phase)?;

            if phase == 2 && self.stagnating(&mut best_sum, &mut stagnant) {
                if !self.info.costs_perturbed && self.options.allow_cost_perturbation {
                    self.perturb_costs();
                    self.compute_dual();
                    stagnant = 0;
                } else if !self.info.bounds_perturbed
                    && self.options.allow_bound_perturbation
                {
                    // Cost perturbation alone did not break the stagnation:
                    // widen the bounds and restart the baseline.
                    self.perturb_bounds();
                    self.set_nonbasic_values();
                    self.compute_primal();
                    best_sum = f64::INFINITY;
                    stagnant = 0;
                }
            }

            match self.dual_inner_loop(phase, callback)? {
                LoopOutcome::PhaseComplete => {
                    if self.info.costs_perturbed || self.info.bounds_perturbed {
                        // Cleanup: remove perturbation and re-establish
                        // optimality on exact data.
                        self.unperturb_costs();
                        self.unperturb_bounds();
                        self.compute_primal_infeasibilities();
                        self.compute_dual_infeasibilities();
                        if self.info.num_dual_infeasibilities > 0 {
                            self.flip_to_dual_feasible();
                            self.compute_dual_infeasibilities();
                        }
                        if self.info.num_primal_infeasibilities > 0 {
                            cleanup_rounds += 1;
                            if cleanup_rounds > 10 {
                                // Perturbation removal keeps reintroducing
                                // infeasibility; certify nothing.
                                return Ok(DualPhaseResult::Stopped(ModelStatus::Unknown));
                            }
                            continue;
                        }
                        if self.info.num_dual_infeasibilities > 0 && phase == 2 {
                            // Free-variable dual infeasibility cannot be
                            // flipped away: finish with a primal cleanup
                            // pass from this primal-feasible iterate.
                            let status = self.primal_cleanup(callback)?;
                            return Ok(DualPhaseResult::Stopped(status));
                        }
                    }
                    return Ok(DualPhaseResult::Optimal);
                }
                LoopOutcome::Unbounded => {
                    let (row_out, move_out) = self
                        .last_chuzr
                        .expect("unbounded outcome records the leaving row");
                    if self.info.costs_perturbed || self.info.bounds_perturbed {
                        // Certify on exact data before declaring.
                        self.unperturb_costs();
                        self.unperturb_bounds();
                        continue;
                    }
                    return Ok(DualPhaseResult::Unbounded { row_out, move_out });
                }
                LoopOutcome::Rebuild => continue,
                LoopOutcome::Bailout => {
                    self.unperturb_costs();
                    self.unperturb_bounds();
                    return Ok(DualPhaseResult::Stopped(self.model_status));
                }
            }
        }
    }

    /// Inner pivot loop: returns when the phase completes, the factor wants
    /// rebuilding, or a stop condition fires.
    fn dual_inner_loop(
        &mut self,
        phase: u8,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<LoopOutcome> {
        loop {
            if self.bailout(callback) {
                return Ok(LoopOutcome::Bailout);
            }
            self.purge_taboo();

            let Some((row_out, move_out)) = self.dual_chuzr() else {
                return Ok(LoopOutcome::PhaseComplete);
            };
            self.last_chuzr = Some((row_out, move_out));

            // BTRAN: row_ep = B⁻ᵀ e_p.
            self.row_ep.clear();
            self.row_ep.insert(row_out, 1.0);
            let hint = self.row_ep_density;
            let mut row_ep = std::mem::replace(&mut self.row_ep, WorkVector::new(0));
            self.btran(&mut row_ep, hint);
            self.row_ep = row_ep;
            Self::update_density(self.row_ep.density(), &mut self.row_ep_density);

            // PRICE: tableau row over the nonbasic variables.
            self.price_row();

            // CHUZC: two-stage bounded ratio test.
            let chosen = self.dual_chuzc(move_out);
            let Some((var_in, alpha_row)) = chosen else {
                if phase == 2 {
                    return Ok(LoopOutcome::Unbounded);
                }
                // The phase-1 subproblem cannot be dual unbounded; treat as
                // numerical and force a fresh factorization.
                self.factor.refactor_info.force_refactor = true;
                return Ok(LoopOutcome::Unbounded);
            };

            // FTRAN the entering column and verify the pivot agreement.
            self.col_aq.clear();
            for (i, v) in self.variable_column(var_in) {
                self.col_aq.insert(i, v);
            }
            let hint = self.col_aq_density;
            let mut col_aq = std::mem::replace(&mut self.col_aq, WorkVector::new(0));
            self.ftran(&mut col_aq, hint);
            self.col_aq = col_aq;
            Self::update_density(self.col_aq.density(), &mut self.col_aq_density);

            let alpha_col = self.col_aq.array[row_out];
            let agreement =
                (alpha_col - alpha_row).abs() / (1.0 + alpha_col.abs());
            if agreement > self.options.pivot_agreement_tolerance
                || alpha_col.abs() < self.options.pivot_tolerance
            {
                if self.factor.refactor_info.update_count == 0 {
                    self.model_status = ModelStatus::SolveError;
                    return Ok(LoopOutcome::Bailout);
                }
                debug!(
                    "pivot disagreement {:.2e} (row {:.6e} col {:.6e}); reinverting",
                    agreement, alpha_row, alpha_col
                );
                self.factor.refactor_info.force_refactor = true;
                return Ok(LoopOutcome::Rebuild);
            }

            if self.dual_update(row_out, move_out, var_in, alpha_col)? {
                return Ok(LoopOutcome::Rebuild);
            }

            if self.factor.refactor_info.update_count >= self.options.refactor_interval {
                return Ok(LoopOutcome::Rebuild);
            }
        }
    }

    /// CHUZR: among primal-infeasible basic rows, maximize
    /// infeasibility²/weight; ties break on the smaller row. Taboo rows are
    /// skipped unless they are the only candidates.
    fn dual_chuzr(&mut self) -> Option<(usize, i8)> {
        let tol = self.options.primal_feasibility_tolerance;
        let mut best: Option<(usize, i8, f64)> = None;
        let mut saw_taboo = false;
        for p in 0..self.lp.num_row {
            let var = self.basis.basic_index[p];
            let v = self.info.base_value[p];
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            let (infeas, move_out) = if v < lower - tol {
                (lower - v, 1i8)
            } else if v > upper + tol {
                (v - upper, -1i8)
            } else {
                continue;
            };
            if self.is_taboo(p) {
                saw_taboo = true;
                continue;
            }
            let weight = self.chuzr_weight(p).max(super::control::WEIGHT_FLOOR);
            let score = infeas * infeas / weight;
            let better = match best {
                None => true,
                Some((bp, _, bs)) => score > bs || (score == bs && p < bp),
            };
            if better {
                best = Some((p, move_out, score));
            }
        }
        if best.is_none() && saw_taboo {
            // Only taboo rows remain infeasible: lift the taboo and retry.
            self.taboo_rows.clear();
            return self.dual_chuzr();
        }
        best.map(|(p, move_out, _)| (p, move_out))
    }

    /// PRICE: tableau row α = (A | −I)ᵀ · row_ep over the nonbasic
    /// variables, by rows or by columns depending on row_ep density.
    fn price_row(&mut self) {
        let n = self.lp.num_col;
        let tot = self.num_tot();
        self.row_ap[..tot].fill(0.0);

        let use_row_price = self.row_ep.density() < self.options.price_density_switch;
        if use_row_price {
            // Scatter each touched row of the row-wise matrix.
            for &i in &self.row_ep.index {
                let mult = self.row_ep.array[i];
                for el in self.ar_matrix.start[i]..self.ar_matrix.start[i + 1] {
                    self.row_ap[self.ar_matrix.index[el]] +=
                        self.ar_matrix.value[el] * mult;
                }
            }
        } else {
            // Column price: dot every nonbasic structural column.
            for j in 0..n {
                if self.basis.nonbasic_flag[j] == 0 {
                    continue;
                }
                let mut dot = 0.0;
                for el in self.lp.a_matrix.start[j]..self.lp.a_matrix.start[j + 1] {
                    dot += self.lp.a_matrix.value[el]
                        * self.row_ep.array[self.lp.a_matrix.index[el]];
                }
                self.row_ap[j] = dot;
            }
        }
        // Logicals price to −row_ep.
        for i in 0..self.lp.num_row {
            self.row_ap[n + i] = -self.row_ep.array[i];
        }
    }

    /// CHUZC: stage 1 finds the maximal dual step over relaxed reduced
    /// costs; stage 2 picks the largest pivot among candidates within it.
    fn dual_chuzc(&mut self, move_out: i8) -> Option<(usize, f64)> {
        let s = -(move_out as f64);
        let dual_tol = self.options.dual_feasibility_tolerance;
        let pivot_tol = self.options.pivot_tolerance;

        let mut theta_max = f64::INFINITY;
        let mut any = false;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            if lower == upper {
                continue;
            }
            let abar = s * self.row_ap[var];
            let d = self.info.work_dual[var];
            let relaxed = match self.basis.nonbasic_move[var] {
                1 if abar > pivot_tol => (d + dual_tol) / abar,
                -1 if abar < -pivot_tol => (d - dual_tol) / abar,
                0 if abar.abs() > pivot_tol && !lower.is_finite() && !upper.is_finite() => {
                    (d.abs() + dual_tol) / abar.abs()
                }
                _ => continue,
            };
            any = true;
            if relaxed < theta_max {
                theta_max = relaxed;
            }
        }
        if !any {
            return None;
        }

        let mut best: Option<(usize, f64, f64)> = None; // (var, alpha_row, |abar|)
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            if lower == upper {
                continue;
            }
            let abar = s * self.row_ap[var];
            let d = self.info.work_dual[var];
            let ratio = match self.basis.nonbasic_move[var] {
                1 if abar > pivot_tol => d / abar,
                -1 if abar < -pivot_tol => d / abar,
                0 if abar.abs() > pivot_tol && !lower.is_finite() && !upper.is_finite() => {
                    d.abs() / abar.abs()
                }
                _ => continue,
            };
            if ratio <= theta_max {
                let mag = abar.abs();
                let better = match best {
                    None => true,
                    Some((_, _, bm)) => mag > bm,
                };
                if better {
                    best = Some((var, self.row_ap[var], mag));
                }
            }
        }
        best.map(|(var, alpha, _)| (var, alpha))
    }

    /// UPDATE: duals, bound flips, primal values, edge weights, the factor,
    /// and the basis bookkeeping. Returns `true` when a rebuild is required.
    fn dual_update(
        &mut self,
        row_out: usize,
        move_out: i8,
        var_in: usize,
        alpha: f64,
    ) -> CoreResult<bool> {
        let out_var = self.basis.basic_index[row_out];
        let value_out = self.info.base_value[row_out];
        let bound_out = if move_out == 1 {
            self.info.work_lower[out_var]
        } else {
            self.info.work_upper[out_var]
        };
        let delta_primal = value_out - bound_out;
        let theta_dual = self.info.work_dual[var_in] / alpha;
        let theta_primal = delta_primal / alpha;

        let dantzig =
            self.options.edge_weight_strategy == crate::options::EdgeWeightStrategy::Dantzig;

        // FTRAN-DSE: τ = B⁻¹ row_ep, needed by the steepest-edge recursion.
        if !self.using_devex && !dantzig {
            self.tau.clear();
            for &i in &self.row_ep.index {
                let v = self.row_ep.array[i];
                if v != 0.0 {
                    self.tau.insert(i, v);
                }
            }
            let hint = self.row_ep_density;
            let mut tau = std::mem::replace(&mut self.tau, WorkVector::new(0));
            self.ftran(&mut tau, hint);
            self.tau = tau;
        }

        // Commit the factor eta first: a failed update aborts the iteration
        // before any engine state changes.
        if self.factor.update(&self.col_aq, row_out).is_err() {
            debug!("product-form update rejected; forcing refactor");
            return Ok(true);
        }

        // Dual values.
        let tot = self.num_tot();
        for var in 0..tot {
            if self.basis.nonbasic_flag[var] == 0 || self.row_ap[var] == 0.0 {
                continue;
            }
            self.info.work_dual[var] -= theta_dual * self.row_ap[var];
        }
        self.info.work_dual[var_in] = 0.0;
        self.info.work_dual[out_var] = -theta_dual;

        // Bound flips for boxed variables whose dual switched side.
        let mut flip_rhs: Option<WorkVector> = None;
        let dual_tol = self.options.dual_feasibility_tolerance;
        for var in 0..tot {
            if self.basis.nonbasic_flag[var] == 0 || var == var_in {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            if !(lower.is_finite() && upper.is_finite()) || lower == upper {
                continue;
            }
            let d = self.info.work_dual[var];
            let flip_to_upper = self.basis.nonbasic_move[var] == 1 && d < -dual_tol;
            let flip_to_lower = self.basis.nonbasic_move[var] == -1 && d > dual_tol;
            if !(flip_to_upper || flip_to_lower) {
                continue;
            }
            let new_value = if flip_to_upper { upper } else { lower };
            let delta = new_value - self.info.work_value[var];
            self.basis.nonbasic_move[var] = if flip_to_upper { -1 } else { 1 };
            self.info.work_value[var] = new_value;
            let rhs = flip_rhs.get_or_insert_with(|| WorkVector::new(self.lp.num_row));
            let n = self.lp.num_col;
            if var < n {
                for el in self.lp.a_matrix.start[var]..self.lp.a_matrix.start[var + 1] {
                    rhs.array[self.lp.a_matrix.index[el]] +=
                        self.lp.a_matrix.value[el] * delta;
                }
            } else {
                rhs.array[var - n] -= delta;
            }
        }

        // Primal values.
        for &i in &self.col_aq.index {
            if i != row_out {
                self.info.base_value[i] -= theta_primal * self.col_aq.array[i];
            }
        }
        self.info.base_value[row_out] = self.info.work_value[var_in] + theta_primal;

        // Apply accumulated bound-flip shifts: base ← base − B⁻¹·rhs.
        if let Some(mut rhs) = flip_rhs {
            rhs.invalidate_pack();
            rhs.repack(0.0);
            self.factor.ftran(&mut rhs, 1.0);
            for i in 0..self.lp.num_row {
                self.info.base_value[i] -= rhs.array[i];
            }
        }

        // Edge weights.
        if dantzig {
            // Unit weights: nothing to maintain.
        } else if self.using_devex {
            let col = std::mem::replace(&mut self.col_aq, WorkVector::new(0));
            self.update_devex_weights(row_out, &col, alpha);
            self.col_aq = col;
        } else {
            let col = std::mem::replace(&mut self.col_aq, WorkVector::new(0));
            let tau = std::mem::replace(&mut self.tau, WorkVector::new(0));
            self.update_steepest_edge_weights(row_out, &col, alpha, &tau);
            self.col_aq = col;
            self.tau = tau;
        }

        // Basis bookkeeping.
        self.basis.basic_index[row_out] = var_in;
        self.basis.nonbasic_flag[var_in] = 0;
        self.basis.nonbasic_move[var_in] = 0;
        self.basis.nonbasic_flag[out_var] = 1;
        let lower = self.info.work_lower[out_var];
        let upper = self.info.work_upper[out_var];
        if lower == upper {
            self.basis.nonbasic_move[out_var] = 0;
        } else if move_out == 1 {
            self.basis.nonbasic_move[out_var] = 1;
        } else {
            self.basis.nonbasic_move[out_var] = -1;
        }
        self.info.work_value[out_var] = bound_out;

        self.iteration_count += 1;
        self.compute_objective();

        if self.record_basis_visit() {
            self.handle_cycling(row_out);
        }
        Ok(false)
    }

    /// Shared rebuild: refactor when due, then recompute the iterate.
    pub(crate) fn rebuild(&mut self, phase: u8) -> CoreResult<()> {
        let reason = if !self.status.has_invert {
            "no factor"
        } else if self.factor.refactor_info.force_refactor {
            "numerical trouble"
        } else if self.factor.refactor_info.update_count >= self.options.refactor_interval {
            "update budget"
        } else {
            "refresh"
        };
        if reason != "refresh" {
            self.compute_factor()?;
        }
        self.compute_primal();
        self.compute_dual();
        self.compute_objective();
        self.log_rebuild(phase, reason);
        Ok(())
    }
}
