//! Primal revised simplex: phases 1 and 2 with Devex column pricing.
//!
//! The primal variant backs up the dual simplex when a solve starts dual
//! infeasible (typical after warmstarts with changed costs) and serves as the
//! cleanup pass when removing cost perturbation uncovers dual infeasibility.

use log::debug;

use super::{RayRecord, SimplexEngine};
use crate::callback::Callback;
use crate::linalg::WorkVector;
use crate::status::{CoreResult, ModelStatus};

pub(crate) enum PrimalPhaseResult {
    Optimal,
    Unbounded { var_in: usize, direction: i8 },
    /// Phase 1 finished with infeasibility left over.
    Infeasible,
    Stopped(ModelStatus),
}

/// Devex column weights live on all variables; basic entries are unused.
impl SimplexEngine {
    pub(crate) fn solve_primal(
        &mut self,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<ModelStatus> {
        self.primal_weight = vec![1.0; self.num_tot()];

        if self.info.num_primal_infeasibilities > 0 {
            match self.primal_phase(1, callback)? {
                PrimalPhaseResult::Optimal => {}
                PrimalPhaseResult::Infeasible => return Ok(ModelStatus::Infeasible),
                PrimalPhaseResult::Unbounded { .. } => return Ok(ModelStatus::Unknown),
                PrimalPhaseResult::Stopped(status) => return Ok(status),
            }
        }

        match self.primal_phase(2, callback)? {
            PrimalPhaseResult::Optimal => Ok(ModelStatus::Optimal),
            PrimalPhaseResult::Unbounded { var_in, direction } => {
                self.primal_ray = Some(RayRecord {
                    index: var_in,
                    sign: -(direction as f64),
                    value: None,
                });
                Ok(ModelStatus::Unbounded)
            }
            PrimalPhaseResult::Infeasible => Ok(ModelStatus::Infeasible),
            PrimalPhaseResult::Stopped(status) => Ok(status),
        }
    }

    /// Run the cleanup pass after perturbation removal: the iterate is primal
    /// feasible, so phase 2 alone re-establishes optimality.
    pub(crate) fn primal_cleanup(
        &mut self,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<ModelStatus> {
        if self.primal_weight.len() != self.num_tot() {
            self.primal_weight = vec![1.0; self.num_tot()];
        }
        match self.primal_phase(2, callback)? {
            PrimalPhaseResult::Optimal => Ok(ModelStatus::Optimal),
            PrimalPhaseResult::Unbounded { var_in, direction } => {
                self.primal_ray = Some(RayRecord {
                    index: var_in,
                    sign: -(direction as f64),
                    value: None,
                });
                Ok(ModelStatus::Unbounded)
            }
            PrimalPhaseResult::Infeasible => Ok(ModelStatus::Infeasible),
            PrimalPhaseResult::Stopped(status) => Ok(status),
        }
    }

    /// Outer rebuild loop for one primal phase.
    fn primal_phase(
        &mut self,
        phase: u8,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<PrimalPhaseResult> {
        loop {
            self.rebuild(phase)?;
            if phase == 1 {
                if self.info.num_primal_infeasibilities == 0 {
                    return Ok(PrimalPhaseResult::Optimal);
                }
                self.install_phase1_costs();
            }
            match self.primal_inner_loop(phase, callback)? {
                PrimalLoop::Done => {
                    if phase == 1 {
                        self.restore_phase1_costs();
                        self.compute_primal_infeasibilities();
                        if self.info.num_primal_infeasibilities > 0 {
                            return Ok(PrimalPhaseResult::Infeasible);
                        }
                        return Ok(PrimalPhaseResult::Optimal);
                    }
                    return Ok(PrimalPhaseResult::Optimal);
                }
                PrimalLoop::Unbounded { var_in, direction } => {
                    if phase == 1 {
                        // The phase-1 objective is bounded below by zero.
                        self.restore_phase1_costs();
                        return Ok(PrimalPhaseResult::Infeasible);
                    }
                    return Ok(PrimalPhaseResult::Unbounded { var_in, direction });
                }
                PrimalLoop::Rebuild => {
                    if phase == 1 {
                        self.restore_phase1_costs();
                    }
                    continue;
                }
                PrimalLoop::Bailout => {
                    if phase == 1 {
                        self.restore_phase1_costs();
                    }
                    return Ok(PrimalPhaseResult::Stopped(self.model_status));
                }
            }
        }
    }

    /// Replace the working costs by the infeasibility pricing of phase 1:
    /// −1 below lower, +1 above upper, zero elsewhere.
    fn install_phase1_costs(&mut self) {
        self.info.saved_cost = self.info.work_cost.clone();
        self.info.work_cost.iter_mut().for_each(|c| *c = 0.0);
        for p in 0..self.lp.num_row {
            let var = self.basis.basic_index[p];
            let v = self.info.base_value[p];
            if v < self.info.work_lower[var] {
                self.info.work_cost[var] = -1.0;
            } else if v > self.info.work_upper[var] {
                self.info.work_cost[var] = 1.0;
            }
        }
        self.compute_dual();
    }

    fn restore_phase1_costs(&mut self) {
        if !self.info.saved_cost.is_empty() {
            self.info.work_cost = std::mem::take(&mut self.info.saved_cost);
        }
        self.compute_dual();
        self.compute_objective();
    }

    fn primal_inner_loop(
        &mut self,
        phase: u8,
        callback: &mut Option<&mut dyn Callback>,
    ) -> CoreResult<PrimalLoop> {
        loop {
            if self.bailout(callback) {
                return Ok(PrimalLoop::Bailout);
            }

            // CHUZC: entering variable by Devex-weighted dual infeasibility.
            let Some((var_in, direction)) = self.primal_chuzc() else {
                return Ok(PrimalLoop::Done);
            };

            // FTRAN the entering column.
            self.col_aq.clear();
            for (i, v) in self.variable_column(var_in) {
                self.col_aq.insert(i, v);
            }
            let hint = self.col_aq_density;
            let mut col_aq = std::mem::replace(&mut self.col_aq, WorkVector::new(0));
            self.ftran(&mut col_aq, hint);
            self.col_aq = col_aq;
            Self::update_density(self.col_aq.density(), &mut self.col_aq_density);

            // CHUZR: bounded ratio test along the entering direction.
            let ratio = self.primal_chuzr(var_in, direction, phase);
            match ratio {
                PrimalRatio::Unbounded => {
                    return Ok(PrimalLoop::Unbounded { var_in, direction });
                }
                PrimalRatio::BoundFlip { step } => {
                    self.primal_bound_flip(var_in, direction, step);
                    self.iteration_count += 1;
                    self.compute_objective();
                }
                PrimalRatio::Pivot { row_out, step } => {
                    let alpha = self.col_aq.array[row_out];
                    if alpha.abs() < self.options.pivot_tolerance {
                        if self.factor.refactor_info.update_count == 0 {
                            self.model_status = ModelStatus::SolveError;
                            return Ok(PrimalLoop::Bailout);
                        }
                        self.factor.refactor_info.force_refactor = true;
                        return Ok(PrimalLoop::Rebuild);
                    }
                    if self.primal_update(var_in, direction, row_out, step, phase)? {
                        return Ok(PrimalLoop::Rebuild);
                    }
                }
            }

            if self.factor.refactor_info.update_count >= self.options.refactor_interval {
                return Ok(PrimalLoop::Rebuild);
            }
        }
    }

    /// Entering-variable choice: maximize d²/w over dual-infeasible
    /// nonbasics. Returns the variable and its movement direction.
    fn primal_chuzc(&self) -> Option<(usize, i8)> {
        let tol = self.options.dual_feasibility_tolerance;
        let mut best: Option<(usize, i8, f64)> = None;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            if lower == upper {
                continue;
            }
            let d = self.info.work_dual[var];
            let direction = match self.basis.nonbasic_move[var] {
                1 if d < -tol => 1i8,
                -1 if d > tol => -1i8,
                0 if d.abs() > tol && !lower.is_finite() && !upper.is_finite() => {
                    if d < 0.0 {
                        1
                    } else {
                        -1
                    }
                }
                _ => continue,
            };
            let w = self.primal_weight[var].max(1e-10);
            let score = d * d / w;
            let better = match best {
                None => true,
                Some((_, _, bs)) => score > bs,
            };
            if better {
                best = Some((var, direction, score));
            }
        }
        best.map(|(var, dir, _)| (var, dir))
    }

    /// Ratio test: the largest step the basic values (and the entering
    /// variable's opposite bound) allow. Phase 1 lets infeasible basics run
    /// to the bound they are approaching.
    fn primal_chuzr(&self, var_in: usize, direction: i8, phase: u8) -> PrimalRatio {
        let tol = self.options.primal_feasibility_tolerance;
        let pivot_tol = self.options.pivot_tolerance;
        let dir = direction as f64;

        let mut best_step = f64::INFINITY;
        let mut best_row: Option<usize> = None;
        let mut best_alpha = 0.0f64;

        for &i in &self.col_aq.index {
            let g = -dir * self.col_aq.array[i]; // value change per unit step
            if g.abs() < pivot_tol {
                continue;
            }
            let var = self.basis.basic_index[i];
            let v = self.info.base_value[i];
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];

            let step = if phase == 1 && v < lower {
                // Below lower: blocks at the lower bound only when rising.
                if g > 0.0 {
                    (lower - v) / g
                } else {
                    continue;
                }
            } else if phase == 1 && v > upper {
                if g < 0.0 {
                    (upper - v) / g
                } else {
                    continue;
                }
            } else if g > 0.0 {
                if upper.is_finite() {
                    (upper - v + tol) / g
                } else {
                    continue;
                }
            } else if lower.is_finite() {
                (lower - v - tol) / g
            } else {
                continue;
            };

            let step = step.max(0.0);
            let better = step < best_step - 1e-12
                || (step < best_step + 1e-12
                    && self.col_aq.array[i].abs() > best_alpha.abs());
            if better {
                best_step = step;
                best_row = Some(i);
                best_alpha = self.col_aq.array[i];
            }
        }

        // The entering variable's own opposite bound competes.
        let lower = self.info.work_lower[var_in];
        let upper = self.info.work_upper[var_in];
        let own_range = if direction == 1 {
            upper - self.info.work_value[var_in]
        } else {
            self.info.work_value[var_in] - lower
        };
        if own_range.is_finite() && own_range <= best_step {
            return PrimalRatio::BoundFlip { step: own_range };
        }

        match best_row {
            Some(row_out) => PrimalRatio::Pivot {
                row_out,
                step: best_step,
            },
            None => PrimalRatio::Unbounded,
        }
    }

    /// The entering variable runs to its opposite bound: no basis change.
    fn primal_bound_flip(&mut self, var_in: usize, direction: i8, step: f64) {
        let dir = direction as f64;
        let delta = dir * step;
        for &i in &self.col_aq.index {
            self.info.base_value[i] -= delta * self.col_aq.array[i];
        }
        self.info.work_value[var_in] += delta;
        self.basis.nonbasic_move[var_in] = -direction;
        self.compute_primal_infeasibilities();
    }

    /// Pivot: shift the primal values, update duals by the leaving row, move
    /// the bookkeeping, and append the factor eta.
    fn primal_update(
        &mut self,
        var_in: usize,
        direction: i8,
        row_out: usize,
        step: f64,
        phase: u8,
    ) -> CoreResult<bool> {
        let dir = direction as f64;
        let alpha_col = self.col_aq.array[row_out];
        let out_var = self.basis.basic_index[row_out];

        // Price the leaving row against the outgoing basis first: the dual
        // update formula needs the pre-pivot tableau row.
        self.row_ep.clear();
        self.row_ep.insert(row_out, 1.0);
        let hint = self.row_ep_density;
        let mut row_ep = std::mem::replace(&mut self.row_ep, WorkVector::new(0));
        self.btran(&mut row_ep, hint);
        self.row_ep = row_ep;
        Self::update_density(self.row_ep.density(), &mut self.row_ep_density);
        self.price_full_row();

        if self.factor.update(&self.col_aq, row_out).is_err() {
            debug!("product-form update rejected; forcing refactor");
            return Ok(true);
        }

        // Primal values.
        let delta = dir * step;
        for &i in &self.col_aq.index {
            if i != row_out {
                self.info.base_value[i] -= delta * self.col_aq.array[i];
            }
        }
        let value_in = self.info.work_value[var_in] + delta;

        // Where the leaving variable lands.
        let g_out = -dir * alpha_col;
        let out_value = self.info.base_value[row_out] + step * g_out;
        let out_lower = self.info.work_lower[out_var];
        let out_upper = self.info.work_upper[out_var];
        let (out_bound, out_move) = if out_lower == out_upper {
            (out_lower, 0i8)
        } else if (out_value - out_lower).abs() <= (out_value - out_upper).abs() {
            (out_lower, 1i8)
        } else {
            (out_upper, -1i8)
        };

        let theta_dual = self.info.work_dual[var_in] / alpha_col;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 || self.row_ap[var] == 0.0 {
                continue;
            }
            self.info.work_dual[var] -= theta_dual * self.row_ap[var];
        }
        self.info.work_dual[var_in] = 0.0;
        self.info.work_dual[out_var] = -theta_dual;

        // Devex column weights keyed on the priced row.
        let w_in = self.primal_weight[var_in].max(1.0);
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 || var == var_in {
                continue;
            }
            let a = self.row_ap[var] / alpha_col;
            let candidate = a * a * w_in;
            if candidate > self.primal_weight[var] {
                self.primal_weight[var] = candidate;
            }
        }
        self.primal_weight[out_var] = (w_in / (alpha_col * alpha_col)).max(1.0);

        // Bookkeeping.
        self.basis.basic_index[row_out] = var_in;
        self.basis.nonbasic_flag[var_in] = 0;
        self.basis.nonbasic_move[var_in] = 0;
        self.basis.nonbasic_flag[out_var] = 1;
        self.basis.nonbasic_move[out_var] = out_move;
        self.info.work_value[out_var] = out_bound;
        self.info.base_value[row_out] = value_in;

        self.iteration_count += 1;
        self.compute_objective();
        self.compute_primal_infeasibilities();

        if phase == 1 {
            // Infeasibility pricing changes as basics cross bounds.
            self.install_phase1_costs_in_place();
        }

        if self.record_basis_visit() {
            self.handle_cycling(row_out);
        }
        Ok(false)
    }

    /// Refresh the phase-1 costs and duals without touching `saved_cost`.
    fn install_phase1_costs_in_place(&mut self) {
        self.info.work_cost.iter_mut().for_each(|c| *c = 0.0);
        for p in 0..self.lp.num_row {
            let var = self.basis.basic_index[p];
            let v = self.info.base_value[p];
            if v < self.info.work_lower[var] {
                self.info.work_cost[var] = -1.0;
            } else if v > self.info.work_upper[var] {
                self.info.work_cost[var] = 1.0;
            }
        }
        self.compute_dual();
    }

    /// PRICE over all variables from the current `row_ep`.
    fn price_full_row(&mut self) {
        let n = self.lp.num_col;
        let tot = self.num_tot();
        self.row_ap[..tot].fill(0.0);
        for &i in &self.row_ep.index {
            let mult = self.row_ep.array[i];
            for el in self.ar_matrix.start[i]..self.ar_matrix.start[i + 1] {
                self.row_ap[self.ar_matrix.index[el]] += self.ar_matrix.value[el] * mult;
            }
        }
        for i in 0..self.lp.num_row {
            self.row_ap[n + i] = -self.row_ep.array[i];
        }
    }
}

enum PrimalRatio {
    Unbounded,
    BoundFlip { step: f64 },
    Pivot { row_out: usize, step: f64 },
}

enum PrimalLoop {
    Done,
    Unbounded { var_in: usize, direction: i8 },
    Rebuild,
    Bailout,
}
