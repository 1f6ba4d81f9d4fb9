//! Revised simplex engine.
//!
//! The engine owns a by-value copy of the LP for the duration of a solve, the
//! basis factorization, and the simplex work arrays. The dual variant (with
//! steepest-edge pricing) is the default driver; the primal variant backs it
//! up when the start is dual infeasible or when forced by options.
//!
//! Variables are numbered structurals first, then logicals: variable `n + i`
//! is the logical of row `i`, with column −e_i in the basis matrix, so the
//! reduced cost of a logical equals the dual value of its row.

pub mod basis;
mod control;
mod dual;
mod primal;

use std::collections::HashSet;

use log::debug;

use crate::callback::{Callback, CallbackData};
use crate::linalg::{LuFactor, SparseMatrix, WorkVector};
use crate::model::lp::Lp;
use crate::options::{EdgeWeightStrategy, SimplexStrategy, SolverOptions};
use crate::status::{CoreError, CoreResult, LpAction, ModelStatus};
use crate::util::random::Random;
use crate::util::timer::Deadline;

use basis::{nonbasic_move_for, Basis, BasisStatus, SimplexBasis};

/// Termination certificate seed: a basis row or an entering column together
/// with a direction sign. The full ray vector is materialized on demand while
/// the factorization is still valid.
#[derive(Debug, Clone)]
pub struct RayRecord {
    pub index: usize,
    pub sign: f64,
    /// Cached materialized vector.
    pub value: Option<Vec<f64>>,
}

/// Lifecycle flags forming a monotone dependency chain: factor implies basis
/// implies initialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexStatus {
    pub initialized_for_solve: bool,
    pub has_basis: bool,
    pub has_invert: bool,
    pub has_dual_steepest_edge_weights: bool,
}

/// Work arrays and iteration records. Arrays span structurals then logicals.
#[derive(Debug, Clone, Default)]
pub struct SimplexInfo {
    pub work_cost: Vec<f64>,
    pub work_lower: Vec<f64>,
    pub work_upper: Vec<f64>,
    pub work_value: Vec<f64>,
    pub work_dual: Vec<f64>,
    /// Basic values by basis position.
    pub base_value: Vec<f64>,

    /// Unperturbed costs, kept while `costs_perturbed`.
    pub saved_cost: Vec<f64>,
    /// Real bounds, kept while phase-1 or perturbed bounds are installed.
    pub saved_lower: Vec<f64>,
    pub saved_upper: Vec<f64>,

    pub costs_perturbed: bool,
    pub bounds_perturbed: bool,

    pub num_primal_infeasibilities: usize,
    pub max_primal_infeasibility: f64,
    pub sum_primal_infeasibilities: f64,
    pub num_dual_infeasibilities: usize,
    pub max_dual_infeasibility: f64,
    pub sum_dual_infeasibilities: f64,

    /// Minimization-form objective Σ work_cost · value.
    pub objective_value: f64,
}

/// Outcome of one inner simplex loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopOutcome {
    /// No infeasible row remains: the phase is complete.
    PhaseComplete,
    /// Ratio test found no blocking variable.
    Unbounded,
    /// Rebuild requested (refactor budget, numerical trouble, perturbation).
    Rebuild,
    /// A bailout condition fired; `model_status` is set.
    Bailout,
}

/// Revised simplex engine instance. Self-contained: no shared mutable state.
pub struct SimplexEngine {
    pub lp: Lp,
    pub options: SolverOptions,
    pub basis: SimplexBasis,
    pub factor: LuFactor,
    pub status: SimplexStatus,
    pub info: SimplexInfo,
    pub model_status: ModelStatus,
    pub iteration_count: usize,

    /// Dual steepest-edge (or Devex) weights by basis position.
    pub dual_edge_weight: Vec<f64>,
    pub(crate) devex_weight: Vec<f64>,
    pub(crate) devex_framework: Vec<bool>,
    pub(crate) devex_age: usize,
    pub(crate) using_devex: bool,
    /// Devex reference weights for primal CHUZC, by variable.
    pub(crate) primal_weight: Vec<f64>,

    pub dual_ray: Option<RayRecord>,
    pub primal_ray: Option<RayRecord>,

    pub(crate) random: Random,
    pub(crate) visited_bases: HashSet<u64>,
    pub(crate) taboo_rows: Vec<(usize, usize)>,
    pub(crate) bad_basis_change_count: usize,
    /// Leaving row and direction of the most recent CHUZR.
    pub(crate) last_chuzr: Option<(usize, i8)>,

    /// Row-wise copy of the constraint matrix for row PRICE.
    pub(crate) ar_matrix: SparseMatrix,

    pub(crate) deadline: Deadline,

    // Reusable solve buffers.
    pub(crate) row_ep: WorkVector,
    pub(crate) col_aq: WorkVector,
    pub(crate) tau: WorkVector,
    pub(crate) row_ap: Vec<f64>,
    pub(crate) row_ep_density: f64,
    pub(crate) col_aq_density: f64,
}

impl SimplexEngine {
    pub fn new(options: SolverOptions) -> Self {
        let seed = options.random_seed;
        Self {
            lp: Lp::default(),
            options,
            basis: SimplexBasis::default(),
            factor: LuFactor::new(0),
            status: SimplexStatus::default(),
            info: SimplexInfo::default(),
            model_status: ModelStatus::Notset,
            iteration_count: 0,
            dual_edge_weight: Vec::new(),
            devex_weight: Vec::new(),
            devex_framework: Vec::new(),
            devex_age: 0,
            using_devex: false,
            primal_weight: Vec::new(),
            dual_ray: None,
            primal_ray: None,
            random: Random::new(seed),
            visited_bases: HashSet::new(),
            taboo_rows: Vec::new(),
            bad_basis_change_count: 0,
            last_chuzr: None,
            ar_matrix: SparseMatrix::default(),
            deadline: Deadline::new(None),
            row_ep: WorkVector::new(0),
            col_aq: WorkVector::new(0),
            tau: WorkVector::new(0),
            row_ap: Vec::new(),
            row_ep_density: 1.0,
            col_aq_density: 1.0,
        }
    }

    pub(crate) fn num_tot(&self) -> usize {
        self.lp.num_col + self.lp.num_row
    }

    /// Collapse lifecycle flags after a model mutation. The token decides how
    /// far derived state survives.
    pub fn update_status(&mut self, action: LpAction) {
        match action {
            LpAction::NewCosts => {
                // Factor and primal values survive; duals and weights do not.
                self.status.has_dual_steepest_edge_weights = false;
                self.dual_ray = None;
                self.primal_ray = None;
            }
            LpAction::NewBounds => {
                self.dual_ray = None;
                self.primal_ray = None;
            }
            LpAction::NewBasis => {
                self.status.has_invert = false;
                self.status.has_dual_steepest_edge_weights = false;
            }
            LpAction::ScaledCol | LpAction::ScaledRow => {
                self.status.has_invert = false;
                self.status.has_dual_steepest_edge_weights = false;
                self.dual_ray = None;
                self.primal_ray = None;
            }
            LpAction::NewCols
            | LpAction::NewRows
            | LpAction::DelCols
            | LpAction::DelRows
            | LpAction::NewLp => {
                self.status = SimplexStatus::default();
                self.dual_ray = None;
                self.primal_ray = None;
            }
            LpAction::NewIntegrality => {}
        }
    }

    /// Solve the given LP from the given basis. The LP is copied; the basis
    /// is updated in place on return. Stop conditions are statuses, not
    /// errors.
    pub fn solve(
        &mut self,
        lp: &Lp,
        user_basis: &mut Basis,
        mut callback: Option<&mut dyn Callback>,
    ) -> CoreResult<ModelStatus> {
        debug_assert!(lp.check_consistent().is_ok());
        self.lp = lp.clone();
        self.deadline = Deadline::new(self.options.time_limit);
        self.dual_ray = None;
        self.primal_ray = None;
        self.bad_basis_change_count = 0;
        self.visited_bases.clear();
        self.taboo_rows.clear();

        if !user_basis.valid || user_basis.col_status.len() != lp.num_col {
            *user_basis = Basis::logical(&self.lp);
        }
        self.initialise_for_solve(user_basis)?;

        // Unconstrained LPs short-circuit: every column goes to its optimal
        // bound, rows are free.
        if self.lp.num_row == 0 {
            let status = self.solve_unconstrained();
            *user_basis = self.basis.to_basis(&self.lp);
            self.model_status = status;
            return Ok(status);
        }

        let status = match self.options.simplex_strategy {
            SimplexStrategy::Primal => self.solve_primal(&mut callback),
            SimplexStrategy::Dual | SimplexStrategy::Choose => self.solve_dual(&mut callback),
        }
        .map_err(|e| {
            self.model_status = ModelStatus::SolveError;
            e
        })?;

        self.model_status = status;
        *user_basis = self.basis.to_basis(&self.lp);
        user_basis.valid = true;
        Ok(status)
    }

    /// LPs with no rows: each column goes to the bound its cost prefers.
    fn solve_unconstrained(&mut self) -> ModelStatus {
        let n = self.lp.num_col;
        for j in 0..n {
            let c = self.info.work_cost[j];
            let lower = self.info.work_lower[j];
            let upper = self.info.work_upper[j];
            let value = if c > 0.0 {
                if lower.is_finite() {
                    lower
                } else {
                    self.primal_ray = Some(RayRecord {
                        index: j,
                        sign: 1.0,
                        value: None,
                    });
                    return ModelStatus::Unbounded;
                }
            } else if c < 0.0 {
                if upper.is_finite() {
                    upper
                } else {
                    self.primal_ray = Some(RayRecord {
                        index: j,
                        sign: -1.0,
                        value: None,
                    });
                    return ModelStatus::Unbounded;
                }
            } else if lower.is_finite() {
                lower
            } else if upper.is_finite() {
                upper
            } else {
                0.0
            };
            self.info.work_value[j] = value;
            let status = if lower.is_finite() && value == lower {
                BasisStatus::Lower
            } else if upper.is_finite() && value == upper {
                BasisStatus::Upper
            } else {
                BasisStatus::Zero
            };
            self.basis.nonbasic_move[j] = nonbasic_move_for(status, lower, upper);
        }
        self.compute_objective();
        ModelStatus::Optimal
    }

    /// Allocate and populate the work arrays, install the basis, and build
    /// the factorization.
    fn initialise_for_solve(&mut self, user_basis: &Basis) -> CoreResult<()> {
        let n = self.lp.num_col;
        let m = self.lp.num_row;
        let tot = n + m;

        self.lp.ensure_colwise();
        self.ar_matrix = self.lp.a_matrix.clone();
        self.ar_matrix.ensure_rowwise();

        let info = &mut self.info;
        info.work_cost = vec![0.0; tot];
        info.work_lower = vec![0.0; tot];
        info.work_upper = vec![0.0; tot];
        info.work_value = vec![0.0; tot];
        info.work_dual = vec![0.0; tot];
        info.base_value = vec![0.0; m];
        info.costs_perturbed = false;
        info.bounds_perturbed = false;

        let sense = self.lp.sense.sign();
        for j in 0..n {
            info.work_cost[j] = sense * self.lp.col_cost[j];
            info.work_lower[j] = self.lp.col_lower[j];
            info.work_upper[j] = self.lp.col_upper[j];
        }
        for i in 0..m {
            info.work_lower[n + i] = self.lp.row_lower[i];
            info.work_upper[n + i] = self.lp.row_upper[i];
        }
        debug_assert!(
            info.work_cost.iter().all(|c| c.is_finite()),
            "infinite costs must be fixed before the engine runs"
        );

        self.basis = SimplexBasis::from_basis(user_basis, &self.lp)?;
        self.status.has_basis = true;
        self.set_nonbasic_values();

        self.row_ep.reset(m);
        self.col_aq.reset(m);
        self.tau.reset(m);
        self.row_ap = vec![0.0; tot];
        self.row_ep_density = 1.0;
        self.col_aq_density = 1.0;

        self.factor = LuFactor::new(m);
        self.factor.pivot_threshold = self.options.factor_pivot_threshold;
        self.compute_factor()?;

        self.dual_edge_weight = vec![1.0; m];
        self.devex_weight = vec![1.0; m];
        self.devex_framework = vec![true; m];
        self.devex_age = 0;
        self.using_devex =
            self.options.edge_weight_strategy == EdgeWeightStrategy::Devex;
        self.status.has_dual_steepest_edge_weights = true;

        self.compute_primal();
        self.compute_dual();
        self.compute_objective();
        self.status.initialized_for_solve = true;
        Ok(())
    }

    /// Snap every nonbasic variable to the value its move direction implies.
    pub(crate) fn set_nonbasic_values(&mut self) {
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let lower = self.info.work_lower[var];
            let upper = self.info.work_upper[var];
            self.info.work_value[var] = match self.basis.nonbasic_move[var] {
                1 => lower,
                -1 => upper,
                _ => {
                    if lower.is_finite() && lower == upper {
                        lower
                    } else {
                        0.0
                    }
                }
            };
        }
    }

    /// Packed column of (A | −I) for a variable.
    pub(crate) fn variable_column(&self, var: usize) -> Vec<(usize, f64)> {
        let n = self.lp.num_col;
        if var < n {
            let (rows, vals) = self.lp.a_matrix.get_col(var);
            rows.into_iter().zip(vals).collect()
        } else {
            vec![(var - n, -1.0)]
        }
    }

    /// Rebuild the factorization from `basic_index`, repairing rank
    /// deficiency by patching logicals.
    pub(crate) fn compute_factor(&mut self) -> CoreResult<()> {
        let m = self.lp.num_row;
        let columns: Vec<Vec<(usize, f64)>> = (0..m)
            .map(|p| self.variable_column(self.basis.basic_index[p]))
            .collect();
        let result = self.factor.invert(&columns);
        if result.rank_deficiency > 0 {
            debug!(
                "factor rank deficient by {}; patching logicals",
                result.rank_deficiency
            );
            for &(position, row) in &result.patches {
                let out_var = self.basis.basic_index[position];
                let logical = self.lp.num_col + row;
                if self.basis.nonbasic_flag[logical] == 0 {
                    // The logical is basic elsewhere: the basis is beyond a
                    // simple patch.
                    return Err(CoreError::Numerical(
                        "rank-deficient basis could not be repaired".to_string(),
                    ));
                }
                self.basis.basic_index[position] = logical;
                self.basis.nonbasic_flag[logical] = 0;
                self.basis.nonbasic_move[logical] = 0;
                self.basis.nonbasic_flag[out_var] = 1;
                let lower = self.info.work_lower[out_var];
                let upper = self.info.work_upper[out_var];
                let status = if lower.is_finite() {
                    BasisStatus::Lower
                } else if upper.is_finite() {
                    BasisStatus::Upper
                } else {
                    BasisStatus::Zero
                };
                self.basis.nonbasic_move[out_var] = nonbasic_move_for(status, lower, upper);
                self.info.work_value[out_var] = match status {
                    BasisStatus::Lower => lower,
                    BasisStatus::Upper => upper,
                    _ => 0.0,
                };
            }
        }
        self.status.has_invert = true;
        Ok(())
    }

    /// B⁻¹ applied to the work vector (row space in, position space out).
    pub(crate) fn ftran(&mut self, rhs: &mut WorkVector, density_hint: f64) {
        self.factor.ftran(rhs, density_hint);
    }

    /// B⁻ᵀ applied to the work vector (position space in, row space out).
    pub(crate) fn btran(&mut self, rhs: &mut WorkVector, density_hint: f64) {
        self.factor.btran(rhs, density_hint);
    }

    /// Running density average used for solve-path hints.
    pub(crate) fn update_density(local: f64, density: &mut f64) {
        *density = 0.95 * *density + 0.05 * local;
    }

    /// Recompute the basic values from the nonbasic values.
    pub(crate) fn compute_primal(&mut self) {
        let n = self.lp.num_col;
        let m = self.lp.num_row;
        let mut rhs = WorkVector::new(m);
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let v = self.info.work_value[var];
            if v == 0.0 {
                continue;
            }
            if var < n {
                for el in self.lp.a_matrix.start[var]..self.lp.a_matrix.start[var + 1] {
                    rhs.array[self.lp.a_matrix.index[el]] -= self.lp.a_matrix.value[el] * v;
                }
            } else {
                rhs.array[var - n] += v;
            }
        }
        rhs.invalidate_pack();
        rhs.repack(0.0);
        self.factor.ftran(&mut rhs, 1.0);
        self.info.base_value.copy_from_slice(&rhs.array);
        self.compute_primal_infeasibilities();
    }

    /// Recompute duals from scratch: y = B⁻ᵀ c_B, then price every column.
    pub(crate) fn compute_dual(&mut self) {
        let n = self.lp.num_col;
        let m = self.lp.num_row;
        let mut rhs = WorkVector::new(m);
        for p in 0..m {
            let c = self.info.work_cost[self.basis.basic_index[p]];
            if c != 0.0 {
                rhs.insert(p, c);
            }
        }
        self.factor.btran(&mut rhs, 1.0);
        let y = &rhs.array;

        for j in 0..n {
            if self.basis.nonbasic_flag[j] == 0 {
                self.info.work_dual[j] = 0.0;
                continue;
            }
            let mut dot = 0.0;
            for el in self.lp.a_matrix.start[j]..self.lp.a_matrix.start[j + 1] {
                dot += self.lp.a_matrix.value[el] * y[self.lp.a_matrix.index[el]];
            }
            self.info.work_dual[j] = self.info.work_cost[j] - dot;
        }
        for i in 0..m {
            let var = n + i;
            self.info.work_dual[var] = if self.basis.nonbasic_flag[var] == 0 {
                0.0
            } else {
                y[i]
            };
        }
        self.compute_dual_infeasibilities();
    }

    pub(crate) fn compute_primal_infeasibilities(&mut self) {
        let tol = self.options.primal_feasibility_tolerance;
        let mut num = 0usize;
        let mut max = 0.0f64;
        let mut sum = 0.0f64;
        for p in 0..self.lp.num_row {
            let var = self.basis.basic_index[p];
            let v = self.info.base_value[p];
            let infeas = (self.info.work_lower[var] - v).max(v - self.info.work_upper[var]);
            if infeas > tol {
                num += 1;
                sum += infeas;
                max = max.max(infeas);
            }
        }
        self.info.num_primal_infeasibilities = num;
        self.info.max_primal_infeasibility = max;
        self.info.sum_primal_infeasibilities = sum;
    }

    pub(crate) fn compute_dual_infeasibilities(&mut self) {
        let tol = self.options.dual_feasibility_tolerance;
        let mut num = 0usize;
        let mut max = 0.0f64;
        let mut sum = 0.0f64;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] == 0 {
                continue;
            }
            let d = self.info.work_dual[var];
            let infeas = self.dual_infeasibility(var, d);
            if infeas > tol {
                num += 1;
                sum += infeas;
                max = max.max(infeas);
            }
        }
        self.info.num_dual_infeasibilities = num;
        self.info.max_dual_infeasibility = max;
        self.info.sum_dual_infeasibilities = sum;
    }

    /// Dual infeasibility of a nonbasic variable's reduced cost.
    pub(crate) fn dual_infeasibility(&self, var: usize, dual: f64) -> f64 {
        let lower = self.info.work_lower[var];
        let upper = self.info.work_upper[var];
        if lower == upper {
            return 0.0;
        }
        match self.basis.nonbasic_move[var] {
            1 => (-dual).max(0.0),
            -1 => dual.max(0.0),
            _ => dual.abs(),
        }
    }

    pub(crate) fn compute_objective(&mut self) {
        let mut obj = 0.0;
        for var in 0..self.num_tot() {
            if self.basis.nonbasic_flag[var] != 0 {
                obj += self.info.work_cost[var] * self.info.work_value[var];
            }
        }
        for p in 0..self.lp.num_row {
            obj += self.info.work_cost[self.basis.basic_index[p]] * self.info.base_value[p];
        }
        self.info.objective_value = obj;
    }

    /// User-sense objective of the current iterate, offset included.
    pub fn user_objective(&self) -> f64 {
        self.lp.sense.sign() * self.info.objective_value + self.lp.offset
    }

    /// Seconds spent since the last solve started.
    pub fn deadline_elapsed(&self) -> f64 {
        self.deadline.elapsed()
    }

    /// One-line rebuild record.
    pub(crate) fn log_rebuild(&self, phase: u8, reason: &str) {
        debug!(
            "rebuild iter={} phase={} obj={:.8e} pr_inf={}/{:.2e} du_inf={}/{:.2e} reason={}",
            self.iteration_count,
            phase,
            self.user_objective(),
            self.info.num_primal_infeasibilities,
            self.info.sum_primal_infeasibilities,
            self.info.num_dual_infeasibilities,
            self.info.sum_dual_infeasibilities,
            reason,
        );
    }

    /// Stop-condition checks shared by the inner loops. Returns `true` (and
    /// sets `model_status`) when the solve must unwind.
    pub(crate) fn bailout(&mut self, callback: &mut Option<&mut dyn Callback>) -> bool {
        if self.iteration_count >= self.options.iteration_limit {
            self.model_status = ModelStatus::IterationLimit;
            return true;
        }
        if self.deadline.expired() {
            self.model_status = ModelStatus::TimeLimit;
            return true;
        }
        if let Some(bound) = self.options.objective_bound {
            let obj = self.user_objective();
            let passed = match self.lp.sense {
                crate::model::lp::ObjSense::Minimize => obj > bound,
                crate::model::lp::ObjSense::Maximize => obj < bound,
            };
            if passed && self.info.num_primal_infeasibilities == 0 {
                self.model_status = ModelStatus::ObjectiveBound;
                return true;
            }
        }
        if let Some(cb) = callback.as_deref_mut() {
            let data = CallbackData {
                simplex_iteration_count: self.iteration_count,
                objective_value: self.user_objective(),
                mip_solution: Vec::new(),
            };
            if cb.simplex_interrupt(&data) {
                self.model_status = ModelStatus::Interrupted;
                return true;
            }
        }
        false
    }

    /// Read back the solution in LP space: column values/duals and row
    /// activities/duals. The dual signs are reported in the user's sense.
    pub fn solution(&self) -> EngineSolution {
        let n = self.lp.num_col;
        let m = self.lp.num_row;
        let sense = self.lp.sense.sign();
        let mut col_value = vec![0.0; n];
        let mut row_value = vec![0.0; m];
        let mut col_dual = vec![0.0; n];
        let mut row_dual = vec![0.0; m];

        let mut value = self.info.work_value.clone();
        for p in 0..m {
            value[self.basis.basic_index[p]] = self.info.base_value[p];
        }
        col_value.copy_from_slice(&value[..n]);
        row_value.copy_from_slice(&value[n..]);

        for j in 0..n {
            col_dual[j] = sense * self.info.work_dual[j];
        }
        // Row duals are the logical reduced costs; report y, the price of the
        // row, which is the same number under this logical convention.
        let mut y = WorkVector::new(m);
        for p in 0..m {
            let c = self.info.work_cost[self.basis.basic_index[p]];
            if c != 0.0 {
                y.insert(p, c);
            }
        }
        self.factor.btran(&mut y, 1.0);
        for i in 0..m {
            row_dual[i] = sense * y.array[i];
        }

        EngineSolution {
            col_value,
            col_dual,
            row_value,
            row_dual,
        }
    }

    /// Hash of the current basic set, for cycling detection.
    pub(crate) fn basis_hash(&self) -> u64 {
        let mut h = 0u64;
        for &var in &self.basis.basic_index {
            h ^= (var as u64).wrapping_mul(0x9e3779b97f4a7c15).rotate_left((var % 63) as u32);
        }
        h
    }
}

/// Primal-dual point read back from the engine.
#[derive(Debug, Clone, Default)]
pub struct EngineSolution {
    pub col_value: Vec<f64>,
    pub col_dual: Vec<f64>,
    pub row_value: Vec<f64>,
    pub row_dual: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_lp() -> Lp {
        // min x1 + x2  s.t.  x1 + 2 x2 <= 4, x1 + x2 >= 1, 0 <= x <= 10
        let mut lp = Lp::new(2, 2);
        lp.col_cost = vec![1.0, 1.0];
        lp.col_lower = vec![0.0, 0.0];
        lp.col_upper = vec![10.0, 10.0];
        lp.row_lower = vec![f64::NEG_INFINITY, 1.0];
        lp.row_upper = vec![4.0, f64::INFINITY];
        lp.a_matrix = SparseMatrix::from_colwise(
            2,
            2,
            vec![0, 2, 4],
            vec![0, 1, 0, 1],
            vec![1.0, 1.0, 2.0, 1.0],
        )
        .unwrap();
        lp
    }

    #[test]
    fn test_engine_solves_simple_lp() {
        let mut engine = SimplexEngine::new(SolverOptions::default());
        let lp = simple_lp();
        let mut basis = Basis::logical(&lp);
        let status = engine.solve(&lp, &mut basis, None).unwrap();
        assert_eq!(status, ModelStatus::Optimal);
        let sol = engine.solution();
        let obj: f64 = sol.col_value[0] + sol.col_value[1];
        assert!((obj - 1.0).abs() < 1e-7, "solution {:?}", sol.col_value);
        assert!((engine.user_objective() - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_unconstrained_bounded() {
        let mut lp = Lp::new(0, 2);
        lp.col_cost = vec![1.0, -1.0];
        lp.col_lower = vec![-5.0, 0.0];
        lp.col_upper = vec![5.0, 7.0];
        let mut engine = SimplexEngine::new(SolverOptions::default());
        let mut basis = Basis::logical(&lp);
        let status = engine.solve(&lp, &mut basis, None).unwrap();
        assert_eq!(status, ModelStatus::Optimal);
        let sol = engine.solution();
        assert_eq!(sol.col_value, vec![-5.0, 7.0]);
        assert!((engine.user_objective() + 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_unconstrained_unbounded() {
        let mut lp = Lp::new(0, 1);
        lp.col_cost = vec![-1.0];
        lp.col_lower = vec![0.0];
        lp.col_upper = vec![f64::INFINITY];
        let mut engine = SimplexEngine::new(SolverOptions::default());
        let mut basis = Basis::logical(&lp);
        let status = engine.solve(&lp, &mut basis, None).unwrap();
        assert_eq!(status, ModelStatus::Unbounded);
        assert!(engine.primal_ray.is_some());
    }

    #[test]
    fn test_iteration_limit() {
        let mut engine = SimplexEngine::new(
            SolverOptions::default().with_iteration_limit(0),
        );
        let lp = simple_lp();
        let mut basis = Basis::logical(&lp);
        let status = engine.solve(&lp, &mut basis, None).unwrap();
        // Either the start is already optimal (it is not for this LP) or the
        // limit fires before the first pivot.
        assert_eq!(status, ModelStatus::IterationLimit);
    }

    #[test]
    fn test_update_status_collapse() {
        let mut engine = SimplexEngine::new(SolverOptions::default());
        engine.status.initialized_for_solve = true;
        engine.status.has_basis = true;
        engine.status.has_invert = true;
        engine.status.has_dual_steepest_edge_weights = true;

        engine.update_status(LpAction::NewCosts);
        assert!(engine.status.has_invert);
        assert!(!engine.status.has_dual_steepest_edge_weights);

        engine.update_status(LpAction::NewRows);
        assert!(!engine.status.has_invert);
        assert!(!engine.status.has_basis);
        assert!(!engine.status.initialized_for_solve);
    }
}
