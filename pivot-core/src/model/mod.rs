//! Model state and the incremental mutation API.
//!
//! [`Model`] is the user-facing facade: it owns the LP, the optional Hessian,
//! the options, the basis, the last solution, and one simplex engine
//! instance. Every mutation follows the same discipline: validate without
//! side effects, normalize (user scales applied), write into the LP, adjust
//! the basis where the change allows it, invalidate derived state, and hand
//! the engine a typed action token.

pub mod hessian;
pub mod index_set;
pub mod lp;
pub mod scale;

use log::warn;

use crate::callback::Callback;
use crate::kkt;
use crate::multiobj::LinearObjective;
use crate::options::{SimplexStrategy, SolverOptions};
use crate::simplex::basis::{nonbasic_status_for_bounds, Basis, BasisStatus};
use crate::simplex::SimplexEngine;
use crate::status::{CoreError, CoreResult, LpAction, ModelStatus, SolveInfo, Validity};

use hessian::Hessian;

/// Reborrow a callback trait object with its lifetime tied to the borrow
/// instead of defaulting to `'static`, so it can be borrowed more than once
/// within the same function.
fn shorten_callback<'a>(cb: &'a mut (dyn Callback + 'static)) -> &'a mut (dyn Callback + 'a) {
    cb
}
use index_set::IndexCollection;
use lp::{assess_bounds, assess_costs, Lp, VarKind};
use scale::{bound_scale_ok, cost_scale_ok, Scale};

/// Primal-dual solution in user space.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub value_valid: bool,
    pub dual_valid: bool,
    pub col_value: Vec<f64>,
    pub col_dual: Vec<f64>,
    pub row_value: Vec<f64>,
    pub row_dual: Vec<f64>,
}

impl Solution {
    pub fn clear(&mut self) {
        *self = Solution::default();
    }
}

/// One entry of the modifications log: the original cost and bounds of a
/// column whose infinite cost was rewritten to a finite fixing for the solve.
#[derive(Debug, Clone)]
pub struct CostBoundMod {
    pub col: usize,
    pub original_cost: f64,
    pub original_lower: f64,
    pub original_upper: f64,
}

/// Columns extracted by [`Model::get_cols`].
#[derive(Debug, Clone, Default)]
pub struct ColSlice {
    pub cost: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// (row, selected-column position, value)
    pub entries: Vec<(usize, usize, f64)>,
}

/// Rows extracted by [`Model::get_rows`].
#[derive(Debug, Clone, Default)]
pub struct RowSlice {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// (selected-row position, column, value)
    pub entries: Vec<(usize, usize, f64)>,
}

/// The optimization model facade.
pub struct Model {
    lp: Lp,
    hessian: Hessian,
    pub options: SolverOptions,
    engine: SimplexEngine,
    basis: Basis,
    solution: Solution,
    info: SolveInfo,
    model_status: ModelStatus,
    objectives: Vec<LinearObjective>,
    mods_log: Vec<CostBoundMod>,
    last_scale: Scale,
    callback: Option<Box<dyn Callback>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        let options = SolverOptions::default();
        Self {
            lp: Lp::default(),
            hessian: Hessian::default(),
            engine: SimplexEngine::new(options.clone()),
            options,
            basis: Basis::default(),
            solution: Solution::default(),
            info: SolveInfo::default(),
            model_status: ModelStatus::Notset,
            objectives: Vec::new(),
            mods_log: Vec::new(),
            last_scale: Scale::default(),
            callback: None,
        }
    }

    /// Replace the incumbent LP.
    pub fn pass_lp(&mut self, lp: Lp) -> CoreResult<()> {
        lp.check_consistent()?;
        self.lp = lp;
        self.lp.has_infinite_cost = self
            .lp
            .compute_has_infinite_cost(self.options.infinite_cost);
        self.basis.clear();
        self.invalidate(LpAction::NewLp);
        Ok(())
    }

    /// Attach a Hessian (½·xᵀQx). Must match the LP dimension and be
    /// triangular.
    pub fn pass_hessian(&mut self, hessian: Hessian) -> CoreResult<()> {
        if hessian.dim != self.lp.num_col {
            return Err(CoreError::InvalidInput(format!(
                "hessian dimension {} does not match {} columns",
                hessian.dim, self.lp.num_col
            )));
        }
        hessian.check_consistent()?;
        self.hessian = hessian;
        self.invalidate(LpAction::NewCosts);
        Ok(())
    }

    pub fn set_callback(&mut self, callback: Box<dyn Callback>) {
        self.callback = Some(callback);
    }

    // ----- read access ----------------------------------------------------

    pub fn lp(&self) -> &Lp {
        &self.lp
    }

    pub fn hessian(&self) -> &Hessian {
        &self.hessian
    }

    pub fn num_col(&self) -> usize {
        self.lp.num_col
    }

    pub fn num_row(&self) -> usize {
        self.lp.num_row
    }

    pub fn status(&self) -> ModelStatus {
        self.model_status
    }

    pub fn info(&self) -> &SolveInfo {
        &self.info
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn modifications_log(&self) -> &[CostBoundMod] {
        &self.mods_log
    }

    pub(crate) fn engine(&self) -> &SimplexEngine {
        &self.engine
    }

    pub(crate) fn engine_mut(&mut self) -> &mut SimplexEngine {
        &mut self.engine
    }

    /// Row scale factors of the last solve (identity when unscaled).
    pub(crate) fn last_scale_rows(&self) -> Vec<f64> {
        if self.last_scale.has_scaling && self.last_scale.row.len() == self.lp.num_row {
            self.last_scale.row.clone()
        } else {
            vec![1.0; self.lp.num_row]
        }
    }

    /// Column scale factors of the last solve (identity when unscaled).
    pub(crate) fn last_scale_cols(&self) -> Vec<f64> {
        if self.last_scale.has_scaling && self.last_scale.col.len() == self.lp.num_col {
            self.last_scale.col.clone()
        } else {
            vec![1.0; self.lp.num_col]
        }
    }

    pub fn get_coefficient(&self, row: usize, col: usize) -> CoreResult<f64> {
        if row >= self.lp.num_row || col >= self.lp.num_col {
            return Err(CoreError::InvalidInput(format!(
                "coefficient ({}, {}) out of range",
                row, col
            )));
        }
        Ok(self.lp.a_matrix.get_coefficient(row, col))
    }

    /// Extract the selected columns: costs, bounds, and matrix entries as
    /// (row, selected-column position, value) triplets.
    pub fn get_cols(&self, collection: &IndexCollection) -> CoreResult<ColSlice> {
        collection.validate(self.lp.num_col)?;
        let mut out = ColSlice::default();
        let mut position = 0usize;
        let mut entries = Vec::new();
        collection.for_each(self.lp.num_col, |_, j| {
            out.cost.push(self.lp.col_cost[j]);
            out.lower.push(self.lp.col_lower[j]);
            out.upper.push(self.lp.col_upper[j]);
            let (rows, vals) = self.lp.a_matrix.get_col(j);
            for (i, v) in rows.into_iter().zip(vals) {
                entries.push((i, position, v));
            }
            position += 1;
        });
        out.entries = entries;
        Ok(out)
    }

    /// Extract the selected rows: bounds and matrix entries as
    /// (selected-row position, col, value) triplets.
    pub fn get_rows(&self, collection: &IndexCollection) -> CoreResult<RowSlice> {
        collection.validate(self.lp.num_row)?;
        let mut out = RowSlice::default();
        let mut position = 0usize;
        let mut entries = Vec::new();
        collection.for_each(self.lp.num_row, |_, i| {
            out.lower.push(self.lp.row_lower[i]);
            out.upper.push(self.lp.row_upper[i]);
            let (cols, vals) = self.lp.a_matrix.get_row(i);
            for (j, v) in cols.into_iter().zip(vals) {
                entries.push((position, j, v));
            }
            position += 1;
        });
        out.entries = entries;
        Ok(out)
    }

    // ----- mutation API ---------------------------------------------------

    /// Append one column. `indices`/`values` hold its matrix entries.
    pub fn add_col(
        &mut self,
        cost: f64,
        lower: f64,
        upper: f64,
        indices: &[usize],
        values: &[f64],
    ) -> CoreResult<()> {
        let start = [0, indices.len()];
        self.add_cols(1, &[cost], &[lower], &[upper], &start, indices, values)
    }

    /// Append a block of columns in packed column-wise form.
    pub fn add_cols(
        &mut self,
        num_new: usize,
        costs: &[f64],
        lower: &[f64],
        upper: &[f64],
        start: &[usize],
        indices: &[usize],
        values: &[f64],
    ) -> CoreResult<()> {
        if costs.len() != num_new || lower.len() != num_new || upper.len() != num_new {
            return Err(CoreError::InvalidInput(
                "column block vector lengths do not match the count".to_string(),
            ));
        }
        for &i in indices {
            if i >= self.lp.num_row {
                return Err(CoreError::InvalidInput(format!(
                    "new column references row {} of {}",
                    i, self.lp.num_row
                )));
            }
        }
        // Normalize copies first so errors leave the model unchanged.
        let mut new_cost = costs.to_vec();
        let mut new_lower = lower.to_vec();
        let mut new_upper = upper.to_vec();
        let has_infinite =
            assess_costs(&mut new_cost, self.options.infinite_cost)?;
        assess_bounds("col", &mut new_lower, &mut new_upper, self.options.infinite_bound)?;
        if self.lp.user_cost_scale != 0 {
            if !cost_scale_ok(&new_cost, self.lp.user_cost_scale, self.options.infinite_cost) {
                return Err(CoreError::ScalingOverflow(
                    "user cost scaling yields infinite cost".to_string(),
                ));
            }
            let f = (self.lp.user_cost_scale as f64).exp2();
            new_cost.iter_mut().for_each(|c| *c *= f);
        }
        if self.lp.user_bound_scale != 0 {
            if !bound_scale_ok(
                &new_lower,
                &new_upper,
                self.lp.user_bound_scale,
                self.options.infinite_bound,
            ) {
                return Err(CoreError::ScalingOverflow(
                    "user bound scaling yields infinite bound".to_string(),
                ));
            }
            let f = (self.lp.user_bound_scale as f64).exp2();
            new_lower.iter_mut().for_each(|b| *b *= f);
            new_upper.iter_mut().for_each(|b| *b *= f);
        }

        self.lp
            .a_matrix
            .add_cols(num_new, start, indices, values)?;
        self.lp.num_col += num_new;
        self.lp.col_cost.extend_from_slice(&new_cost);
        self.lp.col_lower.extend_from_slice(&new_lower);
        self.lp.col_upper.extend_from_slice(&new_upper);
        if !self.lp.integrality.is_empty() {
            self.lp
                .integrality
                .extend(std::iter::repeat(VarKind::Continuous).take(num_new));
        }
        if !self.lp.col_names.is_empty() {
            self.lp
                .col_names
                .extend((0..num_new).map(|_| String::new()));
        }
        self.lp.has_infinite_cost = self.lp.has_infinite_cost || has_infinite;

        // New columns enter nonbasic at their natural bound.
        if self.basis.valid {
            for k in 0..num_new {
                self.basis
                    .col_status
                    .push(nonbasic_status_for_bounds(new_lower[k], new_upper[k]));
            }
        }
        self.invalidate(LpAction::NewCols);
        Ok(())
    }

    /// Append one row. `indices`/`values` hold its matrix entries.
    pub fn add_row(
        &mut self,
        lower: f64,
        upper: f64,
        indices: &[usize],
        values: &[f64],
    ) -> CoreResult<()> {
        let start = [0, indices.len()];
        self.add_rows(1, &[lower], &[upper], &start, indices, values)
    }

    /// Append a block of rows in packed row-wise form.
    pub fn add_rows(
        &mut self,
        num_new: usize,
        lower: &[f64],
        upper: &[f64],
        start: &[usize],
        indices: &[usize],
        values: &[f64],
    ) -> CoreResult<()> {
        if lower.len() != num_new || upper.len() != num_new {
            return Err(CoreError::InvalidInput(
                "row block vector lengths do not match the count".to_string(),
            ));
        }
        for &j in indices {
            if j >= self.lp.num_col {
                return Err(CoreError::InvalidInput(format!(
                    "new row references column {} of {}",
                    j, self.lp.num_col
                )));
            }
        }
        let mut new_lower = lower.to_vec();
        let mut new_upper = upper.to_vec();
        assess_bounds("row", &mut new_lower, &mut new_upper, self.options.infinite_bound)?;
        if self.lp.user_bound_scale != 0 {
            if !bound_scale_ok(
                &new_lower,
                &new_upper,
                self.lp.user_bound_scale,
                self.options.infinite_bound,
            ) {
                return Err(CoreError::ScalingOverflow(
                    "user bound scaling yields infinite bound".to_string(),
                ));
            }
            let f = (self.lp.user_bound_scale as f64).exp2();
            new_lower.iter_mut().for_each(|b| *b *= f);
            new_upper.iter_mut().for_each(|b| *b *= f);
        }

        self.lp
            .a_matrix
            .add_rows(num_new, start, indices, values)?;
        self.lp.num_row += num_new;
        self.lp.row_lower.extend_from_slice(&new_lower);
        self.lp.row_upper.extend_from_slice(&new_upper);
        if !self.lp.row_names.is_empty() {
            self.lp
                .row_names
                .extend((0..num_new).map(|_| String::new()));
        }

        // New rows enter with their logical basic.
        if self.basis.valid {
            self.basis
                .row_status
                .extend(std::iter::repeat(BasisStatus::Basic).take(num_new));
        }
        self.invalidate(LpAction::NewRows);
        Ok(())
    }

    /// Delete columns; returns the old→new index mapping (−1 = deleted),
    /// which is also the mask-form read-back.
    pub fn delete_cols(&mut self, collection: &IndexCollection) -> CoreResult<Vec<i32>> {
        collection.validate(self.lp.num_col)?;
        let mapping = self.lp.a_matrix.delete_cols(collection)?;
        compact(&mut self.lp.col_cost, &mapping);
        compact(&mut self.lp.col_lower, &mapping);
        compact(&mut self.lp.col_upper, &mapping);
        if !self.lp.integrality.is_empty() {
            compact(&mut self.lp.integrality, &mapping);
        }
        if !self.lp.col_names.is_empty() {
            compact(&mut self.lp.col_names, &mapping);
        }
        self.lp.num_col = self.lp.a_matrix.num_col;
        self.lp.has_infinite_cost = self
            .lp
            .compute_has_infinite_cost(self.options.infinite_cost);
        if !self.hessian.is_empty() {
            // Column deletion invalidates the quadratic term.
            self.hessian.clear();
            warn!("hessian dropped by column deletion");
        }

        if self.basis.valid {
            let mut deleted_basic = false;
            for (j, &m) in mapping.iter().enumerate() {
                if m < 0 && self.basis.col_status[j] == BasisStatus::Basic {
                    deleted_basic = true;
                }
            }
            compact(&mut self.basis.col_status, &mapping);
            if deleted_basic {
                self.basis.valid = false;
            }
        }
        self.invalidate(LpAction::DelCols);
        Ok(mapping)
    }

    /// Delete rows; returns the old→new index mapping (−1 = deleted).
    pub fn delete_rows(&mut self, collection: &IndexCollection) -> CoreResult<Vec<i32>> {
        collection.validate(self.lp.num_row)?;
        let mapping = self.lp.a_matrix.delete_rows(collection)?;
        compact(&mut self.lp.row_lower, &mapping);
        compact(&mut self.lp.row_upper, &mapping);
        if !self.lp.row_names.is_empty() {
            compact(&mut self.lp.row_names, &mapping);
        }
        self.lp.num_row = self.lp.a_matrix.num_row;

        if self.basis.valid {
            let mut deleted_nonbasic = false;
            for (i, &m) in mapping.iter().enumerate() {
                if m < 0 && self.basis.row_status[i] != BasisStatus::Basic {
                    deleted_nonbasic = true;
                }
            }
            compact(&mut self.basis.row_status, &mapping);
            if deleted_nonbasic {
                self.basis.valid = false;
            }
        }
        self.invalidate(LpAction::DelRows);
        Ok(mapping)
    }

    /// Change costs for the selected columns. Data is positional for
    /// interval/set collections and indexed by column for masks.
    pub fn change_col_costs(
        &mut self,
        collection: &IndexCollection,
        costs: &[f64],
    ) -> CoreResult<()> {
        collection.validate(self.lp.num_col)?;
        let mut new_cost = costs.to_vec();
        let has_infinite = assess_costs(&mut new_cost, self.options.infinite_cost)?;
        if self.lp.user_cost_scale != 0 {
            if !cost_scale_ok(&new_cost, self.lp.user_cost_scale, self.options.infinite_cost) {
                return Err(CoreError::ScalingOverflow(
                    "user cost scaling yields infinite cost".to_string(),
                ));
            }
            let f = (self.lp.user_cost_scale as f64).exp2();
            new_cost.iter_mut().for_each(|c| *c *= f);
        }
        let mut shape_error = None;
        collection.for_each(self.lp.num_col, |k, j| {
            if k >= new_cost.len() {
                shape_error = Some(k);
            } else {
                self.lp.col_cost[j] = new_cost[k];
            }
        });
        if let Some(k) = shape_error {
            return Err(CoreError::InvalidInput(format!(
                "cost data has no entry for position {}",
                k
            )));
        }
        self.lp.has_infinite_cost = if has_infinite {
            true
        } else {
            self.lp
                .compute_has_infinite_cost(self.options.infinite_cost)
        };
        self.invalidate(LpAction::NewCosts);
        Ok(())
    }

    pub fn change_col_cost(&mut self, col: usize, cost: f64) -> CoreResult<()> {
        self.change_col_costs(&IndexCollection::interval(col, col), &[cost])
    }

    /// Set the objective offset.
    pub fn set_offset(&mut self, offset: f64) {
        self.lp.offset = offset;
        self.model_status = ModelStatus::Notset;
    }

    /// Overwrite the cost vector verbatim, bypassing user cost scaling.
    /// The multi-objective driver uses this to swap objectives in and out
    /// without compounding the scale.
    pub(crate) fn set_costs_raw(&mut self, costs: &[f64], offset: f64) -> CoreResult<()> {
        if costs.len() != self.lp.num_col {
            return Err(CoreError::InvalidInput(format!(
                "{} costs for {} columns",
                costs.len(),
                self.lp.num_col
            )));
        }
        self.lp.col_cost = costs.to_vec();
        self.lp.offset = offset;
        self.lp.has_infinite_cost = self
            .lp
            .compute_has_infinite_cost(self.options.infinite_cost);
        self.invalidate(LpAction::NewCosts);
        Ok(())
    }

    /// Set the objective sense.
    pub fn set_sense(&mut self, sense: lp::ObjSense) {
        if self.lp.sense != sense {
            self.lp.sense = sense;
            self.invalidate(LpAction::NewCosts);
        }
    }

    /// Change bounds for the selected columns.
    pub fn change_col_bounds(
        &mut self,
        collection: &IndexCollection,
        lower: &[f64],
        upper: &[f64],
    ) -> CoreResult<()> {
        self.change_bounds(collection, lower, upper, true)
    }

    /// Change bounds for the selected rows.
    pub fn change_row_bounds(
        &mut self,
        collection: &IndexCollection,
        lower: &[f64],
        upper: &[f64],
    ) -> CoreResult<()> {
        self.change_bounds(collection, lower, upper, false)
    }

    fn change_bounds(
        &mut self,
        collection: &IndexCollection,
        lower: &[f64],
        upper: &[f64],
        columns: bool,
    ) -> CoreResult<()> {
        let dim = if columns {
            self.lp.num_col
        } else {
            self.lp.num_row
        };
        collection.validate(dim)?;
        let mut new_lower = lower.to_vec();
        let mut new_upper = upper.to_vec();
        assess_bounds(
            if columns { "col" } else { "row" },
            &mut new_lower,
            &mut new_upper,
            self.options.infinite_bound,
        )?;
        if self.lp.user_bound_scale != 0 {
            if !bound_scale_ok(
                &new_lower,
                &new_upper,
                self.lp.user_bound_scale,
                self.options.infinite_bound,
            ) {
                return Err(CoreError::ScalingOverflow(
                    "user bound scaling yields infinite bound".to_string(),
                ));
            }
            let f = (self.lp.user_bound_scale as f64).exp2();
            new_lower.iter_mut().for_each(|b| *b *= f);
            new_upper.iter_mut().for_each(|b| *b *= f);
        }
        let mut shape_error = None;
        {
            let (lo, up) = if columns {
                (&mut self.lp.col_lower, &mut self.lp.col_upper)
            } else {
                (&mut self.lp.row_lower, &mut self.lp.row_upper)
            };
            collection.for_each(dim, |k, ix| {
                if k >= new_lower.len() {
                    shape_error = Some(k);
                } else {
                    lo[ix] = new_lower[k];
                    up[ix] = new_upper[k];
                }
            });
        }
        if let Some(k) = shape_error {
            return Err(CoreError::InvalidInput(format!(
                "bound data has no entry for position {}",
                k
            )));
        }

        // Nonbasic statuses follow the surviving bounds.
        if self.basis.valid {
            let statuses = if columns {
                &mut self.basis.col_status
            } else {
                &mut self.basis.row_status
            };
            let (lo, up) = if columns {
                (&self.lp.col_lower, &self.lp.col_upper)
            } else {
                (&self.lp.row_lower, &self.lp.row_upper)
            };
            collection.for_each(dim, |_, ix| {
                let s = statuses[ix];
                statuses[ix] = match s {
                    BasisStatus::Basic => BasisStatus::Basic,
                    BasisStatus::Lower if !lo[ix].is_finite() => {
                        nonbasic_status_for_bounds(lo[ix], up[ix])
                    }
                    BasisStatus::Upper if !up[ix].is_finite() => {
                        nonbasic_status_for_bounds(lo[ix], up[ix])
                    }
                    other => other,
                };
            });
        }
        self.invalidate(LpAction::NewBounds);
        Ok(())
    }

    /// Change a single matrix coefficient. A basic column makes the retained
    /// basis alien (it must refactor before reuse).
    pub fn change_coefficient(
        &mut self,
        row: usize,
        col: usize,
        value: f64,
    ) -> CoreResult<()> {
        if row >= self.lp.num_row || col >= self.lp.num_col {
            return Err(CoreError::InvalidInput(format!(
                "coefficient ({}, {}) out of range",
                row, col
            )));
        }
        if value.abs() > self.options.large_matrix_value {
            return Err(CoreError::InvalidMatrixValue(format!(
                "|{}| exceeds the large-value threshold",
                value
            )));
        }
        self.lp.ensure_colwise();
        self.lp
            .a_matrix
            .change_coefficient(row, col, value, self.options.small_matrix_value);

        let basic_column =
            self.basis.valid && self.basis.col_status[col] == BasisStatus::Basic;
        if basic_column {
            self.basis.alien = true;
            self.invalidate(LpAction::NewRows);
        } else {
            self.invalidate(LpAction::NewBounds);
        }
        Ok(())
    }

    /// Change integrality kinds for the selected columns.
    pub fn change_col_integrality(
        &mut self,
        collection: &IndexCollection,
        kinds: &[VarKind],
    ) -> CoreResult<()> {
        collection.validate(self.lp.num_col)?;
        if self.lp.integrality.is_empty() {
            self.lp.integrality = vec![VarKind::Continuous; self.lp.num_col];
        }
        let mut shape_error = None;
        collection.for_each(self.lp.num_col, |k, j| {
            if k >= kinds.len() {
                shape_error = Some(k);
            } else {
                self.lp.integrality[j] = kinds[k];
            }
        });
        if let Some(k) = shape_error {
            return Err(CoreError::InvalidInput(format!(
                "integrality data has no entry for position {}",
                k
            )));
        }
        self.model_status = ModelStatus::Notset;
        self.engine.update_status(LpAction::NewIntegrality);
        Ok(())
    }

    /// Scale column `col` by a nonzero factor: matrix entries multiply by the
    /// factor, bounds divide by it (swapping on negative), cost multiplies.
    pub fn scale_col(&mut self, col: usize, factor: f64) -> CoreResult<()> {
        if col >= self.lp.num_col {
            return Err(CoreError::InvalidInput(format!("column {} out of range", col)));
        }
        if factor == 0.0 {
            return Err(CoreError::InvalidInput(
                "scale factor must be nonzero".to_string(),
            ));
        }
        self.lp.ensure_colwise();
        self.lp.a_matrix.scale_col(col, factor);
        self.lp.col_cost[col] *= factor;
        self.lp.has_infinite_cost = self
            .lp
            .compute_has_infinite_cost(self.options.infinite_cost);
        let (lo, up) = (self.lp.col_lower[col], self.lp.col_upper[col]);
        if factor > 0.0 {
            self.lp.col_lower[col] = lo / factor;
            self.lp.col_upper[col] = up / factor;
        } else {
            self.lp.col_lower[col] = up / factor;
            self.lp.col_upper[col] = lo / factor;
            if self.basis.valid {
                self.basis.col_status[col] = match self.basis.col_status[col] {
                    BasisStatus::Lower => BasisStatus::Upper,
                    BasisStatus::Upper => BasisStatus::Lower,
                    other => other,
                };
            }
        }
        self.invalidate(LpAction::ScaledCol);
        Ok(())
    }

    /// Scale row `row` by a nonzero factor: matrix entries multiply by the
    /// factor, bounds multiply by it (swapping on negative).
    pub fn scale_row(&mut self, row: usize, factor: f64) -> CoreResult<()> {
        if row >= self.lp.num_row {
            return Err(CoreError::InvalidInput(format!("row {} out of range", row)));
        }
        if factor == 0.0 {
            return Err(CoreError::InvalidInput(
                "scale factor must be nonzero".to_string(),
            ));
        }
        self.lp.ensure_colwise();
        self.lp.a_matrix.scale_row(row, factor);
        let (lo, up) = (self.lp.row_lower[row], self.lp.row_upper[row]);
        if factor > 0.0 {
            self.lp.row_lower[row] = lo * factor;
            self.lp.row_upper[row] = up * factor;
        } else {
            self.lp.row_lower[row] = up * factor;
            self.lp.row_upper[row] = lo * factor;
            if self.basis.valid {
                self.basis.row_status[row] = match self.basis.row_status[row] {
                    BasisStatus::Lower => BasisStatus::Upper,
                    BasisStatus::Upper => BasisStatus::Lower,
                    other => other,
                };
            }
        }
        self.invalidate(LpAction::ScaledRow);
        Ok(())
    }

    /// Set the user bound scale exponent: all bounds multiply by
    /// 2^(new − old). Refused (model untouched) when a finite bound would
    /// cross the infinite threshold.
    pub fn set_user_bound_scale(&mut self, scale: i32) -> CoreResult<()> {
        let delta = scale - self.lp.user_bound_scale;
        if delta == 0 {
            return Ok(());
        }
        if !bound_scale_ok(&self.lp.col_lower, &self.lp.col_upper, delta, self.options.infinite_bound)
            || !bound_scale_ok(
                &self.lp.row_lower,
                &self.lp.row_upper,
                delta,
                self.options.infinite_bound,
            )
        {
            return Err(CoreError::ScalingOverflow(format!(
                "user bound scale {} overflows the infinite bound",
                scale
            )));
        }
        let f = (delta as f64).exp2();
        for b in self
            .lp
            .col_lower
            .iter_mut()
            .chain(self.lp.col_upper.iter_mut())
            .chain(self.lp.row_lower.iter_mut())
            .chain(self.lp.row_upper.iter_mut())
        {
            if b.is_finite() {
                *b *= f;
            }
        }
        self.lp.user_bound_scale = scale;
        self.invalidate(LpAction::NewBounds);
        Ok(())
    }

    /// Set the user cost scale exponent: all costs multiply by 2^(new − old).
    pub fn set_user_cost_scale(&mut self, scale: i32) -> CoreResult<()> {
        let delta = scale - self.lp.user_cost_scale;
        if delta == 0 {
            return Ok(());
        }
        if !cost_scale_ok(&self.lp.col_cost, delta, self.options.infinite_cost) {
            return Err(CoreError::ScalingOverflow(format!(
                "user cost scale {} overflows the infinite cost",
                scale
            )));
        }
        let f = (delta as f64).exp2();
        for c in self.lp.col_cost.iter_mut() {
            if c.is_finite() {
                *c *= f;
            }
        }
        self.lp.user_cost_scale = scale;
        self.invalidate(LpAction::NewCosts);
        Ok(())
    }

    /// Install a user basis. A wrong basic count keeps the basis but marks it
    /// alien; the next factorization repairs it.
    pub fn pass_basis(&mut self, basis: Basis) -> CoreResult<()> {
        basis.validate(&self.lp)?;
        let mut basis = basis;
        basis.valid = true;
        basis.alien = basis.num_basic() != self.lp.num_row;
        self.basis = basis;
        self.engine.update_status(LpAction::NewBasis);
        Ok(())
    }

    /// Drop all derived solver state, keeping the model.
    pub fn clear_solver(&mut self) {
        self.basis.clear();
        self.solution.clear();
        self.info.clear();
        self.model_status = ModelStatus::Notset;
        self.engine.update_status(LpAction::NewLp);
    }

    // ----- objectives -----------------------------------------------------

    /// Replace the set of linear objectives for multi-objective optimization.
    pub fn pass_objectives(&mut self, objectives: Vec<LinearObjective>) -> CoreResult<()> {
        for obj in &objectives {
            if obj.coefficients.len() != self.lp.num_col {
                return Err(CoreError::InvalidObjectives(format!(
                    "objective has {} coefficients for {} columns",
                    obj.coefficients.len(),
                    self.lp.num_col
                )));
            }
        }
        self.objectives = objectives;
        self.model_status = ModelStatus::Notset;
        Ok(())
    }

    pub fn clear_objectives(&mut self) {
        self.objectives.clear();
    }

    // ----- solve ----------------------------------------------------------

    /// Solve the model. Stop conditions are statuses; `Err` is reserved for
    /// invalid input and unrecoverable numerical failure.
    pub fn run(&mut self) -> CoreResult<ModelStatus> {
        self.lp.check_consistent()?;
        if !self.objectives.is_empty() {
            let objectives = std::mem::take(&mut self.objectives);
            let result = crate::multiobj::solve_multiobjective(self, &objectives);
            self.objectives = objectives;
            return result;
        }
        self.run_single()
    }

    pub(crate) fn run_single(&mut self) -> CoreResult<ModelStatus> {
        if !self.hessian.is_empty() {
            return Err(CoreError::UnsupportedQuadratic);
        }

        // Rewrite infinite costs to finite fixings, logged for postsolve.
        let mut solve_lp = self.lp.clone();
        self.mods_log.clear();
        let had_infinite_cost = solve_lp.has_infinite_cost;
        if had_infinite_cost {
            self.fix_infinite_costs(&mut solve_lp)?;
        }

        // Equilibrate the solve copy; factors are powers of two.
        let scale = if self.options.scaling_iterations > 0 {
            Scale::equilibrate(&solve_lp.a_matrix, self.options.scaling_iterations)
        } else {
            Scale::identity(solve_lp.num_col, solve_lp.num_row)
        };
        if scale.has_scaling {
            solve_lp.a_matrix.apply_row_scale(&scale.row);
            solve_lp.a_matrix.apply_col_scale(&scale.col);
            for j in 0..solve_lp.num_col {
                let c = scale.col[j];
                if solve_lp.col_lower[j].is_finite() {
                    solve_lp.col_lower[j] /= c;
                }
                if solve_lp.col_upper[j].is_finite() {
                    solve_lp.col_upper[j] /= c;
                }
                solve_lp.col_cost[j] *= c;
            }
            for i in 0..solve_lp.num_row {
                let r = scale.row[i];
                if solve_lp.row_lower[i].is_finite() {
                    solve_lp.row_lower[i] *= r;
                }
                if solve_lp.row_upper[i].is_finite() {
                    solve_lp.row_upper[i] *= r;
                }
            }
        }

        // An alien basis with the wrong basic count cannot seed the factor.
        if self.basis.alien && self.basis.num_basic() != self.lp.num_row {
            self.basis.valid = false;
        }

        self.engine.options = self.options.clone();
        let mut callback = self.callback.take();
        let mut status = self
            .engine
            .solve(&solve_lp, &mut self.basis, callback.as_deref_mut().map(shorten_callback))?;

        if status == ModelStatus::UnboundedOrInfeasible
            && self.options.simplex_strategy != SimplexStrategy::Primal
        {
            // Distinguish with a primal solve from a fresh logical basis.
            let saved_strategy = self.engine.options.simplex_strategy;
            self.engine.options.simplex_strategy = SimplexStrategy::Primal;
            let mut fresh = Basis::logical(&solve_lp);
            status = self
                .engine
                .solve(&solve_lp, &mut fresh, callback.as_deref_mut().map(shorten_callback))?;
            self.basis = fresh;
            self.engine.options.simplex_strategy = saved_strategy;
        }
        self.callback = callback;

        // Read back and unscale.
        let engine_solution = self.engine.solution();
        let n = self.lp.num_col;
        let m = self.lp.num_row;
        self.solution.col_value = engine_solution.col_value;
        self.solution.col_dual = engine_solution.col_dual;
        self.solution.row_value = engine_solution.row_value;
        self.solution.row_dual = engine_solution.row_dual;
        if scale.has_scaling {
            for j in 0..n {
                self.solution.col_value[j] *= scale.col[j];
                self.solution.col_dual[j] /= scale.col[j];
            }
            for i in 0..m {
                self.solution.row_value[i] /= scale.row[i];
                self.solution.row_dual[i] *= scale.row[i];
            }
        }
        self.solution.value_valid = status.has_solution();
        self.solution.dual_valid = status.has_solution();

        // A fixing-induced infeasibility certifies nothing about the model.
        if had_infinite_cost && status == ModelStatus::Infeasible {
            status = ModelStatus::Unknown;
        }

        // KKT gate.
        if status == ModelStatus::Optimal || status == ModelStatus::Unknown {
            status = kkt::gate_status(
                &self.lp,
                &self.hessian,
                &self.solution,
                Some(&self.basis),
                &self.options,
                &mut self.info,
                status,
            );
        }

        self.info.simplex_iteration_count = self.engine.iteration_count;
        self.info.objective_function_value = if self.solution.value_valid {
            self.lp.objective_value(&self.solution.col_value)
        } else {
            0.0
        };
        self.info.primal_solution_status = if self.solution.value_valid {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        self.info.dual_solution_status = self.info.primal_solution_status;
        self.info.basis_validity = if self.basis.valid {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        self.info.solve_time = self.engine.deadline_elapsed();

        self.last_scale = scale;
        self.model_status = status;
        Ok(status)
    }

    /// Columns with costs at or past the infinite threshold are fixed at the
    /// bound that direction prefers, with the original data logged.
    fn fix_infinite_costs(&mut self, lp: &mut Lp) -> CoreResult<()> {
        for j in 0..lp.num_col {
            let c = lp.col_cost[j];
            if c.abs() < self.options.infinite_cost {
                continue;
            }
            self.mods_log.push(CostBoundMod {
                col: j,
                original_cost: c,
                original_lower: lp.col_lower[j],
                original_upper: lp.col_upper[j],
            });
            let minimize_wants_lower =
                (c > 0.0) == (lp.sense == lp::ObjSense::Minimize);
            let fix_at = if minimize_wants_lower {
                lp.col_lower[j]
            } else {
                lp.col_upper[j]
            };
            if !fix_at.is_finite() {
                return Err(CoreError::InvalidInput(format!(
                    "column {} has infinite cost and no bound to fix at",
                    j
                )));
            }
            lp.col_cost[j] = 0.0;
            lp.col_lower[j] = fix_at;
            lp.col_upper[j] = fix_at;
        }
        lp.has_infinite_cost = false;
        Ok(())
    }

    /// Reinstate a solution snapshot after driver-internal cleanup (the
    /// multi-objective driver restores the model and then puts the final
    /// stage's result back). Row arrays are truncated to the current shape.
    pub(crate) fn reinstate_result(
        &mut self,
        mut solution: Solution,
        mut info: SolveInfo,
        status: ModelStatus,
    ) {
        solution.row_value.truncate(self.lp.num_row);
        solution.row_dual.truncate(self.lp.num_row);
        self.solution = solution;
        self.info = info;
        self.model_status = status;
    }

    /// Invalidate derived state and notify the engine.
    fn invalidate(&mut self, action: LpAction) {
        self.model_status = ModelStatus::Notset;
        self.solution.clear();
        self.info.clear();
        self.engine.update_status(action);
        debug_assert_eq!(
            self.lp.has_infinite_cost,
            self.lp
                .compute_has_infinite_cost(self.options.infinite_cost)
        );
    }
}

/// Keep entries whose mapping is nonnegative, in mapped order.
fn compact<T: Clone>(data: &mut Vec<T>, mapping: &[i32]) {
    let mut out = Vec::with_capacity(data.len());
    for (ix, &m) in mapping.iter().enumerate() {
        if m >= 0 {
            out.push(data[ix].clone());
        }
    }
    *data = out;
}
