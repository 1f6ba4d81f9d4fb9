//! End-to-end tests for the LP core: solve outcomes, certificates, state
//! preservation across mutations, and the multi-objective driver.

use pivot_core::{
    BasisStatus, Callback, CallbackData, IndexCollection, LinearObjective, Model, ModelStatus,
    ObjSense,
};

/// min x1 + x2  s.t.  x1 + 2 x2 <= 4, x1 + x2 >= 1, x >= 0.
fn simple_model() -> Model {
    let mut model = Model::new();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model
        .add_row(f64::NEG_INFINITY, 4.0, &[0, 1], &[1.0, 2.0])
        .unwrap();
    model.add_row(1.0, f64::INFINITY, &[0, 1], &[1.0, 1.0]).unwrap();
    model
}

#[test]
fn test_simple_lp_optimal() {
    let mut model = simple_model();
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    assert!((model.info().objective_function_value - 1.0).abs() < 1e-6);
    let sol = model.solution();
    assert!(sol.value_valid);
    assert!((sol.col_value[0] + sol.col_value[1] - 1.0).abs() < 1e-6);
    // Duals price the binding >= row at 1.
    assert!((sol.row_dual[1] - 1.0).abs() < 1e-6, "duals {:?}", sol.row_dual);
}

#[test]
fn test_maximize_sense() {
    let mut model = Model::new();
    model.add_col(3.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_col(2.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model
        .add_row(f64::NEG_INFINITY, 4.0, &[0, 1], &[1.0, 1.0])
        .unwrap();
    model.set_sense(ObjSense::Maximize);
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    assert!((model.info().objective_function_value - 12.0).abs() < 1e-6);
    assert!((model.solution().col_value[0] - 4.0).abs() < 1e-6);
}

#[test]
fn test_infeasible_with_dual_ray() {
    // x >= 1 and x <= 0 over one nonnegative column.
    let mut model = Model::new();
    model.add_col(0.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_row(1.0, f64::INFINITY, &[0], &[1.0]).unwrap();
    model.add_row(f64::NEG_INFINITY, 0.0, &[0], &[1.0]).unwrap();

    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Infeasible);
    assert!(model.has_dual_ray());
    let ray = model.get_dual_ray().unwrap();
    assert_eq!(ray.len(), 2);
    assert!(ray[0] * ray[1] < 0.0, "opposite signs expected: {:?}", ray);
}

#[test]
fn test_unbounded_with_primal_ray() {
    // min -x s.t. x >= 0 (no rows).
    let mut model = Model::new();
    model.add_col(-1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Unbounded);
    let ray = model.get_primal_ray().unwrap();
    assert_eq!(ray.len(), 1);
    assert!((ray[0] - 1.0).abs() < 1e-9, "ray {:?}", ray);
}

#[test]
fn test_boxed_rows_and_columns() {
    // min -x1 - 2 x2  s.t. 1 <= x1 + x2 <= 3, 0 <= x1 <= 2, 0 <= x2 <= 2.
    let mut model = Model::new();
    model.add_col(-1.0, 0.0, 2.0, &[], &[]).unwrap();
    model.add_col(-2.0, 0.0, 2.0, &[], &[]).unwrap();
    model.add_row(1.0, 3.0, &[0, 1], &[1.0, 1.0]).unwrap();
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    // Optimum: x2 = 2, x1 = 1, objective -5.
    assert!((model.info().objective_function_value + 5.0).abs() < 1e-6);
}

#[test]
fn test_equality_rows() {
    // min x1 + x2  s.t. x1 + x2 = 2, x1 - x2 = 0.
    let mut model = Model::new();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_row(2.0, 2.0, &[0, 1], &[1.0, 1.0]).unwrap();
    model.add_row(0.0, 0.0, &[0, 1], &[1.0, -1.0]).unwrap();
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    let sol = model.solution();
    assert!((sol.col_value[0] - 1.0).abs() < 1e-6);
    assert!((sol.col_value[1] - 1.0).abs() < 1e-6);
}

#[test]
fn test_basis_preserved_across_bound_change() {
    let mut model = simple_model();
    model.run().unwrap();
    assert!(model.basis().valid);
    let first_iters = model.info().simplex_iteration_count;

    // Relax an inactive bound: the optimal basis stays optimal.
    model
        .change_col_bounds(&IndexCollection::interval(0, 0), &[0.0], &[100.0])
        .unwrap();
    assert!(model.basis().valid, "bound change must keep the basis");
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    // Warm start: no more work than the cold solve, and usually none.
    assert!(
        model.info().simplex_iteration_count <= first_iters.max(1),
        "warm start took {} iterations vs cold {}",
        model.info().simplex_iteration_count,
        first_iters,
    );
    assert!((model.info().objective_function_value - 1.0).abs() < 1e-6);
}

#[test]
fn test_add_then_delete_rows_restores_lp() {
    let mut model = simple_model();
    let rows_before = model.num_row();
    let lower_before = model.lp().row_lower.clone();
    let upper_before = model.lp().row_upper.clone();
    let nnz_before = model.lp().a_matrix.num_nz();

    model.add_row(0.0, 5.0, &[0], &[1.0]).unwrap();
    model.add_row(-1.0, 1.0, &[1], &[2.0]).unwrap();
    assert_eq!(model.num_row(), rows_before + 2);

    model
        .delete_rows(&IndexCollection::interval(rows_before, rows_before + 1))
        .unwrap();
    assert_eq!(model.num_row(), rows_before);
    assert_eq!(model.lp().row_lower, lower_before);
    assert_eq!(model.lp().row_upper, upper_before);
    assert_eq!(model.lp().a_matrix.num_nz(), nnz_before);
}

#[test]
fn test_delete_basic_column_invalidates_basis() {
    let mut model = simple_model();
    model.run().unwrap();
    // Find a basic column (one must be basic at this optimum).
    let basic_col = (0..model.num_col())
        .find(|&j| model.basis().col_status[j] == BasisStatus::Basic)
        .expect("some structural is basic");
    model
        .delete_cols(&IndexCollection::interval(basic_col, basic_col))
        .unwrap();
    assert!(!model.basis().valid);
    // The model still solves from scratch.
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
}

#[test]
fn test_delete_mask_reports_mapping() {
    let mut model = simple_model();
    let mapping = model
        .delete_cols(&IndexCollection::Mask(vec![true, false]))
        .unwrap();
    assert_eq!(mapping, vec![-1, 0]);
    assert_eq!(model.num_col(), 1);
}

#[test]
fn test_change_coefficient_marks_alien_on_basic() {
    let mut model = simple_model();
    model.run().unwrap();
    let basic_col = (0..model.num_col())
        .find(|&j| model.basis().col_status[j] == BasisStatus::Basic)
        .unwrap();
    model.change_coefficient(0, basic_col, 3.5).unwrap();
    assert!(model.basis().alien);
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    assert_eq!(model.get_coefficient(0, basic_col).unwrap(), 3.5);
}

#[test]
fn test_user_bound_scale_reversible() {
    let mut model = simple_model();
    let lower = model.lp().col_lower.clone();
    let upper = model.lp().col_upper.clone();
    let row_upper = model.lp().row_upper.clone();

    model.set_user_bound_scale(3).unwrap();
    assert_eq!(model.lp().row_upper[0], row_upper[0] * 8.0);
    model.set_user_bound_scale(-2).unwrap();
    model.set_user_bound_scale(0).unwrap();

    assert_eq!(model.lp().col_lower, lower);
    assert_eq!(model.lp().col_upper, upper);
    assert_eq!(model.lp().row_upper, row_upper);
}

#[test]
fn test_user_scale_overflow_refused() {
    let mut model = Model::new();
    model.add_col(1.0, 0.0, 1e15, &[], &[]).unwrap();
    let err = model.set_user_bound_scale(30);
    assert!(err.is_err());
    // Rolled back: nothing changed.
    assert_eq!(model.lp().user_bound_scale, 0);
    assert_eq!(model.lp().col_upper[0], 1e15);

    model.change_col_cost(0, 1e15).unwrap();
    assert!(model.set_user_cost_scale(30).is_err());
    assert_eq!(model.lp().col_cost[0], 1e15);
}

#[test]
fn test_user_cost_scale_applies_to_changes() {
    let mut model = simple_model();
    model.set_user_cost_scale(1).unwrap();
    // Incoming costs are scaled by 2^1.
    model.change_col_cost(0, 5.0).unwrap();
    assert_eq!(model.lp().col_cost[0], 10.0);
}

#[test]
fn test_iteration_limit_status() {
    let mut model = simple_model();
    model.options.iteration_limit = 0;
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::IterationLimit);
    // Iteration counts are populated even on stop conditions.
    assert_eq!(model.info().simplex_iteration_count, 0);
}

#[test]
fn test_time_limit_status() {
    let mut model = simple_model();
    model.options.time_limit = Some(0.0);
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::TimeLimit);
}

struct StopImmediately;

impl Callback for StopImmediately {
    fn simplex_interrupt(&mut self, _data: &CallbackData) -> bool {
        true
    }
}

#[test]
fn test_callback_interrupt() {
    let mut model = simple_model();
    model.set_callback(Box::new(StopImmediately));
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Interrupted);
}

#[test]
fn test_lexicographic_two_objectives() {
    // Two minimization objectives with priorities 10 and 5 over
    // x1 + x2 >= 2, x in [0, 5]:
    // first minimize x1 (drives x1 to 0), then minimize -x2 is illegal to
    // verify here; use minimize x2 subject to keeping x1 optimal: x2 = 2.
    let mut model = Model::new();
    model.add_col(0.0, 0.0, 5.0, &[], &[]).unwrap();
    model.add_col(0.0, 0.0, 5.0, &[], &[]).unwrap();
    model.add_row(2.0, f64::INFINITY, &[0, 1], &[1.0, 1.0]).unwrap();

    let mut first = LinearObjective::new(vec![1.0, 0.0]);
    first.priority = 10;
    let mut second = LinearObjective::new(vec![0.0, 1.0]);
    second.priority = 5;
    model.pass_objectives(vec![first, second]).unwrap();

    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    let x = &model.solution().col_value;
    assert!(x[0].abs() < 1e-5, "x = {:?}", x);
    assert!((x[1] - 2.0).abs() < 1e-5, "x = {:?}", x);
}

#[test]
fn test_standard_form_relaxation_bound() {
    // A 0-1 knapsack-flavored model: the LP relaxation of the standard form
    // must bound the integer optimum from below (minimization).
    let mut model = Model::new();
    model.add_col(3.0, 0.0, 1.0, &[], &[]).unwrap();
    model.add_col(5.0, 0.0, 1.0, &[], &[]).unwrap();
    model.add_row(1.0, f64::INFINITY, &[0, 1], &[1.0, 1.0]).unwrap();
    model
        .change_col_integrality(
            &IndexCollection::interval(0, 1),
            &[pivot_core::VarKind::Integer, pivot_core::VarKind::Integer],
        )
        .unwrap();

    let sf = model.form_standard_form_lp().unwrap();

    // Rebuild the standard form as an explicit model and solve it.
    let mut relax = Model::new();
    for j in 0..sf.num_col {
        relax
            .add_col(sf.cost[j], 0.0, f64::INFINITY, &[], &[])
            .unwrap();
    }
    for i in 0..sf.num_row {
        relax.add_row(sf.rhs[i], sf.rhs[i], &[], &[]).unwrap();
    }
    for (j, col) in sf.a_matrix.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            relax.change_coefficient(i, j, v).unwrap();
        }
    }
    let status = relax.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    let relax_obj = relax.info().objective_function_value + sf.offset;

    // Integer optimum here is 3 (take the cheaper item).
    assert!(relax_obj <= 3.0 + 1e-6, "relaxation {} exceeds integer optimum", relax_obj);
    // And for this model the relaxation is exact.
    assert!((relax_obj - 3.0).abs() < 1e-5);
}

#[test]
fn test_degenerate_lp_terminates() {
    // Many redundant constraints through the origin invite degeneracy.
    let mut model = Model::new();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    for k in 0..6 {
        let w = 1.0 + 0.1 * k as f64;
        model
            .add_row(1.0, f64::INFINITY, &[0, 1], &[w, 2.0 - w])
            .unwrap();
    }
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    assert!(model.info().objective_function_value <= 1.0 + 1e-6);
}

#[test]
fn test_errors_leave_model_unchanged() {
    let mut model = simple_model();
    let cost_before = model.lp().col_cost.clone();

    // Unordered set is rejected before any write.
    let err = model.change_col_costs(&IndexCollection::Set(vec![1, 0]), &[9.0, 9.0]);
    assert!(err.is_err());
    assert_eq!(model.lp().col_cost, cost_before);

    // Crossed bounds are rejected before any write.
    let lower_before = model.lp().col_lower.clone();
    let err = model.change_col_bounds(&IndexCollection::interval(0, 0), &[2.0], &[1.0]);
    assert!(err.is_err());
    assert_eq!(model.lp().col_lower, lower_before);
}

#[test]
fn test_free_variable_lp() {
    // min x + y with y free and x + y = 3: y soaks up anything; optimum
    // pushes x to its lower bound 0, y = 3.
    let mut model = Model::new();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model
        .add_col(1.0, f64::NEG_INFINITY, f64::INFINITY, &[], &[])
        .unwrap();
    model.add_row(3.0, 3.0, &[0, 1], &[1.0, 1.0]).unwrap();
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    assert!((model.info().objective_function_value - 3.0).abs() < 1e-6);
}

#[test]
fn test_get_cols_and_rows() {
    let model = simple_model();
    let cols = model.get_cols(&IndexCollection::interval(0, 1)).unwrap();
    assert_eq!(cols.cost, vec![1.0, 1.0]);
    assert_eq!(cols.lower, vec![0.0, 0.0]);
    assert_eq!(cols.entries.len(), 4);

    let rows = model.get_rows(&IndexCollection::Set(vec![1])).unwrap();
    assert_eq!(rows.lower, vec![1.0]);
    assert_eq!(rows.entries, vec![(0, 0, 1.0), (0, 1, 1.0)]);
}

#[test]
fn test_fixed_variables() {
    let mut model = Model::new();
    model.add_col(1.0, 2.0, 2.0, &[], &[]).unwrap();
    model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
    model.add_row(3.0, f64::INFINITY, &[0, 1], &[1.0, 1.0]).unwrap();
    let status = model.run().unwrap();
    assert_eq!(status, ModelStatus::Optimal);
    let sol = model.solution();
    assert!((sol.col_value[0] - 2.0).abs() < 1e-9);
    assert!((sol.col_value[1] - 1.0).abs() < 1e-6);
}
