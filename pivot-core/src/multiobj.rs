//! Multi-objective driver: blended and lexicographic solves on top of the
//! core engine.
//!
//! Blended mode folds all objectives into one weighted cost vector and
//! solves once. Lexicographic mode solves by descending priority, pinning
//! each stage's optimum with a constraint before the next stage. Repeated
//! priorities are rejected before any solve.

use log::debug;

use crate::model::index_set::IndexCollection;
use crate::model::lp::ObjSense;
use crate::model::Model;
use crate::status::{CoreError, CoreResult, ModelStatus};

/// One linear objective of a multi-objective model.
#[derive(Debug, Clone)]
pub struct LinearObjective {
    /// Blending weight; in lexicographic mode its sign flips the direction
    /// of this stage relative to the model sense.
    pub weight: f64,
    pub offset: f64,
    /// One coefficient per column.
    pub coefficients: Vec<f64>,
    /// Higher priority optimizes earlier (lexicographic mode).
    pub priority: i32,
    /// Absolute slack allowed when pinning this stage's optimum.
    pub abs_tolerance: f64,
    /// Relative slack allowed when pinning this stage's optimum.
    pub rel_tolerance: f64,
}

impl LinearObjective {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self {
            weight: 1.0,
            offset: 0.0,
            coefficients,
            priority: 0,
            abs_tolerance: 1e-9,
            rel_tolerance: 1e-9,
        }
    }
}

/// Solve `model` under the given objectives. Blended when every priority is
/// equal; lexicographic otherwise.
pub fn solve_multiobjective(
    model: &mut Model,
    objectives: &[LinearObjective],
) -> CoreResult<ModelStatus> {
    if objectives.is_empty() || model.num_col() == 0 {
        return model.run_single();
    }
    if !model.hessian().is_empty() && objectives.len() > 1 {
        return Err(CoreError::InvalidObjectives(
            "a quadratic model permits only a single linear objective".to_string(),
        ));
    }

    let lexicographic = objectives
        .iter()
        .any(|o| o.priority != objectives[0].priority);
    if lexicographic {
        let mut priorities: Vec<i32> = objectives.iter().map(|o| o.priority).collect();
        priorities.sort_unstable();
        if priorities.windows(2).any(|w| w[0] == w[1]) {
            return Err(CoreError::InvalidObjectives(
                "repeated objective priorities".to_string(),
            ));
        }
        solve_lexicographic(model, objectives)
    } else {
        solve_blended(model, objectives)
    }
}

fn solve_blended(model: &mut Model, objectives: &[LinearObjective]) -> CoreResult<ModelStatus> {
    let n = model.num_col();
    let saved_cost = model.lp().col_cost.clone();
    let saved_offset = model.lp().offset;

    let mut cost = vec![0.0; n];
    let mut offset = 0.0;
    for obj in objectives {
        for j in 0..n {
            cost[j] += obj.weight * obj.coefficients[j];
        }
        offset += obj.weight * obj.offset;
    }
    model.set_costs_raw(&cost, offset)?;

    let status = model.run_single();

    let snapshot = (
        model.solution().clone(),
        model.info().clone(),
        status.as_ref().ok().copied().unwrap_or(ModelStatus::Notset),
    );
    model.set_costs_raw(&saved_cost, saved_offset)?;
    if status.is_ok() {
        model.reinstate_result(snapshot.0, snapshot.1, snapshot.2);
    }
    status
}

fn solve_lexicographic(
    model: &mut Model,
    objectives: &[LinearObjective],
) -> CoreResult<ModelStatus> {
    let n = model.num_col();
    let original_rows = model.num_row();
    let saved_cost = model.lp().col_cost.clone();
    let saved_offset = model.lp().offset;
    let sense = model.lp().sense;

    let mut order: Vec<usize> = (0..objectives.len()).collect();
    order.sort_by(|&a, &b| objectives[b].priority.cmp(&objectives[a].priority));

    let mut final_status = ModelStatus::Notset;
    let mut failed: Option<CoreError> = None;

    for (stage, &k) in order.iter().enumerate() {
        let obj = &objectives[k];
        // Stage cost: weight applied so a negative weight flips direction.
        let cost: Vec<f64> = obj.coefficients.iter().map(|&c| obj.weight * c).collect();
        if let Err(e) = model.set_costs_raw(&cost, obj.weight * obj.offset) {
            failed = Some(e);
            break;
        }

        match model.run_single() {
            Ok(ModelStatus::Optimal) => {}
            Ok(status) => {
                final_status = status;
                debug!("lexicographic stage {} stopped with {}", stage, status);
                break;
            }
            Err(e) => {
                failed = Some(e);
                break;
            }
        }
        final_status = ModelStatus::Optimal;

        if stage + 1 < order.len() {
            // Pin this stage's optimum within its tolerances.
            let z = model.info().objective_function_value;
            let slack = obj.abs_tolerance.max(obj.rel_tolerance * z.abs());
            let (lower, upper) = match sense {
                ObjSense::Minimize => (f64::NEG_INFINITY, z + slack),
                ObjSense::Maximize => (z - slack, f64::INFINITY),
            };
            let indices: Vec<usize> = (0..n).filter(|&j| cost[j] != 0.0).collect();
            let values: Vec<f64> = indices.iter().map(|&j| cost[j]).collect();
            // Pinning constrains the weighted cost row, net of the offset.
            let off = obj.weight * obj.offset;
            if let Err(e) = model.add_row(
                if lower.is_finite() { lower - off } else { lower },
                if upper.is_finite() { upper - off } else { upper },
                &indices,
                &values,
            ) {
                failed = Some(e);
                break;
            }
        }
    }

    // Drop pinning rows and restore the original objective on every path,
    // then put the final stage's result back.
    let snapshot = (
        model.solution().clone(),
        model.info().clone(),
        final_status,
    );
    if model.num_row() > original_rows {
        model.delete_rows(&IndexCollection::interval(
            original_rows,
            model.num_row() - 1,
        ))?;
    }
    model.set_costs_raw(&saved_cost, saved_offset)?;

    match failed {
        Some(e) => Err(e),
        None => {
            model.reinstate_result(snapshot.0, snapshot.1, snapshot.2);
            Ok(final_status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    /// Two variables on a budget row; the first objective prefers x0, the
    /// second prefers x1.
    fn two_var_model() -> Model {
        let mut model = Model::new();
        model.add_col(0.0, 0.0, 10.0, &[], &[]).unwrap();
        model.add_col(0.0, 0.0, 10.0, &[], &[]).unwrap();
        model
            .add_row(f64::NEG_INFINITY, 10.0, &[0, 1], &[1.0, 1.0])
            .unwrap();
        model
    }

    #[test]
    fn test_duplicate_priorities_rejected() {
        let mut model = two_var_model();
        let mut a = LinearObjective::new(vec![1.0, 0.0]);
        a.priority = 5;
        let mut b = LinearObjective::new(vec![0.0, 1.0]);
        b.priority = 5;
        let mut c = LinearObjective::new(vec![1.0, 1.0]);
        c.priority = 3;
        model.pass_objectives(vec![a, b, c]).unwrap();
        let err = model.run();
        assert!(matches!(err, Err(CoreError::InvalidObjectives(_))));
    }

    #[test]
    fn test_blended_single_solve() {
        let mut model = two_var_model();
        // Blend of -x0 and -x1 with equal priority: minimize -(x0 + x1).
        let a = LinearObjective::new(vec![-1.0, 0.0]);
        let b = LinearObjective::new(vec![0.0, -1.0]);
        model.pass_objectives(vec![a, b]).unwrap();
        let status = model.run().unwrap();
        assert_eq!(status, ModelStatus::Optimal);
        let sum = model.solution().col_value[0] + model.solution().col_value[1];
        assert!((sum - 10.0).abs() < 1e-6);
        // Original zero objective restored.
        assert_eq!(model.lp().col_cost, vec![0.0, 0.0]);
    }

    #[test]
    fn test_lexicographic_order() {
        let mut model = two_var_model();
        // Priority 10: minimize -x0 (drive x0 to 10).
        // Priority 5: minimize -x1 (then x1 can only reach 0).
        let mut a = LinearObjective::new(vec![-1.0, 0.0]);
        a.priority = 10;
        let mut b = LinearObjective::new(vec![0.0, -1.0]);
        b.priority = 5;
        model.pass_objectives(vec![a, b]).unwrap();
        let status = model.run().unwrap();
        assert_eq!(status, ModelStatus::Optimal);
        let x = &model.solution().col_value;
        assert!((x[0] - 10.0).abs() < 1e-5, "x = {:?}", x);
        assert!(x[1].abs() < 1e-5, "x = {:?}", x);
        // Pinning rows removed.
        assert_eq!(model.num_row(), 1);
    }
}
