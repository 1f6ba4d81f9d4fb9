//! Model status, solve diagnostics, and error types.

use std::fmt;

use thiserror::Error;

/// Outcome of a solve, or the reason it stopped.
///
/// Stop conditions (iteration/time limits, objective bound, interrupt) are
/// statuses, not errors: the call returns `Ok` and the status records why it
/// stopped. Only numerical failure is reported through [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelStatus {
    /// No solve has been attempted since the model last changed.
    #[default]
    Notset,

    /// Optimal solution found and accepted by the KKT check.
    Optimal,

    /// Primal infeasible (dual ray available).
    Infeasible,

    /// Primal unbounded (primal ray available).
    Unbounded,

    /// Dual infeasibility was proven but primal feasibility was not resolved.
    UnboundedOrInfeasible,

    /// Iteration limit reached.
    IterationLimit,

    /// Wall-clock time limit reached.
    TimeLimit,

    /// Objective passed the configured bound.
    ObjectiveBound,

    /// A user callback requested termination.
    Interrupted,

    /// The solver failed numerically.
    SolveError,

    /// A solution exists but did not pass the KKT gate, or the solve was
    /// abandoned in a state that certifies nothing.
    Unknown,
}

impl ModelStatus {
    /// True for the statuses that carry a usable primal-dual solution.
    pub fn has_solution(self) -> bool {
        matches!(self, ModelStatus::Optimal | ModelStatus::Unknown)
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelStatus::Notset => "Not set",
            ModelStatus::Optimal => "Optimal",
            ModelStatus::Infeasible => "Infeasible",
            ModelStatus::Unbounded => "Unbounded",
            ModelStatus::UnboundedOrInfeasible => "Unbounded or infeasible",
            ModelStatus::IterationLimit => "Iteration limit",
            ModelStatus::TimeLimit => "Time limit",
            ModelStatus::ObjectiveBound => "Objective bound",
            ModelStatus::Interrupted => "Interrupted",
            ModelStatus::SolveError => "Solve error",
            ModelStatus::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced by the model API and the solver.
#[derive(Error, Debug)]
pub enum CoreError {
    /// API called with inconsistent shapes, bad indices, or unordered sets.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Matrix entries outside the acceptable magnitude range.
    #[error("invalid matrix value: {0}")]
    InvalidMatrixValue(String),

    /// The requested operation needs state that is not present.
    #[error("missing state: {0}")]
    MissingState(String),

    /// Basis factorization failed beyond recovery.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// User scaling would overflow the infinite bound or cost threshold.
    #[error("user scaling rejected: {0}")]
    ScalingOverflow(String),

    /// The model has a nonempty Hessian and no quadratic subsolver is wired.
    #[error("quadratic objective requires an external quadratic solver")]
    UnsupportedQuadratic,

    /// Multi-objective configuration is illegal.
    #[error("invalid objective set: {0}")]
    InvalidObjectives(String),
}

/// Result alias for the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Action token handed to the simplex engine after a model mutation.
///
/// The engine uses the token to decide how much derived state survives: new
/// costs keep the factor and primal values; new bounds keep the factor and the
/// duals; structural changes collapse everything back to the basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpAction {
    NewCosts,
    NewBounds,
    NewBasis,
    NewCols,
    NewRows,
    DelCols,
    DelRows,
    ScaledCol,
    ScaledRow,
    NewIntegrality,
    /// The whole LP was replaced.
    NewLp,
}

/// Validity marker for solution and basis read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Invalid,
    Valid,
}

/// Diagnostics populated by every solve.
///
/// Iteration counts are always valid after a solve returns; objective and
/// infeasibility records are valid when a solution is present.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    /// Simplex iterations across all phases of the last solve.
    pub simplex_iteration_count: usize,

    /// Objective value of the reported solution (sense applied, offset included).
    pub objective_function_value: f64,

    /// Validity of the primal solution read-back.
    pub primal_solution_status: Validity,

    /// Validity of the dual solution read-back.
    pub dual_solution_status: Validity,

    /// Validity of the basis read-back.
    pub basis_validity: Validity,

    /// Number of primal infeasibilities at termination.
    pub num_primal_infeasibilities: usize,

    /// Largest primal infeasibility.
    pub max_primal_infeasibility: f64,

    /// Sum of primal infeasibilities.
    pub sum_primal_infeasibilities: f64,

    /// Number of dual infeasibilities at termination.
    pub num_dual_infeasibilities: usize,

    /// Largest dual infeasibility.
    pub max_dual_infeasibility: f64,

    /// Sum of dual infeasibilities.
    pub sum_dual_infeasibilities: f64,

    /// Primal residual ‖Ax − activity‖∞ from the KKT check.
    pub primal_residual: f64,

    /// Dual residual ‖Aᵀy + z − c‖∞ from the KKT check.
    pub dual_residual: f64,

    /// |primal objective − dual objective| from the KKT check.
    pub objective_error: f64,

    /// Wall-clock seconds spent in the last solve.
    pub solve_time: f64,
}

impl SolveInfo {
    /// Reset everything except nothing: a model mutation invalidates all of it.
    pub fn clear(&mut self) {
        *self = SolveInfo::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(ModelStatus::Optimal.to_string(), "Optimal");
        assert_eq!(
            ModelStatus::UnboundedOrInfeasible.to_string(),
            "Unbounded or infeasible"
        );
    }

    #[test]
    fn test_has_solution() {
        assert!(ModelStatus::Optimal.has_solution());
        assert!(ModelStatus::Unknown.has_solution());
        assert!(!ModelStatus::Infeasible.has_solution());
        assert!(!ModelStatus::Notset.has_solution());
    }
}
