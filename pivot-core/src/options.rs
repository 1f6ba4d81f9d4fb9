//! Solver options and tolerances.
//!
//! Options are read-only during a solve; changes take effect at the next
//! solve call.

/// Which simplex variant drives the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimplexStrategy {
    /// Pick dual simplex unless the start is dual infeasible beyond repair.
    #[default]
    Choose,
    /// Force the dual simplex.
    Dual,
    /// Force the primal simplex.
    Primal,
}

/// Edge-weight scheme for the dual simplex CHUZR step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeWeightStrategy {
    /// Dual steepest edge, with automatic fallback to Devex on cycling.
    #[default]
    SteepestEdge,
    /// Devex reference framework from the start.
    Devex,
    /// Unit weights (Dantzig pricing).
    Dantzig,
}

/// Solver options.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Bounds at or beyond this magnitude are treated as infinite.
    pub infinite_bound: f64,

    /// Costs at or beyond this magnitude are treated as infinite.
    pub infinite_cost: f64,

    /// Matrix entries below this magnitude are rejected (or dropped as zeros
    /// where the operation says so).
    pub small_matrix_value: f64,

    /// Matrix entries above this magnitude are rejected.
    pub large_matrix_value: f64,

    /// Primal feasibility tolerance.
    pub primal_feasibility_tolerance: f64,

    /// Dual feasibility tolerance.
    pub dual_feasibility_tolerance: f64,

    /// Minimum acceptable pivot magnitude in the ratio test.
    pub pivot_tolerance: f64,

    /// Relative disagreement allowed between the pivot from the tableau row
    /// and from the FTRANed column.
    pub pivot_agreement_tolerance: f64,

    /// Markowitz threshold for factor pivot admissibility.
    pub factor_pivot_threshold: f64,

    /// Basis-change budget between refactorizations.
    pub refactor_interval: usize,

    /// Maximum simplex iterations (all phases combined).
    pub iteration_limit: usize,

    /// Wall-clock limit in seconds (None = unlimited).
    pub time_limit: Option<f64>,

    /// Stop the dual simplex once the objective passes this bound.
    pub objective_bound: Option<f64>,

    /// Simplex variant selection.
    pub simplex_strategy: SimplexStrategy,

    /// Dual edge-weight scheme.
    pub edge_weight_strategy: EdgeWeightStrategy,

    /// Allow cost perturbation in the dual simplex.
    pub allow_cost_perturbation: bool,

    /// Allow bound perturbation in the dual simplex.
    pub allow_bound_perturbation: bool,

    /// Rebuilds without improvement before perturbation kicks in.
    pub stagnation_window: usize,

    /// Iterations a taboo row stays excluded from CHUZR.
    pub taboo_iterations: usize,

    /// KKT gate: absolute violations may exceed their tolerance by at most
    /// this factor before `Optimal` is downgraded.
    pub kkt_margin: f64,

    /// Density of BTRANed rows above which PRICE switches from row-wise to
    /// column-wise traversal.
    pub price_density_switch: f64,

    /// Equilibration passes applied to the solve copy (0 disables scaling).
    pub scaling_iterations: usize,

    /// Deterministic seed for perturbation and tie-breaking.
    pub random_seed: u64,

    /// Default elastic penalty for the IIS filter.
    pub iis_penalty: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            infinite_bound: 1e20,
            infinite_cost: 1e20,
            small_matrix_value: 1e-9,
            large_matrix_value: 1e15,
            primal_feasibility_tolerance: 1e-7,
            dual_feasibility_tolerance: 1e-7,
            pivot_tolerance: 1e-9,
            pivot_agreement_tolerance: 1e-8,
            factor_pivot_threshold: 0.1,
            refactor_interval: 100,
            iteration_limit: usize::MAX,
            time_limit: None,
            objective_bound: None,
            simplex_strategy: SimplexStrategy::default(),
            edge_weight_strategy: EdgeWeightStrategy::default(),
            allow_cost_perturbation: true,
            allow_bound_perturbation: true,
            stagnation_window: 5,
            taboo_iterations: 10,
            kkt_margin: 100.0,
            price_density_switch: 0.25,
            scaling_iterations: 5,
            random_seed: 0x5eed,
            iis_penalty: 1.0,
        }
    }
}

impl SolverOptions {
    /// Set the wall-clock limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the iteration limit.
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit;
        self
    }

    /// Force a simplex variant.
    pub fn with_strategy(mut self, strategy: SimplexStrategy) -> Self {
        self.simplex_strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerances_sane() {
        let opts = SolverOptions::default();
        assert!(opts.primal_feasibility_tolerance > 0.0);
        assert!(opts.dual_feasibility_tolerance > 0.0);
        assert!(opts.infinite_bound > opts.large_matrix_value);
        assert!(opts.factor_pivot_threshold > 0.0 && opts.factor_pivot_threshold <= 1.0);
    }

    #[test]
    fn test_builders() {
        let opts = SolverOptions::default()
            .with_time_limit(10.0)
            .with_iteration_limit(500)
            .with_strategy(SimplexStrategy::Primal);
        assert_eq!(opts.time_limit, Some(10.0));
        assert_eq!(opts.iteration_limit, 500);
        assert_eq!(opts.simplex_strategy, SimplexStrategy::Primal);
    }
}
