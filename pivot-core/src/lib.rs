//! pivot-core: a dual revised simplex core for linear and convex quadratic
//! optimization.
//!
//! The crate provides:
//!
//! - **Model state**: an LP in bounded form with optional integrality and a
//!   triangular Hessian, user power-of-two scaling, and a mutation API that
//!   preserves simplex state where the change allows it
//! - **Simplex engine**: dual revised simplex (phases 1 and 2) with dual
//!   steepest-edge pricing, a two-stage bounded ratio test, perturbation and
//!   cycling control, plus a primal variant for dual-infeasible starts
//! - **Basis-factor NLA**: an eta-file LU of the basis with product-form
//!   updates and rank-deficiency repair
//! - **Certificates**: dual/primal rays from termination records and an
//!   elasticity-filter IIS
//! - **Diagnostics**: a KKT checker that gates the `Optimal` status, and a
//!   multi-objective driver (blended and lexicographic)
//!
//! # Example
//!
//! ```ignore
//! use pivot_core::{Model, ModelStatus};
//!
//! // min x1 + x2  s.t.  x1 + 2 x2 <= 4,  x1 + x2 >= 1,  x >= 0
//! let mut model = Model::new();
//! model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
//! model.add_col(1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
//! model.add_row(f64::NEG_INFINITY, 4.0, &[0, 1], &[1.0, 2.0]).unwrap();
//! model.add_row(1.0, f64::INFINITY, &[0, 1], &[1.0, 1.0]).unwrap();
//!
//! let status = model.run().unwrap();
//! assert_eq!(status, ModelStatus::Optimal);
//! println!("objective = {}", model.info().objective_function_value);
//! ```

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // simplex kernels carry many operands

pub mod callback;
pub mod iis;
pub mod kkt;
pub mod linalg;
pub mod model;
pub mod multiobj;
pub mod options;
pub mod rays;
pub mod simplex;
pub mod standard_form;
pub mod status;
pub mod util;

pub use callback::{Callback, CallbackData};
pub use iis::{Iis, IisOptions, IisStrategy};
pub use model::hessian::Hessian;
pub use model::index_set::IndexCollection;
pub use model::lp::{Lp, ObjSense, VarKind};
pub use model::{Model, Solution};
pub use multiobj::LinearObjective;
pub use options::{EdgeWeightStrategy, SimplexStrategy, SolverOptions};
pub use simplex::basis::{Basis, BasisStatus};
pub use status::{CoreError, CoreResult, LpAction, ModelStatus, SolveInfo};
