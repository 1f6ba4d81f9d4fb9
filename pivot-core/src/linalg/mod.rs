//! Sparse linear algebra: the constraint matrix, work vectors, and the basis
//! LU factorization.

pub mod factor;
pub mod matrix;
pub mod vector;

pub use factor::{FactorError, InvertResult, LuFactor, RefactorInfo};
pub use matrix::{MatrixFormat, SparseMatrix};
pub use vector::WorkVector;
