//! pivot-io: model file readers for the pivot optimization suite.
//!
//! Currently one reader: free-format MPS (with the QPS quadratic extension),
//! gzip-transparent. The reader consumes text and produces the
//! `pivot-core` data model; it performs no solving.

#![warn(clippy::all)]

pub mod mps;

pub use mps::{read_mps, read_mps_from, MpsError, MpsModel, MpsResult, MpsWarnings};
