//! Distribution fitting orchestration.
//!
//! Responsibilities:
//!
//! - estimate parameters for each candidate family (parallel)
//! - score each fit against the series' density histogram
//! - rank families by the chosen goodness-of-fit metric

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
