//! Numerical building blocks: density histograms, simplex minimization and
//! goodness-of-fit statistics.

pub mod gof;
pub mod histogram;
pub mod simplex;

pub use gof::*;
pub use histogram::*;
pub use simplex::*;
