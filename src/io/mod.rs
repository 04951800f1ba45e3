//! Input/output helpers.
//!
//! - CSV ingest + cleaning (`ingest`)
//! - fit report JSON (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
