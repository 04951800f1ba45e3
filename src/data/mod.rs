//! Data derivation and generation.
//!
//! - series derivation from loaded sessions (`series`)
//! - synthetic session CSVs for demos and tests (`sample`)

pub mod sample;
pub mod series;

pub use sample::{SampleStats, write_sample};
pub use series::{DerivedSeries, SECONDS_PER_DAY, derive_series, seconds_since_midnight};
