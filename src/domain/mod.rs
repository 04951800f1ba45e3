//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - candidate families and ranking metrics (`Family`, `Metric`)
//! - raw charging-session records (`ChargingSession`)
//! - fit outputs (`FitResult`, `SeriesFit`, etc.)
//! - run configuration (`FitConfig`, `SampleConfig`)

pub mod types;

pub use types::*;
