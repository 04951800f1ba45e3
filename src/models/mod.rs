//! Candidate distribution families.
//!
//! Families are evaluated through small, pure functions so that the fitting
//! code can stay generic over the candidate list.

pub mod family;

pub use family::*;
