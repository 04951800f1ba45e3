//! Reporting: ranked-fit tables for the terminal.

pub mod format;

pub use format::*;
