//! Naval engagement simulator: ship stats from a CSV table, fleets from a scenario
//! document, deterministic round-by-round resolution, and an outcome report.

pub mod cli;
pub mod combat;
pub mod data;
pub mod error;
pub mod parallel;

pub use error::{Error, Result};
