//! Loadpulse - a synthetic workload driver.
//!
//! Loadpulse drives a processing-engine session with five load patterns
//! (normal, memory-intensive, slow-task, skewed, failure-prone) so the
//! engine's metrics show distinct, recognizable shapes.

pub mod cli;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod workload;

pub use error::{LoadpulseError, Result};
