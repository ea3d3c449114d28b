//! In-process processing engine.
//!
//! Provides the session handle every workload runs against:
//! - Session: long-lived handle with stats, cache accounting and a one-shot stop
//! - Frame: eagerly materialized rows with named columns
//! - Aggregates (sum/avg/max/count) globally or per group key

mod frame;
mod memory;
mod session;
mod show;

use thiserror::Error;

pub use frame::{Agg, AggFunc, Frame, GroupedFrame, Value};
pub use memory::parse_memory_size;
pub use session::{CacheHandle, Session, SessionStats};

/// Errors raised by the engine while building or evaluating frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The session was stopped before the operation ran
    #[error("Session has been stopped")]
    SessionStopped,

    /// Frame has no column with this name
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Column holds values an operation cannot work with
    #[error("Type mismatch in column {column}: expected {expected}")]
    TypeMismatch { column: String, expected: &'static str },

    /// Division with a zero divisor
    #[error("Division by zero")]
    DivideByZero,

    /// Reservation would exceed the memory budget
    #[error("Out of memory: requested {requested} bytes, {available} bytes available")]
    OutOfMemory { requested: u64, available: u64 },

    /// Memory size string could not be parsed
    #[error("Invalid memory size: {0}")]
    InvalidMemorySize(String),

    /// Log level string could not be parsed
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}
