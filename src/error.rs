//! Error types for Loadpulse
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::engine::EngineError;

/// All error types that can occur in Loadpulse
#[derive(Debug, Error)]
pub enum LoadpulseError {
    /// Mode string on the command line is not one we know
    #[error("Unknown mode: {0}\nAvailable modes: {modes}", modes = crate::cli::MODE_NAMES.join(", "))]
    UnknownMode(String),

    /// Failure inside the processing engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Loadpulse operations
pub type Result<T> = std::result::Result<T, LoadpulseError>;
