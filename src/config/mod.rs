//! Configuration system for Loadpulse.
//!
//! Loaded from YAML with kebab-case keys; every section falls back to defaults.
//! Search order:
//! 1. Explicit path (--config)
//! 2. .loadpulse.yml in current directory
//! 3. ~/.config/loadpulse/loadpulse.yml
//! 4. Defaults

pub use self::global::{Bounds, DriverConfig, GlobalConfig, MAX_PAUSE_SECS, SessionConfig};
pub use self::workloads::{
    FailureWorkloadConfig, MemoryWorkloadConfig, NormalWorkloadConfig, SkewedWorkloadConfig, SlowWorkloadConfig,
    WorkloadsConfig,
};

mod global;
mod workloads;

pub type Config = GlobalConfig;

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = ".loadpulse.yml";

/// Default metrics configuration handed to the engine.
pub const DEFAULT_METRICS_CONF: &str = "/opt/bitnami/spark/conf/metrics.properties";

/// Default application name reported to the engine.
pub const DEFAULT_APP_NAME: &str = "AnomalyDetectionApp";
