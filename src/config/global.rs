//! Global configuration.
//!
//! Loaded from ~/.config/loadpulse/loadpulse.yml or .loadpulse.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use super::WorkloadsConfig;
use crate::engine::parse_memory_size;

/// Longest pause the driver will wait between iterations.
pub const MAX_PAUSE_SECS: f64 = 3600.0;

/// Global configuration for Loadpulse.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Engine session settings.
    pub session: SessionConfig,

    /// Continuous driver settings.
    pub driver: DriverConfig,

    /// Per-workload parameters.
    pub workloads: WorkloadsConfig,
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .loadpulse.yml in current directory
    /// 3. ~/.config/loadpulse/loadpulse.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project config
        let project_config = PathBuf::from(super::PROJECT_CONFIG_FILE);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from {}", super::PROJECT_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", super::PROJECT_CONFIG_FILE, e);
                }
            }
        }

        // Try user config
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("loadpulse").join("loadpulse.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.session.shuffle_partitions == 0 {
            eyre::bail!("session.shuffle-partitions must be > 0");
        }
        parse_memory_size(&self.session.executor_memory).context("session.executor-memory")?;
        parse_memory_size(&self.session.driver_memory).context("session.driver-memory")?;
        let pause = self.driver.pause_secs;
        if !pause.min.is_finite() || !pause.max.is_finite() {
            eyre::bail!("driver.pause-secs must be finite numbers");
        }
        pause.check("driver.pause-secs")?;
        if pause.min < 0.0 {
            eyre::bail!("driver.pause-secs.min must be >= 0");
        }
        if pause.max > MAX_PAUSE_SECS {
            eyre::bail!("driver.pause-secs.max must be <= {}", MAX_PAUSE_SECS);
        }
        if self.driver.max_iterations == Some(0) {
            eyre::bail!("driver.max-iterations must be > 0");
        }
        self.workloads.validate()
    }
}

/// Engine session settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Application name reported to the engine.
    #[serde(rename = "app-name")]
    pub app_name: String,

    /// Metrics configuration file the engine reports through.
    #[serde(rename = "metrics-conf")]
    pub metrics_conf: PathBuf,

    /// Partitions used for shuffles and partition-parallel work.
    #[serde(rename = "shuffle-partitions")]
    pub shuffle_partitions: usize,

    /// Executor memory budget (e.g. 1g, 512m). Bounds cached data.
    #[serde(rename = "executor-memory")]
    pub executor_memory: String,

    /// Driver memory budget. Bounds results collected to the driver.
    #[serde(rename = "driver-memory")]
    pub driver_memory: String,

    /// Engine log level (ALL, DEBUG, INFO, WARN, ERROR, FATAL, OFF).
    #[serde(rename = "log-level")]
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: super::DEFAULT_APP_NAME.to_string(),
            metrics_conf: PathBuf::from(super::DEFAULT_METRICS_CONF),
            shuffle_partitions: 4,
            executor_memory: "1g".to_string(),
            driver_memory: "1g".to_string(),
            log_level: "WARN".to_string(),
        }
    }
}

/// Continuous driver settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Duration of a continuous run when none is given.
    #[serde(rename = "default-duration-minutes")]
    pub default_duration_minutes: u64,

    /// Pause between iterations, drawn uniformly in seconds.
    #[serde(rename = "pause-secs")]
    pub pause_secs: Bounds<f64>,

    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,

    /// Stop a continuous run after this many iterations.
    #[serde(rename = "max-iterations")]
    pub max_iterations: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 5,
            pause_secs: Bounds::new(10.0, 30.0),
            seed: None,
            max_iterations: None,
        }
    }
}

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Display + Copy> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Fail when the range is inverted.
    pub fn check(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            eyre::bail!("{}.min ({}) must be <= {}.max ({})", name, self.min, name, self.max);
        }
        Ok(())
    }
}
