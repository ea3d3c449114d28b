//! CLI command definitions using clap.
//!
//! The first positional argument selects the mode:
//! - continuous [minutes]: weighted-random workloads until the time is up
//! - normal, memory, slow, skewed, failure: one workload, then exit

use clap::Parser;
use std::path::PathBuf;

use crate::error::{LoadpulseError, Result};
use crate::workload::WorkloadKind;

/// Every accepted mode string, in help order.
pub const MODE_NAMES: [&str; 6] = ["continuous", "normal", "memory", "slow", "skewed", "failure"];

/// Loadpulse - synthetic workload driver for engine metrics
#[derive(Parser, Debug)]
#[command(name = "loadpulse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Seed for reproducible workload selection and data
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the continuous run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Run mode: continuous, normal, memory, slow, skewed, failure
    pub mode: Option<String>,

    /// Minutes to run in continuous mode
    pub duration_minutes: Option<u64>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Resolve the run mode, falling back to a continuous run of `default_minutes`.
    pub fn mode(&self, default_minutes: u64) -> Result<Mode> {
        Mode::parse(self.mode.as_deref(), self.duration_minutes, default_minutes)
    }
}

/// What the process does after the session is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Timed loop over randomly selected workloads
    Continuous { minutes: u64 },
    /// One workload with default parameters
    Once(WorkloadKind),
}

impl Mode {
    pub fn parse(mode: Option<&str>, duration_minutes: Option<u64>, default_minutes: u64) -> Result<Self> {
        match mode {
            None | Some("continuous") => Ok(Mode::Continuous {
                minutes: duration_minutes.unwrap_or(default_minutes),
            }),
            Some(name) => {
                let kind = WorkloadKind::from_mode_name(name).ok_or_else(|| LoadpulseError::UnknownMode(name.to_string()))?;
                if duration_minutes.is_some() {
                    log::warn!("Duration is ignored in {} mode", name);
                }
                Ok(Mode::Once(kind))
            }
        }
    }
}
