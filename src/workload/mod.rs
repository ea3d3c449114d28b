//! Workload kinds and the generators that produce them.
//!
//! This module provides:
//! - WorkloadKind: the five load patterns and their selection weights
//! - WorkloadParams: kind-specific parameters (defaults or randomized)
//! - WorkloadRunner: the seam the driver dispatches through
//! - Generators: the engine-backed implementation of every kind

mod generators;
mod select;

use std::fmt;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::WorkloadsConfig;
use crate::engine::Frame;
use crate::error::Result;

pub use generators::Generators;
pub use select::WorkloadSelector;

/// A synthetic load pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Normal,
    MemoryIntensive,
    SlowTask,
    SkewedData,
    FailureProne,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 5] = [
        WorkloadKind::Normal,
        WorkloadKind::MemoryIntensive,
        WorkloadKind::SlowTask,
        WorkloadKind::SkewedData,
        WorkloadKind::FailureProne,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorkloadKind::Normal => "normal",
            WorkloadKind::MemoryIntensive => "memory_intensive",
            WorkloadKind::SlowTask => "slow_task",
            WorkloadKind::SkewedData => "skewed_data",
            WorkloadKind::FailureProne => "failure_prone",
        }
    }

    /// Name used on the command line for one-shot runs.
    pub fn mode_name(&self) -> &'static str {
        match self {
            WorkloadKind::Normal => "normal",
            WorkloadKind::MemoryIntensive => "memory",
            WorkloadKind::SlowTask => "slow",
            WorkloadKind::SkewedData => "skewed",
            WorkloadKind::FailureProne => "failure",
        }
    }

    pub fn from_mode_name(mode: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.mode_name() == mode)
    }

    /// Relative selection weight in continuous runs.
    pub fn weight(&self) -> f64 {
        match self {
            WorkloadKind::Normal => 0.6,
            WorkloadKind::MemoryIntensive => 0.2,
            WorkloadKind::SlowTask => 0.1,
            WorkloadKind::SkewedData => 0.05,
            WorkloadKind::FailureProne => 0.05,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for one workload invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadParams {
    Normal { records: u64 },
    MemoryIntensive { size_multiplier: u64 },
    SlowTask,
    SkewedData,
    FailureProne,
}

impl WorkloadParams {
    pub fn kind(&self) -> WorkloadKind {
        match self {
            WorkloadParams::Normal { .. } => WorkloadKind::Normal,
            WorkloadParams::MemoryIntensive { .. } => WorkloadKind::MemoryIntensive,
            WorkloadParams::SlowTask => WorkloadKind::SlowTask,
            WorkloadParams::SkewedData => WorkloadKind::SkewedData,
            WorkloadParams::FailureProne => WorkloadKind::FailureProne,
        }
    }

    /// Fixed parameters used by one-shot runs.
    pub fn defaults(kind: WorkloadKind, config: &WorkloadsConfig) -> Self {
        match kind {
            WorkloadKind::Normal => WorkloadParams::Normal {
                records: config.normal.records,
            },
            WorkloadKind::MemoryIntensive => WorkloadParams::MemoryIntensive {
                size_multiplier: config.memory.size_multiplier,
            },
            WorkloadKind::SlowTask => WorkloadParams::SlowTask,
            WorkloadKind::SkewedData => WorkloadParams::SkewedData,
            WorkloadKind::FailureProne => WorkloadParams::FailureProne,
        }
    }

    /// Randomized parameters used by continuous runs.
    pub fn sample<R: Rng + ?Sized>(kind: WorkloadKind, config: &WorkloadsConfig, rng: &mut R) -> Self {
        match kind {
            WorkloadKind::Normal => {
                let range = config.normal.records_range;
                WorkloadParams::Normal {
                    records: rng.random_range(range.min..=range.max.max(range.min)),
                }
            }
            WorkloadKind::MemoryIntensive => {
                let range = config.memory.multiplier_range;
                WorkloadParams::MemoryIntensive {
                    size_multiplier: rng.random_range(range.min..=range.max.max(range.min)),
                }
            }
            other => Self::defaults(other, config),
        }
    }
}

impl fmt::Display for WorkloadParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadParams::Normal { records } => write!(f, "normal (records={})", records),
            WorkloadParams::MemoryIntensive { size_multiplier } => {
                write!(f, "memory_intensive (multiplier={})", size_multiplier)
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// What a workload invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadReport {
    pub kind: WorkloadKind,
    /// Rows generated and pushed through the engine.
    pub rows_processed: u64,
    /// Result table brought back to the driver.
    pub result: Option<Frame>,
    /// Set when the workload hit a failure it provokes on purpose.
    pub expected_error: Option<String>,
}

impl WorkloadReport {
    pub fn new(kind: WorkloadKind, rows_processed: u64) -> Self {
        Self {
            kind,
            rows_processed,
            result: None,
            expected_error: None,
        }
    }

    pub fn with_result(mut self, result: Frame) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_expected_error(mut self, message: impl Into<String>) -> Self {
        self.expected_error = Some(message.into());
        self
    }
}

/// Runs one workload invocation to completion.
#[async_trait]
pub trait WorkloadRunner: Send + Sync {
    async fn run(&self, params: WorkloadParams) -> Result<WorkloadReport>;
}
