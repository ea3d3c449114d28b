//! Per-workload parameters.

use eyre::Result;
use serde::{Deserialize, Serialize};

use super::Bounds;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WorkloadsConfig {
    pub normal: NormalWorkloadConfig,
    pub memory: MemoryWorkloadConfig,
    pub slow: SlowWorkloadConfig,
    pub skewed: SkewedWorkloadConfig,
    pub failure: FailureWorkloadConfig,
}

impl WorkloadsConfig {
    pub fn validate(&self) -> Result<()> {
        self.normal.records_range.check("workloads.normal.records-range")?;
        self.memory.multiplier_range.check("workloads.memory.multiplier-range")?;
        self.slow.delay_ms.check("workloads.slow.delay-ms")?;
        check_fraction("workloads.skewed.hot-key-fraction", self.skewed.hot_key_fraction)?;
        check_fraction("workloads.failure.zero-divisor-fraction", self.failure.zero_divisor_fraction)?;
        if self.skewed.key_space == 0 {
            eyre::bail!("workloads.skewed.key-space must be > 0");
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        eyre::bail!("{} must be within [0, 1], got {}", name, value);
    }
    Ok(())
}

/// Grouped aggregation over uniformly distributed categories.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NormalWorkloadConfig {
    /// Record count for one-shot runs.
    pub records: u64,

    /// Record count range sampled in continuous runs.
    #[serde(rename = "records-range")]
    pub records_range: Bounds<u64>,
}

impl Default for NormalWorkloadConfig {
    fn default() -> Self {
        Self {
            records: 10_000,
            records_range: Bounds::new(5_000, 15_000),
        }
    }
}

/// Cached dataset sized as `base-records * multiplier`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MemoryWorkloadConfig {
    /// Multiplier for one-shot runs.
    #[serde(rename = "size-multiplier")]
    pub size_multiplier: u64,

    /// Multiplier range sampled in continuous runs.
    #[serde(rename = "multiplier-range")]
    pub multiplier_range: Bounds<u64>,

    #[serde(rename = "base-records")]
    pub base_records: u64,
}

impl Default for MemoryWorkloadConfig {
    fn default() -> Self {
        Self {
            size_multiplier: 5,
            multiplier_range: Bounds::new(2, 5),
            base_records: 100_000,
        }
    }
}

/// Per-row delayed function evaluation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SlowWorkloadConfig {
    pub rows: u64,

    /// Per-row delay range in milliseconds.
    #[serde(rename = "delay-ms")]
    pub delay_ms: Bounds<u64>,
}

impl Default for SlowWorkloadConfig {
    fn default() -> Self {
        Self {
            rows: 1_000,
            delay_ms: Bounds::new(100, 500),
        }
    }
}

/// Grouping over a key distribution dominated by one hot key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SkewedWorkloadConfig {
    pub rows: u64,

    /// Share of rows assigned to the hot key.
    #[serde(rename = "hot-key-fraction")]
    pub hot_key_fraction: f64,

    /// Remaining rows get keys in `0..key-space`.
    #[serde(rename = "key-space")]
    pub key_space: u64,
}

impl Default for SkewedWorkloadConfig {
    fn default() -> Self {
        Self {
            rows: 50_000,
            hot_key_fraction: 0.8,
            key_space: 100,
        }
    }
}

/// Division whose divisor is occasionally zero.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FailureWorkloadConfig {
    pub rows: u64,

    /// Share of rows whose divisor is zero.
    #[serde(rename = "zero-divisor-fraction")]
    pub zero_divisor_fraction: f64,
}

impl Default for FailureWorkloadConfig {
    fn default() -> Self {
        Self {
            rows: 10_000,
            zero_divisor_fraction: 0.01,
        }
    }
}
