//! Driver module - dispatches workloads to a runner.
//!
//! This module provides:
//! - ContinuousDriver: timed loop over weighted-random workloads
//! - run_once: a single dispatch with default parameters
//! - Clock: time source, real or virtual

mod clock;
mod continuous;

pub use clock::{Clock, ManualClock, SystemClock};
pub use continuous::{ContinuousDriver, RunSummary};

use crate::config::WorkloadsConfig;
use crate::error::Result;
use crate::workload::{WorkloadKind, WorkloadParams, WorkloadReport, WorkloadRunner};

/// Run one workload of `kind` with its default parameters. Errors propagate.
pub async fn run_once<W>(runner: &W, kind: WorkloadKind, config: &WorkloadsConfig) -> Result<WorkloadReport>
where
    W: WorkloadRunner + ?Sized,
{
    let params = WorkloadParams::defaults(kind, config);
    log::info!("Running single workload: {}", params);
    runner.run(params).await
}
