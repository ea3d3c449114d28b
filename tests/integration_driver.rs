//! Driver integration tests
//!
//! Runs the real generators against a local session, with virtual time for
//! the continuous loop.

use std::sync::Arc;
use std::time::Duration;

use loadpulse::cli::Mode;
use loadpulse::config::{Bounds, GlobalConfig, SessionConfig, WorkloadsConfig};
use loadpulse::driver::{ContinuousDriver, ManualClock, run_once};
use loadpulse::engine::{Session, Value};
use loadpulse::error::{LoadpulseError, Result};
use loadpulse::workload::{Generators, WorkloadKind, WorkloadSelector};

fn small_workloads() -> WorkloadsConfig {
    let mut config = WorkloadsConfig::default();
    config.normal.records = 10;
    config.normal.records_range = Bounds::new(10, 20);
    config.memory.base_records = 50;
    config.memory.multiplier_range = Bounds::new(2, 3);
    config.slow.rows = 8;
    config.slow.delay_ms = Bounds::new(0, 1);
    config.skewed.rows = 200;
    config.failure.rows = 50;
    config
}

fn config_with(session: SessionConfig) -> GlobalConfig {
    let mut config = GlobalConfig {
        session,
        workloads: small_workloads(),
        ..Default::default()
    };
    config.driver.pause_secs = Bounds::new(10.0, 30.0);
    config.driver.seed = Some(17);
    config
}

/// Scenario: one-shot normal mode with 10 records yields a grouped result
#[tokio::test]
async fn test_one_shot_normal_groups_by_category() -> Result<()> {
    let config = config_with(SessionConfig::default());
    let session = Arc::new(Session::start(config.session.clone())?);
    let generators = Generators::new(Arc::clone(&session), config.workloads.clone());

    let mode = Mode::parse(Some("normal"), None, config.driver.default_duration_minutes)?;
    let kind = match mode {
        Mode::Once(kind) => kind,
        other => panic!("expected one-shot mode, got {:?}", other),
    };

    let report = run_once(&generators, kind, &config.workloads).await?;
    assert_eq!(report.rows_processed, 10);
    let result = report.result.expect("normal workload returns a table");
    assert!(!result.is_empty());
    assert_eq!(result.columns()[0], "category");
    assert!(result.rows().iter().all(|row| matches!(row[0], Value::Long(_))));

    assert!(session.stop());
    Ok(())
}

/// Every one-shot mode completes without an unhandled error
#[tokio::test]
async fn test_every_one_shot_mode_completes() -> Result<()> {
    let config = config_with(SessionConfig::default());
    let session = Arc::new(Session::start(config.session.clone())?);
    let generators = Generators::new(Arc::clone(&session), config.workloads.clone()).with_seed(1);

    for kind in WorkloadKind::ALL {
        let report = run_once(&generators, kind, &config.workloads).await?;
        assert_eq!(report.kind, kind);
    }
    assert_eq!(session.cached_bytes(), 0);
    Ok(())
}

/// Unknown modes are rejected before any generator runs
#[test]
fn test_unknown_mode_lists_valid_modes() {
    let err = Mode::parse(Some("chaos"), None, 5).unwrap_err();
    assert!(matches!(err, LoadpulseError::UnknownMode(_)));
    assert_eq!(
        err.to_string(),
        "Unknown mode: chaos\nAvailable modes: continuous, normal, memory, slow, skewed, failure"
    );
}

/// Scenario: duration 0 runs no iteration and the session still tears down
#[tokio::test]
async fn test_zero_duration_then_teardown() -> Result<()> {
    let config = config_with(SessionConfig::default());
    let session = Arc::new(Session::start(config.session.clone())?);
    let generators = Arc::new(Generators::new(Arc::clone(&session), config.workloads.clone()));
    let clock = Arc::new(ManualClock::new());

    let mut driver = ContinuousDriver::new(generators, clock.clone(), &config);
    let summary = driver.run(Duration::ZERO).await;

    assert_eq!(summary.iterations, 0);
    assert_eq!(session.stats().jobs, 0);
    assert!(session.stop());
    assert!(!session.stop());
    Ok(())
}

/// Failing iterations are counted and the loop keeps going
#[tokio::test]
async fn test_generator_failures_are_isolated() -> Result<()> {
    // memory workloads cannot fit in a 1k executor
    let config = config_with(SessionConfig {
        executor_memory: "1k".to_string(),
        ..Default::default()
    });
    let session = Arc::new(Session::start(config.session.clone())?);
    let generators = Arc::new(Generators::new(Arc::clone(&session), config.workloads.clone()).with_seed(2));
    let clock = Arc::new(ManualClock::new());
    let selector = WorkloadSelector::with_weights(&[
        (WorkloadKind::Normal, 0.5),
        (WorkloadKind::MemoryIntensive, 0.5),
    ])?;

    let mut driver = ContinuousDriver::new(generators, clock.clone(), &config).with_selector(selector);
    let budget = Duration::from_secs(10 * 60);
    let summary = driver.run(budget).await;

    let memory_runs = summary.per_kind.get(&WorkloadKind::MemoryIntensive).copied().unwrap_or(0);
    let normal_runs = summary.per_kind.get(&WorkloadKind::Normal).copied().unwrap_or(0);
    assert!(memory_runs > 0 && normal_runs > 0);
    assert_eq!(summary.failures, memory_runs);
    assert_eq!(summary.iterations, memory_runs + normal_runs);
    assert_eq!(session.stats().failed_jobs, memory_runs);

    // bounded overshoot: at most one pause past the deadline
    assert!(clock.elapsed() >= budget);
    assert!(clock.elapsed() <= budget + Duration::from_secs(30));
    Ok(())
}

/// Runs against a stopped session fail per iteration without ending the loop
#[tokio::test]
async fn test_stopped_session_fails_every_iteration() -> Result<()> {
    let config = config_with(SessionConfig::default());
    let session = Arc::new(Session::start(config.session.clone())?);
    let generators = Arc::new(Generators::new(Arc::clone(&session), config.workloads.clone()));
    session.stop();

    let clock = Arc::new(ManualClock::new());
    let mut driver = ContinuousDriver::new(generators, clock, &config);
    let summary = driver.run(Duration::from_secs(120)).await;

    assert!(summary.iterations >= 4);
    assert_eq!(summary.failures, summary.iterations);
    Ok(())
}
