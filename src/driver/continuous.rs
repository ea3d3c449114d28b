//! Continuous driver - runs randomly chosen workloads until a deadline.
//!
//! Each iteration:
//! 1. Picks a workload kind from the weighted distribution
//! 2. Samples kind-specific parameters
//! 3. Dispatches to the runner; a failure is logged and the loop goes on
//! 4. Pauses a random interval unless the deadline has passed

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use colored::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::Clock;
use crate::config::{Bounds, GlobalConfig, MAX_PAUSE_SECS, WorkloadsConfig};
use crate::workload::{WorkloadKind, WorkloadParams, WorkloadRunner, WorkloadSelector};

/// Totals for a finished continuous run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Attempted iterations, failed ones included.
    pub iterations: u64,
    pub failures: u64,
    pub per_kind: BTreeMap<WorkloadKind, u64>,
    pub elapsed_secs: f64,
}

/// Drives randomly selected workloads through a runner until the time budget is spent.
pub struct ContinuousDriver<W, C>
where
    W: WorkloadRunner,
    C: Clock,
{
    runner: Arc<W>,
    clock: Arc<C>,
    selector: WorkloadSelector,
    workloads: WorkloadsConfig,
    pause_secs: Bounds<f64>,
    max_iterations: Option<u64>,
    rng: StdRng,
}

impl<W, C> ContinuousDriver<W, C>
where
    W: WorkloadRunner,
    C: Clock,
{
    pub fn new(runner: Arc<W>, clock: Arc<C>, config: &GlobalConfig) -> Self {
        let rng = match config.driver.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            runner,
            clock,
            selector: WorkloadSelector::default(),
            workloads: config.workloads.clone(),
            pause_secs: config.driver.pause_secs,
            max_iterations: config.driver.max_iterations,
            rng,
        }
    }

    /// Reseed kind selection, parameters and pauses.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_selector(mut self, selector: WorkloadSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Stop after `max` iterations even if time remains.
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }

    fn next_pause(&mut self) -> Duration {
        let bound = |secs: f64| if secs.is_nan() { 0.0 } else { secs.clamp(0.0, MAX_PAUSE_SECS) };
        let min = bound(self.pause_secs.min);
        let max = bound(self.pause_secs.max).max(min);
        Duration::from_secs_f64(self.rng.random_range(min..=max))
    }

    fn has_time(&self, start: Instant, duration: Duration) -> bool {
        self.clock.now().saturating_duration_since(start) < duration
    }

    fn has_iterations(&self, done: u64) -> bool {
        self.max_iterations.is_none_or(|max| done < max)
    }

    /// Run until `duration` has elapsed on the clock. Durations too long to
    /// reach a deadline simply never expire.
    pub async fn run(&mut self, duration: Duration) -> RunSummary {
        println!(
            "Running continuous workload for {} minutes...",
            format!("{:.1}", duration.as_secs_f64() / 60.0).cyan()
        );

        let start = self.clock.now();
        let mut summary = RunSummary::default();

        while self.has_time(start, duration) && self.has_iterations(summary.iterations) {
            summary.iterations += 1;
            let iteration = summary.iterations;
            println!("\n{}", "=".repeat(60));
            println!("Iteration {} - {}", iteration, Local::now().format("%Y-%m-%d %H:%M:%S"));
            println!("{}", "=".repeat(60));

            let kind = self.selector.choose(&mut self.rng);
            let params = WorkloadParams::sample(kind, &self.workloads, &mut self.rng);
            *summary.per_kind.entry(kind).or_default() += 1;

            match self.runner.run(params).await {
                Ok(report) => {
                    tracing::info!(iteration, kind = %kind, rows = report.rows_processed, "Workload iteration finished");
                }
                Err(e) => {
                    summary.failures += 1;
                    println!("{} {}: {}", "Error in iteration".red(), iteration, e);
                    tracing::warn!(iteration, kind = %kind, error = %e, "Workload iteration failed");
                }
            }

            if self.has_time(start, duration) && self.has_iterations(summary.iterations) {
                let pause = self.next_pause();
                println!("\nWaiting {:.1} seconds before next iteration...", pause.as_secs_f64());
                self.clock.sleep(pause).await;
            }
        }

        summary.elapsed_secs = self.clock.now().saturating_duration_since(start).as_secs_f64();
        println!(
            "\n{} after {} iterations ({} failed)",
            "Completed continuous workload".green(),
            summary.iterations,
            summary.failures
        );
        log::info!(
            "Continuous run finished: {} iterations, {} failures, {:.1}s",
            summary.iterations,
            summary.failures,
            summary.elapsed_secs
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::driver::ManualClock;
    use crate::engine::EngineError;
    use crate::error::Result;
    use crate::workload::WorkloadReport;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records dispatched params; fails the listed call numbers (1-based).
    struct MockRunner {
        clock: Arc<ManualClock>,
        work: Duration,
        fail_calls: Vec<usize>,
        calls: Mutex<Vec<WorkloadParams>>,
    }

    impl MockRunner {
        fn new(clock: Arc<ManualClock>) -> Self {
            Self {
                clock,
                work: Duration::ZERO,
                fail_calls: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<WorkloadParams> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkloadRunner for MockRunner {
        async fn run(&self, params: WorkloadParams) -> Result<WorkloadReport> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(params);
                calls.len()
            };
            self.clock.advance(self.work);
            if self.fail_calls.contains(&call) {
                return Err(EngineError::SessionStopped.into());
            }
            Ok(WorkloadReport::new(params.kind(), 1))
        }
    }

    fn config(pause: f64) -> GlobalConfig {
        GlobalConfig {
            driver: DriverConfig {
                pause_secs: Bounds::new(pause, pause),
                seed: Some(3),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_zero_duration_runs_nothing() {
        let clock = Arc::new(ManualClock::new());
        let runner = Arc::new(MockRunner::new(clock.clone()));
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &config(10.0));

        let summary = driver.run(Duration::ZERO).await;
        assert_eq!(summary.iterations, 0);
        assert!(runner.calls().is_empty());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_fixed_pause_iteration_count() {
        let clock = Arc::new(ManualClock::new());
        let runner = Arc::new(MockRunner::new(clock.clone()));
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &config(10.0));

        // iterations start at 0s, 10s, ... 110s
        let summary = driver.run(Duration::from_secs(120)).await;
        assert_eq!(summary.iterations, 12);
        assert_eq!(summary.failures, 0);
        assert_eq!(runner.calls().len(), 12);
        assert_eq!(summary.per_kind.values().sum::<u64>(), 12);
        assert_eq!(clock.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_no_pause_after_deadline() {
        let clock = Arc::new(ManualClock::new());
        let mut runner = MockRunner::new(clock.clone());
        runner.work = Duration::from_secs(100);
        let runner = Arc::new(runner);
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &config(30.0));

        // the single iteration overruns the 60s budget, so no pause follows
        let summary = driver.run(Duration::from_secs(60)).await;
        assert_eq!(summary.iterations, 1);
        assert_eq!(clock.elapsed(), Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let clock = Arc::new(ManualClock::new());
        let mut runner = MockRunner::new(clock.clone());
        runner.fail_calls = vec![1, 2, 4];
        let runner = Arc::new(runner);
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &config(10.0));

        let summary = driver.run(Duration::from_secs(50)).await;
        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.failures, 3);
        assert_eq!(runner.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_overshoot_bounded_by_one_pause() {
        let clock = Arc::new(ManualClock::new());
        let mut runner = MockRunner::new(clock.clone());
        runner.work = Duration::from_secs(1);
        let runner = Arc::new(runner);
        let mut cfg = config(0.0);
        cfg.driver.pause_secs = Bounds::new(10.0, 30.0);
        let mut driver = ContinuousDriver::new(runner, clock.clone(), &cfg);

        let budget = Duration::from_secs(300);
        let summary = driver.run(budget).await;
        assert!(summary.iterations > 0);
        assert!(clock.elapsed() >= budget);
        assert!(clock.elapsed() <= budget + Duration::from_secs(30));
        assert!((summary.elapsed_secs - clock.elapsed().as_secs_f64()).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_sampled_params_follow_kind() {
        let clock = Arc::new(ManualClock::new());
        let runner = Arc::new(MockRunner::new(clock.clone()));
        let selector = WorkloadSelector::with_weights(&[(WorkloadKind::Normal, 1.0)]).unwrap();
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &config(1.0)).with_selector(selector);

        driver.run(Duration::from_secs(20)).await;
        let calls = runner.calls();
        assert_eq!(calls.len(), 20);
        for params in calls {
            match params {
                WorkloadParams::Normal { records } => assert!((5_000..=15_000).contains(&records)),
                other => panic!("unexpected params {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_same_seed_same_kinds() {
        let run = |seed: u64| async move {
            let clock = Arc::new(ManualClock::new());
            let runner = Arc::new(MockRunner::new(clock.clone()));
            let mut driver = ContinuousDriver::new(runner.clone(), clock, &config(1.0)).with_seed(seed);
            driver.run(Duration::from_secs(30)).await;
            runner.calls()
        };
        assert_eq!(run(5).await, run(5).await);
    }

    #[tokio::test]
    async fn test_unbounded_duration_runs_until_iteration_limit() {
        let clock = Arc::new(ManualClock::new());
        let mut runner = MockRunner::new(clock.clone());
        runner.work = Duration::from_secs(3600);
        let runner = Arc::new(runner);
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &config(10.0)).with_max_iterations(3);

        let summary = driver.run(Duration::MAX).await;
        assert_eq!(summary.iterations, 3);
        assert_eq!(runner.calls().len(), 3);
        // two pauses between three iterations, none after the last
        assert_eq!(clock.elapsed(), Duration::from_secs(3 * 3600 + 20));
    }

    #[tokio::test]
    async fn test_minutes_overflowing_instant_do_not_panic() {
        let clock = Arc::new(ManualClock::new());
        let runner = Arc::new(MockRunner::new(clock.clone()));
        let mut driver = ContinuousDriver::new(runner.clone(), clock, &config(10.0)).with_max_iterations(2);

        let summary = driver.run(Duration::from_secs(u64::MAX.saturating_mul(60))).await;
        assert_eq!(summary.iterations, 2);
    }

    #[tokio::test]
    async fn test_iteration_limit_from_config() {
        let clock = Arc::new(ManualClock::new());
        let runner = Arc::new(MockRunner::new(clock.clone()));
        let mut cfg = config(10.0);
        cfg.driver.max_iterations = Some(4);
        let mut driver = ContinuousDriver::new(runner.clone(), clock, &cfg);

        let summary = driver.run(Duration::from_secs(3600)).await;
        assert_eq!(summary.iterations, 4);
    }

    #[tokio::test]
    async fn test_non_finite_pause_is_capped() {
        let clock = Arc::new(ManualClock::new());
        let mut runner = MockRunner::new(clock.clone());
        runner.work = Duration::from_secs(1);
        let runner = Arc::new(runner);
        let mut cfg = config(0.0);
        cfg.driver.pause_secs = Bounds::new(10.0, f64::INFINITY);
        let mut driver = ContinuousDriver::new(runner.clone(), clock.clone(), &cfg);

        let budget = Duration::from_secs(60);
        let summary = driver.run(budget).await;
        assert!(summary.iterations >= 1);
        // last iteration starts before the budget, then one second of work and one capped pause
        assert!(clock.elapsed() <= budget + Duration::from_secs(1) + Duration::from_secs_f64(MAX_PAUSE_SECS));

        cfg.driver.pause_secs = Bounds::new(f64::NAN, f64::NAN);
        let mut driver = ContinuousDriver::new(runner, clock.clone(), &cfg);
        let before = clock.elapsed();
        let summary = driver.run(Duration::from_secs(1)).await;
        assert_eq!(summary.iterations, 1);
        assert_eq!(clock.elapsed(), before + Duration::from_secs(1));
    }

    #[test]
    fn test_summary_serializes() {
        let mut summary = RunSummary {
            iterations: 2,
            failures: 1,
            ..Default::default()
        };
        summary.per_kind.insert(WorkloadKind::SlowTask, 2);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["iterations"], 2);
        assert_eq!(json["per_kind"]["slow_task"], 2);
    }
}
