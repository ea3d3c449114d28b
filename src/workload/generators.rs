//! Engine-backed workload generators.
//!
//! Each generator builds a synthetic dataset in the session, transforms it,
//! forces evaluation and prints the resulting table.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{WorkloadKind, WorkloadParams, WorkloadReport, WorkloadRunner};
use crate::config::WorkloadsConfig;
use crate::engine::{Agg, EngineError, Frame, Session, Value};
use crate::error::Result;

/// The five workload generators over one shared session.
pub struct Generators {
    session: Arc<Session>,
    config: WorkloadsConfig,
    seed: Option<u64>,
    calls: AtomicU64,
}

impl Generators {
    pub fn new(session: Arc<Session>, config: WorkloadsConfig) -> Self {
        Self {
            session,
            config,
            seed: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Make generated data reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fresh RNG per invocation; seeded runs derive it from the call number.
    fn rng(&self) -> StdRng {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(call)),
            None => StdRng::from_os_rng(),
        }
    }

    fn show(&self, result: &Frame) -> std::result::Result<Frame, EngineError> {
        let collected = self.session.collect(result)?;
        print!("{}", collected);
        Ok(collected)
    }

    /// Uniform values grouped by ten categories.
    pub fn normal(&self, records: u64) -> Result<WorkloadReport> {
        println!("Generating normal workload with {} records...", records);
        let mut rng = self.rng();
        let now = Local::now();

        let df = self
            .session
            .range(records)?
            .with_column("value", |_| Value::Double(rng.random::<f64>() * 100.0))
            .with_column("category", |_| Value::Long((rng.random::<f64>() * 10.0) as i64))
            .with_column("timestamp", |_| Value::Timestamp(now));
        let rows = self.session.materialize(&df)?;

        let result = df
            .group_by("category")?
            .agg(&[Agg::sum("value"), Agg::avg("value"), Agg::max("value")])?;
        let shown = self.show(&result)?;

        Ok(WorkloadReport::new(WorkloadKind::Normal, rows as u64).with_result(shown))
    }

    /// Large dataset pinned in executor memory while it is aggregated.
    pub fn memory_intensive(&self, size_multiplier: u64) -> Result<WorkloadReport> {
        println!(
            "Generating memory-intensive workload (multiplier: {})...",
            size_multiplier
        );
        let mut rng = self.rng();
        let records = self.config.memory.base_records.saturating_mul(size_multiplier);

        let df = self
            .session
            .range(records)?
            .with_column("data", |_| Value::Str((rng.random::<f64>() * 1_000_000.0).to_string()))
            .with_column("value", |_| Value::Double(rng.random::<f64>() * 1000.0));

        let handle = self.session.cache(&df)?;
        let outcome = self.aggregate_cached(&df);
        self.session.unpersist(handle);
        let (rows, shown) = outcome?;

        Ok(WorkloadReport::new(WorkloadKind::MemoryIntensive, rows as u64).with_result(shown))
    }

    fn aggregate_cached(&self, df: &Frame) -> Result<(usize, Frame)> {
        let rows = self.session.materialize(df)?;
        let result = df.agg(&[Agg::sum("value"), Agg::avg("value")])?;
        Ok((rows, self.show(&result)?))
    }

    /// Per-row function with an artificial delay, partitions evaluated concurrently.
    pub async fn slow_task(&self) -> Result<WorkloadReport> {
        println!("Generating slow task workload...");
        let slow = &self.config.slow;
        let mut rng = self.rng();

        let df = self
            .session
            .range(slow.rows)?
            .with_column("value", |_| Value::Double(rng.random::<f64>() * 100.0));

        let jobs: Vec<(f64, Duration)> = df
            .column_values("value")?
            .into_iter()
            .map(|v| {
                let delay = rng.random_range(slow.delay_ms.min..=slow.delay_ms.max.max(slow.delay_ms.min));
                (v.as_f64().unwrap_or(0.0), Duration::from_millis(delay))
            })
            .collect();

        let chunk = jobs.len().div_ceil(self.session.partitions()).max(1);
        let partitions = jobs.chunks(chunk).map(|part| async move {
            let mut out = Vec::with_capacity(part.len());
            for (value, delay) in part {
                tokio::time::sleep(*delay).await;
                out.push(value * 2.0);
            }
            out
        });
        let mut slow_values = join_all(partitions).await.into_iter().flatten();

        let df = df.with_column("slow_value", |_| slow_values.next().map(Value::Double).unwrap_or(Value::Null));
        let rows = self.session.materialize(&df)?;

        let result = df.agg(&[Agg::sum("slow_value")])?;
        let shown = self.show(&result)?;

        Ok(WorkloadReport::new(WorkloadKind::SlowTask, rows as u64).with_result(shown))
    }

    /// Most rows share one key, so one group carries most of the work.
    pub fn skewed_data(&self) -> Result<WorkloadReport> {
        println!("Generating skewed data workload...");
        let skewed = &self.config.skewed;
        let hot = skewed.hot_key_fraction.clamp(0.0, 1.0);
        let key_space = skewed.key_space as f64;
        let mut rng = self.rng();

        let df = self
            .session
            .range(skewed.rows)?
            .with_column("key", |_| {
                if rng.random_bool(hot) {
                    Value::Long(1)
                } else {
                    Value::Long((rng.random::<f64>() * key_space) as i64)
                }
            })
            .with_column("value", |_| Value::Double(rng.random::<f64>() * 1000.0));
        let rows = self.session.materialize(&df)?;

        let result = df.group_by("key")?.agg(&[Agg::sum("value"), Agg::count("value")])?;
        let shown = self.show(&result)?;

        Ok(WorkloadReport::new(WorkloadKind::SkewedData, rows as u64).with_result(shown))
    }

    /// Division by a divisor that is occasionally zero. The division error is
    /// expected and reported instead of propagated.
    pub fn failure_prone(&self) -> Result<WorkloadReport> {
        println!("Generating failure-prone workload...");
        let rows = self.config.failure.rows;

        match self.risky_sum() {
            Ok(shown) => Ok(WorkloadReport::new(WorkloadKind::FailureProne, rows).with_result(shown)),
            Err(EngineError::DivideByZero) => {
                let message = EngineError::DivideByZero.to_string();
                println!("Expected error in failure-prone workload: {}", message);
                self.session.record_failure();
                Ok(WorkloadReport::new(WorkloadKind::FailureProne, rows).with_expected_error(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn risky_sum(&self) -> std::result::Result<Frame, EngineError> {
        let failure = &self.config.failure;
        let zero_chance = failure.zero_divisor_fraction.clamp(0.0, 1.0);
        let mut rng = self.rng();

        let df = self
            .session
            .range(failure.rows)?
            .with_column("value", |_| Value::Double(rng.random::<f64>() * 100.0));
        let value_idx = df.column_index("value")?;

        let df = df.try_with_column("risky_calc", |row| {
            let divisor = if rng.random_bool(zero_chance) { 0 } else { 1 };
            row[value_idx].checked_div(&Value::Long(divisor))
        })?;
        self.session.materialize(&df)?;

        let result = df.agg(&[Agg::sum("risky_calc")])?;
        self.show(&result)
    }
}

#[async_trait]
impl WorkloadRunner for Generators {
    async fn run(&self, params: WorkloadParams) -> Result<WorkloadReport> {
        log::debug!("Running workload {}", params);
        let outcome = match params {
            WorkloadParams::Normal { records } => self.normal(records),
            WorkloadParams::MemoryIntensive { size_multiplier } => self.memory_intensive(size_multiplier),
            WorkloadParams::SlowTask => self.slow_task().await,
            WorkloadParams::SkewedData => self.skewed_data(),
            WorkloadParams::FailureProne => self.failure_prone(),
        };
        if outcome.is_err() && !self.session.is_stopped() {
            self.session.record_failure();
        }
        outcome
    }
}
