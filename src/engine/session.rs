//! Session handle shared by every workload.
//!
//! A session is started once, handed out by reference and stopped exactly
//! once. Stopping is idempotent and also happens on drop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::LevelFilter;
use serde::Serialize;

use super::{EngineError, Frame, parse_memory_size};
use crate::config::SessionConfig;

/// Counters accumulated over the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub jobs: u64,
    pub failed_jobs: u64,
    pub rows_materialized: u64,
}

/// Reservation of cache memory; release it with [`Session::unpersist`].
#[derive(Debug)]
#[must_use = "cached data stays reserved until unpersisted"]
pub struct CacheHandle {
    id: u64,
    bytes: u64,
}

impl CacheHandle {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Long-lived processing-engine session.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    executor_memory: u64,
    driver_memory: u64,
    log_level: LevelFilter,
    stopped: AtomicBool,
    cached_bytes: AtomicU64,
    next_cache_id: AtomicU64,
    jobs: AtomicU64,
    failed_jobs: AtomicU64,
    rows_materialized: AtomicU64,
}

/// Map engine-style level names (including `ALL` and `FATAL`) onto log levels.
fn parse_log_level(level: &str) -> Result<LevelFilter, EngineError> {
    match level.trim().to_ascii_uppercase().as_str() {
        "ALL" | "TRACE" => Ok(LevelFilter::Trace),
        "DEBUG" => Ok(LevelFilter::Debug),
        "INFO" => Ok(LevelFilter::Info),
        "WARN" => Ok(LevelFilter::Warn),
        "ERROR" | "FATAL" => Ok(LevelFilter::Error),
        "OFF" => Ok(LevelFilter::Off),
        _ => Err(EngineError::InvalidLogLevel(level.to_string())),
    }
}

impl Session {
    /// Start a session with the given configuration.
    pub fn start(config: SessionConfig) -> Result<Self, EngineError> {
        let executor_memory = parse_memory_size(&config.executor_memory)?;
        let driver_memory = parse_memory_size(&config.driver_memory)?;
        let log_level = parse_log_level(&config.log_level)?;

        log::info!(
            "Session {} started (partitions={}, executor-memory={}, driver-memory={}, metrics-conf={})",
            config.app_name,
            config.shuffle_partitions,
            config.executor_memory,
            config.driver_memory,
            config.metrics_conf.display()
        );

        Ok(Self {
            config,
            executor_memory,
            driver_memory,
            log_level,
            stopped: AtomicBool::new(false),
            cached_bytes: AtomicU64::new(0),
            next_cache_id: AtomicU64::new(1),
            jobs: AtomicU64::new(0),
            failed_jobs: AtomicU64::new(0),
            rows_materialized: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of partitions work is split into.
    pub fn partitions(&self) -> usize {
        self.config.shuffle_partitions.max(1)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.is_stopped() {
            return Err(EngineError::SessionStopped);
        }
        Ok(())
    }

    fn engine_log(&self, message: std::fmt::Arguments<'_>) {
        if log::Level::Info <= self.log_level {
            log::info!(target: "loadpulse::engine", "[{}] {}", self.config.app_name, message);
        }
    }

    /// Frame with a single `id` column holding `0..n`.
    pub fn range(&self, n: u64) -> Result<Frame, EngineError> {
        self.ensure_active()?;
        Ok(Frame::range(n))
    }

    /// Force evaluation of a frame and return its row count.
    pub fn materialize(&self, frame: &Frame) -> Result<usize, EngineError> {
        self.ensure_active()?;
        let rows = frame.count();
        self.record_job(rows as u64);
        Ok(rows)
    }

    /// Bring a result frame back to the driver, bounded by driver memory.
    pub fn collect(&self, frame: &Frame) -> Result<Frame, EngineError> {
        self.ensure_active()?;
        let bytes = frame.estimated_size();
        if bytes > self.driver_memory {
            return Err(EngineError::OutOfMemory {
                requested: bytes,
                available: self.driver_memory,
            });
        }
        self.record_job(frame.count() as u64);
        Ok(frame.clone())
    }

    /// Account for a job that failed while running inside the engine.
    pub fn record_failure(&self) {
        self.jobs.fetch_add(1, Ordering::Relaxed);
        self.failed_jobs.fetch_add(1, Ordering::Relaxed);
        self.engine_log(format_args!("job failed"));
    }

    fn record_job(&self, rows: u64) {
        let job = self.jobs.fetch_add(1, Ordering::Relaxed) + 1;
        self.rows_materialized.fetch_add(rows, Ordering::Relaxed);
        self.engine_log(format_args!("job {} finished ({} rows)", job, rows));
    }

    /// Pin a frame in executor memory.
    pub fn cache(&self, frame: &Frame) -> Result<CacheHandle, EngineError> {
        self.ensure_active()?;
        let bytes = frame.estimated_size();
        let budget = self.executor_memory;

        self.cached_bytes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_add(bytes).filter(|total| *total <= budget)
            })
            .map_err(|current| EngineError::OutOfMemory {
                requested: bytes,
                available: budget.saturating_sub(current),
            })?;

        let id = self.next_cache_id.fetch_add(1, Ordering::Relaxed);
        self.engine_log(format_args!("cached frame {} ({} bytes)", id, bytes));
        Ok(CacheHandle { id, bytes })
    }

    /// Release a cache reservation.
    pub fn unpersist(&self, handle: CacheHandle) {
        self.cached_bytes.fetch_sub(handle.bytes, Ordering::SeqCst);
        self.engine_log(format_args!("unpersisted frame {}", handle.id));
    }

    pub fn cached_bytes(&self) -> u64 {
        self.cached_bytes.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            jobs: self.jobs.load(Ordering::Relaxed),
            failed_jobs: self.failed_jobs.load(Ordering::Relaxed),
            rows_materialized: self.rows_materialized.load(Ordering::Relaxed),
        }
    }

    /// Stop the session. Returns true only for the call that actually stopped it.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return false;
        }
        let stats = self.stats();
        log::info!(
            "Session {} stopped after {} jobs ({} failed, {} rows)",
            self.config.app_name,
            stats.jobs,
            stats.failed_jobs,
            stats.rows_materialized
        );
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
