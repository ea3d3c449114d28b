use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use loadpulse::LoadpulseError;
use loadpulse::cli::{Cli, Mode};
use loadpulse::config::Config;
use loadpulse::driver::{ContinuousDriver, SystemClock, run_once};
use loadpulse::engine::Session;
use loadpulse::workload::Generators;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("loadpulse")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("loadpulse.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn print_banner() {
    println!("{}", "=".repeat(60));
    println!("{}", "Loadpulse Anomaly Detection Workload".bold());
    println!("{}", "=".repeat(60));
}

async fn run_application(cli: &Cli, config: &Config, session: Arc<Session>) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let mode = match cli.mode(config.driver.default_duration_minutes) {
        Ok(mode) => mode,
        Err(e @ LoadpulseError::UnknownMode(_)) => {
            println!("{}", e.to_string().red());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let seed = cli.seed.or(config.driver.seed);
    let mut generators = Generators::new(session, config.workloads.clone());
    if let Some(seed) = seed {
        generators = generators.with_seed(seed);
    }
    let generators = Arc::new(generators);

    match mode {
        Mode::Continuous { minutes } => {
            let mut driver = ContinuousDriver::new(generators, Arc::new(SystemClock), config);
            if let Some(seed) = seed {
                driver = driver.with_seed(seed);
            }
            let summary = driver.run(Duration::from_secs(minutes.saturating_mul(60))).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if cli.is_verbose() {
                for (kind, count) in &summary.per_kind {
                    println!("  {:<18} {}", kind.to_string(), count);
                }
            }
        }
        Mode::Once(kind) => {
            let report = run_once(generators.as_ref(), kind, &config.workloads).await?;
            info!("Workload {} processed {} rows", report.kind, report.rows_processed);
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    print_banner();

    let session = Arc::new(Session::start(config.session.clone()).context("Failed to start engine session")?);

    // Teardown runs on completion, error and Ctrl-C alike
    let outcome = tokio::select! {
        result = run_application(&cli, &config, Arc::clone(&session)) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", "Interrupted".yellow());
            Ok(())
        }
    };

    session.stop();
    println!("\nSession stopped. Metrics should be visible in the monitoring dashboard.");

    outcome.context("Application failed")
}
