//! `cjs` - run the dependency-aware producer/consumer job scheduler.

use anyhow::{Context, Result};
use cjs::{config::SchedulerConfig, coordinator::Coordinator, job::JobId};
use clap::{Parser, ValueEnum};
use core::time::Duration;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(Parser)]
#[command(name = "cjs")]
#[command(
    about = "Configure and run the producer-consumer job scheduler",
    long_about = None
)]
struct Cli {
    /// Number of producer threads
    #[arg(long, default_value_t = 2)]
    producers: usize,
    /// Number of consumer threads
    #[arg(long, default_value_t = 3)]
    consumers: usize,
    /// Number of jobs each producer will generate
    #[arg(long, default_value_t = 5)]
    jobs_per_producer: u32,
    /// Maximum number of jobs held by the queue
    #[arg(long, default_value_t = 10)]
    queue_size: usize,
    /// Chance (0-1) that a job depends on earlier jobs of its producer
    #[arg(long, default_value_t = 0.3)]
    dependency_chance: f64,
    /// Upper bound of a job's simulated duration, in ticks
    #[arg(long, default_value_t = 3)]
    max_duration: u32,
    /// Length of one tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
    /// Chance (0-1) that a simulated execution fails
    #[arg(long, default_value_t = 0.0)]
    failure_chance: f64,
    /// Seed for reproducible job graphs
    #[arg(long)]
    seed: Option<u64>,
    /// Logging level; `RUST_LOG` takes precedence when set
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warning => Self::WARN,
            LogLevel::Error | LogLevel::Critical => Self::ERROR,
        }
    }
}

impl From<&Cli> for SchedulerConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            producers: cli.producers,
            consumers: cli.consumers,
            jobs_per_producer: cli.jobs_per_producer,
            queue_capacity: cli.queue_size,
            dependency_probability: cli.dependency_chance,
            max_duration: cli.max_duration,
            tick: Duration::from_millis(cli.tick_ms),
            failure_probability: cli.failure_chance,
            seed: cli.seed,
            ..Self::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(cli.log_level).into())
                .from_env_lossy(),
        )
        .init();

    let mut coordinator =
        Coordinator::new(SchedulerConfig::from(&cli)).context("invalid scheduler configuration")?;
    let report = coordinator.run().context("job scheduler failed")?;

    let completed: Vec<_> = report.completed.iter().map(JobId::to_string).collect();
    println!("\nCompleted jobs: {completed:?}");
    if !report.failed.is_empty() {
        let failed: Vec<_> = report.failed.iter().map(JobId::to_string).collect();
        println!("Failed jobs: {failed:?}");
    }
    Ok(())
}
