use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use query_bench::config::DEFAULT_QUEUE_CAPACITY;
use query_bench::{
    load_query_params, BenchConfig, BenchmarkReport, PgConnector, StatisticsSummary, WorkerPool,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Parallel per-host cpu_usage query benchmark")]
struct Args {
    /// CSV file with hostname,start_time,end_time rows
    #[arg(long, default_value = "query_params.csv")]
    params: PathBuf,

    /// Number of workers, one database connection each
    #[arg(short, long, env = "WORKER_COUNT")]
    workers: Option<String>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Bound of each worker's input queue
    #[arg(long, env = "WORKER_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Per-query deadline in milliseconds (no deadline when unset)
    #[arg(long, env = "QUERY_TIMEOUT_MS")]
    query_timeout_ms: Option<u64>,
}

fn init_tracing() {
    // Diagnostics go to stderr; stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing();

    let config = BenchConfig::from_parts(
        args.workers.as_deref(),
        args.database_url.as_deref(),
        args.queue_capacity,
        args.query_timeout_ms,
    )
    .context("invalid configuration")?;

    let params = load_query_params(&args.params)
        .with_context(|| format!("error reading query params from {}", args.params.display()))?;
    info!(
        params = params.len(),
        workers = config.worker_count.get(),
        queue_capacity = config.queue_capacity,
        query_timeout = ?config.query_timeout,
        "starting benchmark"
    );

    let pool = WorkerPool::new(&config, Arc::new(PgConnector));
    let outcome = pool.run(params).await;

    let summary = StatisticsSummary::from_durations(&outcome.durations())
        .context("benchmark produced no results")?;
    let report = BenchmarkReport {
        elapsed: outcome.elapsed,
        summary,
        failed: outcome.failed(),
    };
    println!("{report}");

    Ok(())
}
