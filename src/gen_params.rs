//! Generates a query parameter CSV for the benchmark.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Parser;
use query_bench::params::write_query_params;
use query_bench::QueryParams;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate hostname,start_time,end_time rows for query-bench")]
struct Args {
    /// Number of distinct hosts (host_0 .. host_{n-1})
    #[arg(long, default_value_t = 10)]
    hosts: usize,

    /// Number of rows to generate
    #[arg(short, long, default_value_t = 200)]
    queries: usize,

    /// Window length of each query in minutes
    #[arg(long, default_value_t = 60)]
    window_minutes: i64,

    /// RNG seed; the same seed produces the same file
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output path
    #[arg(short, long, default_value = "query_params.csv")]
    output: PathBuf,
}

fn generate(args: &Args, day: DateTime<Utc>) -> Vec<QueryParams> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let latest_start = (MINUTES_PER_DAY - args.window_minutes).max(1);

    (0..args.queries)
        .map(|_| {
            let host = rng.gen_range(0..args.hosts);
            let start_time = day + Duration::minutes(rng.gen_range(0..latest_start));
            QueryParams {
                hostname: format!("host_{}", host),
                start_time,
                end_time: start_time + Duration::minutes(args.window_minutes),
            }
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(args.hosts > 0, "--hosts must be positive");
    ensure!(
        (1..=MINUTES_PER_DAY).contains(&args.window_minutes),
        "--window-minutes must be between 1 and {}",
        MINUTES_PER_DAY
    );

    let day = Utc
        .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
        .single()
        .context("invalid base day")?;
    let params = generate(&args, day);
    write_query_params(&args.output, &params)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "wrote {} rows for {} hosts to {}",
        params.len(),
        args.hosts,
        args.output.display()
    );
    Ok(())
}
