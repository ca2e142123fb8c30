//! Per-host CPU usage query benchmark.
//!
//! Loads `(hostname, start, end)` parameters, fans them out over a fixed set of
//! workers (each owning one database connection) and summarizes query latency.

pub mod barrier;
pub mod config;
pub mod db;
pub mod params;
pub mod partition;
pub mod pool;
pub mod stats;
pub mod worker;

pub use config::{BenchConfig, ConfigError};
pub use db::{Connector, PgConnector, QueryConnection, CPU_USAGE_QUERY};
pub use params::{load_query_params, LoadError, QueryParams};
pub use pool::{RunOutcome, WorkerPool};
pub use stats::{BenchmarkReport, StatisticsSummary, StatsError};
pub use worker::{QueryResult, WorkerReport};
