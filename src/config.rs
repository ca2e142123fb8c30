//! Benchmark configuration.
//!
//! Values come from the environment (optionally seeded from a `.env` file) or
//! the matching command-line flags:
//! - `WORKER_COUNT`: number of workers, each with its own connection (required, > 0)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `WORKER_QUEUE_CAPACITY`: per-worker input queue bound (default: 100)
//! - `QUERY_TIMEOUT_MS`: per-query deadline in milliseconds (default: none)

use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("WORKER_COUNT is not set")]
    MissingWorkerCount,
    #[error("WORKER_COUNT must be an integer, got {0:?}")]
    InvalidWorkerCount(String),
    #[error("WORKER_COUNT must be positive, got {0}")]
    NonPositiveWorkerCount(i64),
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("WORKER_QUEUE_CAPACITY must be positive")]
    InvalidQueueCapacity,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub database_url: String,
    pub worker_count: NonZeroUsize,
    pub queue_capacity: usize,
    /// None waits on every query until it finishes or fails.
    pub query_timeout: Option<Duration>,
}

impl BenchConfig {
    pub fn new(database_url: impl Into<String>, worker_count: NonZeroUsize) -> Self {
        Self {
            database_url: database_url.into(),
            worker_count,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            query_timeout: None,
        }
    }

    /// Validate raw settings. Nothing is started until this succeeds.
    pub fn from_parts(
        worker_count: Option<&str>,
        database_url: Option<&str>,
        queue_capacity: usize,
        query_timeout_ms: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let worker_count = parse_worker_count(worker_count)?;
        let database_url = database_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }

        Ok(Self {
            database_url: database_url.to_string(),
            worker_count,
            queue_capacity,
            query_timeout: query_timeout_ms.map(Duration::from_millis),
        })
    }

    pub fn with_queue_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.queue_capacity = capacity.get();
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

pub fn parse_worker_count(raw: Option<&str>) -> Result<NonZeroUsize, ConfigError> {
    let raw = raw.map(str::trim).ok_or(ConfigError::MissingWorkerCount)?;
    if raw.is_empty() {
        return Err(ConfigError::MissingWorkerCount);
    }
    let value: i64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidWorkerCount(raw.to_string()))?;
    usize::try_from(value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(ConfigError::NonPositiveWorkerCount(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "postgres://bench@localhost/metrics";

    #[test]
    fn test_worker_count_parsing() {
        assert_eq!(parse_worker_count(Some("3")).unwrap().get(), 3);
        assert_eq!(parse_worker_count(Some(" 8 ")).unwrap().get(), 8);
        assert_eq!(parse_worker_count(None), Err(ConfigError::MissingWorkerCount));
        assert_eq!(parse_worker_count(Some("")), Err(ConfigError::MissingWorkerCount));
        assert_eq!(
            parse_worker_count(Some("0")),
            Err(ConfigError::NonPositiveWorkerCount(0))
        );
        assert_eq!(
            parse_worker_count(Some("-2")),
            Err(ConfigError::NonPositiveWorkerCount(-2))
        );
        assert_eq!(
            parse_worker_count(Some("four")),
            Err(ConfigError::InvalidWorkerCount("four".to_string()))
        );
    }

    #[test]
    fn test_from_parts() {
        let config = BenchConfig::from_parts(Some("4"), Some(URL), 100, Some(250)).unwrap();
        assert_eq!(config.worker_count.get(), 4);
        assert_eq!(config.database_url, URL);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));

        let config = BenchConfig::from_parts(Some("1"), Some(URL), 10, None).unwrap();
        assert_eq!(config.query_timeout, None);
    }

    #[test]
    fn test_builders_keep_values() {
        let config = BenchConfig::new(URL, NonZeroUsize::new(2).unwrap())
            .with_queue_capacity(NonZeroUsize::new(1).unwrap())
            .with_query_timeout(Duration::from_millis(40));
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(40)));
        assert_eq!(
            BenchConfig::new(URL, NonZeroUsize::new(2).unwrap()).queue_capacity,
            DEFAULT_QUEUE_CAPACITY
        );
    }

    #[test]
    fn test_from_parts_rejects_bad_settings() {
        assert_eq!(
            BenchConfig::from_parts(None, Some(URL), 100, None).unwrap_err(),
            ConfigError::MissingWorkerCount
        );
        assert_eq!(
            BenchConfig::from_parts(Some("0"), Some(URL), 100, None).unwrap_err(),
            ConfigError::NonPositiveWorkerCount(0)
        );
        assert_eq!(
            BenchConfig::from_parts(Some("2"), Some("  "), 100, None).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
        assert_eq!(
            BenchConfig::from_parts(Some("2"), Some(URL), 0, None).unwrap_err(),
            ConfigError::InvalidQueueCapacity
        );
    }
}
