//! Query parameter source.
//!
//! A CSV file with a header row followed by `hostname,start_time,end_time`
//! records, timestamps formatted as `2023-01-01 00:00:00` (UTC).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One unit of benchmark work: a host and the `[start_time, end_time)` window to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub hostname: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing {field} in row {row}")]
    MissingField { row: usize, field: &'static str },
    #[error("error parsing {field} in row {row}: {source}")]
    Timestamp {
        field: &'static str,
        row: usize,
        #[source]
        source: chrono::ParseError,
    },
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map(|ts| ts.and_utc())
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Load every record or fail on the first bad one.
pub fn load_query_params(path: impl AsRef<Path>) -> Result<Vec<QueryParams>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_query_params(file)
}

pub fn read_query_params<R: io::Read>(reader: R) -> Result<Vec<QueryParams>, LoadError> {
    // Flexible so short rows reach the field check instead of failing as a length mismatch.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut params = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let row = idx + 2;
        let record = record?;
        let column = |pos: usize, field: &'static str| {
            record
                .get(pos)
                .ok_or(LoadError::MissingField { row, field })
        };
        let hostname = column(0, "hostname")?;
        let start_time = parse_timestamp(column(1, "start time")?).map_err(|source| {
            LoadError::Timestamp {
                field: "start time",
                row,
                source,
            }
        })?;
        let end_time = parse_timestamp(column(2, "end time")?).map_err(|source| {
            LoadError::Timestamp {
                field: "end time",
                row,
                source,
            }
        })?;
        params.push(QueryParams {
            hostname: hostname.to_string(),
            start_time,
            end_time,
        });
    }
    Ok(params)
}

#[derive(Serialize)]
struct CsvRow<'a> {
    hostname: &'a str,
    start_time: String,
    end_time: String,
}

pub fn write_query_params(path: impl AsRef<Path>, params: &[QueryParams]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for p in params {
        writer.serialize(CsvRow {
            hostname: &p.hostname,
            start_time: format_timestamp(&p.start_time),
            end_time: format_timestamp(&p.end_time),
        })?;
    }
    writer.flush()?;
    Ok(())
}
