//! Database capability used by the workers.
//!
//! Workers only see [`Connector`] and [`QueryConnection`]; the PostgreSQL
//! implementation lives here and tests substitute their own.

use std::str::FromStr;

use futures::future::BoxFuture;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::params::QueryParams;

/// Per-minute max/min usage for one host over `[$2, $3)`.
pub const CPU_USAGE_QUERY: &str = r#"
    SELECT
        date_trunc('minute', ts) AS minute,
        MAX(usage) AS max_usage,
        MIN(usage) AS min_usage
    FROM cpu_usage
    WHERE host = $1 AND ts >= $2 AND ts < $3
    GROUP BY minute
    ORDER BY minute
"#;

/// A single exclusively-owned database connection.
pub trait QueryConnection: Send {
    /// Run `sql` bound to `(hostname, start_time, end_time)`, returning the row count.
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, Result<usize, sqlx::Error>>;

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), sqlx::Error>>;
}

/// Opens one connection per worker.
pub trait Connector: Send + Sync {
    fn connect<'a>(
        &'a self,
        worker_id: usize,
        database_url: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn QueryConnection>, sqlx::Error>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

impl Connector for PgConnector {
    fn connect<'a>(
        &'a self,
        worker_id: usize,
        database_url: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn QueryConnection>, sqlx::Error>> {
        Box::pin(async move {
            let options = PgConnectOptions::from_str(database_url)?
                .application_name(&format!("query-bench-worker-{}", worker_id));
            let conn = PgConnection::connect_with(&options).await?;
            Ok::<Box<dyn QueryConnection>, sqlx::Error>(Box::new(PgQueryConnection { conn }))
        })
    }
}

pub struct PgQueryConnection {
    conn: PgConnection,
}

impl QueryConnection for PgQueryConnection {
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, Result<usize, sqlx::Error>> {
        Box::pin(async move {
            let rows = sqlx::query(sql)
                .bind(params.hostname.as_str())
                .bind(params.start_time)
                .bind(params.end_time)
                .fetch_all(&mut self.conn)
                .await?;
            Ok::<_, sqlx::Error>(rows.len())
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), sqlx::Error>> {
        self.conn.close()
    }
}
