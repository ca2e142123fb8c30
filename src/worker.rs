//! Query worker: one connection, one input queue, sequential processing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::barrier::Completion;
use crate::db::{Connector, QueryConnection, CPU_USAGE_QUERY};
use crate::params::QueryParams;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub hostname: String,
    pub duration: Duration,
    pub worker: usize,
    /// The query errored or timed out. Its duration still counts.
    pub failed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("query did not finish within {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Ready,
    Processing,
    Draining,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    pub connected: bool,
    pub processed: usize,
    pub failed: usize,
    /// Items routed here that never ran because the connection was never established.
    pub dropped: usize,
}

/// A queued item and the barrier slot it releases when dropped.
pub type Dispatched = (QueryParams, Completion);

pub struct Worker {
    id: usize,
    state: WorkerState,
    queue: mpsc::Receiver<Dispatched>,
    results: mpsc::Sender<QueryResult>,
    connector: Arc<dyn Connector>,
    database_url: Arc<str>,
    query_timeout: Option<Duration>,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: mpsc::Receiver<Dispatched>,
        results: mpsc::Sender<QueryResult>,
        connector: Arc<dyn Connector>,
        database_url: Arc<str>,
        query_timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            state: WorkerState::Connecting,
            queue,
            results,
            connector,
            database_url,
            query_timeout,
        }
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(worker = self.id, from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }

    pub async fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport {
            id: self.id,
            ..Default::default()
        };

        let connected = self.connector.connect(self.id, &self.database_url).await;
        let mut conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                error!(worker = self.id, error = %e, "unable to connect to database");
                report.dropped = self.abandon_queue().await;
                if report.dropped > 0 {
                    warn!(worker = self.id, dropped = report.dropped, "items dropped with worker");
                }
                self.transition(WorkerState::Closed);
                return report;
            }
        };
        report.connected = true;
        self.transition(WorkerState::Ready);

        while let Some((params, completion)) = self.queue.recv().await {
            self.transition(WorkerState::Processing);

            let start = Instant::now();
            let outcome = self.execute(&mut conn, &params).await;
            let duration = start.elapsed();

            let failed = match outcome {
                Ok(rows) => {
                    debug!(worker = self.id, host = %params.hostname, rows, ?duration, "query done");
                    false
                }
                Err(e) => {
                    error!(worker = self.id, host = %params.hostname, error = %e, "query error");
                    report.failed += 1;
                    true
                }
            };
            report.processed += 1;

            let result = QueryResult {
                hostname: params.hostname,
                duration,
                worker: self.id,
                failed,
            };
            if self.results.send(result).await.is_err() {
                warn!(worker = self.id, "result channel closed, discarding result");
            }
            drop(completion);
            self.transition(WorkerState::Ready);
        }

        self.transition(WorkerState::Draining);
        if let Err(e) = conn.close().await {
            warn!(worker = self.id, error = %e, "error closing connection");
        }
        self.transition(WorkerState::Closed);
        report
    }

    async fn execute(
        &self,
        conn: &mut Box<dyn QueryConnection>,
        params: &QueryParams,
    ) -> Result<usize, QueryError> {
        let query = conn.query(CPU_USAGE_QUERY, params);
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, query)
                .await
                .map_err(|_| QueryError::TimedOut(limit))?
                .map_err(QueryError::from),
            None => Ok(query.await?),
        }
    }

    /// Refuse further items and release everything already queued without a result.
    async fn abandon_queue(&mut self) -> usize {
        self.queue.close();
        let mut dropped = 0;
        // Each discarded item releases its barrier slot on drop.
        while self.queue.recv().await.is_some() {
            dropped += 1;
        }
        dropped
    }
}
