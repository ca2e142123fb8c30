//! Worker pool: partitions work items across workers and waits for the batch.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::barrier::DispatchBarrier;
use crate::config::BenchConfig;
use crate::db::Connector;
use crate::params::QueryParams;
use crate::partition::assign;
use crate::worker::{QueryResult, Worker, WorkerReport};

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub results: Vec<QueryResult>,
    /// Wall clock from first dispatch until every dispatched item completed.
    pub elapsed: Duration,
    pub workers: Vec<WorkerReport>,
}

impl RunOutcome {
    pub fn durations(&self) -> Vec<Duration> {
        self.results.iter().map(|r| r.duration).collect()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.failed).count()
    }

    pub fn dropped(&self) -> usize {
        self.workers.iter().map(|w| w.dropped).sum()
    }
}

pub struct WorkerPool {
    worker_count: NonZeroUsize,
    queue_capacity: usize,
    query_timeout: Option<Duration>,
    database_url: Arc<str>,
    connector: Arc<dyn Connector>,
}

impl WorkerPool {
    pub fn new(config: &BenchConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            worker_count: config.worker_count,
            queue_capacity: config.queue_capacity,
            query_timeout: config.query_timeout,
            database_url: Arc::from(config.database_url.as_str()),
            connector,
        }
    }

    pub fn worker_count(&self) -> NonZeroUsize {
        self.worker_count
    }

    pub async fn run(&self, items: Vec<QueryParams>) -> RunOutcome {
        let barrier = Arc::new(DispatchBarrier::new());
        // Never more results than items, so workers do not block on emit.
        let (results_tx, results_rx) = mpsc::channel(items.len().max(1));
        let aggregator = tokio::spawn(collect_results(results_rx));

        let mut queues = Vec::with_capacity(self.worker_count.get());
        let mut handles: Vec<JoinHandle<WorkerReport>> = Vec::with_capacity(self.worker_count.get());
        for id in 0..self.worker_count.get() {
            let (tx, rx) = mpsc::channel(self.queue_capacity);
            let worker = Worker::new(
                id,
                rx,
                results_tx.clone(),
                self.connector.clone(),
                self.database_url.clone(),
                self.query_timeout,
            );
            queues.push(tx);
            handles.push(tokio::spawn(worker.run()));
        }

        info!(
            workers = self.worker_count.get(),
            items = items.len(),
            "dispatching queries"
        );

        let start_time = Instant::now();
        let mut rejected = vec![0usize; self.worker_count.get()];
        for item in items {
            let target = assign(&item.hostname, self.worker_count);
            // Registered before the send so the barrier can never hit zero early.
            let completion = barrier.track();
            if let Err(mpsc::error::SendError((item, _))) =
                queues[target].send((item, completion)).await
            {
                warn!(worker = target, host = %item.hostname, "worker unavailable, dropping item");
                rejected[target] += 1;
            }
        }
        drop(queues);

        barrier.wait().await;
        drop(results_tx);
        let elapsed = start_time.elapsed();

        let mut workers = Vec::with_capacity(handles.len());
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(mut report) => {
                    // Sends refused after the worker gave up never reached its queue.
                    report.dropped += rejected[id];
                    workers.push(report);
                }
                Err(e) => {
                    error!(worker = id, rejected = rejected[id], error = %e, "worker task failed")
                }
            }
        }

        let results = match aggregator.await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "result aggregator failed");
                Vec::new()
            }
        };

        let outcome = RunOutcome {
            results,
            elapsed,
            workers,
        };
        info!(
            results = outcome.results.len(),
            failed = outcome.failed(),
            dropped = outcome.dropped(),
            ?elapsed,
            "batch complete"
        );
        outcome
    }
}

/// Drain the shared output channel until every sender is gone.
pub async fn collect_results(mut results: mpsc::Receiver<QueryResult>) -> Vec<QueryResult> {
    let mut collected = Vec::new();
    while let Some(result) = results.recv().await {
        collected.push(result);
    }
    collected
}
