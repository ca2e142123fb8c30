//! Dispatch barrier: tracks dispatched-but-unfinished work items.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Counts pending work. The dispatcher registers each item before handing it
/// to a worker and the worker completes it once a result (or a drop) is
/// recorded; `wait` resolves when the count returns to zero.
#[derive(Debug, Default)]
pub struct DispatchBarrier {
    pending: AtomicUsize,
    notify: Notify,
}

impl DispatchBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub fn complete(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "complete() without matching register()");
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Register one item and return the guard that completes it when dropped.
    ///
    /// The guard travels with the item, so an item discarded anywhere
    /// (closed queue, unwinding worker) still releases the barrier.
    pub fn track(self: &Arc<Self>) -> Completion {
        self.register();
        Completion {
            barrier: self.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            // Created before the check so a notify_waiters() in between is not lost.
            let notified = self.notify.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    barrier: Arc<DispatchBarrier>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.barrier.complete();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_idle() {
        let barrier = DispatchBarrier::new();
        tokio::time::timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("idle barrier should not block");
    }

    #[tokio::test]
    async fn test_wait_blocks_until_all_complete() {
        let barrier = Arc::new(DispatchBarrier::new());
        for _ in 0..3 {
            barrier.register();
        }
        assert_eq!(barrier.pending(), 3);

        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait().await })
        };

        barrier.complete();
        barrier.complete();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.complete();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after last completion")
            .unwrap();
        assert_eq!(barrier.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_completions() {
        let barrier = Arc::new(DispatchBarrier::new());
        let mut handles = Vec::new();
        for _ in 0..64 {
            barrier.register();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                barrier.complete();
            }));
        }
        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier should drain");
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(barrier.pending(), 0);
    }

    #[tokio::test]
    async fn test_dropped_completion_releases_wait() {
        let barrier = Arc::new(DispatchBarrier::new());
        let first = barrier.track();
        let second = barrier.track();
        assert_eq!(barrier.pending(), 2);

        drop(first);
        assert_eq!(barrier.pending(), 1);

        let (tx, rx) = tokio::sync::mpsc::channel(1);
        tx.send(second).await.unwrap();
        // Dropping the receiver drops the buffered guard with it.
        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("guards dropped in a closed queue should release the barrier");
        assert_eq!(barrier.pending(), 0);
    }
}
