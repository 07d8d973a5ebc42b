use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, Instrument};

pub const DEFAULT_WORKERS: usize = 3;

/// A fixed number of worker tasks draining a shared queue.
///
/// Each call to [`WorkerPool::run`] is one phase: every item is queued up
/// front, the queue is closed, workers drain it, and all of them are joined
/// before the call returns. Phases never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `work` once per item and collect one result per item, in
    /// completion order.
    ///
    /// The first failing item stops the phase: remaining workers are aborted
    /// and the error is returned. A panicking worker surfaces as a
    /// `JoinError` converted into `E`.
    pub async fn run<T, R, E, F, Fut>(&self, items: Vec<T>, work: F) -> Result<Vec<R>, E>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: From<JoinError> + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let total = items.len();
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        for item in items {
            // The receiver is alive until the workers are spawned below.
            let _ = task_tx.send(item);
        }
        drop(task_tx);

        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<Result<R, E>>();
        let work = Arc::new(work);

        let mut workers = JoinSet::new();
        for id in 0..self.size.min(total) {
            let task_rx = Arc::clone(&task_rx);
            let result_tx = result_tx.clone();
            let work = Arc::clone(&work);
            workers.spawn(
                async move {
                    let mut handled = 0usize;
                    loop {
                        let next = task_rx.lock().await.recv().await;
                        let Some(item) = next else { break };
                        let outcome = (*work)(item).await;
                        let failed = outcome.is_err();
                        handled += 1;
                        if result_tx.send(outcome).is_err() || failed {
                            break;
                        }
                    }
                    debug!(handled, "worker finished");
                }
                .instrument(tracing::debug_span!("worker", id)),
            );
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while let Some(outcome) = result_rx.recv().await {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    workers.abort_all();
                    return Err(err);
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            joined?;
        }
        Ok(results)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}
