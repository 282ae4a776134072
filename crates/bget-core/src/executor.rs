//! Admission-controlled execution of blocking download jobs.
//!
//! Two independent bounds: a fixed worker budget capping concurrent
//! transfers, and a much larger admission bound capping jobs that are
//! accepted but not yet complete. Submission waits for an admission permit,
//! so a producer can never outrun the workers by more than the bound.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Returned by `submit` once the executor no longer accepts work.
#[derive(Debug)]
pub struct ExecutorClosed;

impl fmt::Display for ExecutorClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "executor is shut down")
    }
}

impl std::error::Error for ExecutorClosed {}

/// Fixed-size worker budget plus admission bound over blocking closures.
///
/// Each accepted job owns its admission permit and drops it exactly once on
/// completion (success, failure, panic, or cancellation) so admission
/// accounting can never drift. Jobs run via `spawn_blocking` once one of
/// the `workers` slots frees up.
pub struct BoundedExecutor {
    worker_slots: Arc<Semaphore>,
    admission: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl BoundedExecutor {
    pub fn new(workers: usize, queue_bound: usize) -> Self {
        Self {
            worker_slots: Arc::new(Semaphore::new(workers.max(1))),
            admission: Arc::new(Semaphore::new(queue_bound.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Jobs accepted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Submits one blocking job, waiting until the admission bound allows
    /// it; this is the backpressure point for producers. Fails only when the
    /// executor has been shut down.
    pub async fn submit<F>(&mut self, work: F) -> Result<(), ExecutorClosed>
    where
        F: FnOnce() + Send + 'static,
    {
        let admitted = match Arc::clone(&self.admission).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Err(ExecutorClosed),
        };
        let worker_slots = Arc::clone(&self.worker_slots);
        self.tasks.spawn(async move {
            // Held for the job's whole life; every exit path below releases
            // it exactly once.
            let _admitted = admitted;
            let Ok(_slot) = worker_slots.acquire_owned().await else {
                // Pool torn down after admission was granted: drop the job.
                return;
            };
            if let Err(join_err) = tokio::task::spawn_blocking(work).await {
                tracing::warn!("worker panicked: {}", join_err);
            }
        });
        Ok(())
    }

    /// Stops accepting work, waits up to `grace` for in-flight jobs, then
    /// cancels whatever remains (zero grace = abrupt shutdown). Idempotent.
    /// A job already running on a blocking thread finishes on its own; its
    /// completion is simply no longer awaited, so such jobs must watch a
    /// stop flag to exit promptly.
    pub async fn shutdown(&mut self, grace: Duration) {
        self.admission.close();
        let drained = tokio::time::timeout(grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = self.tasks.len(),
                "shutdown grace elapsed; cancelling remaining jobs"
            );
            self.worker_slots.close();
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }
    }
}
