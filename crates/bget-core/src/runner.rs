//! Batch orchestration: submit every job, collect outcomes as they finish,
//! report progress, and tear the engine down.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::config::BgetConfig;
use crate::control::StopToken;
use crate::executor::BoundedExecutor;
use crate::fetch::{Fetcher, FetcherConfig};
use crate::job::DownloadJob;
use crate::outcome::{timed, JobOutcome, Timed};
use crate::progress::BatchProgress;

/// Per-run settings supplied by the caller; the ambient knobs come from
/// `BgetConfig`.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub workers: usize,
    pub out_dir: PathBuf,
    /// Aggregate bandwidth ceiling in bytes per second.
    pub speed_limit: f64,
}

/// Owns the HTTP client and the executor for the life of one batch run.
///
/// `run` consumes the runner: jobs are submitted by a separate task (so
/// admission backpressure never stalls collection), outcomes are collected
/// in completion order, and a progress snapshot is emitted after each one.
/// A stop request halts submission and collection without discarding
/// outcomes already collected; jobs never run produce no outcome at all.
pub struct BatchRunner {
    fetcher: Arc<Fetcher>,
    executor: BoundedExecutor,
    stop: StopToken,
    shutdown_grace: Duration,
}

impl BatchRunner {
    /// Wires up the client, limiter, and executor. Client construction
    /// happens on a blocking thread (the blocking client cannot be built
    /// while running on the async runtime) and is fatal on failure.
    pub async fn new(settings: BatchSettings, cfg: &BgetConfig) -> Result<Self> {
        let fetcher_cfg = FetcherConfig {
            out_dir: settings.out_dir.clone(),
            speed_limit: settings.speed_limit,
            workers: settings.workers,
            max_keep_alive_connections: cfg.max_keep_alive_connections,
            pool_idle: Duration::from_secs(cfg.pool_idle_secs),
            max_redirects: cfg.max_redirects,
        };
        let fetcher = tokio::task::spawn_blocking(move || Fetcher::new(fetcher_cfg))
            .await
            .context("fetcher init join")??;

        Ok(Self {
            fetcher: Arc::new(fetcher),
            executor: BoundedExecutor::new(settings.workers, cfg.queue_bound),
            stop: StopToken::new(),
            shutdown_grace: Duration::from_secs(cfg.shutdown_grace_secs),
        })
    }

    /// Token that stops this run cooperatively: submission and collection
    /// halt, in-flight transfers bail at their next chunk.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Runs the whole batch. Returns every collected outcome (completion
    /// order) wrapped with the batch's elapsed time, measured up to the end
    /// of collection; teardown time is not billed to the batch.
    pub async fn run(
        self,
        jobs: Vec<DownloadJob>,
        progress: Option<mpsc::Sender<BatchProgress>>,
    ) -> Result<Timed<Vec<Timed<JobOutcome>>>> {
        let BatchRunner {
            fetcher,
            mut executor,
            stop,
            shutdown_grace,
        } = self;

        let total = jobs.len();
        let started = Instant::now();
        tracing::info!(jobs = total, "starting batch");

        let (completion_tx, mut completion_rx) = mpsc::channel::<Timed<JobOutcome>>(total.max(1));
        let submit_stop = stop.clone();
        let submitter = tokio::spawn(async move {
            for job in jobs {
                if submit_stop.is_set() {
                    tracing::debug!("stop requested; halting submission");
                    break;
                }
                let fetcher = Arc::clone(&fetcher);
                let job_stop = submit_stop.clone();
                let tx = completion_tx.clone();
                let number = job.number;
                let work = move || {
                    let outcome = timed(|| fetcher.fetch(&job, &job_stop));
                    // The receiver is gone only when collection stopped early.
                    let _ = tx.blocking_send(outcome);
                };
                let submitted = tokio::select! {
                    _ = submit_stop.cancelled() => break,
                    result = executor.submit(work) => result,
                };
                if submitted.is_err() {
                    tracing::warn!(number, "executor rejected job; halting submission");
                    break;
                }
            }
            executor
        });

        let mut outcomes: Vec<Timed<JobOutcome>> = Vec::with_capacity(total);
        while outcomes.len() < total {
            tokio::select! {
                _ = stop.cancelled() => {
                    tracing::debug!(collected = outcomes.len(), "stop requested; halting collection");
                    break;
                }
                next = completion_rx.recv() => match next {
                    Some(outcome) => {
                        outcomes.push(outcome);
                        if let Some(tx) = &progress {
                            // Non-blocking: a slow progress consumer must
                            // never hold up collection.
                            let _ = tx.try_send(BatchProgress {
                                completed: outcomes.len(),
                                total,
                            });
                        }
                    }
                    // Every sender is gone: all submitted jobs reported.
                    None => break,
                },
            }
        }
        let elapsed = started.elapsed();

        // Teardown order: executor first (graceful, bounded), then the
        // client goes down with the last Fetcher reference.
        let mut executor = submitter.await.context("submitter task join")?;
        executor.shutdown(shutdown_grace).await;

        tracing::info!(
            collected = outcomes.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "batch finished"
        );
        Ok(Timed::new(outcomes, elapsed))
    }
}
