//! Per-job outcome model and elapsed-time wrapping.

use std::time::{Duration, Instant};

use crate::fetch::FetchError;

/// Final word on one job: exactly one outcome per job that ran, carrying
/// enough to trace back to the originating `DownloadJob`.
#[derive(Debug)]
pub enum JobOutcome {
    Success {
        /// 1-based job number.
        number: u32,
        url: String,
        /// Bytes read from the response body; every destination received an
        /// identical copy, so this equals each destination's length.
        bytes_saved: u64,
    },
    Failed {
        number: u32,
        url: String,
        error: FetchError,
    },
}

impl JobOutcome {
    pub fn number(&self) -> u32 {
        match self {
            JobOutcome::Success { number, .. } | JobOutcome::Failed { number, .. } => *number,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            JobOutcome::Success { url, .. } | JobOutcome::Failed { url, .. } => url,
        }
    }

    /// Bytes written per destination; defined as 0 for failures.
    pub fn bytes_saved(&self) -> u64 {
        match self {
            JobOutcome::Success { bytes_saved, .. } => *bytes_saved,
            JobOutcome::Failed { .. } => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }
}

/// A value paired with how long it took to produce, used both for a single
/// download and for the whole batch.
#[derive(Debug)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    pub fn new(value: T, elapsed: Duration) -> Self {
        Self { value, elapsed }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Runs `f`, measuring wall-clock time around it.
pub fn timed<T>(f: impl FnOnce() -> T) -> Timed<T> {
    let start = Instant::now();
    let value = f();
    Timed::new(value, start.elapsed())
}
