//! Single-job fetch unit.
//!
//! One GET against the shared client with redirects followed manually, a
//! strict final-status-200 rule, and the body streamed through the shared
//! bandwidth limiter into every destination file. All failures are caught
//! at this boundary and classified; a fetch never aborts the batch.

use anyhow::{Context, Result};
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use url::Url;

use crate::control::StopToken;
use crate::job::DownloadJob;
use crate::limiter::BandwidthLimiter;
use crate::outcome::JobOutcome;
use crate::storage;
use crate::throttle::ThrottledReader;

const COPY_BUF_BYTES: usize = 8 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Classified cause of a failed fetch. Each variant renders a
/// human-readable description for the results table.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Terminal HTTP status other than 200.
    #[error("unexpected response status {0}")]
    Status(u16),
    /// Connection-level failure (refused, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body stream broke mid-transfer.
    #[error("response stream error: {0}")]
    Stream(#[source] std::io::Error),
    /// A destination directory or file could not be created or written.
    #[error("storage error: {0}")]
    Storage(#[source] std::io::Error),
    /// The batch was stopped while this job was transferring.
    #[error("download interrupted")]
    Interrupted,
    /// Redirect chain exceeded the hop budget.
    #[error("stopped following redirects after {0} hops")]
    RedirectLoop(usize),
    /// Redirect response without a resolvable Location target.
    #[error("redirect from {0} carries no usable Location")]
    BadRedirect(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Settings for the shared HTTP client and destination layout.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub out_dir: PathBuf,
    /// Aggregate bandwidth ceiling in bytes per second.
    pub speed_limit: f64,
    /// Concurrent transfer count; also used as the per-host keep-alive cap.
    pub workers: usize,
    /// Floor for total keep-alive connections; raised to the worker count
    /// so the pool can never starve the workers.
    pub max_keep_alive_connections: usize,
    /// How long idle keep-alive connections stay pooled.
    pub pool_idle: Duration,
    /// Redirect hop budget per request.
    pub max_redirects: usize,
}

/// Executes download jobs against one shared client and one shared
/// bandwidth budget. Cheap to share across workers behind an `Arc`.
pub struct Fetcher {
    client: Client,
    out_dir: PathBuf,
    limiter: Arc<BandwidthLimiter>,
    max_redirects: usize,
}

impl Fetcher {
    /// Builds the shared client. Call from a blocking context: the
    /// blocking client refuses to be driven from inside an async runtime.
    /// Construction failure is fatal to the whole batch.
    pub fn new(cfg: FetcherConfig) -> Result<Self> {
        let keep_alive_total = cfg.max_keep_alive_connections.max(cfg.workers);
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            // Whole-request timeout off: throttled transfers are
            // legitimately slow by design.
            .timeout(None)
            .pool_idle_timeout(cfg.pool_idle)
            .pool_max_idle_per_host(cfg.workers)
            .build()
            .context("building HTTP client")?;
        tracing::debug!(
            keep_alive_total,
            per_host = cfg.workers,
            rate = cfg.speed_limit,
            "fetcher ready"
        );
        Ok(Self {
            client,
            out_dir: cfg.out_dir,
            limiter: Arc::new(BandwidthLimiter::new(cfg.speed_limit)),
            max_redirects: cfg.max_redirects,
        })
    }

    /// Runs one job to its outcome. Never panics and never returns an
    /// error: every failure ends up inside `JobOutcome::Failed`.
    pub fn fetch(&self, job: &DownloadJob, stop: &StopToken) -> JobOutcome {
        let span = tracing::debug_span!("job", number = job.number, url = %job.url);
        let _guard = span.enter();
        tracing::debug!(destinations = job.file_names.len(), "starting download");

        match self.try_fetch(job, stop) {
            Ok(bytes_saved) => {
                tracing::debug!(bytes_saved, "download finished");
                JobOutcome::Success {
                    number: job.number,
                    url: job.url.clone(),
                    bytes_saved,
                }
            }
            Err(error) => {
                match &error {
                    FetchError::Status(_) | FetchError::Interrupted => {
                        tracing::warn!(%error, "download failed")
                    }
                    _ => tracing::error!(%error, "download failed"),
                }
                JobOutcome::Failed {
                    number: job.number,
                    url: job.url.clone(),
                    error,
                }
            }
        }
    }

    fn try_fetch(&self, job: &DownloadJob, stop: &StopToken) -> Result<u64, FetchError> {
        let response = self.execute_following_redirects(&job.url)?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let writer = storage::open_destinations(&self.out_dir, &job.file_names)
            .map_err(FetchError::Storage)?;
        self.copy_body(response, writer, stop)
    }

    /// GET with redirects followed by hand. Besides the usual temporary and
    /// permanent codes, 305 and 308 (which stock client configurations
    /// tend to skip) are honored through their Location header.
    fn execute_following_redirects(&self, url: &str) -> Result<Response, FetchError> {
        let mut current: Url = url.parse()?;
        for _ in 0..=self.max_redirects {
            let response = self.client.get(current.clone()).send()?;
            let status = response.status();
            if !is_followed_redirect(status) {
                return Ok(response);
            }
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| FetchError::BadRedirect(current.to_string()))?;
            let next = current
                .join(location)
                .map_err(|_| FetchError::BadRedirect(current.to_string()))?;
            tracing::debug!(status = status.as_u16(), to = %next, "following redirect");
            current = next;
        }
        Err(FetchError::RedirectLoop(self.max_redirects))
    }

    /// Streams the body into the fan-out writer, settling every chunk with
    /// the shared limiter and checking the stop token between chunks.
    /// Returns bytes read from the body, identical to what every
    /// destination received.
    fn copy_body<W: Write>(
        &self,
        response: Response,
        mut writer: storage::FanoutWriter<W>,
        stop: &StopToken,
    ) -> Result<u64, FetchError> {
        let mut reader = ThrottledReader::new(response, Arc::clone(&self.limiter));
        let mut buf = [0u8; COPY_BUF_BYTES];
        let mut total = 0u64;
        loop {
            if stop.is_set() {
                // Writer drops here, closing every destination.
                return Err(FetchError::Interrupted);
            }
            let n = reader.read(&mut buf).map_err(FetchError::Stream)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).map_err(FetchError::Storage)?;
            total += n as u64;
        }
        writer.finish().map_err(FetchError::Storage)?;
        Ok(total)
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::USE_PROXY
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}
