//! Global bandwidth ceiling shared by all concurrent transfers.
//!
//! One limiter instance is created per batch run and handed to every fetch
//! via `Arc`, so the configured bytes-per-second rate is an aggregate across
//! all in-flight downloads, not a per-task allowance.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate used to model "no limit" without a special case: high enough that
/// any deficit sleeps round to zero, low enough to keep the math finite.
pub const UNLIMITED_BYTES_PER_SEC: f64 = 1e18;

/// Token bucket over bytes. Tokens accrue continuously at `rate` up to a
/// one-second burst cap; the bucket starts empty, so a cold batch pays the
/// full deficit up front instead of bursting past the ceiling.
///
/// `acquire` debits the bucket (into debt if the request exceeds what is
/// available) and sleeps the calling thread for the deficit time. Debiting
/// before sleeping keeps concurrent callers honest: each sleeps out its own
/// share, and total bytes released over any window stay within
/// `rate * window` plus the burst allowance.
pub struct BandwidthLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

struct Bucket {
    /// Currently available tokens; negative while in debt.
    available: f64,
    last_refill: Instant,
}

impl BandwidthLimiter {
    /// Creates a limiter with the given positive bytes-per-second rate.
    pub fn new(bytes_per_sec: f64) -> Self {
        let rate = bytes_per_sec.max(1.0);
        Self {
            rate,
            burst: rate,
            bucket: Mutex::new(Bucket {
                available: 0.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Takes `n` tokens, blocking the calling thread until the budget allows
    /// them. A request of 0 returns immediately.
    pub fn acquire(&self, n: u64) {
        if n == 0 {
            return;
        }
        let wait = {
            let mut bucket = self.bucket.lock().unwrap();
            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.last_refill = now;
            bucket.available = (bucket.available + elapsed * self.rate).min(self.burst);
            bucket.available -= n as f64;
            if bucket.available >= 0.0 {
                None
            } else {
                Some(Duration::from_secs_f64(-bucket.available / self.rate))
            }
        };
        if let Some(wait) = wait {
            std::thread::sleep(wait);
        }
    }
}
