//! Reader adapter that charges every byte against the shared bandwidth budget.

use std::io::Read;
use std::sync::Arc;

use crate::limiter::BandwidthLimiter;

/// Wraps a byte source so each read settles with the limiter before the
/// bytes reach the caller, coupling producer pace to the global ceiling no
/// matter how fast the underlying source could deliver. End of stream (a
/// 0-byte read) acquires nothing. The limiter is shared, not owned: dropping
/// the reader releases only the inner source.
pub struct ThrottledReader<R> {
    inner: R,
    limiter: Arc<BandwidthLimiter>,
}

impl<R: Read> ThrottledReader<R> {
    pub fn new(inner: R, limiter: Arc<BandwidthLimiter>) -> Self {
        Self { inner, limiter }
    }
}

impl<R: Read> Read for ThrottledReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.limiter.acquire(n as u64);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::UNLIMITED_BYTES_PER_SEC;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    #[test]
    fn read_paces_to_the_ceiling() {
        // 1024 bytes at 512 B/s from an empty bucket: at least ~2s.
        let limiter = Arc::new(BandwidthLimiter::new(512.0));
        let mut reader = ThrottledReader::new(Cursor::new(vec![7u8; 1024]), limiter);
        let start = Instant::now();
        let mut sink = Vec::new();
        let copied = reader.read_to_end(&mut sink).unwrap();
        let elapsed = start.elapsed();
        assert_eq!(copied, 1024);
        assert!(
            elapsed >= Duration::from_millis(1800),
            "expected >= ~2s, got {:?}",
            elapsed
        );
    }

    #[test]
    fn empty_source_returns_without_acquiring() {
        // Rate of 1 B/s would stall for any acquisition; EOF must not touch it.
        let limiter = Arc::new(BandwidthLimiter::new(1.0));
        let mut reader = ThrottledReader::new(Cursor::new(Vec::new()), limiter);
        let start = Instant::now();
        let mut sink = Vec::new();
        assert_eq!(reader.read_to_end(&mut sink).unwrap(), 0);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn unlimited_ceiling_removes_the_lower_bound() {
        let limiter = Arc::new(BandwidthLimiter::new(UNLIMITED_BYTES_PER_SEC));
        let mut reader = ThrottledReader::new(Cursor::new(vec![0u8; 1 << 20]), limiter);
        let start = Instant::now();
        let mut sink = Vec::new();
        assert_eq!(reader.read_to_end(&mut sink).unwrap(), 1 << 20);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
