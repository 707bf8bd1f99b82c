//! Rate limiting for warnings raised on the send path.
//!
//! While the proxy is unreachable every `send_data` call fails, potentially
//! thousands of times per second. Failures are counted here and summarised at
//! most once per interval instead of producing one log line each.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Default minimum spacing between two summarised warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

const NEVER: u64 = u64::MAX;

/// Counts failures and emits a summary when the interval has elapsed.
///
/// The first warning is emitted immediately. Subsequent failures within the
/// interval are only counted; the next call to [`warn_if_due`] after the
/// interval reports how many accumulated. [`flush`] reports any pending count
/// regardless of timing.
///
/// [`warn_if_due`]: RateLimitedWarner::warn_if_due
/// [`flush`]: RateLimitedWarner::flush
#[derive(Debug)]
pub struct RateLimitedWarner {
    origin: Instant,
    interval_ms: u64,
    last_warn_ms: AtomicU64,
    pending: AtomicU64,
}

impl RateLimitedWarner {
    /// Create a warner that emits at most one warning per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval_ms: interval.as_millis().min(u128::from(u64::MAX - 1)) as u64,
            last_warn_ms: AtomicU64::new(NEVER),
            pending: AtomicU64::new(0),
        }
    }

    /// Count one failure.
    pub fn record(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of failures counted since the last emitted warning.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Call `warn` with the pending count if the interval has elapsed.
    ///
    /// When several threads race, only one of them emits.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = self.now_ms();
        let prev = self.last_warn_ms.load(Ordering::Relaxed);
        if prev != NEVER && now.saturating_sub(prev) < self.interval_ms {
            return;
        }
        if self
            .last_warn_ms
            .compare_exchange(prev, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
        }
    }

    /// Immediately report any pending failures.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn_ms.store(self.now_ms(), Ordering::Relaxed);
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin
            .elapsed()
            .as_millis()
            .min(u128::from(NEVER - 1)) as u64
    }
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}
