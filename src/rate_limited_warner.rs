//! Coalesced warnings for dropped packets.
//!
//! Overload policies discard packets without telling the producer. A
//! [`RateLimitedWarner`] keeps that loss visible in the log while emitting
//! at most one summary line per interval, however fast packets are lost.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::warn;

/// Minimum time between two summaries from the same warner.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Drop counter that logs `"<label> (<n> since last report)"` at a bounded
/// rate.
#[derive(Debug)]
pub struct RateLimitedWarner {
    label: String,
    interval_ms: u64,
    dropped: AtomicU64,
    last_warn: AtomicU64,
}

impl RateLimitedWarner {
    /// Warner using [`DEFAULT_WARN_INTERVAL`].
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_interval(label, DEFAULT_WARN_INTERVAL)
    }

    /// The first summary can be emitted immediately.
    pub fn with_interval(label: impl Into<String>, interval: Duration) -> Self {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            label: label.into(),
            interval_ms,
            dropped: AtomicU64::new(0),
            last_warn: AtomicU64::new(now_millis().saturating_sub(interval_ms)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Drops counted but not yet reported.
    pub fn pending(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Count `count` lost packets, warning if the interval has elapsed.
    pub fn record(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.dropped.fetch_add(count, Ordering::Relaxed);
        if let Some(total) = self.take_due(now_millis()) {
            self.emit(total);
        }
    }

    /// Report pending drops now, regardless of the interval.
    pub fn flush(&self) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            self.last_warn.store(now_millis(), Ordering::Relaxed);
            self.emit(count);
        }
    }

    /// Claim the pending count if a summary is due at `now`. Only one of
    /// several racing callers wins a given interval.
    fn take_due(&self, now: u64) -> Option<u64> {
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) < self.interval_ms {
            return None;
        }
        self.last_warn
            .compare_exchange(prev, now, Ordering::AcqRel, Ordering::Relaxed)
            .ok()?;
        match self.dropped.swap(0, Ordering::Relaxed) {
            0 => None,
            count => Some(count),
        }
    }

    fn emit(&self, count: u64) {
        warn!("{} ({count} since last report)", self.label);
    }
}
