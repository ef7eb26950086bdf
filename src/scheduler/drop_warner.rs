//! Rate-limited reporting of scheduler overload drops.

use crate::rate_limited_warner::RateLimitedWarner;

/// Why a command never reached the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DropReason {
    /// The command alone exceeded the queue threshold.
    Oversized,
    /// A queued write was evicted to make room.
    Evicted,
    /// The scheduler was not running.
    NotRunning,
}

/// One warner per [`DropReason`].
#[derive(Debug)]
pub(crate) struct DropWarner {
    oversized: RateLimitedWarner,
    evicted: RateLimitedWarner,
    not_running: RateLimitedWarner,
}

impl Default for DropWarner {
    fn default() -> Self {
        Self {
            oversized: RateLimitedWarner::new(
                "scheduler: packets dropped for exceeding the queue threshold",
            ),
            evicted: RateLimitedWarner::new("scheduler: queued packets evicted to make room"),
            not_running: RateLimitedWarner::new("scheduler: commands rejected while not running"),
        }
    }
}

impl DropWarner {
    pub(crate) fn record(&self, reason: DropReason, count: u64) {
        match reason {
            DropReason::Oversized => self.oversized.record(count),
            DropReason::Evicted => self.evicted.record(count),
            DropReason::NotRunning => self.not_running.record(count),
        }
    }

    pub(crate) fn flush(&self) {
        self.oversized.flush();
        self.evicted.flush();
        self.not_running.flush();
    }
}
