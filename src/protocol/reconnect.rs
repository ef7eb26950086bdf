//! Reconnection gate consulted before silently reopening a failed transport.

use std::time::Instant;

use super::config::ReconnectPolicy;

/// Tracks reconnection attempts against a [`ReconnectPolicy`].
#[derive(Debug)]
pub(crate) struct ReconnectState {
    policy: ReconnectPolicy,
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl ReconnectState {
    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            last_attempt: None,
        }
    }

    /// Whether a reconnect may be tried at `now`.
    pub(crate) fn attempt_due(&self, now: Instant) -> bool {
        if !self.policy.enabled {
            return false;
        }
        if let Some(max) = self.policy.max_attempts
            && self.attempts >= max
        {
            return false;
        }
        match self.last_attempt {
            Some(last) => now.duration_since(last) >= self.policy.interval,
            None => true,
        }
    }

    /// Note a failure outside a reconnect attempt. Only the interval
    /// restarts; the attempt budget is untouched.
    pub(crate) fn note_failure(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Note a failed reconnect attempt at `now`.
    pub(crate) fn record_failure(&mut self, now: Instant) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);
    }

    pub(crate) fn record_success(&mut self) {
        self.attempts = 0;
        self.last_attempt = None;
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    fn policy(interval_ms: u64, max_attempts: Option<u32>) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: true,
            interval: Duration::from_millis(interval_ms),
            max_attempts,
        }
    }

    #[rstest]
    fn disabled_policy_never_reconnects() {
        let state = ReconnectState::new(ReconnectPolicy::default());
        assert!(!state.attempt_due(Instant::now()));
    }

    #[rstest]
    fn interval_gates_attempts() {
        let mut state = ReconnectState::new(policy(1_000, None));
        let start = Instant::now();
        assert!(state.attempt_due(start));
        state.record_failure(start);
        assert!(!state.attempt_due(start + Duration::from_millis(999)));
        assert!(state.attempt_due(start + Duration::from_millis(1_000)));
    }

    #[rstest]
    fn attempts_are_bounded_until_success() {
        let mut state = ReconnectState::new(policy(0, Some(2)));
        let now = Instant::now();
        state.record_failure(now);
        assert!(state.attempt_due(now));
        state.record_failure(now);
        assert!(!state.attempt_due(now));
        assert_eq!(state.attempts(), 2);

        state.record_success();
        assert!(state.attempt_due(now));
        assert_eq!(state.attempts(), 0);
    }

    #[rstest]
    fn noted_failures_restart_the_interval_only() {
        let mut state = ReconnectState::new(policy(1_000, Some(1)));
        let start = Instant::now();
        state.note_failure(start);
        assert_eq!(state.attempts(), 0);
        assert!(!state.attempt_due(start + Duration::from_millis(500)));
        assert!(state.attempt_due(start + Duration::from_millis(1_000)));
    }
}
