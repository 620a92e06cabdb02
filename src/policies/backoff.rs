//! # Backoff policy for delivery retries and session restarts.
//!
//! [`RetryPolicy`] maps each recoverable delivery outcome to a wait:
//!
//! - **Rate limited** → the server-specified wait plus a fixed safety margin.
//! - **Forbidden** → a long fixed hold; permissions may be restored, so the
//!   destination is retried indefinitely rather than abandoned.
//! - **Transient** → linear escalation `step × consecutive`, capped; the
//!   consecutive counter resets on any accepted delivery.
//! - **Restart** → linear escalation `restart_step × attempt`, capped; used by
//!   the restart supervisor between relaunch attempts.
//!
//! Waits longer than [`RetryPolicy::long_wait_notice`] are worth a warning to
//! observers; shorter ones stay silent.

use std::time::Duration;

/// Wait computation for every recoverable failure class.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Safety margin added on top of a server-specified rate-limit wait.
    pub rate_limit_margin: Duration,
    /// Fixed hold after a permission rejection.
    pub forbidden_hold: Duration,
    /// Escalation step per consecutive transient failure.
    pub transient_step: Duration,
    /// Cap for transient escalation.
    pub transient_cap: Duration,
    /// Escalation step per restart attempt.
    pub restart_step: Duration,
    /// Cap for restart escalation.
    pub restart_cap: Duration,
    /// Waits longer than this are surfaced as warnings.
    pub long_wait_notice: Duration,
}

impl Default for RetryPolicy {
    /// Returns the policy the upstream service's limits were tuned against:
    /// - rate-limit margin 1s, forbidden hold 60s,
    /// - transient 10s × n capped at 120s,
    /// - restart 5s × n capped at 60s,
    /// - long-wait notice threshold 5s.
    fn default() -> Self {
        Self {
            rate_limit_margin: Duration::from_secs(1),
            forbidden_hold: Duration::from_secs(60),
            transient_step: Duration::from_secs(10),
            transient_cap: Duration::from_secs(120),
            restart_step: Duration::from_secs(5),
            restart_cap: Duration::from_secs(60),
            long_wait_notice: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Wait after an upstream throttle: the server's `retry_after` plus margin.
    pub fn rate_limited(&self, retry_after: Duration) -> Duration {
        retry_after.saturating_add(self.rate_limit_margin)
    }

    /// Wait after the `n`-th consecutive transient failure (1-based).
    ///
    /// `step × n`, clamped to [`RetryPolicy::transient_cap`]. `n = 0` is
    /// treated as 1 so a miscounted caller still waits.
    pub fn transient(&self, consecutive: u32) -> Duration {
        let n = consecutive.max(1);
        self.transient_step
            .saturating_mul(n)
            .min(self.transient_cap)
    }

    /// Wait before the `n`-th restart attempt (1-based).
    pub fn restart(&self, attempt: u32) -> Duration {
        let n = attempt.max(1);
        self.restart_step.saturating_mul(n).min(self.restart_cap)
    }

    /// Whether a wait is long enough to warrant a warning to observers.
    #[inline]
    pub fn is_long_wait(&self, wait: Duration) -> bool {
        wait > self.long_wait_notice
    }
}
