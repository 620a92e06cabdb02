//! # Delivery outcome taxonomy.
//!
//! Every delivery attempt collapses into one [`SendOutcome`]; the channel
//! loop's transitions are keyed entirely off this enum:
//!
//! ```text
//! Sent           → count it, jittered inter-send wait, go again
//! RateLimited    → wait retry_after + margin, go again
//! Forbidden      → warn, fixed long hold, go again (never abandoned)
//! Transient      → warn, escalating capped backoff, go again
//! Unauthorized   → terminate the whole session (credential is dead)
//! ```

use std::time::Duration;

/// Classified result of a single delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Upstream accepted the message.
    Sent,

    /// Upstream signaled throttling; wait at least `retry_after` plus the
    /// policy margin before the next attempt on this destination.
    RateLimited {
        /// Server-specified minimum wait.
        retry_after: Duration,
    },

    /// Credential rejected outright. Fatal for the entire session, not just
    /// this destination.
    Unauthorized,

    /// Credential lacks permission for this destination. Backed off for a
    /// long fixed interval and retried, since permissions may be restored.
    Forbidden,

    /// Network/transport failure or any other non-success status.
    Transient {
        /// Human-readable description for the warning log.
        error: String,
    },
}

impl SendOutcome {
    /// Whether the outcome ends the session rather than just this attempt.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SendOutcome::Unauthorized)
    }
}
