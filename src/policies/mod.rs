//! # Retry and pacing policies.
//!
//! - [`RetryPolicy`] — how long to wait after each delivery outcome, and how
//!   restart attempts escalate.
//! - [`jitter`] — randomized spread for the inter-send interval.

mod backoff;
pub mod jitter;

pub use backoff::RetryPolicy;
