//! # Status/telemetry broadcasting.
//!
//! - [`Reporter`] — the single path for user-visible log lines: persist to
//!   the bounded history, publish on the bus, follow with a status snapshot.
//! - [`LiveStateCache`] — observer-pushed, TTL-bounded "live state" snapshots
//!   for session-scoped remote observation. Advisory telemetry only, never
//!   authoritative configuration.
//! - [`ObserverGuard`] — RAII observer accounting; dropping the last guard
//!   for a session clears its live snapshot and releases its idle registry
//!   entry.

mod live;
mod observers;
mod reporter;

pub use live::{LiveSnapshot, LiveStateCache};
pub use observers::{ObserverGuard, ObserverLedger};
pub use reporter::Reporter;
