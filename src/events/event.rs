//! # Runtime events emitted by the engine.
//!
//! Two feeds share one event type:
//! - **Log events** — user-visible `(message, level)` lines from channel
//!   loops, the session engine, and the restart supervisor.
//! - **Status events** — the aggregate session snapshot, pushed whenever a
//!   log event fires and on demand.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Per-destination log order matches attempt order; the global
//! stream interleaves sessions and destinations.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::StatusSnapshot;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A user-visible log line.
    ///
    /// Sets:
    /// - `session`: session identifier
    /// - `level`: severity
    /// - `message`: the log line
    Log,

    /// Aggregate session status changed (or was requested).
    ///
    /// Sets:
    /// - `session`: session identifier
    /// - `status`: the snapshot
    Status,
}

/// Severity of a log event.
///
/// `Success` is distinct from `Info`: every accepted delivery emits a
/// success-level line with the running total, and observers render the two
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    /// Returns a short stable label (snake_case) for history records.
    pub fn as_label(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// Engine event with session scope and optional payload.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `message`/`status` are set depending on [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Session this event belongs to.
    pub session: Arc<str>,
    /// Event classification.
    pub kind: EventKind,
    /// Severity (meaningful for `Log`).
    pub level: Level,
    /// Log line (set for `Log`).
    pub message: Option<Arc<str>>,
    /// Aggregate snapshot (set for `Status`).
    pub status: Option<StatusSnapshot>,
}

impl Event {
    /// Creates a log event with the next global sequence number.
    pub fn log(session: Arc<str>, level: Level, message: impl Into<Arc<str>>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            session,
            kind: EventKind::Log,
            level,
            message: Some(message.into()),
            status: None,
        }
    }

    /// Creates a status event carrying the given snapshot.
    pub fn status(session: Arc<str>, snapshot: StatusSnapshot) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            session,
            kind: EventKind::Status,
            level: Level::Info,
            message: None,
            status: Some(snapshot),
        }
    }

    #[inline]
    pub fn is_log(&self) -> bool {
        matches!(self.kind, EventKind::Log)
    }

    #[inline]
    pub fn is_status(&self) -> bool {
        matches!(self.kind, EventKind::Status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let session: Arc<str> = Arc::from("s1");
        let a = Event::log(session.clone(), Level::Info, "one");
        let b = Event::log(session, Level::Info, "two");
        assert!(b.seq > a.seq);
    }

    #[test]
    fn log_event_carries_message_not_status() {
        let ev = Event::log(Arc::from("s1"), Level::Warn, "slow down");
        assert!(ev.is_log());
        assert_eq!(ev.message.as_deref(), Some("slow down"));
        assert!(ev.status.is_none());
    }

    #[test]
    fn status_event_carries_snapshot() {
        let ev = Event::status(Arc::from("s1"), StatusSnapshot::default());
        assert!(ev.is_status());
        assert!(ev.message.is_none());
        assert!(ev.status.is_some());
    }
}
