//! # Event bus for broadcasting engine events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing from multiple sources (channel loops, the session
//! engine, restart supervisors).
//!
//! ```text
//! Publishers (many):                    Subscribers (many):
//!   ChannelLoop 1 ──┐                 ┌──► observer A (filters by session)
//!   ChannelLoop 2 ──┼──────► Bus ─────┤
//!   Engine/Superv ──┘  (broadcast)    └──► observer B
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: a single ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip
//!   the `n` oldest items.
//! - **No persistence**: durable log history is the store's job, not the bus's.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for engine events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); every component
/// that emits events holds its own clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped; this still returns
    /// immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver observing events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of currently attached receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Level;
    use std::sync::Arc;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::log(Arc::from("s1"), Level::Info, "hello"));
        let ev = rx.recv().await.unwrap();
        assert_eq!(&*ev.session, "s1");
        assert_eq!(ev.message.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn publish_without_receivers_is_a_no_op() {
        let bus = Bus::new(8);
        // Must not panic or block.
        bus.publish(Event::log(Arc::from("s1"), Level::Info, "dropped"));
    }
}
