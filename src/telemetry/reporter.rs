//! # Reporter: the single emission path for user-visible telemetry.
//!
//! Every log line flows through [`Reporter::log`]:
//! 1. durably appended to the session's bounded history via the store
//!    (append failures downgrade to an internal `tracing` warning — telemetry
//!    must never take a delivery loop down),
//! 2. published on the bus for live observers,
//! 3. followed by a `Status` event carrying the aggregate snapshot, so
//!    observers always hold a fresh picture without polling.

use std::sync::Arc;

use crate::core::SessionRegistry;
use crate::events::{Bus, Event, Level};
use crate::store::ConfigStore;

/// Cheap-to-clone emission handle shared by channel loops, the engine, and
/// restart supervisors.
#[derive(Clone)]
pub struct Reporter {
    bus: Bus,
    store: Arc<dyn ConfigStore>,
    registry: Arc<SessionRegistry>,
}

impl Reporter {
    pub fn new(bus: Bus, store: Arc<dyn ConfigStore>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            bus,
            store,
            registry,
        }
    }

    /// Emits one log line: persist, broadcast, then push status.
    pub async fn log(&self, session: &Arc<str>, level: Level, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(session = %session, level = level.as_label(), "{message}");
        if let Err(e) = self.store.append_log(session, level, &message).await {
            tracing::warn!(session = %session, error = %e, "failed to persist log entry");
        }
        self.bus
            .publish(Event::log(Arc::clone(session), level, message));
        self.push_status(session);
    }

    /// Publishes the current aggregate snapshot for `session`.
    pub fn push_status(&self, session: &Arc<str>) {
        self.bus.publish(Event::status(
            Arc::clone(session),
            self.registry.snapshot(session),
        ));
    }

    /// Records one accepted delivery: persist the increment, then emit the
    /// success line with the running total.
    pub async fn delivered(&self, session: &Arc<str>, label: &str, total: u64) {
        if let Err(e) = self.store.add_sent(session, 1).await {
            tracing::warn!(session = %session, error = %e, "failed to persist sent counter");
        }
        self.log(
            session,
            Level::Success,
            format!("Delivered to {label} ({total} total)"),
        )
        .await;
    }

    pub async fn info(&self, session: &Arc<str>, message: impl Into<String>) {
        self.log(session, Level::Info, message).await;
    }

    pub async fn warn(&self, session: &Arc<str>, message: impl Into<String>) {
        self.log(session, Level::Warn, message).await;
    }

    pub async fn error(&self, session: &Arc<str>, message: impl Into<String>) {
        self.log(session, Level::Error, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn log_persists_broadcasts_and_pushes_status() {
        let bus = Bus::new(16);
        let store = MemoryStore::new();
        let registry = SessionRegistry::new();
        let reporter = Reporter::new(bus.clone(), store.clone(), registry);
        let mut rx = bus.subscribe();
        let session: Arc<str> = Arc::from("s1");

        reporter.warn(&session, "slow down").await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Log);
        assert_eq!(first.level, Level::Warn);
        assert_eq!(first.message.as_deref(), Some("slow down"));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, EventKind::Status);
        assert!(second.status.is_some());

        let history = store.history("s1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "slow down");
    }

    #[tokio::test]
    async fn delivered_persists_increment_and_names_the_total() {
        let bus = Bus::new(16);
        let store = MemoryStore::new();
        let registry = SessionRegistry::new();
        let reporter = Reporter::new(bus.clone(), store.clone(), Arc::clone(&registry));
        let mut rx = bus.subscribe();
        let session: Arc<str> = Arc::from("s1");
        store
            .upsert(crate::store::StoredConfig {
                session: "s1".into(),
                credential: "tok".into(),
                payload: "hi".into(),
                destinations: vec!["1".into()],
                delay_secs: 30,
                wants_active: true,
                is_active: true,
                total_sent: 0,
            })
            .await
            .unwrap();

        reporter.delivered(&session, "general", 5).await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.level, Level::Success);
        assert!(ev.message.unwrap().contains("(5 total)"));
        let stored = store.load("s1").await.unwrap().unwrap();
        assert_eq!(stored.total_sent, 1);
    }
}
