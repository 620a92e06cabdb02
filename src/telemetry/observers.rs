//! # Observer accounting.
//!
//! The engine hands every attaching observer an [`ObserverGuard`]. When the
//! last guard for a session drops, the session's live snapshot is cleared and
//! its registry entry is released if idle — per-session ephemeral state lives
//! exactly as long as someone is watching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::SessionRegistry;

use super::live::LiveStateCache;

/// Reference counts of attached observers per session.
#[derive(Default)]
pub struct ObserverLedger {
    counts: Mutex<HashMap<String, usize>>,
}

impl ObserverLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers one observer; returns the new count.
    pub fn attach(&self, session: &str) -> usize {
        let mut counts = self.counts.lock().expect("observer ledger poisoned");
        let count = counts.entry(session.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Deregisters one observer; returns the remaining count.
    fn detach(&self, session: &str) -> usize {
        let mut counts = self.counts.lock().expect("observer ledger poisoned");
        match counts.get_mut(session) {
            Some(count) => {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(session);
                    0
                } else {
                    *count
                }
            }
            None => 0,
        }
    }

    /// Current observer count for `session`.
    pub fn count(&self, session: &str) -> usize {
        self.counts
            .lock()
            .expect("observer ledger poisoned")
            .get(session)
            .copied()
            .unwrap_or(0)
    }
}

/// RAII handle for one attached observer.
///
/// Dropping the last guard for a session tears down its ephemeral state.
pub struct ObserverGuard {
    session: Arc<str>,
    ledger: Arc<ObserverLedger>,
    live: Arc<LiveStateCache>,
    registry: Arc<SessionRegistry>,
}

impl ObserverGuard {
    pub(crate) fn new(
        session: Arc<str>,
        ledger: Arc<ObserverLedger>,
        live: Arc<LiveStateCache>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        ledger.attach(&session);
        Self {
            session,
            ledger,
            live,
            registry,
        }
    }

    /// Session this observer is attached to.
    pub fn session(&self) -> &str {
        &self.session
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if self.ledger.detach(&self.session) == 0 {
            self.live.clear(&self.session);
            self.registry.release_idle(&self.session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn guard(
        session: &str,
        ledger: &Arc<ObserverLedger>,
        live: &Arc<LiveStateCache>,
        registry: &Arc<SessionRegistry>,
    ) -> ObserverGuard {
        ObserverGuard::new(
            Arc::from(session),
            Arc::clone(ledger),
            Arc::clone(live),
            Arc::clone(registry),
        )
    }

    #[tokio::test]
    async fn last_detach_clears_live_state_and_idle_registry_entry() {
        let ledger = ObserverLedger::new();
        let live = Arc::new(LiveStateCache::new(Duration::from_secs(15)));
        let registry = SessionRegistry::new();
        registry.state("s1");
        live.push(
            "s1",
            crate::telemetry::LiveSnapshot {
                credential: "tok".into(),
                payload: "hi".into(),
                destinations: "1".into(),
                delay_secs: 30,
                config_name: "default".into(),
            },
        );

        let first = guard("s1", &ledger, &live, &registry);
        let second = guard("s1", &ledger, &live, &registry);
        assert_eq!(ledger.count("s1"), 2);

        drop(first);
        assert_eq!(ledger.count("s1"), 1);
        assert!(live.get("s1").is_some(), "live state survives while watched");

        drop(second);
        assert_eq!(ledger.count("s1"), 0);
        assert!(live.get("s1").is_none());
        assert!(registry.get("s1").is_none());
    }

    #[tokio::test]
    async fn active_sessions_survive_observer_teardown() {
        let ledger = ObserverLedger::new();
        let live = Arc::new(LiveStateCache::new(Duration::from_secs(15)));
        let registry = SessionRegistry::new();
        let state = registry.state("s1");
        let root = tokio_util::sync::CancellationToken::new();
        state.begin_run(&root).unwrap();

        drop(guard("s1", &ledger, &live, &registry));
        assert!(registry.get("s1").is_some());
    }
}
