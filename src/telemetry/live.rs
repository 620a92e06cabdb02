//! # Live-state snapshot cache.
//!
//! Attached clients can push a snapshot of what they currently have
//! configured (credential, payload, destinations, delay, config name) for
//! display to privileged observers. The snapshot is purely advisory — it is
//! never read back into engine configuration.
//!
//! Entries expire lazily on read after the TTL (no background sweep) and are
//! cleared outright when the last observer for the session disconnects.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

/// Client-reported configuration snapshot for one session.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LiveSnapshot {
    pub credential: String,
    pub payload: String,
    pub destinations: String,
    pub delay_secs: u64,
    pub config_name: String,
}

struct LiveEntry {
    snapshot: LiveSnapshot,
    refreshed: Instant,
}

/// TTL cache of [`LiveSnapshot`]s keyed by session identifier.
pub struct LiveStateCache {
    ttl: Duration,
    inner: RwLock<HashMap<String, LiveEntry>>,
}

impl LiveStateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or refreshes the snapshot for `session`.
    pub fn push(&self, session: &str, snapshot: LiveSnapshot) {
        self.inner.write().expect("live cache lock poisoned").insert(
            session.to_string(),
            LiveEntry {
                snapshot,
                refreshed: Instant::now(),
            },
        );
    }

    /// Returns the snapshot for `session` if it is still fresh.
    ///
    /// A stale entry is discarded on this read.
    pub fn get(&self, session: &str) -> Option<LiveSnapshot> {
        {
            let inner = self.inner.read().expect("live cache lock poisoned");
            match inner.get(session) {
                Some(entry) if entry.refreshed.elapsed() <= self.ttl => {
                    return Some(entry.snapshot.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Stale: drop it under the write lock, re-checking freshness in case
        // a concurrent push refreshed the entry.
        let mut inner = self.inner.write().expect("live cache lock poisoned");
        if let Some(entry) = inner.get(session) {
            if entry.refreshed.elapsed() <= self.ttl {
                return Some(entry.snapshot.clone());
            }
            inner.remove(session);
        }
        None
    }

    /// Removes the snapshot for `session` (last observer disconnected).
    pub fn clear(&self, session: &str) {
        self.inner
            .write()
            .expect("live cache lock poisoned")
            .remove(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LiveSnapshot {
        LiveSnapshot {
            credential: "tok".into(),
            payload: "hi".into(),
            destinations: "1,2".into(),
            delay_secs: 30,
            config_name: "default".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_snapshot_is_returned() {
        let cache = LiveStateCache::new(Duration::from_secs(15));
        cache.push("s1", snapshot());
        tokio::time::advance(Duration::from_secs(14)).await;
        assert!(cache.get("s1").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_snapshot_is_discarded_on_read() {
        let cache = LiveStateCache::new(Duration::from_secs(15));
        cache.push("s1", snapshot());
        tokio::time::advance(Duration::from_secs(16)).await;
        assert!(cache.get("s1").is_none());
        // The lazy expiry removed the entry entirely.
        assert!(cache.get("s1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn push_refreshes_the_ttl() {
        let cache = LiveStateCache::new(Duration::from_secs(15));
        cache.push("s1", snapshot());
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.push("s1", snapshot());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(cache.get("s1").is_some());
    }

    #[tokio::test]
    async fn clear_removes_the_snapshot() {
        let cache = LiveStateCache::new(Duration::from_secs(15));
        cache.push("s1", snapshot());
        cache.clear("s1");
        assert!(cache.get("s1").is_none());
    }
}
