//! # In-memory reference store.
//!
//! Backs tests and embedders that do not need durable storage. Log history is
//! bounded per session to the most-recent [`MemoryStore::history_limit`]
//! entries.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ConfigStore, LogEntry, StoredConfig};
use crate::error::StoreError;
use crate::events::Level;

/// Default bound for the per-session log history.
const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Default)]
struct Inner {
    configs: HashMap<String, StoredConfig>,
    logs: HashMap<String, VecDeque<LogEntry>>,
}

/// Thread-safe in-memory [`ConfigStore`].
pub struct MemoryStore {
    inner: RwLock<Inner>,
    history_limit: usize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Creates a store keeping at most `limit` log entries per session.
    pub fn with_history_limit(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Inner::default()),
            history_limit: limit.max(1),
        })
    }

    /// Returns the persisted log history for a session, oldest first.
    pub async fn history(&self, session: &str) -> Vec<LogEntry> {
        let inner = self.inner.read().await;
        inner
            .logs
            .get(session)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self, session: &str) -> Result<Option<StoredConfig>, StoreError> {
        Ok(self.inner.read().await.configs.get(session).cloned())
    }

    async fn load_all(&self) -> Result<Vec<StoredConfig>, StoreError> {
        Ok(self.inner.read().await.configs.values().cloned().collect())
    }

    async fn upsert(&self, config: StoredConfig) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        // Lifetime counter survives config rewrites.
        let carried = inner
            .configs
            .get(&config.session)
            .map(|c| c.total_sent.max(config.total_sent))
            .unwrap_or(config.total_sent);
        let mut config = config;
        config.total_sent = carried;
        inner.configs.insert(config.session.clone(), config);
        Ok(())
    }

    async fn set_active(&self, session: &str, active: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(cfg) = inner.configs.get_mut(session) {
            cfg.is_active = active;
        }
        Ok(())
    }

    async fn set_wants_active(&self, session: &str, wants: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(cfg) = inner.configs.get_mut(session) {
            cfg.wants_active = wants;
        }
        Ok(())
    }

    async fn add_sent(&self, session: &str, n: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(cfg) = inner.configs.get_mut(session) {
            cfg.total_sent = cfg.total_sent.saturating_add(n);
        }
        Ok(())
    }

    async fn append_log(
        &self,
        session: &str,
        level: Level,
        message: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let queue = inner.logs.entry(session.to_string()).or_default();
        if queue.len() == self.history_limit {
            queue.pop_front();
        }
        queue.push_back(LogEntry {
            level,
            message: message.to_string(),
        });
        Ok(())
    }
}
