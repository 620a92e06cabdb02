//! # Persistence collaborator, specified at its interface boundary.
//!
//! The engine never embeds storage logic; it calls through [`ConfigStore`],
//! keyed by session identifier. What sits behind the trait (a database, a
//! file, [`MemoryStore`]) is the embedder's choice.
//!
//! Log lines are durably appended to a bounded per-session history
//! (most-recent N entries) alongside the configuration record.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::events::Level;

/// Persisted delivery configuration for one session.
///
/// Read-mostly input to the engine; `wants_active` is the user's intent flag,
/// distinct from `is_active` (whether a run currently holds the session).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoredConfig {
    /// Opaque stable session identifier.
    pub session: String,
    /// Credential token for the upstream service.
    pub credential: String,
    /// Message payload to deliver.
    pub payload: String,
    /// Ordered destination identifiers.
    pub destinations: Vec<String>,
    /// Delay between sends per destination, in seconds (clamped on start).
    pub delay_secs: u64,
    /// Whether the user wants this session running.
    pub wants_active: bool,
    /// Whether a run currently holds this session.
    pub is_active: bool,
    /// Lifetime delivery counter.
    pub total_sent: u64,
}

impl StoredConfig {
    /// Whether the record has everything a restart needs.
    pub fn is_complete(&self) -> bool {
        !self.credential.is_empty() && !self.payload.is_empty() && !self.destinations.is_empty()
    }
}

/// One entry of the persisted log history.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Narrow persistence interface consumed by the engine.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    /// Loads one session's configuration, if it exists.
    async fn load(&self, session: &str) -> Result<Option<StoredConfig>, StoreError>;

    /// Loads every persisted configuration (boot restore pass).
    async fn load_all(&self) -> Result<Vec<StoredConfig>, StoreError>;

    /// Creates or replaces a session's configuration.
    async fn upsert(&self, config: StoredConfig) -> Result<(), StoreError>;

    /// Updates the run-active flag.
    async fn set_active(&self, session: &str, active: bool) -> Result<(), StoreError>;

    /// Updates the user-intent flag.
    async fn set_wants_active(&self, session: &str, wants: bool) -> Result<(), StoreError>;

    /// Adds `n` to the lifetime delivery counter.
    async fn add_sent(&self, session: &str, n: u64) -> Result<(), StoreError>;

    /// Appends one entry to the bounded log history.
    async fn append_log(&self, session: &str, level: Level, message: &str)
        -> Result<(), StoreError>;
}
