//! # sendvisor
//!
//! **Sendvisor** is a per-session message dispatch engine: it automates
//! repeated message delivery to multiple destinations on behalf of many
//! independent users, each isolated by session, while respecting upstream
//! rate limits and surviving transient failures without manual intervention.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ StartRequest │   │ StartRequest │   │ StartRequest │
//!     │ (session #1) │   │ (session #2) │   │ (session #3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Engine (composition root)                                        │
//! │  - SessionRegistry (lazy session id → run state)                  │
//! │  - Bus (broadcast log/status events)                              │
//! │  - LabelCache (destination id → label, process-wide)              │
//! │  - LiveStateCache (observer-pushed snapshots, 15s TTL)            │
//! │  - ConfigStore / Transport / AccessGate (injected collaborators)  │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//!   │ ChannelLoop │   │ ChannelLoop │   │ ChannelLoop │   (one per
//!   │ (dest #1)   │   │ (dest #2)   │   │ (dest #3)   │    destination)
//!   └┬────────────┘   └┬────────────┘   └┬────────────┘
//!    │ Sent / RateLimited / Forbidden / Transient / Unauthorized
//!    ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │ Aggregation: credential-invalid ends the session; a user stop     │
//! │ shuts down cleanly; anything else hands off to the restart        │
//! │ supervisor (min(5s × n, 60s), unbounded, intent-flag controlled)  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle of one channel loop
//! ```text
//! [stagger: index × 2s] ──► loop {
//!   Sent         → count + success log → uniform(0.9, 1.1) × delay
//!   RateLimited  → retry_after + 1s margin
//!   Forbidden    → warn, fixed 60s hold (never abandoned)
//!   Transient    → warn, min(10s × consecutive, 120s)
//!   Unauthorized → session terminal: credential invalid
//! }   all sleeps interruptible via the run's CancellationToken
//! ```
//!
//! ## Guarantees
//! - At-least-once delivery; duplicates are possible across a crash/restart
//!   boundary.
//! - Per-destination sends are strictly sequential; cross-destination
//!   ordering is scheduler-determined.
//! - `total_sent` increments are serialized — no lost updates under
//!   concurrent loops.
//! - Idle sessions always read as zero active loops with no start time.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use sendvisor::{Engine, EngineConfig, HttpTransport, MemoryStore, StartRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(
//!         EngineConfig::default(),
//!         MemoryStore::new(),
//!         Arc::new(HttpTransport::new("https://upstream.example/api")),
//!     );
//!
//!     engine
//!         .start(
//!             StartRequest {
//!                 session: "user-1".into(),
//!                 credential: "token".into(),
//!                 payload: "hello".into(),
//!                 destinations: "123, 456".into(),
//!                 delay_secs: 30,
//!             },
//!             false,
//!         )
//!         .await?;
//!
//!     let status = engine.status("user-1");
//!     println!("active={} sent={}", status.active, status.total_sent);
//!
//!     engine.stop("user-1").await;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod store;
mod telemetry;
mod transport;

#[cfg(test)]
pub(crate) mod testutil;

// ---- Public re-exports ----

pub use core::{
    parse_destinations, AccessGate, ChannelOutcome, Engine, EngineConfig, SessionRegistry,
    SessionState, StartRequest, StatusSnapshot,
};
pub use error::{StartError, StoreError};
pub use events::{Bus, Event, EventKind, Level};
pub use policies::{jitter, RetryPolicy};
pub use store::{ConfigStore, LogEntry, MemoryStore, StoredConfig};
pub use telemetry::{LiveSnapshot, LiveStateCache, ObserverGuard, Reporter};
pub use transport::{CredentialCheck, HttpTransport, LabelCache, SendOutcome, Transport};
