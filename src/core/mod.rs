//! # Core dispatch engine.
//!
//! One [`Engine`] hosts many sessions; each active session fans out one
//! [`ChannelLoop`](channel::ChannelLoop) per destination, aggregates their
//! terminal outcomes, and hands unexpected terminations to the restart
//! supervisor.
//!
//! ```text
//! StartRequest ──► Engine::start() ──► validation ──► run task
//!                                                       │
//!                       resolve labels ◄────────────────┤
//!                       JoinSet fan-out ◄───────────────┘
//!                        ChannelLoop × N  (staggered, per destination)
//!                              │
//!                     ChannelOutcome per loop
//!                              │
//!                       aggregation + finalization
//!                              │
//!        credential invalid ── user stop ── unexpected stop
//!              │                   │               │
//!        intent=false        shutdown log    restart supervisor
//! ```

mod channel;
mod config;
mod engine;
mod registry;
mod restore;
mod spec;
mod state;
mod supervisor;

pub use channel::ChannelOutcome;
pub use config::EngineConfig;
pub use engine::Engine;
pub use registry::SessionRegistry;
pub use restore::AccessGate;
pub use spec::{parse_destinations, StartRequest};
pub use state::{SessionState, StatusSnapshot};
