//! # Event system: bus + event types.
//!
//! Everything observers see goes through here: per-session log lines and
//! aggregate status snapshots, broadcast on a single process-wide [`Bus`].
//! Events carry their session identifier; observers filter on it.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Level};
