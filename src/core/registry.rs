//! # Session registry.
//!
//! Process-wide map from session identifier to [`SessionState`], lazily
//! created on first reference. The registry is an explicit, injectable object
//! owned by the engine — never a hidden singleton — so the engine stays
//! testable in isolation.
//!
//! Entries live for the process lifetime; [`SessionRegistry::release_idle`]
//! tears one down when the last observer detaches and the session is idle
//! (the persisted configuration is the durable record, not this map).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::state::{SessionState, StatusSnapshot};

/// Lazy map of per-session run state.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Arc<str>, Arc<SessionState>>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the state for `session`, creating it on first reference.
    pub fn state(&self, session: &str) -> Arc<SessionState> {
        if let Some(state) = self.get(session) {
            return state;
        }
        let mut sessions = self.sessions.write().expect("registry lock poisoned");
        // Double-checked: another caller may have created it meanwhile.
        if let Some(state) = sessions.get(session) {
            return Arc::clone(state);
        }
        let id: Arc<str> = Arc::from(session);
        let state = SessionState::new(Arc::clone(&id));
        sessions.insert(id, Arc::clone(&state));
        state
    }

    /// Returns the state for `session` without creating it.
    pub fn get(&self, session: &str) -> Option<Arc<SessionState>> {
        self.sessions
            .read()
            .expect("registry lock poisoned")
            .get(session)
            .cloned()
    }

    /// Aggregate status for one session; unknown sessions read as idle.
    pub fn snapshot(&self, session: &str) -> StatusSnapshot {
        self.get(session)
            .map(|s| s.snapshot())
            .unwrap_or_default()
    }

    /// Aggregate status for every known session.
    pub fn snapshots(&self) -> HashMap<String, StatusSnapshot> {
        self.sessions
            .read()
            .expect("registry lock poisoned")
            .iter()
            .map(|(id, state)| (id.to_string(), state.snapshot()))
            .collect()
    }

    /// Removes `session` if it exists and is idle. Returns whether it was
    /// removed.
    pub fn release_idle(&self, session: &str) -> bool {
        let mut sessions = self.sessions.write().expect("registry lock poisoned");
        match sessions.get(session) {
            Some(state) if !state.is_active() => {
                sessions.remove(session);
                true
            }
            _ => false,
        }
    }

    /// Number of known sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
