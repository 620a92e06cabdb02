//! # Per-session run state.
//!
//! One [`SessionState`] per session identifier, owned by the
//! [`SessionRegistry`](crate::core::SessionRegistry). Channel loops mutate it
//! (counter increments, loop count) while the broadcaster and status queries
//! read it; increments are serialized through atomics, readers may observe a
//! slightly stale snapshot.
//!
//! ## Invariant
//! `active == false` implies `active_channels == 0` and `started_at` absent.
//! A cancelled run token is only meaningful while the session is active; every
//! new run installs a fresh child token.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

/// Aggregate session status, as reported to observers.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct StatusSnapshot {
    /// True while at least one channel loop is running.
    pub active: bool,
    /// Lifetime delivery counter.
    pub total_sent: u64,
    /// Currently running channel loops ("active destinations").
    pub active_channels: usize,
    /// Launch time of the current run, absent when idle.
    pub started_at: Option<SystemTime>,
}

struct RunSlot {
    token: CancellationToken,
    started_at: Option<SystemTime>,
}

/// Mutable run state for one session.
pub struct SessionState {
    id: Arc<str>,
    active: AtomicBool,
    total_sent: AtomicU64,
    active_channels: AtomicUsize,
    user_stop: AtomicBool,
    run: Mutex<RunSlot>,
}

impl SessionState {
    pub(crate) fn new(id: Arc<str>) -> Arc<Self> {
        Arc::new(Self {
            id,
            active: AtomicBool::new(false),
            total_sent: AtomicU64::new(0),
            active_channels: AtomicUsize::new(0),
            user_stop: AtomicBool::new(false),
            run: Mutex::new(RunSlot {
                token: CancellationToken::new(),
                started_at: None,
            }),
        })
    }

    /// Session identifier.
    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// True while a cancellation has been requested but loops have not drained.
    pub fn is_stopping(&self) -> bool {
        self.is_active() && self.run.lock().expect("run slot poisoned").token.is_cancelled()
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::SeqCst)
    }

    /// Whether the current/last run's cancellation was user-initiated.
    pub(crate) fn user_requested_stop(&self) -> bool {
        self.user_stop.load(Ordering::SeqCst)
    }

    /// Claims the session for a new run and installs a fresh run token.
    ///
    /// The claim is a compare-and-swap on the active flag: exactly one of any
    /// concurrently racing starts wins, the rest get `None`. On success the
    /// user-stop flag is cleared, the start time stamped, and the token
    /// channel loops observe is returned.
    pub(crate) fn begin_run(&self, parent: &CancellationToken) -> Option<CancellationToken> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        let token = parent.child_token();
        {
            let mut run = self.run.lock().expect("run slot poisoned");
            run.token = token.clone();
            run.started_at = Some(SystemTime::now());
        }
        self.user_stop.store(false, Ordering::SeqCst);
        self.active_channels.store(0, Ordering::SeqCst);
        Some(token)
    }

    /// Resets the session to idle values.
    pub(crate) fn end_run(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.active_channels.store(0, Ordering::SeqCst);
        self.run.lock().expect("run slot poisoned").started_at = None;
    }

    /// Requests cooperative cancellation of the current run.
    ///
    /// Returns `false` when idle. `user` marks the cancellation as
    /// user-initiated so finalization skips the restart supervisor.
    pub(crate) fn request_stop(&self, user: bool) -> bool {
        if !self.is_active() {
            return false;
        }
        if user {
            self.user_stop.store(true, Ordering::SeqCst);
        }
        self.run.lock().expect("run slot poisoned").token.cancel();
        true
    }

    /// Cancels the current run without marking it user-initiated.
    ///
    /// Used when a credential rejection winds down co-running loops, and by
    /// tests simulating unexpected termination.
    pub(crate) fn interrupt(&self) {
        self.request_stop(false);
    }

    /// Serialized counter increment; returns the new lifetime total.
    pub(crate) fn record_sent(&self) -> u64 {
        self.total_sent.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Seeds the lifetime counter from a persisted total. Idle sessions only.
    pub(crate) fn seed_total(&self, total: u64) {
        if !self.is_active() {
            self.total_sent.store(total, Ordering::SeqCst);
        }
    }

    pub(crate) fn channel_started(&self) {
        self.active_channels.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn channel_finished(&self) {
        // end_run may already have zeroed the count.
        let _ = self
            .active_channels
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Point-in-time aggregate status.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            active: self.is_active(),
            total_sent: self.total_sent(),
            active_channels: self.active_channels.load(Ordering::SeqCst),
            started_at: self.run.lock().expect("run slot poisoned").started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_state_upholds_the_invariant() {
        let state = SessionState::new(Arc::from("s1"));
        let snap = state.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.active_channels, 0);
        assert!(snap.started_at.is_none());
    }

    #[test]
    fn begin_run_sets_active_and_clears_user_stop() {
        let state = SessionState::new(Arc::from("s1"));
        let root = CancellationToken::new();

        let token = state.begin_run(&root).unwrap();
        assert!(state.is_active());
        assert!(state.snapshot().started_at.is_some());
        assert!(!token.is_cancelled());

        assert!(state.request_stop(true));
        assert!(token.is_cancelled());
        assert!(state.user_requested_stop());

        // A new run clears the user-stop flag and installs a fresh token.
        state.end_run();
        let token2 = state.begin_run(&root).unwrap();
        assert!(!state.user_requested_stop());
        assert!(!token2.is_cancelled());
    }

    #[test]
    fn begin_run_claims_the_session_exactly_once() {
        let state = SessionState::new(Arc::from("s1"));
        let root = CancellationToken::new();

        assert!(state.begin_run(&root).is_some());
        assert!(state.begin_run(&root).is_none(), "second claim must lose");

        state.end_run();
        assert!(state.begin_run(&root).is_some());
    }

    #[test]
    fn end_run_restores_the_invariant() {
        let state = SessionState::new(Arc::from("s1"));
        let root = CancellationToken::new();
        state.begin_run(&root).unwrap();
        state.channel_started();
        state.channel_started();

        state.end_run();
        let snap = state.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.active_channels, 0);
        assert!(snap.started_at.is_none());
    }

    #[test]
    fn stop_while_idle_is_refused() {
        let state = SessionState::new(Arc::from("s1"));
        assert!(!state.request_stop(true));
        assert!(!state.user_requested_stop());
    }

    #[test]
    fn record_sent_is_monotonic_and_seed_respects_activity() {
        let state = SessionState::new(Arc::from("s1"));
        state.seed_total(40);
        assert_eq!(state.record_sent(), 41);

        let root = CancellationToken::new();
        state.begin_run(&root).unwrap();
        state.seed_total(0); // ignored while active
        assert_eq!(state.total_sent(), 41);
    }

    #[test]
    fn channel_finished_never_underflows() {
        let state = SessionState::new(Arc::from("s1"));
        state.channel_finished();
        assert_eq!(state.snapshot().active_channels, 0);
    }
}
