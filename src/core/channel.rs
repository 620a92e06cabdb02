//! # Channel loop: the per-(session, destination) unit of repeated delivery.
//!
//! State machine per loop:
//!
//! ```text
//! [staggered hold] ──► loop {
//!   cancellation observed?  ──► Stopped
//!   deliver()
//!     Sent         ──► count + success log ──► jittered inter-send wait
//!     RateLimited  ──► wait retry_after + margin (warn if > 5s)
//!     Forbidden    ──► warn ──► fixed 60s hold
//!     Transient    ──► warn ──► min(10s × misses, 120s)
//!     Unauthorized ──► CredentialInvalid (immediate, ends the session)
//! }
//! ```
//!
//! Every sleep is interruptible: cancellation resolves it early and the loop
//! terminates as `Stopped`. An in-flight delivery attempt is never aborted;
//! the loop honors cancellation after the attempt classifies.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::core::state::SessionState;
use crate::policies::{jitter, RetryPolicy};
use crate::telemetry::Reporter;
use crate::transport::{SendOutcome, Transport};

/// Terminal classification of one channel loop, consumed by the session
/// engine to decide the session's terminal result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The loop observed cancellation and wound down.
    Stopped,
    /// The upstream rejected the credential; the whole session is done.
    CredentialInvalid,
}

/// Decrements the session's loop count when the loop exits, however it exits.
struct LoopGuard(Arc<SessionState>);

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.channel_finished();
    }
}

/// Repeated delivery driver for one destination of one session.
pub(crate) struct ChannelLoop {
    pub state: Arc<SessionState>,
    pub cancel: CancellationToken,
    pub destination: Arc<str>,
    pub label: Arc<str>,
    pub credential: Arc<str>,
    pub payload: Arc<str>,
    pub interval: Duration,
    pub transport: Arc<dyn Transport>,
    pub reporter: Reporter,
    pub policy: RetryPolicy,
}

impl ChannelLoop {
    /// Runs until cancellation or an unrecoverable authorization failure.
    ///
    /// `initial_hold` is the staggered-start delay before the first attempt.
    pub(crate) async fn run(self, initial_hold: Duration) -> ChannelOutcome {
        self.state.channel_started();
        let _guard = LoopGuard(Arc::clone(&self.state));

        if !self.pause(initial_hold).await {
            return ChannelOutcome::Stopped;
        }

        let mut misses: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return ChannelOutcome::Stopped;
            }

            let outcome = self
                .transport
                .deliver(&self.credential, &self.destination, &self.payload)
                .await;

            match outcome {
                SendOutcome::Sent => {
                    misses = 0;
                    let total = self.state.record_sent();
                    self.reporter
                        .delivered(self.state.id(), &self.label, total)
                        .await;
                    if !self.pause(jitter::pace(self.interval)).await {
                        return ChannelOutcome::Stopped;
                    }
                }
                SendOutcome::RateLimited { retry_after } => {
                    let wait = self.policy.rate_limited(retry_after);
                    if self.policy.is_long_wait(wait) {
                        self.reporter
                            .warn(
                                self.state.id(),
                                format!(
                                    "Rate limited on {}; waiting {}s",
                                    self.label,
                                    wait.as_secs()
                                ),
                            )
                            .await;
                    }
                    if !self.pause(wait).await {
                        return ChannelOutcome::Stopped;
                    }
                }
                SendOutcome::Forbidden => {
                    let wait = self.policy.forbidden_hold;
                    self.reporter
                        .warn(
                            self.state.id(),
                            format!(
                                "Missing access to {}; retrying in {}s",
                                self.label,
                                wait.as_secs()
                            ),
                        )
                        .await;
                    if !self.pause(wait).await {
                        return ChannelOutcome::Stopped;
                    }
                }
                SendOutcome::Transient { error } => {
                    misses = misses.saturating_add(1);
                    let wait = self.policy.transient(misses);
                    self.reporter
                        .warn(
                            self.state.id(),
                            format!(
                                "Delivery to {} failed: {}; retrying in {}s",
                                self.label,
                                error,
                                wait.as_secs()
                            ),
                        )
                        .await;
                    if !self.pause(wait).await {
                        return ChannelOutcome::Stopped;
                    }
                }
                SendOutcome::Unauthorized => {
                    return ChannelOutcome::CredentialInvalid;
                }
            }
        }
    }

    /// Interruptible sleep; `false` means cancellation was observed.
    async fn pause(&self, wait: Duration) -> bool {
        if wait.is_zero() {
            return !self.cancel.is_cancelled();
        }
        select! {
            _ = time::sleep(wait) => true,
            _ = self.cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionRegistry;
    use crate::events::{Bus, EventKind, Level};
    use crate::store::MemoryStore;
    use crate::testutil::FakeTransport;
    use tokio::time::Instant;

    fn harness(
        registry: &Arc<SessionRegistry>,
        transport: Arc<FakeTransport>,
        session: &str,
        destination: &str,
        cancel: CancellationToken,
    ) -> (ChannelLoop, Bus) {
        let bus = Bus::new(64);
        let store = MemoryStore::new();
        let reporter = Reporter::new(bus.clone(), store, Arc::clone(registry));
        let state = registry.state(session);
        let chan = ChannelLoop {
            state,
            cancel,
            destination: Arc::from(destination),
            label: Arc::from(destination),
            credential: Arc::from("tok"),
            payload: Arc::from("hi"),
            interval: Duration::from_secs(10),
            transport,
            reporter,
            policy: RetryPolicy::default(),
        };
        (chan, bus)
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_terminates_immediately() {
        let registry = SessionRegistry::new();
        let transport = FakeTransport::quiet();
        transport.script("1", [SendOutcome::Unauthorized]);
        let (chan, _bus) = harness(&registry, transport, "s1", "1", CancellationToken::new());

        let outcome = chan.run(Duration::ZERO).await;
        assert_eq!(outcome, ChannelOutcome::CredentialInvalid);
        assert_eq!(registry.state("s1").snapshot().active_channels, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_wait_honors_server_hint_plus_margin() {
        let registry = SessionRegistry::new();
        let transport = FakeTransport::quiet();
        transport.script(
            "1",
            [
                SendOutcome::RateLimited {
                    retry_after: Duration::from_millis(3000),
                },
                SendOutcome::Sent,
            ],
        );
        let cancel = CancellationToken::new();
        let (chan, bus) = harness(&registry, Arc::clone(&transport), "s1", "1", cancel.clone());
        let mut rx = bus.subscribe();

        let handle = tokio::spawn(chan.run(Duration::ZERO));
        // Wait until the second attempt lands, then stop the loop.
        while transport.attempts("1") < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), ChannelOutcome::Stopped);

        let stamps = transport.attempt_times("1");
        assert!(
            stamps[1] - stamps[0] >= Duration::from_millis(4000),
            "second attempt came {:?} after the first",
            stamps[1] - stamps[0]
        );

        // A 4s wait is below the notice threshold: no warning was emitted.
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::Log {
                assert_ne!(ev.level, Level::Warn, "unexpected warning: {:?}", ev.message);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_transient_failures_escalate_and_reset() {
        let registry = SessionRegistry::new();
        let transport = FakeTransport::quiet();
        let fail = || SendOutcome::Transient {
            error: "connection refused".into(),
        };
        transport.script("1", [fail(), fail(), fail(), SendOutcome::Sent, fail()]);
        let cancel = CancellationToken::new();
        let (chan, _bus) = harness(&registry, Arc::clone(&transport), "s1", "1", cancel.clone());

        let handle = tokio::spawn(chan.run(Duration::ZERO));
        while transport.attempts("1") < 5 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        cancel.cancel();
        handle.await.unwrap();

        let stamps = transport.attempt_times("1");
        let gap = |i: usize| stamps[i + 1] - stamps[i];
        assert!(gap(0) >= Duration::from_secs(10) && gap(0) < Duration::from_secs(11));
        assert!(gap(1) >= Duration::from_secs(20) && gap(1) < Duration::from_secs(21));
        assert!(gap(2) >= Duration::from_secs(30) && gap(2) < Duration::from_secs(31));
        // The send reset the counter: the jittered inter-send wait is ≤ 11s,
        // well under the 40s a fourth consecutive failure would have cost.
        assert!(gap(3) <= Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_long_backoff() {
        let registry = SessionRegistry::new();
        let transport = FakeTransport::quiet(); // Forbidden: 60s holds
        let cancel = CancellationToken::new();
        let (chan, _bus) = harness(&registry, Arc::clone(&transport), "s1", "1", cancel.clone());

        let handle = tokio::spawn(chan.run(Duration::ZERO));
        while transport.attempts("1") < 1 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let before = Instant::now();
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), ChannelOutcome::Stopped);
        assert!(Instant::now() - before < Duration::from_secs(1));
    }
}
