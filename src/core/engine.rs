//! # Session engine: validation, fan-out, aggregation, finalization.
//!
//! [`Engine`] owns the composition root: the registry, the event bus, the
//! label cache, the live-state cache, and handles to the persistence and
//! transport collaborators. One engine hosts all sessions of the process.
//!
//! ## Run lifecycle
//! ```text
//! start():
//!   ├─ wait ≤ stop_wait for a mid-shutdown run to drain (stop_poll steps)
//!   ├─ AlreadyRunning / NoValidDestinations / MissingCredential / MissingMessage
//!   ├─ clamp delay, mark active, fresh child token, persist config+intent
//!   └─ spawn run task
//!
//! run task:
//!   ├─ resolve labels sequentially (abort early on cancellation)
//!   ├─ one combined roster log
//!   ├─ JoinSet: one ChannelLoop per destination, staggered index × stagger
//!   ├─ aggregate: any CredentialInvalid → cancel the rest, session outcome
//!   │  is credential-invalid; otherwise stopped
//!   └─ finalize (always): reset state, persist inactive, then branch:
//!        credential-invalid → intent=false + error log
//!        user stop          → shutdown log
//!        otherwise          → restart supervisor task
//! ```
//!
//! Finalization runs regardless of how the loop set ended — a panicked loop
//! is logged and treated as stopped — so no failure can leave a session stuck
//! in an active state.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::channel::{ChannelLoop, ChannelOutcome};
use crate::core::config::EngineConfig;
use crate::core::registry::SessionRegistry;
use crate::core::spec::{parse_destinations, DeliverySpec, StartRequest};
use crate::core::state::{SessionState, StatusSnapshot};
use crate::core::supervisor;
use crate::error::StartError;
use crate::events::{Bus, Event};
use crate::store::{ConfigStore, StoredConfig};
use crate::telemetry::{LiveSnapshot, LiveStateCache, ObserverGuard, ObserverLedger, Reporter};
use crate::transport::{CredentialCheck, LabelCache, Transport};

/// Per-process dispatch engine hosting all sessions.
pub struct Engine {
    pub(crate) cfg: EngineConfig,
    pub(crate) bus: Bus,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) store: Arc<dyn ConfigStore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) labels: Arc<LabelCache>,
    pub(crate) live: Arc<LiveStateCache>,
    pub(crate) observers: Arc<ObserverLedger>,
    pub(crate) reporter: Reporter,
    pub(crate) root: CancellationToken,
}

impl Engine {
    /// Builds an engine around the given collaborators.
    pub fn new(
        cfg: EngineConfig,
        store: Arc<dyn ConfigStore>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        let registry = SessionRegistry::new();
        let reporter = Reporter::new(bus.clone(), Arc::clone(&store), Arc::clone(&registry));
        let live = Arc::new(LiveStateCache::new(cfg.live_ttl));
        Arc::new(Self {
            cfg,
            bus,
            registry,
            store,
            transport,
            labels: Arc::new(LabelCache::new()),
            live,
            observers: ObserverLedger::new(),
            reporter,
            root: CancellationToken::new(),
        })
    }

    /// Starts a delivery session.
    ///
    /// Validation is evaluated in order and the first failure wins; see
    /// [`StartError`]. On success the run task is spawned and this returns
    /// immediately.
    ///
    /// The returned future is boxed: the restart supervisor re-enters `start`,
    /// and the type-level cycle (start → run task → supervisor → start) has to
    /// be broken by erasure.
    pub fn start(
        self: &Arc<Self>,
        req: StartRequest,
        restore: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), StartError>> + Send>> {
        let engine = Arc::clone(self);
        Box::pin(async move { engine.start_impl(req, restore).await })
    }

    async fn start_impl(
        self: &Arc<Self>,
        req: StartRequest,
        restore: bool,
    ) -> Result<(), StartError> {
        let session: Arc<str> = Arc::from(req.session.as_str());
        let state = self.registry.state(&session);

        // A stop may still be draining; give it a bounded window.
        if state.is_stopping() {
            let deadline = Instant::now() + self.cfg.stop_wait;
            while state.is_active() && Instant::now() < deadline {
                tokio::time::sleep(self.cfg.stop_poll).await;
            }
        }
        if state.is_active() {
            return Err(StartError::AlreadyRunning);
        }

        let destinations = parse_destinations(&req.destinations);
        if destinations.is_empty() {
            return Err(StartError::NoValidDestinations);
        }
        if req.credential.is_empty() {
            return Err(StartError::MissingCredential);
        }
        if req.payload.is_empty() {
            return Err(StartError::MissingMessage);
        }

        let interval = self.cfg.clamp_delay(req.delay_secs);
        // The claim itself is the authoritative check; a racing start loses
        // here even if both passed the is_active read above.
        let Some(cancel) = state.begin_run(&self.root) else {
            return Err(StartError::AlreadyRunning);
        };

        let persisted = StoredConfig {
            session: req.session.clone(),
            credential: req.credential.clone(),
            payload: req.payload.clone(),
            destinations: destinations.iter().map(|d| d.to_string()).collect(),
            delay_secs: interval.as_secs(),
            wants_active: true,
            is_active: true,
            total_sent: state.total_sent(),
        };
        if let Err(e) = self.store.upsert(persisted).await {
            state.end_run();
            return Err(e.into());
        }

        self.reporter
            .info(
                &session,
                if restore {
                    "Delivery session auto-resumed"
                } else {
                    "Delivery session initialized"
                },
            )
            .await;

        let spec = DeliverySpec {
            credential: Arc::from(req.credential.as_str()),
            payload: Arc::from(req.payload.as_str()),
            destinations,
            interval,
        };
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_session(state, session, spec, cancel).await;
        });
        Ok(())
    }

    /// Requests cooperative stop of a session.
    ///
    /// Returns `false` if the session is idle; otherwise flips the run's
    /// cancellation, persists intent=false, and returns immediately without
    /// waiting for loops to drain.
    pub async fn stop(&self, session: &str) -> bool {
        let Some(state) = self.registry.get(session) else {
            return false;
        };
        if !state.request_stop(true) {
            return false;
        }
        if let Err(e) = self.store.set_wants_active(session, false).await {
            tracing::warn!(session, error = %e, "failed to persist intent flag on stop");
        }
        true
    }

    /// Aggregate status for one session; unknown sessions read as idle.
    pub fn status(&self, session: &str) -> StatusSnapshot {
        self.registry.snapshot(session)
    }

    /// Aggregate status for every known session.
    pub fn statuses(&self) -> HashMap<String, StatusSnapshot> {
        self.registry.snapshots()
    }

    /// Attaches an observer to `session`: a bus receiver (filter on
    /// `event.session`) plus the accounting guard.
    pub fn attach(&self, session: &str) -> (ObserverGuard, tokio::sync::broadcast::Receiver<Event>) {
        let guard = ObserverGuard::new(
            Arc::from(session),
            Arc::clone(&self.observers),
            Arc::clone(&self.live),
            Arc::clone(&self.registry),
        );
        (guard, self.bus.subscribe())
    }

    /// Raw event stream without observer accounting (internal tooling).
    pub fn observe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Ingests a client-reported live-state snapshot for `session`.
    pub fn push_live(&self, session: &str, snapshot: LiveSnapshot) {
        self.live.push(session, snapshot);
    }

    /// Returns the live-state snapshot for `session` if still fresh.
    pub fn live(&self, session: &str) -> Option<LiveSnapshot> {
        self.live.get(session)
    }

    /// Read-only identity probe for a credential.
    pub async fn check_credential(&self, credential: &str) -> CredentialCheck {
        self.transport.validate_credential(credential).await
    }

    /// Cancels every run and restart supervisor in the process.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Drives one run to its terminal outcome, then finalizes.
    async fn run_session(
        self: Arc<Self>,
        state: Arc<SessionState>,
        session: Arc<str>,
        spec: DeliverySpec,
        cancel: CancellationToken,
    ) {
        let outcome = self.drive_channels(&state, &session, &spec, &cancel).await;

        // Read the stop reason before resetting: the moment end_run clears
        // the active flag, a start waiting out the drain window begins a new
        // run and wipes the user-stop flag.
        let user_stop = state.user_requested_stop();

        // Finalization: always restore idle invariants before branching.
        state.end_run();
        if let Err(e) = self.store.set_active(&session, false).await {
            tracing::warn!(session = %session, error = %e, "failed to persist inactive status");
        }
        self.reporter.push_status(&session);

        match outcome {
            ChannelOutcome::CredentialInvalid => {
                if let Err(e) = self.store.set_wants_active(&session, false).await {
                    tracing::warn!(session = %session, error = %e, "failed to persist intent flag");
                }
                self.reporter
                    .error(
                        &session,
                        "Credential rejected by upstream; supply a fresh credential and start again",
                    )
                    .await;
            }
            ChannelOutcome::Stopped if user_stop => {
                self.reporter.info(&session, "Delivery session stopped").await;
            }
            ChannelOutcome::Stopped => {
                let engine = Arc::clone(&self);
                tokio::spawn(supervisor::supervise_restart(engine, session));
            }
        }
    }

    /// Resolves labels, fans out channel loops, and aggregates their
    /// terminal outcomes.
    async fn drive_channels(
        &self,
        state: &Arc<SessionState>,
        session: &Arc<str>,
        spec: &DeliverySpec,
        cancel: &CancellationToken,
    ) -> ChannelOutcome {
        let mut labels = Vec::with_capacity(spec.destinations.len());
        for destination in &spec.destinations {
            if cancel.is_cancelled() {
                return ChannelOutcome::Stopped;
            }
            labels.push(
                self.labels
                    .resolve(self.transport.as_ref(), &spec.credential, destination)
                    .await,
            );
        }

        let roster = labels
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        self.reporter
            .info(session, format!("Dispatching to {roster}"))
            .await;

        let mut set = JoinSet::new();
        for (index, (destination, label)) in
            spec.destinations.iter().zip(labels.into_iter()).enumerate()
        {
            let chan = ChannelLoop {
                state: Arc::clone(state),
                cancel: cancel.clone(),
                destination: Arc::clone(destination),
                label,
                credential: Arc::clone(&spec.credential),
                payload: Arc::clone(&spec.payload),
                interval: spec.interval,
                transport: Arc::clone(&self.transport),
                reporter: self.reporter.clone(),
                policy: self.cfg.retry,
            };
            let hold = self.cfg.stagger * index as u32;
            set.spawn(chan.run(hold));
        }

        let mut invalid = false;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(ChannelOutcome::CredentialInvalid) => {
                    invalid = true;
                    // Wind down co-running loops; not a user-initiated stop.
                    cancel.cancel();
                }
                Ok(ChannelOutcome::Stopped) => {}
                Err(e) => {
                    self.reporter
                        .error(session, format!("Delivery loop crashed: {e}"))
                        .await;
                }
            }
        }

        if invalid {
            ChannelOutcome::CredentialInvalid
        } else {
            ChannelOutcome::Stopped
        }
    }
}
