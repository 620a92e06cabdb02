//! # Restore-on-boot.
//!
//! On process startup, every persisted configuration whose intent flag is
//! still "active" gets its counters seeded from the store and its session
//! relaunched with `restore = true`. Sessions that fail the external
//! authorization gate are force-deactivated instead — the engine defers
//! entirely to the gate's decision at restore time.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::engine::Engine;
use crate::core::spec::StartRequest;

/// Access-control collaborator, consulted only at restore time.
#[async_trait]
pub trait AccessGate: Send + Sync + 'static {
    /// Whether the session is currently authorized to run.
    async fn is_authorized(&self, session: &str) -> bool;
}

impl Engine {
    /// Relaunches every persisted session whose intent flag is still active.
    ///
    /// Returns the number of sessions started. Incomplete configurations are
    /// skipped; unauthorized ones are force-deactivated.
    pub async fn restore_all(self: &Arc<Self>, gate: &dyn AccessGate) -> usize {
        let configs = match self.store.load_all().await {
            Ok(configs) => configs,
            Err(e) => {
                tracing::warn!(error = %e, "restore pass could not load configurations");
                return 0;
            }
        };

        let mut started = 0;
        for config in configs {
            if !config.wants_active {
                continue;
            }
            if !gate.is_authorized(&config.session).await {
                if let Err(e) = self.store.set_wants_active(&config.session, false).await {
                    tracing::warn!(session = %config.session, error = %e, "failed to deactivate unauthorized session");
                }
                if let Err(e) = self.store.set_active(&config.session, false).await {
                    tracing::warn!(session = %config.session, error = %e, "failed to clear active flag");
                }
                continue;
            }
            if !config.is_complete() {
                continue;
            }

            // Lifetime counter survives the process restart.
            self.registry.state(&config.session).seed_total(config.total_sent);

            let req = StartRequest {
                session: config.session.clone(),
                credential: config.credential,
                payload: config.payload,
                destinations: config.destinations.join("\n"),
                delay_secs: config.delay_secs,
            };
            match self.start(req, true).await {
                Ok(()) => started += 1,
                Err(e) => {
                    tracing::warn!(session = %config.session, error = %e, "restore start failed");
                }
            }
        }
        started
    }
}
