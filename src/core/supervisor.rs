//! # Restart supervisor.
//!
//! Invoked only for unexpected termination: the loop set ended without a
//! user-initiated stop and without a credential rejection. Runs as its own
//! task — an explicit `Terminated → Restarting → Running` transition, never
//! the run loop calling itself — so the retry policy is independently
//! testable and the call stack stays flat.
//!
//! ```text
//! loop (attempt n = 1, 2, ...):
//!   ├─ wait min(restart_step × n, restart_cap), warn with attempt + wait
//!   │    (aborts if the engine shuts down)
//!   ├─ re-read persisted configuration
//!   │    ├─ gone or intent=false → cancellation log, stop permanently
//!   │    └─ incomplete           → warn, next iteration
//!   └─ start(restore=true)
//!        ├─ Ok  → done; the fresh run owns the session
//!        └─ Err → log the reason, next iteration
//! ```
//!
//! Retries are unbounded: only a cleared intent flag (or a removed
//! configuration) ends the loop.

use std::sync::Arc;

use crate::core::engine::Engine;
use crate::core::spec::StartRequest;

pub(crate) async fn supervise_restart(engine: Arc<Engine>, session: Arc<str>) {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        let wait = engine.cfg.retry.restart(attempt);
        engine
            .reporter
            .warn(
                &session,
                format!(
                    "Delivery loops ended unexpectedly; restart attempt {attempt} in {}s",
                    wait.as_secs()
                ),
            )
            .await;

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = engine.root.cancelled() => return,
        }

        // Always restart from the latest persisted configuration.
        let config = match engine.store.load(&session).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                engine
                    .reporter
                    .info(&session, "Auto-restart cancelled: configuration removed")
                    .await;
                return;
            }
            Err(e) => {
                engine
                    .reporter
                    .warn(&session, format!("Auto-restart deferred: {e}"))
                    .await;
                continue;
            }
        };

        if !config.wants_active {
            engine
                .reporter
                .info(&session, "Auto-restart cancelled: session deactivated")
                .await;
            return;
        }
        if !config.is_complete() {
            engine
                .reporter
                .warn(&session, "Auto-restart deferred: configuration incomplete")
                .await;
            continue;
        }

        let req = StartRequest {
            session: config.session,
            credential: config.credential,
            payload: config.payload,
            destinations: config.destinations.join("\n"),
            delay_secs: config.delay_secs,
        };
        match engine.start(req, true).await {
            Ok(()) => return,
            Err(e) => {
                engine
                    .reporter
                    .warn(&session, format!("Restart failed: {e}"))
                    .await;
            }
        }
    }
}
