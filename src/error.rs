//! Error types used by the sendvisor engine.
//!
//! Two enums cover the two failure surfaces:
//!
//! - [`StartError`] — synchronous validation failures of a start request.
//!   These are surfaced to the caller and never retried automatically.
//! - [`StoreError`] — failures reported by the persistence collaborator.
//!
//! Everything the upstream service can do wrong (throttling, revoked
//! credentials, missing permissions, transport failures) is *not* an error
//! type: it is classified into [`SendOutcome`](crate::transport::SendOutcome)
//! and recovered inside the channel loop.

use thiserror::Error;

/// # Validation errors for [`Engine::start`](crate::Engine::start).
///
/// Evaluated in order; the first failure wins. None of these are retried by
/// the engine itself (the restart supervisor may retry a failed restore
/// attempt on its own schedule).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StartError {
    /// The session still has a live run (or one that did not drain in time).
    #[error("session is already running")]
    AlreadyRunning,

    /// No token in the destination input survived parsing.
    #[error("no valid destinations in input")]
    NoValidDestinations,

    /// The credential field was empty.
    #[error("credential is missing")]
    MissingCredential,

    /// The message payload was empty.
    #[error("message payload is missing")]
    MissingMessage,

    /// The persistence collaborator rejected a write on the start path.
    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}

impl StartError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartError::AlreadyRunning => "already_running",
            StartError::NoValidDestinations => "no_valid_destinations",
            StartError::MissingCredential => "missing_credential",
            StartError::MissingMessage => "missing_message",
            StartError::Store(_) => "store_failed",
        }
    }
}

/// # Errors reported by the persistence collaborator.
///
/// The engine only calls through the narrow [`ConfigStore`](crate::store::ConfigStore)
/// interface; whatever backend sits behind it reduces its failures to this.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend failed to execute the operation.
    #[error("store backend error: {message}")]
    Backend {
        /// Human-readable description from the backend.
        message: String,
    },
}

impl StoreError {
    /// Convenience constructor for backend failures.
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
        }
    }
}
