//! # Upstream transport: one send, one classification.
//!
//! [`Transport`] is the seam between the engine and the upstream messaging
//! service. Implementations perform exactly one network call per invocation,
//! never sleep, and never touch shared engine state; everything the upstream
//! can do wrong is folded into [`SendOutcome`] and handled by the channel
//! loop's state machine.
//!
//! [`HttpTransport`] is the production implementation; tests script their own
//! fakes against the same trait.

mod http;
mod labels;
mod outcome;

pub use http::HttpTransport;
pub use labels::LabelCache;
pub use outcome::SendOutcome;

use async_trait::async_trait;

/// Result of the read-only identity probe.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CredentialCheck {
    /// Whether the upstream accepted the credential.
    pub valid: bool,
    /// Account name, when the upstream reported one.
    pub username: Option<String>,
    /// Account discriminator, when the upstream reports one.
    pub discriminator: Option<String>,
}

/// Upstream messaging service, reduced to the three calls the engine needs.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs one send to one destination and classifies the outcome.
    ///
    /// Never returns an error: transport failures come back as
    /// [`SendOutcome::Transient`].
    async fn deliver(&self, credential: &str, destination: &str, payload: &str) -> SendOutcome;

    /// Resolves a destination identifier to a human-readable label.
    ///
    /// A single attempt; `None` on any failure. Callers fall back to the raw
    /// identifier.
    async fn lookup_label(&self, credential: &str, destination: &str) -> Option<String>;

    /// Read-only identity probe for the given credential.
    async fn validate_credential(&self, credential: &str) -> CredentialCheck;
}
