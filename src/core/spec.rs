//! # Start requests and destination parsing.
//!
//! [`StartRequest`] is the external start surface; [`DeliverySpec`] is the
//! validated, shareable form a run actually executes.

use std::sync::Arc;
use std::time::Duration;

/// External start request, as submitted by a caller (or rebuilt from a
/// persisted configuration on restore/restart).
#[derive(Clone, Debug)]
pub struct StartRequest {
    /// Opaque stable session identifier.
    pub session: String,
    /// Credential token for the upstream service.
    pub credential: String,
    /// Message payload to deliver.
    pub payload: String,
    /// Raw destination input; split on commas and newlines.
    pub destinations: String,
    /// Delay between sends per destination, in seconds (clamped by the engine).
    pub delay_secs: u64,
}

/// Validated delivery plan for one run.
#[derive(Clone, Debug)]
pub(crate) struct DeliverySpec {
    pub credential: Arc<str>,
    pub payload: Arc<str>,
    pub destinations: Vec<Arc<str>>,
    pub interval: Duration,
}

/// Parses destination identifiers from raw input.
///
/// Splits on commas and newlines, trims, and keeps only tokens composed
/// entirely of digits. Order is preserved; duplicates are dropped.
pub fn parse_destinations(raw: &str) -> Vec<Arc<str>> {
    let mut seen = Vec::new();
    for token in raw.split(|c| c == ',' || c == '\n' || c == '\r') {
        let token = token.trim();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if seen.iter().any(|s: &Arc<str>| &**s == token) {
            continue;
        }
        seen.push(Arc::from(token));
    }
    seen
}
