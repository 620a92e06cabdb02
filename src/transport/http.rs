//! # HTTP transport against the upstream messaging API.
//!
//! Classification rules:
//! - `2xx` → [`SendOutcome::Sent`]
//! - `429` → [`SendOutcome::RateLimited`] with the wait taken from the JSON
//!   body's `retry_after` (seconds, possibly fractional) or the `Retry-After`
//!   header, defaulting to 5s when neither parses
//! - `401` → [`SendOutcome::Unauthorized`]
//! - `403` → [`SendOutcome::Forbidden`]
//! - anything else, including transport errors → [`SendOutcome::Transient`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{CredentialCheck, SendOutcome, Transport};

/// Fallback wait when a 429 carries no usable retry hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Upper bound on an honored retry hint. The hint is attacker-influenced
/// input; anything past this is treated as nonsense.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Production transport over the upstream HTTP API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Creates a transport with a caller-supplied client (custom timeouts,
    /// proxies).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Extracts the throttle wait from a 429 response.
    async fn retry_after(response: reqwest::Response) -> Duration {
        let header = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok());

        let body = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("retry_after").and_then(|r| r.as_f64()));

        Self::clamp_retry_after(body.or(header))
    }

    /// Folds a parsed retry hint into a usable wait. Negative, non-finite, or
    /// overflowing values fall back to the default; honored hints are capped.
    fn clamp_retry_after(secs: Option<f64>) -> Duration {
        secs.and_then(|s| Duration::try_from_secs_f64(s).ok())
            .map(|d| d.min(MAX_RETRY_AFTER))
            .unwrap_or(DEFAULT_RETRY_AFTER)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, credential: &str, destination: &str, payload: &str) -> SendOutcome {
        let url = self.url(&format!("/channels/{destination}/messages"));
        let result = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, credential)
            .json(&serde_json::json!({ "content": payload }))
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                return SendOutcome::Transient {
                    error: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return SendOutcome::Sent;
        }
        match status {
            StatusCode::TOO_MANY_REQUESTS => SendOutcome::RateLimited {
                retry_after: Self::retry_after(response).await,
            },
            StatusCode::UNAUTHORIZED => SendOutcome::Unauthorized,
            StatusCode::FORBIDDEN => SendOutcome::Forbidden,
            other => SendOutcome::Transient {
                error: format!("unexpected status {other}"),
            },
        }
    }

    async fn lookup_label(&self, credential: &str, destination: &str) -> Option<String> {
        let url = self.url(&format!("/channels/{destination}"));
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, credential)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = response.json::<serde_json::Value>().await.ok()?;
        body.get("name")
            .and_then(|n| n.as_str())
            .map(str::to_string)
    }

    async fn validate_credential(&self, credential: &str) -> CredentialCheck {
        let url = self.url("/users/@me");
        let response = match self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, credential)
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return CredentialCheck::default(),
        };
        if !response.status().is_success() {
            return CredentialCheck::default();
        }
        let body = match response.json::<serde_json::Value>().await {
            Ok(b) => b,
            Err(_) => return CredentialCheck::default(),
        };
        CredentialCheck {
            valid: true,
            username: body
                .get("username")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            discriminator: body
                .get("discriminator")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_hint_is_honored_within_the_cap() {
        assert_eq!(
            HttpTransport::clamp_retry_after(Some(3.5)),
            Duration::from_secs_f64(3.5)
        );
        assert_eq!(
            HttpTransport::clamp_retry_after(Some(1_000_000.0)),
            MAX_RETRY_AFTER
        );
    }

    #[test]
    fn absurd_or_invalid_hints_fall_back_to_the_default() {
        assert_eq!(
            HttpTransport::clamp_retry_after(Some(1e300)),
            DEFAULT_RETRY_AFTER
        );
        assert_eq!(
            HttpTransport::clamp_retry_after(Some(f64::NAN)),
            DEFAULT_RETRY_AFTER
        );
        assert_eq!(
            HttpTransport::clamp_retry_after(Some(-1.0)),
            DEFAULT_RETRY_AFTER
        );
        assert_eq!(HttpTransport::clamp_retry_after(None), DEFAULT_RETRY_AFTER);
    }
}
