//! Shared test doubles.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::transport::{CredentialCheck, SendOutcome, Transport};

/// Scripted transport: per-destination outcome queues, recorded attempt
/// times, and a configurable outcome once a script runs dry.
///
/// The default dry outcome is [`SendOutcome::Forbidden`]: loops settle into
/// quiet fixed holds instead of racing the paused clock with endless sends,
/// which keeps counter assertions exact.
pub(crate) struct FakeTransport {
    scripts: Mutex<HashMap<String, VecDeque<SendOutcome>>>,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    dry: SendOutcome,
}

impl FakeTransport {
    /// Transport whose exhausted scripts yield `Forbidden`.
    pub fn quiet() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            dry: SendOutcome::Forbidden,
        })
    }

    /// Queues outcomes for one destination.
    pub fn script(&self, destination: &str, outcomes: impl IntoIterator<Item = SendOutcome>) {
        self.scripts
            .lock()
            .expect("scripts poisoned")
            .entry(destination.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// Number of delivery attempts observed for one destination.
    pub fn attempts(&self, destination: &str) -> usize {
        self.attempts
            .lock()
            .expect("attempts poisoned")
            .get(destination)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Timestamps of every attempt on one destination, in order.
    pub fn attempt_times(&self, destination: &str) -> Vec<Instant> {
        self.attempts
            .lock()
            .expect("attempts poisoned")
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    /// Total attempts across all destinations.
    pub fn total_attempts(&self) -> usize {
        self.attempts
            .lock()
            .expect("attempts poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn deliver(&self, _credential: &str, destination: &str, _payload: &str) -> SendOutcome {
        self.attempts
            .lock()
            .expect("attempts poisoned")
            .entry(destination.to_string())
            .or_default()
            .push(Instant::now());
        self.scripts
            .lock()
            .expect("scripts poisoned")
            .get_mut(destination)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.dry.clone())
    }

    async fn lookup_label(&self, _credential: &str, _destination: &str) -> Option<String> {
        None
    }

    async fn validate_credential(&self, credential: &str) -> CredentialCheck {
        CredentialCheck {
            valid: !credential.is_empty(),
            username: Some("tester".to_string()),
            discriminator: Some("0001".to_string()),
        }
    }
}
