//! # Destination label cache.
//!
//! Resolves destination identifiers to human-readable labels for logging.
//! The cache is process-wide and keyed by identifier only (not by credential):
//! whichever session resolves a destination first labels it for everyone.
//!
//! Resolution never fails the caller: a failed lookup yields the raw
//! identifier as the label and leaves the cache entry unpopulated, so the next
//! resolution request tries the upstream again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::Transport;

/// Process-wide `destination id → label` cache.
#[derive(Default)]
pub struct LabelCache {
    inner: RwLock<HashMap<String, Arc<str>>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `destination` to a label, consulting the cache first.
    ///
    /// On cache miss performs a single upstream lookup; on lookup failure
    /// returns the raw identifier without caching it.
    pub async fn resolve(
        &self,
        transport: &dyn Transport,
        credential: &str,
        destination: &str,
    ) -> Arc<str> {
        if let Some(label) = self.get(destination) {
            return label;
        }
        match transport.lookup_label(credential, destination).await {
            Some(label) => {
                let label: Arc<str> = Arc::from(label.as_str());
                self.inner
                    .write()
                    .expect("label cache lock poisoned")
                    .insert(destination.to_string(), Arc::clone(&label));
                label
            }
            None => Arc::from(destination),
        }
    }

    /// Returns the cached label, if any.
    pub fn get(&self, destination: &str) -> Option<Arc<str>> {
        self.inner
            .read()
            .expect("label cache lock poisoned")
            .get(destination)
            .cloned()
    }

    /// Number of cached labels.
    pub fn len(&self) -> usize {
        self.inner.read().expect("label cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
