//! Distributed Backend Module
//!
//! Delegates storage to an external byte-oriented key/value store behind the
//! [`RemoteStore`] trait. The wire protocol belongs to the collaborator; this
//! backend only owns the entry envelope (serde-encoded [`StoredEntry`]) and
//! the key prefix.
//!
//! The remote store cannot enumerate or pattern-match keys, so pattern
//! removal is unsupported and `clear` is advisory only. Both are
//! capability-flagged, and the service logs the gap instead of failing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::{Backend, BackendCapabilities, Lookup, StoredEntry};
use crate::error::{CacheError, Result};

// == Remote Store Trait ==
/// Contract for the external distributed store: get/set-with-TTL/remove/
/// exists over raw bytes, addressed by string key. Implementations own
/// connection handling and the wire format.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<bool>;
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
}

// == Distributed Backend ==
/// Backend over an external store reachable over the network.
pub struct DistributedBackend {
    store: Arc<dyn RemoteStore>,
    key_prefix: String,
}

impl DistributedBackend {
    // == Constructor ==
    /// Creates a backend writing prefixed keys through `store`.
    pub fn new(store: Arc<dyn RemoteStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn unavailable(err: anyhow::Error) -> CacheError {
        CacheError::BackendUnavailable(err.to_string())
    }
}

#[async_trait]
impl Backend for DistributedBackend {
    async fn get(&self, key: &str) -> Result<Lookup> {
        let full_key = self.full_key(key);
        let bytes = self
            .store
            .get(&full_key)
            .await
            .map_err(Self::unavailable)?;

        let Some(bytes) = bytes else {
            return Ok(Lookup::Miss);
        };

        let entry: StoredEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable envelope (version drift, corruption): a miss,
                // never a hard failure on the read path
                warn!(key, error = %e, "unreadable remote entry envelope, treating as miss");
                return Ok(Lookup::Miss);
            }
        };

        if entry.is_expired() {
            // The remote TTL should have removed it already; lagging stores
            // get a best-effort cleanup
            if let Err(e) = self.store.remove(&full_key).await {
                debug!(key, error = %e, "failed to remove lagging expired remote entry");
            }
            return Ok(Lookup::Expired(entry));
        }

        Ok(Lookup::Hit(entry))
    }

    async fn set(&self, key: &str, entry: StoredEntry) -> Result<Option<String>> {
        let ttl = entry.remaining_ttl();
        let envelope = serde_json::to_vec(&entry).map_err(|e| CacheError::Encode(e.to_string()))?;

        self.store
            .set(&self.full_key(key), envelope, ttl)
            .await
            .map_err(Self::unavailable)?;
        Ok(None)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.store
            .remove(&self.full_key(key))
            .await
            .map_err(Self::unavailable)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.store
            .exists(&self.full_key(key))
            .await
            .map_err(Self::unavailable)
    }

    async fn clear(&self) -> Result<()> {
        // No reliable key enumeration over the remote store
        warn!(
            prefix = %self.key_prefix,
            "distributed backend cannot enumerate keys; clear is advisory only"
        );
        Ok(())
    }

    async fn remove_pattern(&self, _pattern: &str) -> Result<Vec<String>> {
        // Capability-gated in the service; reaching this is a no-op
        Ok(Vec::new())
    }

    fn entry_count(&self) -> Option<usize> {
        None
    }

    fn estimated_size(&self) -> Option<u64> {
        None
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            pattern_removal: false,
            full_clear: false,
        }
    }

    fn name(&self) -> &'static str {
        "distributed"
    }
}
