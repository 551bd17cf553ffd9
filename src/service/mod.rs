//! Cache Service Module
//!
//! The public cache contract: typed get/set, tag-based bulk invalidation,
//! warmup orchestration, and statistics, composed from a codec, a backend,
//! a tag index, and a metrics collector.
//!
//! Read-path failures (undecodable entries, unreachable backend) degrade to
//! a miss; write- and invalidation-path failures propagate, because a caller
//! that just invalidated something must know if the invalidation did not
//! take effect.


use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{
    Backend, CachePriority, DistributedBackend, Lookup, MemoryBackend, RemoteStore, StoredEntry,
};
use crate::codec::Codec;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::tags::TagIndex;
use crate::tasks::spawn_sweep_task;
use crate::warmup::{WarmupCoordinator, WarmupReport, WarmupStrategy};

use serde::de::DeserializeOwned;
use serde::Serialize;

// == Cache Options ==
/// Per-write options. Everything here is optional; defaults mean "plain
/// entry with the configured default TTL".
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// TTL for this entry; falls back to the configured default
    pub expiration: Option<Duration>,
    /// Compress the encoded payload even when compression is disabled
    /// globally (still subject to the size threshold)
    pub enable_compression: bool,
    /// Tags to index this entry under
    pub tags: Vec<String>,
    /// Advisory eviction priority
    pub priority: CachePriority,
}

// == Cache Service ==
/// Orchestrates one backend, one codec, one tag index, and one metrics
/// collector. Safe to share across tasks behind an `Arc`; no operation
/// takes a service-wide lock.
pub struct CacheService {
    backend: Arc<dyn Backend>,
    codec: Codec,
    tags: Arc<TagIndex>,
    metrics: Arc<MetricsCollector>,
    config: CacheConfig,
    sweep_handle: Option<JoinHandle<()>>,
}

impl CacheService {
    // == Constructors ==
    /// Creates a service over an already-built backend. No background sweep
    /// is spawned; use [`CacheService::with_memory`] for that.
    pub fn new(backend: Arc<dyn Backend>, config: CacheConfig) -> Self {
        Self {
            codec: Codec::from_config(&config),
            metrics: Arc::new(MetricsCollector::new(config.latency_sample_capacity)),
            tags: Arc::new(TagIndex::new()),
            backend,
            config,
            sweep_handle: None,
        }
    }

    /// Creates a service over an in-process memory backend and spawns the
    /// periodic TTL sweep. Must be called from within a tokio runtime.
    pub fn with_memory(config: CacheConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new(config.max_entries));
        let mut service = Self::new(backend.clone(), config);
        service.sweep_handle = Some(spawn_sweep_task(
            backend,
            service.tags.clone(),
            service.metrics.clone(),
            service.config.sweep_interval,
        ));
        service
    }

    /// Creates a service over a distributed backend delegating to `store`,
    /// using the configured key prefix.
    pub fn with_remote_store(store: Arc<dyn RemoteStore>, config: CacheConfig) -> Self {
        let backend = Arc::new(DistributedBackend::new(store, config.key_prefix.clone()));
        Self::new(backend, config)
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".to_string()));
        }
        Ok(())
    }

    // == Get ==
    /// Returns the cached value for `key`, or `None` on a miss.
    ///
    /// An entry that cannot be decoded, or a backend that cannot be reached
    /// for the read, is treated as a miss and logged, never surfaced as an
    /// error: cached data is a secondary source of truth.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Self::validate_key(key)?;
        let start = Instant::now();

        let lookup = match self.backend.get(key).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(key, error = %e, "backend read failed, treating as miss");
                self.metrics.record_miss();
                self.metrics.record_latency(start.elapsed());
                return Ok(None);
            }
        };

        let result = match lookup {
            Lookup::Hit(entry) => match self.codec.decode(key, &entry.payload, entry.compressed) {
                Ok(value) => {
                    self.metrics.record_hit();
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "undecodable cache entry, treating as miss");
                    self.metrics.record_miss();
                    None
                }
            },
            Lookup::Miss => {
                self.metrics.record_miss();
                debug!(key, "cache miss");
                None
            }
            Lookup::Expired(_) => {
                // The backend lazily dropped the entry; keep the index and
                // eviction count in step
                self.tags.remove_key(key);
                self.metrics.record_eviction();
                self.metrics.record_miss();
                debug!(key, "cache entry expired");
                None
            }
        };

        self.metrics.record_latency(start.elapsed());
        Ok(result)
    }

    // == Get Or Create ==
    /// Returns the cached value, or invokes `factory` and caches its result
    /// under the given (or default) TTL.
    ///
    /// Concurrent callers missing the same key each invoke `factory`: there
    /// is deliberately no single-flight coalescing, so call-count guarantees
    /// match the documented contract. A factory returning `Ok(None)` caches
    /// nothing; a factory error propagates unchanged as
    /// [`CacheError::Factory`] and leaves no entry behind.
    pub async fn get_or_create<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        factory: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(Some(value));
        }

        let produced = factory().await.map_err(CacheError::Factory)?;
        match produced {
            Some(value) => {
                let options = CacheOptions {
                    expiration: ttl,
                    ..Default::default()
                };
                self.set(key, &value, options).await?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // == Set ==
    /// Encodes and stores `value` under `key`, updating the tag index.
    ///
    /// Backend failures propagate: callers may depend on the write having
    /// taken effect. The tag index is updated synchronously after the
    /// backend write completes, so cancellation cannot leave the entry
    /// indexed but unwritten or vice versa.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, options: CacheOptions) -> Result<()> {
        Self::validate_key(key)?;
        if options.tags.iter().any(|t| t.is_empty()) {
            return Err(CacheError::InvalidValue(
                "tags must not be empty strings".to_string(),
            ));
        }
        let start = Instant::now();

        let (payload, compressed) = self.codec.encode(value, options.enable_compression)?;
        let ttl = options.expiration.unwrap_or(self.config.default_ttl);
        let entry = StoredEntry::new(
            payload,
            compressed,
            Some(ttl),
            options.tags.clone(),
            options.priority,
        );

        let evicted = self.backend.set(key, entry).await?;
        self.tags.insert(key, &options.tags);

        if let Some(victim) = evicted {
            self.tags.remove_key(&victim);
            self.metrics.record_eviction();
        }

        self.metrics.record_set();
        self.metrics.record_latency(start.elapsed());
        debug!(key, compressed, tags = options.tags.len(), "cache set");
        Ok(())
    }

    // == Remove ==
    /// Deletes `key` from the backend and prunes it from the tag index.
    /// Backend failures propagate.
    pub async fn remove(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;

        self.backend.remove(key).await?;
        self.tags.remove_key(key);
        debug!(key, "cache remove");
        Ok(())
    }

    // == Remove By Pattern ==
    /// Best-effort removal of all keys matching `pattern`.
    ///
    /// On backends without native pattern scanning this is a logged no-op:
    /// a documented capability gap, not a silent correctness violation,
    /// since pattern removal is advisory cleanup rather than invalidation
    /// the caller strictly depends on.
    pub async fn remove_by_pattern(&self, pattern: &str) -> Result<()> {
        if !self.backend.capabilities().pattern_removal {
            warn!(
                backend = self.backend.name(),
                pattern, "backend does not support pattern removal, skipping"
            );
            return Ok(());
        }

        let removed = self.backend.remove_pattern(pattern).await?;
        for key in &removed {
            self.tags.remove_key(key);
        }
        info!(pattern, count = removed.len(), "removed entries by pattern");
        Ok(())
    }

    // == Remove By Tag ==
    /// Removes every entry written under `tag`. See
    /// [`CacheService::remove_by_tags`].
    pub async fn remove_by_tag(&self, tag: &str) -> Result<()> {
        self.remove_by_tags(&[tag]).await
    }

    /// Removes every entry written under any of `tags`.
    ///
    /// The key set of each tag is snapshotted atomically before the sweep;
    /// keys added to a tag after its snapshot survive until the next
    /// invalidation of that tag. Backend failures propagate; keys whose
    /// removal did not go through are re-indexed under the tag first, so a
    /// retry of the same invalidation still reaches them.
    pub async fn remove_by_tags(&self, tags: &[&str]) -> Result<()> {
        let mut removed = 0usize;
        for tag in tags {
            let keys = self.tags.snapshot_and_clear(tag);
            for (position, key) in keys.iter().enumerate() {
                if let Err(e) = self.backend.remove(key).await {
                    for pending in &keys[position..] {
                        self.tags.add(pending, tag);
                    }
                    return Err(e);
                }
                // Prune the key's membership in other tags too
                self.tags.remove_key(key);
                removed += 1;
            }
        }
        info!(tags = tags.len(), count = removed, "removed entries by tag");
        Ok(())
    }

    // == Clear ==
    /// Drops all entries and the whole tag index. On backends without
    /// reliable full clear the entry drop is advisory (logged by the
    /// backend); the tag index is always dropped.
    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await?;
        self.tags.clear();
        info!(backend = self.backend.name(), "cache cleared");
        Ok(())
    }

    // == Exists ==
    /// Presence check without decoding the value. Does not count as a hit
    /// or a miss. Backend read failures degrade to `false`.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        Self::validate_key(key)?;

        match self.backend.exists(key).await {
            Ok(present) => {
                debug!(key, present, "cache exists check");
                Ok(present)
            }
            Err(e) => {
                warn!(key, error = %e, "backend exists check failed, treating as absent");
                Ok(false)
            }
        }
    }

    // == Warmup ==
    /// Runs the given strategies against this service in ascending priority
    /// order, isolating failures per strategy.
    pub async fn warmup(&self, strategies: Vec<Arc<dyn WarmupStrategy>>) -> WarmupReport {
        WarmupCoordinator::new(strategies).run(self).await
    }

    // == Statistics ==
    /// Builds a statistics snapshot, asking the backend for its current
    /// item count and size where it can report them.
    pub fn statistics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(
            self.backend.entry_count().unwrap_or(0),
            self.backend.estimated_size().unwrap_or(0),
        )
    }

    /// Zeroes all counters and the latency sample.
    pub fn reset_statistics(&self) {
        self.metrics.reset();
    }

    /// Short name of the underlying backend, for logs and diagnostics.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        if let Some(handle) = &self.sweep_handle {
            handle.abort();
        }
    }
}
