//! Memory Backend Module
//!
//! In-process backend over a concurrent map. TTLs are checked lazily on
//! read; a periodic sweep (see [`crate::tasks::spawn_sweep_task`]) evicts
//! expired entries proactively. At capacity, an insert evicts the
//! lowest-priority entry, oldest first.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::Regex;
use tracing::debug;

use crate::backend::{Backend, BackendCapabilities, CachePriority, Lookup, StoredEntry};
use crate::error::{CacheError, Result};

// == Memory Backend ==
/// Concurrent in-process byte store with TTL and priority-aware eviction.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: DashMap<String, StoredEntry>,
    /// Maximum number of entries before an insert evicts
    max_entries: usize,
    /// Running total of payload bytes held
    size_bytes: AtomicU64,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates a backend holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            size_bytes: AtomicU64::new(0),
        }
    }

    /// Picks the entry to evict: any already-expired entry, otherwise the
    /// lowest-priority one, oldest first.
    fn select_victim(&self) -> Option<String> {
        let mut victim: Option<(CachePriority, DateTime<Utc>, String)> = None;

        for entry in self.entries.iter() {
            if entry.value().is_expired() {
                return Some(entry.key().clone());
            }
            let candidate = (
                entry.value().priority,
                entry.value().created_at,
                entry.key().clone(),
            );
            let better = match &victim {
                None => true,
                Some((priority, created_at, _)) => {
                    (candidate.0, candidate.1) < (*priority, *created_at)
                }
            };
            if better {
                victim = Some(candidate);
            }
        }

        victim.map(|(_, _, key)| key)
    }

    /// Removes a key and keeps the size gauge in step.
    fn take(&self, key: &str) -> Option<StoredEntry> {
        let (_, entry) = self.entries.remove(key)?;
        self.size_bytes
            .fetch_sub(entry.payload.len() as u64, Ordering::Relaxed);
        Some(entry)
    }

    // == Sweep Expired ==
    /// Removes every currently-expired entry and returns their keys.
    ///
    /// Iteration goes shard by shard, so no lock is held across the whole
    /// store; the removal re-checks expiry under the entry lock so an entry
    /// re-set mid-sweep survives.
    pub fn sweep_expired(&self) -> Vec<String> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for key in expired {
            let mut taken_len = None;
            self.entries.remove_if(&key, |_, entry| {
                if entry.is_expired() {
                    taken_len = Some(entry.payload.len() as u64);
                    true
                } else {
                    false
                }
            });
            if let Some(len) = taken_len {
                self.size_bytes.fetch_sub(len, Ordering::Relaxed);
                removed.push(key);
            }
        }
        removed
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Lookup> {
        let entry = match self.entries.get(key) {
            Some(entry) => entry.clone(),
            None => return Ok(Lookup::Miss),
        };

        if entry.is_expired() {
            // Re-check under the entry lock; a concurrent re-set wins
            if self.entries.remove_if(key, |_, e| e.is_expired()).is_some() {
                self.size_bytes
                    .fetch_sub(entry.payload.len() as u64, Ordering::Relaxed);
            }
            return Ok(Lookup::Expired(entry));
        }

        Ok(Lookup::Hit(entry))
    }

    async fn set(&self, key: &str, entry: StoredEntry) -> Result<Option<String>> {
        let mut evicted = None;
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            if let Some(victim) = self.select_victim() {
                if self.take(&victim).is_some() {
                    debug!(key = %victim, "evicted entry to make room");
                    evicted = Some(victim);
                }
            }
        }

        let new_len = entry.payload.len() as u64;
        if let Some(old) = self.entries.insert(key.to_string(), entry) {
            self.size_bytes
                .fetch_sub(old.payload.len() as u64, Ordering::Relaxed);
        }
        self.size_bytes.fetch_add(new_len, Ordering::Relaxed);

        Ok(evicted)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.take(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        // Non-mutating: an expired entry is left in place for get or the
        // sweep to remove, since only those paths can keep the caller's
        // tag index and eviction count in step
        Ok(self
            .entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        self.size_bytes.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn remove_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let regex = Regex::new(pattern).map_err(|e| CacheError::InvalidPattern(e.to_string()))?;

        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| regex.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = Vec::with_capacity(matching.len());
        for key in matching {
            if self.take(&key).is_some() {
                removed.push(key);
            }
        }
        Ok(removed)
    }

    fn entry_count(&self) -> Option<usize> {
        Some(self.entries.len())
    }

    fn estimated_size(&self) -> Option<u64> {
        Some(self.size_bytes.load(Ordering::Relaxed))
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            pattern_removal: true,
            full_clear: true,
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(payload: &[u8], ttl: Option<Duration>) -> StoredEntry {
        StoredEntry::new(payload.to_vec(), false, ttl, vec![], CachePriority::Normal)
    }

    fn entry_with_priority(priority: CachePriority) -> StoredEntry {
        StoredEntry::new(b"v".to_vec(), false, None, vec![], priority)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new(100);
        backend.set("k", entry(b"hello", None)).await.unwrap();

        match backend.get("k").await.unwrap() {
            Lookup::Hit(found) => assert_eq!(found.payload, b"hello"),
            other => panic!("expected hit, got {other:?}"),
        }
        assert_eq!(backend.entry_count(), Some(1));
        assert_eq!(backend.estimated_size(), Some(5));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let backend = MemoryBackend::new(100);
        assert!(matches!(backend.get("nope").await.unwrap(), Lookup::Miss));
    }

    #[tokio::test]
    async fn test_lazy_expiry_on_get() {
        let backend = MemoryBackend::new(100);
        backend
            .set("k", entry(b"v", Some(Duration::from_millis(20))))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(matches!(
            backend.get("k").await.unwrap(),
            Lookup::Expired(_)
        ));
        // Second read finds nothing; the entry was removed lazily
        assert!(matches!(backend.get("k").await.unwrap(), Lookup::Miss));
        assert_eq!(backend.estimated_size(), Some(0));
    }

    #[tokio::test]
    async fn test_exists_respects_expiry() {
        let backend = MemoryBackend::new(100);
        backend
            .set("k", entry(b"v", Some(Duration::from_millis(20))))
            .await
            .unwrap();

        assert!(backend.exists("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!backend.exists("k").await.unwrap());

        // The expired entry is still there for get to report as Expired
        assert_eq!(backend.entry_count(), Some(1));
        assert!(matches!(
            backend.get("k").await.unwrap(),
            Lookup::Expired(_)
        ));
    }

    #[tokio::test]
    async fn test_overwrite_tracks_size() {
        let backend = MemoryBackend::new(100);
        backend.set("k", entry(b"aaaa", None)).await.unwrap();
        backend.set("k", entry(b"bb", None)).await.unwrap();

        assert_eq!(backend.entry_count(), Some(1));
        assert_eq!(backend.estimated_size(), Some(2));
    }

    #[tokio::test]
    async fn test_remove() {
        let backend = MemoryBackend::new(100);
        backend.set("k", entry(b"v", None)).await.unwrap();

        assert!(backend.remove("k").await.unwrap());
        assert!(!backend.remove("k").await.unwrap());
        assert_eq!(backend.estimated_size(), Some(0));
    }

    #[tokio::test]
    async fn test_eviction_prefers_low_priority() {
        let backend = MemoryBackend::new(2);
        backend
            .set("low", entry_with_priority(CachePriority::Low))
            .await
            .unwrap();
        backend
            .set("high", entry_with_priority(CachePriority::High))
            .await
            .unwrap();

        let evicted = backend
            .set("new", entry_with_priority(CachePriority::Normal))
            .await
            .unwrap();

        assert_eq!(evicted.as_deref(), Some("low"));
        assert!(matches!(backend.get("low").await.unwrap(), Lookup::Miss));
        assert!(matches!(backend.get("high").await.unwrap(), Lookup::Hit(_)));
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let backend = MemoryBackend::new(1);
        backend.set("k", entry(b"a", None)).await.unwrap();
        let evicted = backend.set("k", entry(b"b", None)).await.unwrap();

        assert!(evicted.is_none());
        assert_eq!(backend.entry_count(), Some(1));
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let backend = MemoryBackend::new(100);
        backend
            .set("gone", entry(b"v", Some(Duration::from_millis(10))))
            .await
            .unwrap();
        backend
            .set("kept", entry(b"v", Some(Duration::from_secs(60))))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let removed = backend.sweep_expired();
        assert_eq!(removed, vec!["gone"]);
        assert_eq!(backend.entry_count(), Some(1));
    }

    #[tokio::test]
    async fn test_remove_pattern() {
        let backend = MemoryBackend::new(100);
        backend.set("user:1", entry(b"a", None)).await.unwrap();
        backend.set("user:2", entry(b"b", None)).await.unwrap();
        backend.set("session:1", entry(b"c", None)).await.unwrap();

        let mut removed = backend.remove_pattern("^user:").await.unwrap();
        removed.sort();

        assert_eq!(removed, vec!["user:1", "user:2"]);
        assert_eq!(backend.entry_count(), Some(1));
        assert!(backend.exists("session:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_pattern_rejects_bad_regex() {
        let backend = MemoryBackend::new(100);
        let result = backend.remove_pattern("[unclosed").await;
        assert!(matches!(result, Err(CacheError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = MemoryBackend::new(100);
        backend.set("a", entry(b"1", None)).await.unwrap();
        backend.set("b", entry(b"2", None)).await.unwrap();

        backend.clear().await.unwrap();
        assert_eq!(backend.entry_count(), Some(0));
        assert_eq!(backend.estimated_size(), Some(0));
    }

    #[tokio::test]
    async fn test_capabilities() {
        let backend = MemoryBackend::new(100);
        let caps = backend.capabilities();
        assert!(caps.pattern_removal);
        assert!(caps.full_clear);
        assert_eq!(backend.name(), "memory");
    }
}
