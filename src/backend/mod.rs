//! Backend Module
//!
//! Raw byte-oriented key/value storage behind one trait with two
//! implementations: an in-process concurrent map and a delegate to an
//! external distributed store. Backends know nothing about value types or
//! tags beyond storing them; orchestration lives in the service layer.

mod distributed;
mod entry;
mod memory;

pub use distributed::{DistributedBackend, RemoteStore};
pub use entry::{CachePriority, StoredEntry};
pub use memory::MemoryBackend;

use async_trait::async_trait;

use crate::error::Result;

// == Backend Capabilities ==
/// What a backend can natively do. The service consults this before issuing
/// operations a backend cannot honor, so capability gaps are logged rather
/// than silently ignored.
#[derive(Debug, Clone, Copy)]
pub struct BackendCapabilities {
    /// Keys can be enumerated and removed by pattern
    pub pattern_removal: bool,
    /// All entries can be dropped reliably
    pub full_clear: bool,
}

// == Lookup Outcome ==
/// Result of a raw backend read.
///
/// `Expired` means the backend lazily removed a stale entry during this
/// lookup and returns it so the caller can prune the tag index and count
/// the eviction.
#[derive(Debug)]
pub enum Lookup {
    Hit(StoredEntry),
    Miss,
    Expired(StoredEntry),
}

// == Backend Trait ==
/// Byte-oriented storage contract shared by all backends.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Looks up an entry, lazily expiring it when its TTL has elapsed.
    async fn get(&self, key: &str) -> Result<Lookup>;

    /// Writes an entry, replacing any existing one. Returns the key of an
    /// entry evicted to make room, if any.
    async fn set(&self, key: &str, entry: StoredEntry) -> Result<Option<String>>;

    /// Removes an entry. Returns whether one was present.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Presence check without handing back the payload.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Drops all entries. Advisory on backends without `full_clear`.
    async fn clear(&self) -> Result<()>;

    /// Removes all keys matching `pattern`; returns the removed keys so the
    /// caller can prune its tag index. Only meaningful when
    /// `capabilities().pattern_removal` is set.
    async fn remove_pattern(&self, pattern: &str) -> Result<Vec<String>>;

    /// Current entry count, where the backend can report one.
    fn entry_count(&self) -> Option<usize>;

    /// Estimated payload bytes held, where the backend can report them.
    fn estimated_size(&self) -> Option<u64>;

    /// Native capabilities of this backend.
    fn capabilities(&self) -> BackendCapabilities;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
