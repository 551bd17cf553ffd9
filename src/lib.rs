//! tagcache - A tag-aware caching layer with pluggable backends
//!
//! Provides a generic cache service with tag-based bulk invalidation,
//! optional compression, warmup orchestration, and runtime metrics, backed
//! by either an in-process store or an external distributed store.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod tags;
pub mod tasks;
pub mod warmup;

pub use backend::{
    Backend, BackendCapabilities, CachePriority, DistributedBackend, Lookup, MemoryBackend,
    RemoteStore, StoredEntry,
};
pub use codec::Codec;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use service::{CacheOptions, CacheService};
pub use tags::TagIndex;
pub use tasks::spawn_sweep_task;
pub use warmup::{WarmupCoordinator, WarmupReport, WarmupStrategy};
