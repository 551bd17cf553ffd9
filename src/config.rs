//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied to entries written without an explicit expiration
    pub default_ttl: Duration,
    /// Compress encoded payloads even when the write options do not ask for it
    pub compression_enabled: bool,
    /// Minimum encoded size in bytes before compression is considered
    pub compression_threshold: usize,
    /// Interval between background sweeps of expired entries (memory backend)
    pub sweep_interval: Duration,
    /// Capacity of the rolling per-operation latency sample
    pub latency_sample_capacity: usize,
    /// Maximum number of entries the memory backend can hold
    pub max_entries: usize,
    /// Prefix applied to keys written through the distributed backend
    pub key_prefix: String,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TAGCACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `TAGCACHE_COMPRESSION_ENABLED` - Compress large payloads (default: false)
    /// - `TAGCACHE_COMPRESSION_THRESHOLD` - Compression threshold in bytes (default: 1024)
    /// - `TAGCACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 5)
    /// - `TAGCACHE_LATENCY_SAMPLES` - Latency sample capacity (default: 1024)
    /// - `TAGCACHE_MAX_ENTRIES` - Memory backend capacity (default: 10000)
    /// - `TAGCACHE_KEY_PREFIX` - Distributed key prefix (default: "tagcache:")
    pub fn from_env() -> Self {
        Self {
            default_ttl: Duration::from_secs(
                env::var("TAGCACHE_DEFAULT_TTL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            compression_enabled: env::var("TAGCACHE_COMPRESSION_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            compression_threshold: env::var("TAGCACHE_COMPRESSION_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            sweep_interval: Duration::from_secs(
                env::var("TAGCACHE_SWEEP_INTERVAL")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
            latency_sample_capacity: env::var("TAGCACHE_LATENCY_SAMPLES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            max_entries: env::var("TAGCACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            key_prefix: env::var("TAGCACHE_KEY_PREFIX").unwrap_or_else(|_| "tagcache:".to_string()),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            compression_enabled: false,
            compression_threshold: 1024,
            sweep_interval: Duration::from_secs(5),
            latency_sample_capacity: 1024,
            max_entries: 10_000,
            key_prefix: "tagcache:".to_string(),
        }
    }
}
