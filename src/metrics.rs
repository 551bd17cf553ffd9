//! Metrics Module
//!
//! Tracks cache performance with atomic counters and a bounded rolling sample
//! of per-operation latencies. Counters only increase between calls to
//! [`MetricsCollector::reset`]; snapshot reads never block writers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

// == Metrics Snapshot ==
/// Point-in-time view of cache statistics.
///
/// Atomic counters are read with relaxed ordering, so the snapshot is a
/// consistent-enough view rather than a linearizable point.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Number of successful cache retrievals
    pub hit_count: u64,
    /// Number of failed cache retrievals (missing, expired, or undecodable)
    pub miss_count: u64,
    /// Number of entries written
    pub set_count: u64,
    /// Number of entries removed by the cache itself (expiry or capacity)
    pub eviction_count: u64,
    /// Current number of entries in the backend, where it can report one
    pub item_count: usize,
    /// Estimated payload bytes held by the backend, where it can report them
    pub memory_usage_bytes: u64,
    /// hits / (hits + misses), 0.0 when no gets have happened
    pub hit_ratio: f64,
    /// Rolling average operation latency in milliseconds
    pub avg_latency_ms: f64,
    /// Seconds since the collector was created or last reset
    pub uptime_secs: u64,
}

// == Metrics Collector ==
/// Per-service metrics state. One instance per cache service; no
/// process-wide statics.
#[derive(Debug)]
pub struct MetricsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
    /// Drop-oldest bounded sample of operation latencies
    latencies: Mutex<VecDeque<Duration>>,
    sample_capacity: usize,
    started_at: Mutex<Instant>,
}

impl MetricsCollector {
    // == Constructor ==
    /// Creates a collector with the given latency sample capacity.
    pub fn new(sample_capacity: usize) -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(sample_capacity)),
            sample_capacity: sample_capacity.max(1),
            started_at: Mutex::new(Instant::now()),
        }
    }

    // == Recording ==
    /// Increments the hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the set counter.
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a latency measurement, dropping the oldest sample at capacity.
    pub fn record_latency(&self, latency: Duration) {
        let mut samples = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        if samples.len() >= self.sample_capacity {
            samples.pop_front();
        }
        samples.push_back(latency);
    }

    // == Derived Values ==
    /// Returns hits / (hits + misses), or 0.0 when no gets have happened.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Rolling average over the latency sample, or zero when empty.
    pub fn avg_latency(&self) -> Duration {
        let samples = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        if samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = samples.iter().sum();
        total / samples.len() as u32
    }

    // == Snapshot ==
    /// Builds a statistics snapshot. Item count and memory usage come from
    /// the backend since only it knows its current contents.
    pub fn snapshot(&self, item_count: usize, memory_usage_bytes: u64) -> MetricsSnapshot {
        let uptime = self
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed();

        MetricsSnapshot {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            set_count: self.sets.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            item_count,
            memory_usage_bytes,
            hit_ratio: self.hit_ratio(),
            avg_latency_ms: self.avg_latency().as_secs_f64() * 1000.0,
            uptime_secs: uptime.as_secs(),
        }
    }

    // == Reset ==
    /// Zeroes all counters and the latency sample. The only operation
    /// allowed to decrease counters.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.latencies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1024)
    }
}
