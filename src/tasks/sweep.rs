//! TTL Sweep Task
//!
//! Background task that periodically removes expired entries from the
//! memory backend, prunes them from the tag index, and counts them as
//! evictions. Runs independently of foreground Get/Set/Remove calls and
//! never holds a lock across the whole store (see
//! [`MemoryBackend::sweep_expired`]).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::backend::MemoryBackend;
use crate::metrics::MetricsCollector;
use crate::tags::TagIndex;

/// Spawns the periodic sweep for a memory backend.
///
/// Each tick removes all currently-expired entries and keeps the tag index
/// and eviction counter in step. The handle can be aborted for shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(backend, tags, metrics, Duration::from_secs(5));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(
    backend: Arc<MemoryBackend>,
    tags: Arc<TagIndex>,
    metrics: Arc<MetricsCollector>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "starting TTL sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            // One bad tick must not kill the task
            let swept = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let removed = backend.sweep_expired();
                for key in &removed {
                    tags.remove_key(key);
                    metrics.record_eviction();
                }
                removed
            }));
            let removed = match swept {
                Ok(removed) => removed,
                Err(_) => {
                    error!("sweep tick panicked, retrying next interval");
                    continue;
                }
            };

            if removed.is_empty() {
                debug!("sweep found no expired entries");
            } else {
                info!(count = removed.len(), "sweep removed expired entries");
            }
        }
    })
}
