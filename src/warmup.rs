//! Warmup Module
//!
//! Runs a prioritized sequence of cache-population strategies. Strategies
//! are isolated from each other: a failure is logged and the remaining
//! strategies still run, and nothing a failed strategy already wrote is
//! rolled back, since cache entries are always advisory.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::service::CacheService;

// == Warmup Strategy Trait ==
/// A named unit of work that populates the cache on demand. Strategies hold
/// no persisted state of their own.
#[async_trait]
pub trait WarmupStrategy: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Execution order; lower priorities run first.
    fn priority(&self) -> u32;

    /// Populates the cache, returning how many entries were written.
    async fn run(&self, cache: &CacheService) -> anyhow::Result<u64>;
}

// == Warmup Report ==
/// Outcome of one coordinator run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmupReport {
    /// Strategies that completed without error
    pub succeeded: usize,
    /// Strategies that failed (logged, never fatal)
    pub failed: usize,
    /// Total entries written by successful strategies
    pub entries_written: u64,
}

// == Warmup Coordinator ==
/// Executes strategies in ascending priority order, sequentially by default.
pub struct WarmupCoordinator {
    strategies: Vec<Arc<dyn WarmupStrategy>>,
    concurrent: bool,
}

impl WarmupCoordinator {
    // == Constructor ==
    /// Creates a coordinator over `strategies`, sorted by priority.
    pub fn new(mut strategies: Vec<Arc<dyn WarmupStrategy>>) -> Self {
        strategies.sort_by_key(|s| s.priority());
        Self {
            strategies,
            concurrent: false,
        }
    }

    /// Run strategies concurrently instead of in priority order. Priority
    /// then only affects launch order.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    // == Run ==
    /// Executes all strategies against `cache`. Never fails: each strategy
    /// error is caught and logged.
    pub async fn run(&self, cache: &CacheService) -> WarmupReport {
        info!(
            strategies = self.strategies.len(),
            concurrent = self.concurrent,
            "starting cache warmup"
        );

        let outcomes = if self.concurrent {
            join_all(
                self.strategies
                    .iter()
                    .map(|strategy| Self::run_one(strategy.as_ref(), cache)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(self.strategies.len());
            for strategy in &self.strategies {
                outcomes.push(Self::run_one(strategy.as_ref(), cache).await);
            }
            outcomes
        };

        let mut report = WarmupReport::default();
        for outcome in outcomes {
            match outcome {
                Some(written) => {
                    report.succeeded += 1;
                    report.entries_written += written;
                }
                None => report.failed += 1,
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            entries = report.entries_written,
            "cache warmup finished"
        );
        report
    }

    /// Runs a single strategy, converting failure into a log line.
    async fn run_one(strategy: &dyn WarmupStrategy, cache: &CacheService) -> Option<u64> {
        match strategy.run(cache).await {
            Ok(written) => {
                info!(
                    strategy = strategy.name(),
                    entries = written,
                    "warmup strategy completed"
                );
                Some(written)
            }
            Err(e) => {
                warn!(
                    strategy = strategy.name(),
                    error = %e,
                    "warmup strategy failed, continuing with remaining strategies"
                );
                None
            }
        }
    }
}
