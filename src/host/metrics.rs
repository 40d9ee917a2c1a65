// src/host/metrics.rs
//
// Counters for the whole prediction path. Cheap atomics, shared by handle;
// export via the summary struct.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct HostMetrics {
    pub predictions_received: Arc<AtomicU64>,
    pub cache_hits: Arc<AtomicU64>,
    pub cache_misses: Arc<AtomicU64>,
    pub patches_applied: Arc<AtomicU64>,
    pub sync_settled: Arc<AtomicU64>,
    pub sync_unsettled: Arc<AtomicU64>,
    pub invalidations: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl HostMetrics {
    pub fn new() -> Self {
        Self {
            predictions_received: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
            patches_applied: Arc::new(AtomicU64::new(0)),
            sync_settled: Arc::new(AtomicU64::new(0)),
            sync_unsettled: Arc::new(AtomicU64::new(0)),
            invalidations: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Share of predictions answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            predictions_received: self.predictions_received.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
            patches_applied: self.patches_applied.load(Ordering::Relaxed),
            sync_settled: self.sync_settled.load(Ordering::Relaxed),
            sync_unsettled: self.sync_unsettled.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for HostMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub predictions_received: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
    pub patches_applied: u64,
    pub sync_settled: u64,
    pub sync_unsettled: u64,
    pub invalidations: u64,
    pub elapsed_secs: f64,
}
