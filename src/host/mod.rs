// src/host/mod.rs
//
// Host-side collaborators. The engine worker forecasts; everything that
// touches cached patches, the live UI or the authoritative side lives here,
// on the host thread.

pub mod cache;
pub mod metrics;
pub mod speculation;
pub mod sync;

pub use cache::{CacheEntry, PredictionCache};
pub use metrics::{HostMetrics, MetricsSummary};
pub use speculation::{SpeculationCoordinator, SpeculationOutcome};
pub use sync::{HttpSyncTransport, SettleState, StateSyncBridge, SyncAck, SyncDelta, SyncTransport};
