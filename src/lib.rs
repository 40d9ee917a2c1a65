// src/lib.rs
//
// Predictive interaction engine.
//
// Signal flow:
//   PointerMove/Scroll/Focus/Keydown → trackers → ConfidenceEngine ─┐
//                                                                   ▼
//   host ← PredictionRequest ← worker (isolated tokio task) ◄───────┘
//     └→ SpeculationCoordinator: PredictionCache lookup → PatchApplier
//          └→ StateSyncBridge → authoritative side
//
// The engine side forecasts; the host side speculates. The two communicate
// only through the message protocol, never shared state.

pub mod config;
pub mod engine;
pub mod host;
pub mod patch;
pub mod protocol;
pub mod sample_buffer;
pub mod trackers;
pub mod types;
pub mod worker;

// Re-exports for ergonomic embedding
pub use config::EngineConfig;
pub use engine::ConfidenceEngine;
pub use host::{
    HostMetrics, HttpSyncTransport, PredictionCache, SpeculationCoordinator, SpeculationOutcome,
    StateSyncBridge, SyncTransport,
};
pub use patch::{MapPatchApplier, Patch, PatchApplier, PatchOp};
pub use protocol::{decode_message, EngineMessage, EngineOutput, PredictionRequest};
pub use types::{ObservableRegion, Rect, SignalForecast, SignalState, WatchedSignals};
pub use worker::{spawn, EngineHandle};
