// src/trackers/mod.rs
//
// Per-modality input trackers.
//
// Signal flow:
//   PointerMove → trajectory ─┐
//   Scroll      → scroll ─────┼→ ConfidenceEngine → PredictionRequest
//   Focus/Key   → focus ──────┘
//
// Every tracker answers forecasts in the same SignalForecast shape so the
// engine can treat all modalities uniformly.

pub mod focus;
pub mod scroll;
pub mod trajectory;

pub use focus::{FocusForecast, FocusSequenceTracker};
pub use scroll::ScrollVelocityTracker;
pub use trajectory::TrajectoryTracker;
