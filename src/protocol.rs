// src/protocol.rs
//
// Host ↔ engine message protocol. A closed tagged union decoded once at the
// boundary and exhaustively matched inside the engine — inbound traffic is
// never classified by probing properties, so there is no "unrecognized
// shape" path past this module.

use crate::types::{Rect, SignalState, WatchedSignals};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Messages the host sends into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineMessage {
    RegisterRegion {
        owner_id: String,
        region_id: String,
        bounds: Rect,
        watched: WatchedSignals,
    },
    UpdateBounds {
        region_id: String,
        bounds: Rect,
    },
    UnregisterRegion {
        region_id: String,
    },
    PointerMove {
        x: f32,
        y: f32,
        timestamp_ms: f64,
    },
    Scroll {
        offset: f32,
        timestamp_ms: f64,
    },
    Focus {
        region_id: String,
        timestamp_ms: f64,
    },
    Keydown {
        key: String,
        timestamp_ms: f64,
    },
}

/// Messages the engine emits to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineOutput {
    Prediction(PredictionRequest),
    Debug {
        message: String,
        data: serde_json::Value,
    },
}

/// A confidence-scored forecast that a signal is about to become true for a
/// region. Consumed once by the host; the engine never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub owner_id: String,
    pub region_id: String,
    /// The anticipated partial signal-state, e.g. `{hover: true}`.
    pub observation: SignalState,
    pub confidence: f32,
    pub lead_time_ms: f64,
    pub reason: String,
}

/// Decode one wire message. Malformed payloads are logged at debug level and
/// dropped — a protocol anomaly must never surface as an error to the host.
pub fn decode_message(raw: &str) -> Option<EngineMessage> {
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!("Dropping unrecognized engine message: {}", e);
            None
        }
    }
}
