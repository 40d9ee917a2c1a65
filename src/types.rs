// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned region bounds in CSS pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Which interaction signals a registered region wants forecasts for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedSignals {
    #[serde(default)]
    pub hover: bool,
    #[serde(default)]
    pub intersection: bool,
    #[serde(default)]
    pub focus: bool,
}

impl WatchedSignals {
    pub fn hover() -> Self {
        Self {
            hover: true,
            ..Default::default()
        }
    }

    pub fn intersection() -> Self {
        Self {
            intersection: true,
            ..Default::default()
        }
    }

    pub fn focus() -> Self {
        Self {
            focus: true,
            ..Default::default()
        }
    }
}

/// A (partial) set of signal values for one owner. BTreeMap so iteration
/// order is stable and signatures derived from it are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalState(pub BTreeMap<String, serde_json::Value>);

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: serde_json::Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical `key=value;` rendering used for cache signatures. Keys come
    /// out sorted because the underlying map is ordered.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            out.push_str(key);
            out.push('=');
            out.push_str(&value.to_string());
            out.push(';');
        }
        out
    }
}

/// A region registered for predictive monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservableRegion {
    pub region_id: String,
    pub owner_id: String,
    pub bounds: Rect,
    pub watched: WatchedSignals,
}

/// One pointer-movement sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: f64,
}

/// One scroll sample (vertical document offset).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub offset: f32,
    pub timestamp_ms: f64,
}

/// One focus transition sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusSample {
    pub region_id: String,
    pub timestamp_ms: f64,
}

/// Fitted short-window pointer trajectory. Derived per evaluation, never stored.
#[derive(Debug, Clone, Copy)]
pub struct Trajectory {
    /// Speed in px/ms, always >= 0.
    pub velocity: f32,
    /// Heading in radians, (-pi, pi].
    pub angle: f32,
    /// Signed speed change across the sample window, px/ms^2.
    pub acceleration: f32,
    /// Latest sample position.
    pub last_x: f32,
    pub last_y: f32,
}

/// Uniform forecast result shared by all trackers so the engine can treat
/// every modality the same way.
#[derive(Debug, Clone)]
pub struct SignalForecast {
    pub confidence: f32,
    pub lead_time_ms: f64,
    pub reason: &'static str,
}

impl SignalForecast {
    pub fn rejected(reason: &'static str) -> Self {
        Self {
            confidence: 0.0,
            lead_time_ms: 0.0,
            reason,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.confidence <= 0.0
    }
}
