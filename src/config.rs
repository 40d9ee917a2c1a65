// src/config.rs
//
// Engine configuration. Every empirically tuned constant in the confidence
// blend is a field here rather than a literal in the tracker, so deployments
// can retune without a rebuild and tests can pin the documented blend.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: CoreConfig,
    pub pointer: PointerConfig,
    pub scroll: ScrollConfig,
    pub focus: FocusConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Minimum confidence a forecast needs before it is emitted to the host.
    pub min_confidence: f32,
    /// Per-region cooldown between successive predictions (ms).
    pub prediction_window_ms: f64,
    /// When true, the engine also emits Debug messages to the host.
    pub debug_logging: bool,
    /// Keys treated as a focus-advance (tab-like) navigation.
    pub nav_advance_keys: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.55,
            prediction_window_ms: 500.0,
            debug_logging: false,
            nav_advance_keys: vec!["Tab".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Ring buffer length for pointer-move samples.
    pub history_size: usize,
    /// Samples used per trajectory fit.
    pub trajectory_samples: usize,
    /// Below this speed (px/ms) the cursor counts as stationary.
    pub min_velocity: f32,
    /// Forecast window: intersections sooner than this are too immediate
    /// to be useful, later ones too unreliable (ms).
    pub lead_time_min_ms: f64,
    pub lead_time_max_ms: f64,
    /// Maximum deviation between heading and the angle to the target
    /// centre (radians).
    pub max_angle_rad: f32,
    /// Confidence blend weights. Must stay in [0,1] and sum to 1 for the
    /// blend itself to stay in [0,1].
    pub weight_alignment: f32,
    pub weight_proximity: f32,
    pub weight_velocity: f32,
    pub weight_deceleration: f32,
    /// Distance (px) at which the proximity sub-score reaches zero.
    pub proximity_divisor_px: f32,
    /// Speed (px/ms) considered ideal for deliberate target approach.
    pub ideal_velocity: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            history_size: 32,
            trajectory_samples: 5,
            min_velocity: 0.05,
            lead_time_min_ms: 50.0,
            lead_time_max_ms: 2000.0,
            max_angle_rad: std::f32::consts::FRAC_PI_4,
            weight_alignment: 0.4,
            weight_proximity: 0.3,
            weight_velocity: 0.2,
            weight_deceleration: 0.1,
            proximity_divisor_px: 500.0,
            ideal_velocity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Ring buffer length for scroll samples.
    pub history_size: usize,
    /// Below this speed (px/ms) scrolling counts as stopped.
    pub min_velocity: f32,
    /// Forecast window for viewport crossings (ms).
    pub lead_time_min_ms: f64,
    pub lead_time_max_ms: f64,
    /// Viewport height in px used for visibility forecasts.
    pub viewport_height: f32,
    /// Distance (px) at which the proximity sub-score reaches zero.
    pub proximity_divisor_px: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            history_size: 24,
            min_velocity: 0.05,
            lead_time_min_ms: 50.0,
            lead_time_max_ms: 3000.0,
            viewport_height: 800.0,
            proximity_divisor_px: 1500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Bounded focus-transition history length.
    pub history_size: usize,
    /// Transitions from the current focus needed before forecasting.
    pub min_observations: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            history_size: 64,
            min_observations: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Default entry lifetime (ms) when the insert does not specify one.
    pub default_ttl_ms: u64,
    /// Hard cap on live entries; oldest are evicted past this.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: 30_000,
            max_entries: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Authoritative endpoint for state deltas.
    pub endpoint: String,
    /// How long to wait for a push acknowledgment before giving up (ms).
    /// On the order of one interaction frame.
    pub ack_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/sync".to_string(),
            ack_timeout_ms: 50,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: EngineConfig =
            serde_yaml::from_str(&contents).context("Failed to parse config")?;
        Ok(config)
    }
}
