// src/engine.rs
//
// The confidence engine: routes inbound input events to the owning tracker,
// evaluates every registered region's forecast, gates emissions through a
// per-region throttle window and a minimum-confidence threshold, and emits
// PredictionRequests to the host.
//
// The engine is a per-event dispatcher, not a sequential automaton: each
// message runs to completion before the next is processed, and nothing here
// ever panics or propagates an error across the event boundary — prediction
// is best-effort and its absence must never block the interaction pipeline.

use crate::config::EngineConfig;
use crate::protocol::{EngineMessage, EngineOutput, PredictionRequest};
use crate::trackers::{FocusSequenceTracker, ScrollVelocityTracker, TrajectoryTracker};
use crate::types::{ObservableRegion, PointerSample, ScrollSample, SignalState};
use std::collections::HashMap;
use tracing::{debug, info};

/// One registry entry. The cooldown timestamp lives inside the entry itself,
/// so removing a region can never leave throttle state dangling.
struct RegionEntry {
    region: ObservableRegion,
    /// Event timestamp of the last emitted prediction for this region.
    last_prediction_ms: Option<f64>,
}

impl RegionEntry {
    fn throttled(&self, now_ms: f64, window_ms: f64) -> bool {
        self.last_prediction_ms
            .map_or(false, |last| now_ms - last < window_ms)
    }
}

pub struct ConfidenceEngine {
    config: EngineConfig,
    regions: HashMap<String, RegionEntry>,
    trajectory: TrajectoryTracker,
    scroll: ScrollVelocityTracker,
    focus: FocusSequenceTracker,
}

impl ConfidenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        let trajectory = TrajectoryTracker::new(&config.pointer);
        let scroll = ScrollVelocityTracker::new(&config.scroll);
        let focus = FocusSequenceTracker::new(&config.focus);
        Self {
            config,
            regions: HashMap::new(),
            trajectory,
            scroll,
            focus,
        }
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Process one inbound message and return any emissions.
    pub fn handle(&mut self, message: EngineMessage) -> Vec<EngineOutput> {
        match message {
            EngineMessage::RegisterRegion {
                owner_id,
                region_id,
                bounds,
                watched,
            } => {
                debug!("Region registered: {} (owner {})", region_id, owner_id);
                // Re-registration replaces the entry and starts a clean cooldown
                self.regions.insert(
                    region_id.clone(),
                    RegionEntry {
                        region: ObservableRegion {
                            region_id,
                            owner_id,
                            bounds,
                            watched,
                        },
                        last_prediction_ms: None,
                    },
                );
                self.debug_output("region_registered")
            }

            EngineMessage::UpdateBounds { region_id, bounds } => {
                match self.regions.get_mut(&region_id) {
                    Some(entry) => entry.region.bounds = bounds,
                    None => debug!("UpdateBounds for unknown region {}", region_id),
                }
                Vec::new()
            }

            EngineMessage::UnregisterRegion { region_id } => {
                if self.regions.remove(&region_id).is_some() {
                    debug!("Region unregistered: {}", region_id);
                }
                // Drop focus history referencing the dead region so it can
                // never be forecast again
                self.focus.forget_region(&region_id);
                self.debug_output("region_unregistered")
            }

            EngineMessage::PointerMove { x, y, timestamp_ms } => {
                self.trajectory
                    .track_move(PointerSample { x, y, timestamp_ms });
                self.evaluate_hover(timestamp_ms)
            }

            EngineMessage::Scroll {
                offset,
                timestamp_ms,
            } => {
                self.scroll.track_scroll(ScrollSample {
                    offset,
                    timestamp_ms,
                });
                self.evaluate_intersection(timestamp_ms)
            }

            EngineMessage::Focus {
                region_id,
                timestamp_ms: _,
            } => {
                self.focus.track_focus(&region_id);
                Vec::new()
            }

            EngineMessage::Keydown { key, timestamp_ms } => {
                if self.config.engine.nav_advance_keys.iter().any(|k| *k == key) {
                    self.evaluate_focus_advance(timestamp_ms)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Evaluate hover forecasts for every region watching pointer movement.
    fn evaluate_hover(&mut self, now_ms: f64) -> Vec<EngineOutput> {
        let mut outputs = Vec::new();
        let window_ms = self.config.engine.prediction_window_ms;
        let min_confidence = self.config.engine.min_confidence;

        for entry in self.regions.values_mut() {
            if !entry.region.watched.hover || entry.throttled(now_ms, window_ms) {
                continue;
            }

            let forecast = self
                .trajectory
                .hover_forecast(&entry.region.bounds, &self.config.pointer);
            if forecast.confidence >= min_confidence {
                info!(
                    "Hover predicted: {} conf={:.2} lead={:.0}ms",
                    entry.region.region_id, forecast.confidence, forecast.lead_time_ms
                );
                entry.last_prediction_ms = Some(now_ms);
                outputs.push(EngineOutput::Prediction(PredictionRequest {
                    owner_id: entry.region.owner_id.clone(),
                    region_id: entry.region.region_id.clone(),
                    observation: SignalState::new().with("hover", serde_json::json!(true)),
                    confidence: forecast.confidence,
                    lead_time_ms: forecast.lead_time_ms,
                    reason: forecast.reason.to_string(),
                }));
            }
        }

        outputs
    }

    /// Evaluate viewport-intersection forecasts for scroll watchers.
    fn evaluate_intersection(&mut self, now_ms: f64) -> Vec<EngineOutput> {
        let mut outputs = Vec::new();
        let window_ms = self.config.engine.prediction_window_ms;
        let min_confidence = self.config.engine.min_confidence;

        for entry in self.regions.values_mut() {
            if !entry.region.watched.intersection || entry.throttled(now_ms, window_ms) {
                continue;
            }

            let forecast = self
                .scroll
                .visibility_forecast(&entry.region.bounds, &self.config.scroll);
            if forecast.confidence >= min_confidence {
                info!(
                    "Intersection predicted: {} conf={:.2} lead={:.0}ms",
                    entry.region.region_id, forecast.confidence, forecast.lead_time_ms
                );
                entry.last_prediction_ms = Some(now_ms);
                outputs.push(EngineOutput::Prediction(PredictionRequest {
                    owner_id: entry.region.owner_id.clone(),
                    region_id: entry.region.region_id.clone(),
                    observation: SignalState::new()
                        .with("intersection", serde_json::json!(true)),
                    confidence: forecast.confidence,
                    lead_time_ms: forecast.lead_time_ms,
                    reason: forecast.reason.to_string(),
                }));
            }
        }

        outputs
    }

    /// On a navigation-advance key, emit the focus tracker's single best
    /// forecast — only if the target is a registered focus watcher.
    fn evaluate_focus_advance(&mut self, now_ms: f64) -> Vec<EngineOutput> {
        let forecast = match self.focus.next_target_forecast(&self.config.focus) {
            Some(f) => f,
            None => return Vec::new(),
        };
        if forecast.confidence < self.config.engine.min_confidence {
            return Vec::new();
        }

        let window_ms = self.config.engine.prediction_window_ms;
        let entry = match self.regions.get_mut(&forecast.target_region_id) {
            Some(e) if e.region.watched.focus => e,
            _ => return Vec::new(),
        };
        if entry.throttled(now_ms, window_ms) {
            return Vec::new();
        }

        info!(
            "Focus advance predicted: {} conf={:.2}",
            forecast.target_region_id, forecast.confidence
        );
        entry.last_prediction_ms = Some(now_ms);
        vec![EngineOutput::Prediction(PredictionRequest {
            owner_id: entry.region.owner_id.clone(),
            region_id: entry.region.region_id.clone(),
            observation: SignalState::new().with("focus", serde_json::json!(true)),
            confidence: forecast.confidence,
            // The transition lands on keyup; there is no meaningful lead
            lead_time_ms: 0.0,
            reason: forecast.reason.to_string(),
        })]
    }

    fn debug_output(&self, event: &str) -> Vec<EngineOutput> {
        if !self.config.engine.debug_logging {
            return Vec::new();
        }
        vec![EngineOutput::Debug {
            message: event.to_string(),
            data: serde_json::json!({ "regions": self.regions.len() }),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, WatchedSignals};

    fn engine() -> ConfidenceEngine {
        ConfidenceEngine::new(EngineConfig::default())
    }

    fn register(e: &mut ConfidenceEngine, region_id: &str, bounds: Rect, watched: WatchedSignals) {
        e.handle(EngineMessage::RegisterRegion {
            owner_id: format!("owner-{}", region_id),
            region_id: region_id.to_string(),
            bounds,
            watched,
        });
    }

    /// Feed a straight pointer path along y=125 toward positive x, ending at
    /// `end_x`, at `velocity` px/ms, starting at `t0`. Returns emissions.
    fn feed_path(
        e: &mut ConfidenceEngine,
        end_x: f32,
        velocity: f32,
        t0: f64,
    ) -> Vec<EngineOutput> {
        let mut outputs = Vec::new();
        let step_ms = 16.0;
        let step_px = velocity * step_ms as f32;
        for i in 0..5 {
            let back = (4 - i) as f32;
            outputs.extend(e.handle(EngineMessage::PointerMove {
                x: end_x - back * step_px,
                y: 125.0,
                timestamp_ms: t0 + i as f64 * step_ms,
            }));
        }
        outputs
    }

    fn predictions(outputs: &[EngineOutput]) -> Vec<&PredictionRequest> {
        outputs
            .iter()
            .filter_map(|o| match o {
                EngineOutput::Prediction(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_hover_prediction() {
        let mut e = engine();
        register(
            &mut e,
            "target",
            Rect::new(100.0, 100.0, 50.0, 50.0),
            WatchedSignals::hover(),
        );

        let outputs = feed_path(&mut e, 32.0, 0.5, 0.0);
        let preds = predictions(&outputs);
        assert_eq!(preds.len(), 1, "exactly one prediction in the window");

        let p = preds[0];
        assert_eq!(p.region_id, "target");
        assert_eq!(p.owner_id, "owner-target");
        assert!(p.confidence > e.config.engine.min_confidence);
        assert!(p.lead_time_ms >= e.config.pointer.lead_time_min_ms);
        assert!(p.lead_time_ms <= e.config.pointer.lead_time_max_ms);
        assert_eq!(
            p.observation.get("hover"),
            Some(&serde_json::json!(true))
        );
    }

    #[test]
    fn test_end_to_end_slow_cursor_emits_nothing() {
        let mut e = engine();
        register(
            &mut e,
            "target",
            Rect::new(100.0, 100.0, 50.0, 50.0),
            WatchedSignals::hover(),
        );

        // 0.01 px/ms is below the default min_velocity
        let outputs = feed_path(&mut e, 32.0, 0.01, 0.0);
        assert!(predictions(&outputs).is_empty());
    }

    #[test]
    fn test_throttle_window_suppresses_second_prediction() {
        let mut e = engine();
        register(
            &mut e,
            "target",
            Rect::new(100.0, 100.0, 50.0, 50.0),
            WatchedSignals::hover(),
        );

        let first = feed_path(&mut e, 32.0, 0.5, 0.0);
        assert_eq!(predictions(&first).len(), 1);

        // Second approach 100ms later: still inside the 500ms window
        let second = feed_path(&mut e, 40.0, 0.5, 100.0);
        assert!(predictions(&second).is_empty());

        // A third approach well past the window predicts again
        let third = feed_path(&mut e, 32.0, 0.5, 2000.0);
        assert_eq!(predictions(&third).len(), 1);
    }

    #[test]
    fn test_unregister_mid_window_stops_emissions() {
        let mut e = engine();
        register(
            &mut e,
            "target",
            Rect::new(100.0, 100.0, 50.0, 50.0),
            WatchedSignals::hover(),
        );

        assert_eq!(predictions(&feed_path(&mut e, 32.0, 0.5, 0.0)).len(), 1);

        e.handle(EngineMessage::UnregisterRegion {
            region_id: "target".to_string(),
        });
        assert_eq!(e.region_count(), 0);

        // Would have matched — but the region is gone
        let outputs = feed_path(&mut e, 32.0, 0.5, 2000.0);
        assert!(predictions(&outputs).is_empty());
    }

    #[test]
    fn test_rebounds_update_applies_in_place() {
        let mut e = engine();
        register(
            &mut e,
            "target",
            Rect::new(100.0, 100.0, 50.0, 50.0),
            WatchedSignals::hover(),
        );
        // Layout change moves the region far off the cursor's path
        e.handle(EngineMessage::UpdateBounds {
            region_id: "target".to_string(),
            bounds: Rect::new(100.0, 600.0, 50.0, 50.0),
        });

        let outputs = feed_path(&mut e, 32.0, 0.5, 0.0);
        assert!(predictions(&outputs).is_empty());
    }

    #[test]
    fn test_region_not_watching_hover_is_skipped() {
        let mut e = engine();
        register(
            &mut e,
            "target",
            Rect::new(100.0, 100.0, 50.0, 50.0),
            WatchedSignals::focus(),
        );
        let outputs = feed_path(&mut e, 32.0, 0.5, 0.0);
        assert!(predictions(&outputs).is_empty());
    }

    #[test]
    fn test_focus_advance_predicts_consistent_next_target() {
        let mut e = engine();
        register(
            &mut e,
            "name",
            Rect::new(0.0, 0.0, 100.0, 30.0),
            WatchedSignals::focus(),
        );
        register(
            &mut e,
            "email",
            Rect::new(0.0, 40.0, 100.0, 30.0),
            WatchedSignals::focus(),
        );

        // name → email observed twice
        for i in 0..2 {
            e.handle(EngineMessage::Focus {
                region_id: "name".to_string(),
                timestamp_ms: i as f64 * 100.0,
            });
            e.handle(EngineMessage::Focus {
                region_id: "email".to_string(),
                timestamp_ms: i as f64 * 100.0 + 50.0,
            });
        }
        e.handle(EngineMessage::Focus {
            region_id: "name".to_string(),
            timestamp_ms: 300.0,
        });

        let outputs = e.handle(EngineMessage::Keydown {
            key: "Tab".to_string(),
            timestamp_ms: 350.0,
        });
        let preds = predictions(&outputs);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].region_id, "email");
        assert!((preds[0].confidence - 1.0).abs() < 1e-6);
        assert_eq!(
            preds[0].observation.get("focus"),
            Some(&serde_json::json!(true))
        );
    }

    #[test]
    fn test_non_navigation_key_is_ignored() {
        let mut e = engine();
        register(
            &mut e,
            "email",
            Rect::new(0.0, 40.0, 100.0, 30.0),
            WatchedSignals::focus(),
        );
        for _ in 0..2 {
            e.handle(EngineMessage::Focus {
                region_id: "name".to_string(),
                timestamp_ms: 0.0,
            });
            e.handle(EngineMessage::Focus {
                region_id: "email".to_string(),
                timestamp_ms: 0.0,
            });
        }
        e.handle(EngineMessage::Focus {
            region_id: "name".to_string(),
            timestamp_ms: 0.0,
        });
        let outputs = e.handle(EngineMessage::Keydown {
            key: "a".to_string(),
            timestamp_ms: 0.0,
        });
        assert!(predictions(&outputs).is_empty());
    }

    #[test]
    fn test_focus_forecast_for_unregistered_target_dropped() {
        let mut e = engine();
        // "email" never registered: history exists, region does not
        for _ in 0..2 {
            e.handle(EngineMessage::Focus {
                region_id: "name".to_string(),
                timestamp_ms: 0.0,
            });
            e.handle(EngineMessage::Focus {
                region_id: "email".to_string(),
                timestamp_ms: 0.0,
            });
        }
        e.handle(EngineMessage::Focus {
            region_id: "name".to_string(),
            timestamp_ms: 0.0,
        });
        let outputs = e.handle(EngineMessage::Keydown {
            key: "Tab".to_string(),
            timestamp_ms: 0.0,
        });
        assert!(predictions(&outputs).is_empty());
    }

    #[test]
    fn test_end_to_end_scroll_intersection_prediction() {
        let mut e = engine();
        register(
            &mut e,
            "below-fold",
            Rect::new(0.0, 1264.0, 400.0, 200.0),
            WatchedSignals::intersection(),
        );

        let mut outputs = Vec::new();
        for i in 0..5 {
            outputs.extend(e.handle(EngineMessage::Scroll {
                offset: i as f32 * 16.0,
                timestamp_ms: i as f64 * 16.0,
            }));
        }
        let preds = predictions(&outputs);
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].region_id, "below-fold");
        assert!(preds[0].confidence > e.config.engine.min_confidence);
    }

    #[test]
    fn test_debug_outputs_only_when_enabled() {
        let mut config = EngineConfig::default();
        config.engine.debug_logging = true;
        let mut e = ConfidenceEngine::new(config);
        let outputs = e.handle(EngineMessage::RegisterRegion {
            owner_id: "o".to_string(),
            region_id: "r".to_string(),
            bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
            watched: WatchedSignals::hover(),
        });
        assert!(matches!(outputs[0], EngineOutput::Debug { .. }));

        let mut quiet = engine();
        let outputs = quiet.handle(EngineMessage::RegisterRegion {
            owner_id: "o".to_string(),
            region_id: "r".to_string(),
            bounds: Rect::new(0.0, 0.0, 10.0, 10.0),
            watched: WatchedSignals::hover(),
        });
        assert!(outputs.is_empty());
    }
}
