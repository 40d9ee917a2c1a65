// src/trackers/focus.rs
//
// Focus sequence tracker. Keeps a bounded history of focus transitions and,
// on a navigation-advance key, forecasts the most probable next target from
// how consistently that transition has been observed.

use crate::config::FocusConfig;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// A recorded focus transition.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Transition {
    from: String,
    to: String,
}

/// Forecast of the next focus target. Unlike the geometric trackers the
/// target is part of the result: the engine does not know it up front.
#[derive(Debug, Clone)]
pub struct FocusForecast {
    pub target_region_id: String,
    pub confidence: f32,
    pub reason: &'static str,
}

pub struct FocusSequenceTracker {
    transitions: VecDeque<Transition>,
    history_size: usize,
    current_focus: Option<String>,
}

impl FocusSequenceTracker {
    pub fn new(config: &FocusConfig) -> Self {
        Self {
            transitions: VecDeque::with_capacity(config.history_size),
            history_size: config.history_size.max(1),
            current_focus: None,
        }
    }

    /// Record that focus moved to `region_id`.
    pub fn track_focus(&mut self, region_id: &str) {
        if let Some(previous) = self.current_focus.take() {
            if previous != region_id {
                self.transitions.push_back(Transition {
                    from: previous,
                    to: region_id.to_string(),
                });
                if self.transitions.len() > self.history_size {
                    self.transitions.pop_front();
                }
            }
        }
        self.current_focus = Some(region_id.to_string());
    }

    pub fn current_focus(&self) -> Option<&str> {
        self.current_focus.as_deref()
    }

    /// Drop any history referencing a region that no longer exists.
    pub fn forget_region(&mut self, region_id: &str) {
        self.transitions
            .retain(|t| t.from != region_id && t.to != region_id);
        if self.current_focus.as_deref() == Some(region_id) {
            self.current_focus = None;
        }
    }

    pub fn reset(&mut self) {
        self.transitions.clear();
        self.current_focus = None;
    }

    /// Best next-target forecast for a navigation advance from the current
    /// focus. Confidence is the share of observed transitions out of the
    /// current focus that went to the forecast target.
    pub fn next_target_forecast(&self, config: &FocusConfig) -> Option<FocusForecast> {
        let current = self.current_focus.as_deref()?;

        let mut successor_counts: HashMap<&str, usize> = HashMap::new();
        let mut total = 0usize;
        for t in &self.transitions {
            if t.from == current {
                *successor_counts.entry(t.to.as_str()).or_insert(0) += 1;
                total += 1;
            }
        }

        if total < config.min_observations {
            debug!(
                "focus forecast skipped: {} transition(s) from '{}' (need {})",
                total, current, config.min_observations
            );
            return None;
        }

        let (best, count) = successor_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)?;

        Some(FocusForecast {
            target_region_id: best.to_string(),
            confidence: count as f32 / total as f32,
            reason: "consistent focus transition",
        })
    }
}
