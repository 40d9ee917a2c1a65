// src/trackers/scroll.rs
//
// One-dimensional scroll velocity tracker. Forecasts when a region's
// vertical span will cross the viewport edge at the current scroll rate.

use crate::config::ScrollConfig;
use crate::sample_buffer::SampleRing;
use crate::types::{Rect, ScrollSample, SignalForecast};
use tracing::debug;

pub struct ScrollVelocityTracker {
    samples: SampleRing<ScrollSample>,
}

impl ScrollVelocityTracker {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            samples: SampleRing::new(config.history_size),
        }
    }

    pub fn track_scroll(&mut self, sample: ScrollSample) {
        self.samples.push(sample);
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn current_offset(&self) -> Option<f32> {
        self.samples.latest().map(|s| s.offset)
    }

    /// Signed scroll velocity in px/ms over the buffered window; positive
    /// means the document is scrolling down (offset increasing). `None`
    /// with fewer than 2 samples or a zero time span.
    pub fn velocity(&self) -> Option<f32> {
        let window = self.samples.last_n(self.samples.len());
        if window.len() < 2 {
            return None;
        }
        let first = window.first().unwrap();
        let last = window.last().unwrap();
        let dt = last.timestamp_ms - first.timestamp_ms;
        if dt <= 0.0 {
            return None;
        }
        Some(((last.offset - first.offset) as f64 / dt) as f32)
    }

    /// Forecast the region's vertical span crossing into the viewport.
    pub fn visibility_forecast(&self, bounds: &Rect, config: &ScrollConfig) -> SignalForecast {
        let offset = match self.current_offset() {
            Some(o) => o,
            None => return SignalForecast::rejected("no scroll data"),
        };
        let velocity = match self.velocity() {
            Some(v) => v,
            None => return SignalForecast::rejected("no scroll data"),
        };

        let viewport_top = offset;
        let viewport_bottom = offset + config.viewport_height;

        // Already intersecting the viewport: nothing left to forecast
        if bounds.y < viewport_bottom && bounds.bottom() > viewport_top {
            return SignalForecast::rejected("already visible");
        }

        if velocity.abs() < config.min_velocity {
            return SignalForecast::rejected("not scrolling");
        }

        // Distance the viewport edge must travel to reach the region
        let distance = if bounds.y >= viewport_bottom {
            // Region below the fold: needs downward scrolling
            if velocity <= 0.0 {
                return SignalForecast::rejected("scrolling away from region");
            }
            bounds.y - viewport_bottom
        } else {
            // Region above the viewport: needs upward scrolling
            if velocity >= 0.0 {
                return SignalForecast::rejected("scrolling away from region");
            }
            viewport_top - bounds.bottom()
        };

        let lead_time_ms = (distance / velocity.abs()) as f64;
        if lead_time_ms < config.lead_time_min_ms {
            return SignalForecast::rejected("crossing too immediate");
        }
        if lead_time_ms > config.lead_time_max_ms {
            return SignalForecast::rejected("crossing too far out");
        }

        // Blend: steadiness of the scroll (0.6) and how close the region
        // already is (0.4). Both sub-scores live in [0,1].
        let consistency = self.velocity_consistency();
        let proximity = (1.0 - distance / config.proximity_divisor_px).max(0.0);
        let confidence = consistency * 0.6 + proximity * 0.4;

        debug!(
            "visibility forecast: dist={:.0}px lead={:.0}ms consistency={:.2} conf={:.2}",
            distance, lead_time_ms, consistency, confidence
        );

        SignalForecast {
            confidence,
            lead_time_ms,
            reason: "scroll approaching region",
        }
    }

    /// How steady the recent scroll rate is, in [0,1]. Flick-style scrolling
    /// with wildly varying step velocities forecasts poorly.
    fn velocity_consistency(&self) -> f32 {
        let window = self.samples.last_n(self.samples.len());
        if window.len() < 3 {
            return 0.5;
        }

        let mut step_velocities = Vec::with_capacity(window.len() - 1);
        for pair in window.windows(2) {
            let dt = pair[1].timestamp_ms - pair[0].timestamp_ms;
            if dt > 0.0 {
                step_velocities.push(((pair[1].offset - pair[0].offset) as f64 / dt) as f32);
            }
        }
        if step_velocities.len() < 2 {
            return 0.5;
        }

        let mean = step_velocities.iter().sum::<f32>() / step_velocities.len() as f32;
        if mean.abs() < f32::EPSILON {
            return 0.0;
        }
        let variance = step_velocities
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / step_velocities.len() as f32;
        let relative_spread = variance.sqrt() / mean.abs();
        (1.0 - relative_spread).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_steady(tracker: &mut ScrollVelocityTracker, start: f32, velocity: f32, steps: usize) {
        let step_ms = 16.0;
        for i in 0..steps {
            tracker.track_scroll(ScrollSample {
                offset: start + velocity * (i as f32) * step_ms as f32,
                timestamp_ms: i as f64 * step_ms,
            });
        }
    }

    #[test]
    fn test_velocity_over_window() {
        let config = ScrollConfig::default();
        let mut t = ScrollVelocityTracker::new(&config);
        feed_steady(&mut t, 0.0, 0.5, 6);
        let v = t.velocity().unwrap();
        assert!((v - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_no_data_and_stationary_rejections() {
        let config = ScrollConfig::default();
        let t = ScrollVelocityTracker::new(&config);
        let bounds = Rect::new(0.0, 5000.0, 400.0, 200.0);
        assert_eq!(
            t.visibility_forecast(&bounds, &config).reason,
            "no scroll data"
        );

        let mut t = ScrollVelocityTracker::new(&config);
        feed_steady(&mut t, 100.0, 0.0, 5);
        assert_eq!(
            t.visibility_forecast(&bounds, &config).reason,
            "not scrolling"
        );
    }

    #[test]
    fn test_region_already_visible_rejected() {
        let config = ScrollConfig::default();
        let mut t = ScrollVelocityTracker::new(&config);
        feed_steady(&mut t, 100.0, 0.5, 5);
        // Viewport covers [132, 932]; region at y=500 is inside it
        let bounds = Rect::new(0.0, 500.0, 400.0, 100.0);
        let forecast = t.visibility_forecast(&bounds, &config);
        assert_eq!(forecast.confidence, 0.0);
        assert_eq!(forecast.reason, "already visible");
    }

    #[test]
    fn test_scrolling_away_rejected() {
        let config = ScrollConfig::default();
        let mut t = ScrollVelocityTracker::new(&config);
        // Scrolling up while the region is far below the fold
        feed_steady(&mut t, 4000.0, -0.5, 5);
        let bounds = Rect::new(0.0, 8000.0, 400.0, 200.0);
        let forecast = t.visibility_forecast(&bounds, &config);
        assert_eq!(forecast.confidence, 0.0);
        assert_eq!(forecast.reason, "scrolling away from region");
    }

    #[test]
    fn test_steady_downward_scroll_forecasts_crossing() {
        let config = ScrollConfig::default();
        let mut t = ScrollVelocityTracker::new(&config);
        // Viewport ends at offset+800; last offset is 64 → bottom 864
        feed_steady(&mut t, 0.0, 1.0, 5);
        let bounds = Rect::new(0.0, 1264.0, 400.0, 200.0);
        let forecast = t.visibility_forecast(&bounds, &config);
        assert!(forecast.confidence > 0.5, "steady scroll should score well");
        // 400px gap at 1px/ms
        assert!((forecast.lead_time_ms - 400.0).abs() < 1.0);
    }

    #[test]
    fn test_lead_time_window_bounds() {
        let mut config = ScrollConfig::default();
        config.lead_time_max_ms = 300.0;
        let mut t = ScrollVelocityTracker::new(&config);
        feed_steady(&mut t, 0.0, 1.0, 5);
        let bounds = Rect::new(0.0, 1264.0, 400.0, 200.0); // 400ms out
        let forecast = t.visibility_forecast(&bounds, &config);
        assert_eq!(forecast.confidence, 0.0);
        assert_eq!(forecast.reason, "crossing too far out");
    }

    #[test]
    fn test_erratic_scroll_scores_below_steady() {
        let config = ScrollConfig::default();

        let mut steady = ScrollVelocityTracker::new(&config);
        feed_steady(&mut steady, 0.0, 1.0, 6);

        let mut erratic = ScrollVelocityTracker::new(&config);
        let offsets = [0.0_f32, 40.0, 44.0, 78.0, 79.0, 80.0];
        for (i, offset) in offsets.iter().enumerate() {
            erratic.track_scroll(ScrollSample {
                offset: *offset,
                timestamp_ms: i as f64 * 16.0,
            });
        }

        let bounds = Rect::new(0.0, 1400.0, 400.0, 200.0);
        let s = steady.visibility_forecast(&bounds, &config);
        let e = erratic.visibility_forecast(&bounds, &config);
        assert!(s.confidence > e.confidence);
    }
}
