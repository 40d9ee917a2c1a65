// src/trackers/trajectory.rs
//
// Pointer trajectory tracker. Fits a short-window linear trajectory over
// recent pointer samples and forecasts whether the cursor will reach a
// region's bounds, scoring the forecast from geometric alignment, proximity,
// speed and deceleration.

use crate::config::PointerConfig;
use crate::sample_buffer::SampleRing;
use crate::types::{PointerSample, Rect, SignalForecast, Trajectory};
use tracing::debug;

pub struct TrajectoryTracker {
    samples: SampleRing<PointerSample>,
    trajectory_samples: usize,
}

impl TrajectoryTracker {
    pub fn new(config: &PointerConfig) -> Self {
        Self {
            samples: SampleRing::new(config.history_size),
            trajectory_samples: config.trajectory_samples.max(2),
        }
    }

    pub fn track_move(&mut self, sample: PointerSample) {
        self.samples.push(sample);
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Fit a trajectory over the most recent samples.
    ///
    /// Returns `None` with fewer than 2 samples or a zero time span (guards
    /// the divide-by-zero, e.g. duplicate timestamps from coalesced events).
    pub fn trajectory(&self) -> Option<Trajectory> {
        let window = self.samples.last_n(self.trajectory_samples);
        if window.len() < 2 {
            return None;
        }

        let first = window.first().unwrap();
        let last = window.last().unwrap();
        let dt = last.timestamp_ms - first.timestamp_ms;
        if dt <= 0.0 {
            return None;
        }

        let dx = last.x - first.x;
        let dy = last.y - first.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let velocity = (distance as f64 / dt) as f32;
        let angle = dy.atan2(dx);

        // Acceleration: compare the velocity of each half of the window.
        // Needs at least 4 samples for two meaningful halves.
        let acceleration = if window.len() >= 4 {
            let mid = window.len() / 2;
            let v_first = segment_velocity(&window[..=mid]);
            let v_second = segment_velocity(&window[mid..]);
            ((v_second - v_first) as f64 / dt) as f32
        } else {
            0.0
        };

        Some(Trajectory {
            velocity,
            angle,
            acceleration,
            last_x: last.x,
            last_y: last.y,
        })
    }

    /// Forecast whether the cursor will hover `bounds`.
    ///
    /// Rejection order matters: cheap guards first, geometry last, so a
    /// stationary cursor never pays for an intersection test.
    pub fn hover_forecast(&self, bounds: &Rect, config: &PointerConfig) -> SignalForecast {
        let trajectory = match self.trajectory() {
            Some(t) => t,
            None => return SignalForecast::rejected("no trajectory data"),
        };

        if trajectory.velocity < config.min_velocity {
            return SignalForecast::rejected("mouse not moving");
        }

        let distance = match ray_box_intersection(
            trajectory.last_x,
            trajectory.last_y,
            trajectory.angle,
            bounds,
        ) {
            Some(d) => d,
            None => return SignalForecast::rejected("not in trajectory path"),
        };

        let lead_time_ms = (distance / trajectory.velocity) as f64;
        if lead_time_ms < config.lead_time_min_ms {
            return SignalForecast::rejected("intersection too immediate");
        }
        if lead_time_ms > config.lead_time_max_ms {
            return SignalForecast::rejected("intersection too far out");
        }

        // The ray can clip a corner of a target the cursor is merely passing;
        // require the heading to actually point at the target centre.
        let (cx, cy) = bounds.center();
        let target_angle = (cy - trajectory.last_y).atan2(cx - trajectory.last_x);
        let deviation = angle_delta(trajectory.angle, target_angle).abs();
        if deviation > config.max_angle_rad {
            return SignalForecast::rejected("not heading toward target");
        }

        let alignment = 1.0 - deviation / config.max_angle_rad;
        let proximity = (1.0 - distance / config.proximity_divisor_px).max(0.0);
        let velocity_fit = (1.0
            - (trajectory.velocity - config.ideal_velocity).abs() / config.ideal_velocity)
            .clamp(0.0, 1.0);
        // Decelerating approach correlates with intent to stop on the target
        let deceleration = if trajectory.acceleration < 0.0 { 1.0 } else { 0.0 };

        let confidence = alignment * config.weight_alignment
            + proximity * config.weight_proximity
            + velocity_fit * config.weight_velocity
            + deceleration * config.weight_deceleration;

        debug!(
            "hover forecast: dist={:.1}px lead={:.0}ms dev={:.2}rad conf={:.2}",
            distance, lead_time_ms, deviation, confidence
        );

        SignalForecast {
            confidence,
            lead_time_ms,
            reason: "trajectory intersects target",
        }
    }
}

/// Path velocity (px/ms) over a run of samples; 0 for degenerate segments.
fn segment_velocity(samples: &[PointerSample]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let first = &samples[0];
    let last = &samples[samples.len() - 1];
    let dt = last.timestamp_ms - first.timestamp_ms;
    if dt <= 0.0 {
        return 0.0;
    }
    let dx = last.x - first.x;
    let dy = last.y - first.y;
    ((dx * dx + dy * dy).sqrt() as f64 / dt) as f32
}

/// Smallest signed difference between two angles, in (-pi, pi].
fn angle_delta(a: f32, b: f32) -> f32 {
    let mut d = a - b;
    while d > std::f32::consts::PI {
        d -= std::f32::consts::TAU;
    }
    while d <= -std::f32::consts::PI {
        d += std::f32::consts::TAU;
    }
    d
}

/// Cast a ray from `(ox, oy)` along `angle` against the four edges of
/// `bounds`. Returns the nearest forward hit distance, or `None` when the
/// ray misses. For each edge the parametric hit distance is computed and
/// kept only when the perpendicular coordinate falls within the edge span.
fn ray_box_intersection(ox: f32, oy: f32, angle: f32, bounds: &Rect) -> Option<f32> {
    let dx = angle.cos();
    let dy = angle.sin();
    let mut nearest: Option<f32> = None;

    let mut consider = |t: f32| {
        if t > 0.0 {
            nearest = Some(match nearest {
                Some(best) => best.min(t),
                None => t,
            });
        }
    };

    // Vertical edges (left, right)
    if dx.abs() > f32::EPSILON {
        for edge_x in [bounds.x, bounds.right()] {
            let t = (edge_x - ox) / dx;
            let y_hit = oy + t * dy;
            if y_hit >= bounds.y && y_hit <= bounds.bottom() {
                consider(t);
            }
        }
    }

    // Horizontal edges (top, bottom)
    if dy.abs() > f32::EPSILON {
        for edge_y in [bounds.y, bounds.bottom()] {
            let t = (edge_y - oy) / dy;
            let x_hit = ox + t * dx;
            if x_hit >= bounds.x && x_hit <= bounds.right() {
                consider(t);
            }
        }
    }

    nearest
}
