//! # Strum Detection Module
//!
//! Turns the vertical motion of the strumming hand into strum events with a
//! dynamics (volume) value.
//!
//! ## Algorithm
//! - The reference point's y is compared with the previous frame's y.
//! - A move larger than the threshold gives a raw direction (down when y grows).
//! - A strum fires only when that direction differs from the previous strum's,
//!   so one long stroke triggers once however many frames it spans.
//! - Strums closer together than the cooldown are suppressed.
//! - Stroke speed goes into a short history; a recency-weighted average is
//!   rescaled, shaped by a super-linear curve and mapped to the output range.
//!
//! All cross-frame memory lives in [`StrumState`], owned by the caller.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Direction of a strum stroke in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrumDirection {
    Up,
    Down,
}

impl StrumDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrumDirection::Up => "up",
            StrumDirection::Down => "down",
        }
    }
}

/// Thresholds and shaping for strum detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrumConfig {
    /// Minimum per-frame vertical movement (normalized units) to count as a stroke.
    pub threshold: f32,
    /// Minimum seconds between two accepted strums.
    pub cooldown_s: f64,
    /// Floor for the time between samples when computing speed.
    pub min_elapsed_s: f64,
    /// Number of recent stroke speeds averaged for dynamics.
    pub velocity_window: usize,
    /// Speed (units/s) mapped to the quietest strum.
    pub min_velocity: f32,
    /// Speed (units/s) mapped to the loudest strum.
    pub max_velocity: f32,
    /// Exponent of the shaping curve; above 1 widens the slow/fast gap.
    pub curve_exponent: f32,
    pub min_dynamics: f32,
    pub max_dynamics: f32,
}

impl Default for StrumConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            cooldown_s: 0.1,
            min_elapsed_s: 1e-3,
            velocity_window: 5,
            min_velocity: 0.3,
            max_velocity: 6.0,
            curve_exponent: 1.5,
            min_dynamics: 0.35,
            max_dynamics: 1.0,
        }
    }
}

/// Result of feeding one frame to the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrumOutput {
    pub triggered: bool,
    /// Set only on the frame that triggered.
    pub direction: Option<StrumDirection>,
    /// Dynamics of the latest strum, 0 before the first one.
    pub dynamics: f32,
}

/// Per-session strum memory. Create at session start, thread through every
/// frame, reset on hand loss or on request.
#[derive(Debug, Clone, Default)]
pub struct StrumState {
    prev_y: Option<f32>,
    prev_time: Option<f64>,
    last_direction: Option<StrumDirection>,
    velocities: VecDeque<f32>,
    last_trigger: Option<f64>,
    dynamics: f32,
}

impl StrumState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets position, timing and speed history. Direction, cooldown and
    /// the last dynamics value survive, as on hand loss.
    pub fn clear_tracking(&mut self) {
        self.prev_y = None;
        self.prev_time = None;
        self.velocities.clear();
    }

    /// Returns the state to its freshly created form.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_direction(&self) -> Option<StrumDirection> {
        self.last_direction
    }

    pub fn dynamics(&self) -> f32 {
        self.dynamics
    }

    /// Timestamp of the last accepted strum.
    pub fn last_trigger(&self) -> Option<f64> {
        self.last_trigger
    }

    pub fn is_tracking(&self) -> bool {
        self.prev_y.is_some()
    }

    fn idle(&self) -> StrumOutput {
        StrumOutput { triggered: false, direction: None, dynamics: self.dynamics }
    }

    fn record(&mut self, y: f32, timestamp: f64) {
        self.prev_y = Some(y);
        self.prev_time = Some(timestamp);
    }
}

/// Stateless strum rules; the evolving part lives in [`StrumState`].
#[derive(Debug, Clone, Default)]
pub struct StrumDetector {
    config: StrumConfig,
}

impl StrumDetector {
    pub fn new(config: StrumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrumConfig {
        &self.config
    }

    /// Advances `state` by one frame.
    ///
    /// # Arguments
    /// * `state` - Session strum memory
    /// * `y` - Vertical position of the reference point, `None` when the hand is not visible
    /// * `timestamp` - Frame time in seconds
    pub fn update(&self, state: &mut StrumState, y: Option<f32>, timestamp: f64) -> StrumOutput {
        let Some(y) = y.filter(|y| y.is_finite()) else {
            if state.is_tracking() {
                debug!("Strum hand lost, clearing motion history");
            }
            state.clear_tracking();
            return state.idle();
        };

        let (Some(prev_y), Some(prev_time)) = (state.prev_y, state.prev_time) else {
            state.record(y, timestamp);
            return state.idle();
        };

        if let Some(last) = state.last_trigger {
            if timestamp - last < self.config.cooldown_s {
                trace!("Strum suppressed by cooldown at {:.3}s", timestamp);
                state.record(y, timestamp);
                return state.idle();
            }
        }

        let delta = y - prev_y;
        state.record(y, timestamp);

        if delta.abs() <= self.config.threshold {
            return state.idle();
        }

        let direction = if delta > 0.0 { StrumDirection::Down } else { StrumDirection::Up };
        if state.last_direction == Some(direction) {
            return state.idle();
        }

        let elapsed = (timestamp - prev_time).max(self.config.min_elapsed_s);
        let velocity = delta.abs() / elapsed as f32;

        state.velocities.push_back(velocity);
        while state.velocities.len() > self.config.velocity_window.max(1) {
            state.velocities.pop_front();
        }

        let dynamics = self.dynamics_for(weighted_average(&state.velocities));
        state.dynamics = dynamics;
        state.last_direction = Some(direction);
        // Earlier timestamps never get here (the cooldown check stops them);
        // a NaN timestamp must not replace the cooldown reference.
        state.last_trigger = Some(state.last_trigger.map_or(timestamp, |t| t.max(timestamp)));

        debug!(
            "Strum {} at {:.3}s: velocity {:.2}/s, dynamics {:.2}",
            direction.as_str(),
            timestamp,
            velocity,
            dynamics
        );

        StrumOutput { triggered: true, direction: Some(direction), dynamics }
    }

    /// Maps an averaged stroke speed to a dynamics value.
    ///
    /// Speed is rescaled to 0..1 between the configured bounds (clamped at
    /// both ends), raised to the curve exponent, then placed in the dynamics
    /// range. The quietest strum is `min_dynamics`, never silence.
    pub fn dynamics_for(&self, velocity: f32) -> f32 {
        let c = &self.config;
        let span = (c.max_velocity - c.min_velocity).max(f32::EPSILON);
        let normalized = ((velocity - c.min_velocity) / span).clamp(0.0, 1.0);
        let shaped = normalized.powf(c.curve_exponent);
        (c.min_dynamics * (1.0 - shaped) + c.max_dynamics * shaped)
            .max(c.min_dynamics)
            .min(c.max_dynamics)
    }
}

/// Average with linearly increasing weights, newest sample heaviest.
pub fn weighted_average(values: &VecDeque<f32>) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let total_weight = (n * (n + 1) / 2) as f32;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| v * (i + 1) as f32 / total_weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f64 = 1.0 / 30.0;

    fn detector() -> StrumDetector {
        StrumDetector::new(StrumConfig::default())
    }

    /// Feeds a trajectory at 30 fps starting at `t0`, collecting triggers.
    fn run(
        det: &StrumDetector,
        state: &mut StrumState,
        t0: f64,
        ys: &[f32],
    ) -> Vec<StrumOutput> {
        ys.iter()
            .enumerate()
            .map(|(i, &y)| det.update(state, Some(y), t0 + i as f64 * FRAME))
            .filter(|out| out.triggered)
            .collect()
    }

    #[test]
    fn test_first_sample_never_triggers() {
        let det = detector();
        let mut state = StrumState::new();
        let out = det.update(&mut state, Some(0.5), 0.0);
        assert!(!out.triggered);
        assert_eq!(out.dynamics, 0.0);
        assert!(state.is_tracking());
    }

    #[test]
    fn test_stationary_hand_never_triggers() {
        let det = detector();
        let mut state = StrumState::new();
        let hits = run(&det, &mut state, 0.0, &[0.4; 60]);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_sweep_triggers_once_per_direction() {
        let det = detector();
        let mut state = StrumState::new();
        // 0.1 per frame downward for many frames, crossing the threshold every frame.
        let down: Vec<f32> = (0..10).map(|i| 0.0 + 0.1 * i as f32).collect();
        let hits = run(&det, &mut state, 0.0, &down);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].direction, Some(StrumDirection::Down));

        let up: Vec<f32> = (0..10).map(|i| 0.9 - 0.1 * i as f32).collect();
        let hits = run(&det, &mut state, 1.0, &up);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].direction, Some(StrumDirection::Up));
        assert_eq!(state.last_direction(), Some(StrumDirection::Up));
    }

    #[test]
    fn test_cooldown_suppresses_reversal() {
        let det = detector();
        let mut state = StrumState::new();
        det.update(&mut state, Some(0.2), 0.0);
        assert!(det.update(&mut state, Some(0.4), 0.02).triggered);
        // Reversal 30 ms later is inside the 100 ms cooldown.
        let out = det.update(&mut state, Some(0.2), 0.05);
        assert!(!out.triggered);
        // History kept moving, so a still hand after the cooldown stays quiet.
        assert!(!det.update(&mut state, Some(0.2), 0.2).triggered);
        // A fresh upward move after the cooldown fires.
        assert!(det.update(&mut state, Some(0.05), 0.25).triggered);
    }

    #[test]
    fn test_small_moves_are_ignored() {
        let det = detector();
        let mut state = StrumState::new();
        let slow: Vec<f32> = (0..30).map(|i| 0.2 + 0.04 * i as f32).collect();
        assert!(run(&det, &mut state, 0.0, &slow).is_empty());
    }

    #[test]
    fn test_hand_loss_clears_history_but_keeps_dynamics() {
        let det = detector();
        let mut state = StrumState::new();
        det.update(&mut state, Some(0.2), 0.0);
        let hit = det.update(&mut state, Some(0.5), 0.05);
        assert!(hit.triggered);

        let lost = det.update(&mut state, None, 0.1);
        assert!(!lost.triggered);
        assert_eq!(lost.dynamics, hit.dynamics);
        assert!(!state.is_tracking());

        // The first sample after the gap only re-seeds the history.
        assert!(!det.update(&mut state, Some(0.0), 0.5).triggered);
        assert!(det.update(&mut state, Some(-0.2), 0.55).triggered);
    }

    #[test]
    fn test_reset_forgets_everything() {
        let det = detector();
        let mut state = StrumState::new();
        det.update(&mut state, Some(0.2), 0.0);
        det.update(&mut state, Some(0.5), 0.05);
        state.reset();
        assert_eq!(state.last_direction(), None);
        assert_eq!(state.last_trigger(), None);
        assert_eq!(state.dynamics(), 0.0);
    }

    #[test]
    fn test_zero_elapsed_time_is_floored() {
        let det = detector();
        let mut state = StrumState::new();
        det.update(&mut state, Some(0.2), 1.0);
        let out = det.update(&mut state, Some(0.5), 1.0);
        assert!(out.triggered);
        assert!(out.dynamics.is_finite());
        assert_eq!(out.dynamics, det.config().max_dynamics);
    }

    #[test]
    fn test_nan_timestamp_keeps_cooldown_reference() {
        let det = detector();
        let mut state = StrumState::new();
        det.update(&mut state, Some(0.2), 0.0);
        assert!(det.update(&mut state, Some(0.5), 0.05).triggered);

        det.update(&mut state, Some(0.2), f64::NAN);
        assert_eq!(state.last_trigger(), Some(0.05));
        assert!(state.dynamics().is_finite());

        // The cooldown is still measured from 0.05.
        let out = det.update(&mut state, Some(0.6), 0.1);
        assert!(!out.triggered);
    }

    #[test]
    fn test_dynamics_is_bounded_and_monotonic() {
        let det = detector();
        let c = det.config().clone();
        let mut previous = f32::NEG_INFINITY;
        for step in 0..200 {
            let v = step as f32 * 0.05;
            let d = det.dynamics_for(v);
            assert!(d >= c.min_dynamics && d <= c.max_dynamics, "{v} -> {d}");
            assert!(d >= previous);
            previous = d;
        }
        // Below the slowest speed is clamped, not extrapolated below the floor.
        assert_eq!(det.dynamics_for(0.0), c.min_dynamics);
        assert_eq!(det.dynamics_for(-5.0), c.min_dynamics);
        assert_eq!(det.dynamics_for(100.0), c.max_dynamics);
    }

    #[test]
    fn test_curve_is_super_linear() {
        let det = detector();
        let c = det.config();
        let mid = (c.min_velocity + c.max_velocity) / 2.0;
        let linear_mid = (c.min_dynamics + c.max_dynamics) / 2.0;
        assert!(det.dynamics_for(mid) < linear_mid);
    }

    #[test]
    fn test_weighted_average_favors_recent() {
        let values: VecDeque<f32> = [1.0, 4.0].into_iter().collect();
        // Weights 1/3 and 2/3.
        assert!((weighted_average(&values) - 3.0).abs() < 1e-6);
        assert_eq!(weighted_average(&VecDeque::new()), 0.0);
    }

    #[test]
    fn test_velocity_window_is_bounded() {
        let config = StrumConfig { velocity_window: 2, cooldown_s: 0.0, ..StrumConfig::default() };
        let det = StrumDetector::new(config);
        let mut state = StrumState::new();
        let mut y = 0.0;
        det.update(&mut state, Some(y), 0.0);
        for i in 1..10 {
            y = if i % 2 == 1 { 0.5 } else { 0.0 };
            assert!(det.update(&mut state, Some(y), i as f64 * 0.1).triggered);
        }
        assert_eq!(state.velocities.len(), 2);
    }
}
