//! # Position Validation Module
//!
//! Scores how closely the player's fingers match a chord's target positions
//! in fretboard space, and decides whether the shape as a whole is held.
//!
//! ## Scoring
//! - Ordinary fingers: distance to target, split into good / okay / poor bands.
//! - Barre finger: fret alignment, string coverage and centring of the
//!   points sampled along the finger.
//! - The shape passes only when every required finger is present and at
//!   least okay; one poor finger fails it regardless of the average.

use crate::chords::{Chord, StringFret};
use crate::fretboard::{span_of, FretboardLayout, TargetPosition};
use crate::pose::{Finger, FingerPositions, FingerSample, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Discretized match quality for one finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Good,
    Okay,
    Poor,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Good => "good",
            Tier::Okay => "okay",
            Tier::Poor => "poor",
        }
    }

    pub fn is_acceptable(&self) -> bool {
        matches!(self, Tier::Good | Tier::Okay)
    }
}

/// Tolerances for position validation, in normalized fretboard units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Radius of the "good" band.
    pub tolerance_good: f32,
    /// Radius of the "okay" band; also the fret tolerance and poor decay half-width.
    pub tolerance_okay: f32,
    /// Added to the barre half-span when scoring centring.
    pub barre_center_epsilon: f32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            tolerance_good: 0.15,
            tolerance_okay: 0.25,
            barre_center_epsilon: 0.1,
        }
    }
}

/// The target a finger was scored against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedTarget {
    pub point: Point,
    /// `None` for a barre, which spans several strings.
    pub string: Option<u8>,
    pub fret: i8,
}

/// Components of a barre score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarreMetrics {
    pub fret_distance: f32,
    pub fret_accuracy: f32,
    pub coverage: f32,
    pub centering: f32,
}

/// Per-finger outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerFeedback {
    pub tier: Tier,
    pub score: f32,
    /// Absent when the finger was not detected.
    pub target: Option<MatchedTarget>,
    pub barre: Option<BarreMetrics>,
}

impl FingerFeedback {
    fn missing() -> Self {
        Self { tier: Tier::Poor, score: 0.0, target: None, barre: None }
    }
}

/// Outcome of one validation call. Recomputed every frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub fingers: BTreeMap<Finger, FingerFeedback>,
    /// Mean of the per-finger scores.
    pub overall_accuracy: f32,
}

impl ValidationResult {
    pub fn tier(&self, finger: Finger) -> Option<Tier> {
        self.fingers.get(&finger).map(|f| f.tier)
    }

    pub fn score(&self, finger: Finger) -> Option<f32> {
        self.fingers.get(&finger).map(|f| f.score)
    }
}

/// Targets grouped by the finger that owns them.
struct Requirement<'a> {
    finger: Finger,
    targets: Vec<&'a TargetPosition>,
}

/// Compares fretboard-space finger samples with chord targets.
#[derive(Debug, Clone, Default)]
pub struct PositionValidator {
    config: ValidatorConfig,
    layout: FretboardLayout,
}

impl PositionValidator {
    pub fn new(config: ValidatorConfig, layout: FretboardLayout) -> Self {
        Self { config, layout }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn layout(&self) -> &FretboardLayout {
        &self.layout
    }

    /// Targets for a catalog chord under this validator's layout.
    pub fn targets_for(&self, chord: Chord) -> Vec<TargetPosition> {
        crate::chords::catalog()
            .get(chord)
            .map(|shape| self.layout.targets(shape))
            .unwrap_or_default()
    }

    /// Validates against a chord given by name; an unknown name never passes.
    pub fn validate_chord(&self, positions: Option<&FingerPositions>, name: &str) -> ValidationResult {
        match Chord::from_name(name) {
            Some(chord) => self.validate(positions, &self.targets_for(chord)),
            None => ValidationResult::default(),
        }
    }

    /// Scores every required finger and aggregates.
    ///
    /// # Arguments
    /// * `positions` - Fretboard-space samples, `None` when no hand was seen
    /// * `targets` - Target positions of the selected chord
    ///
    /// # Returns
    /// * `ValidationResult` - default (failed, empty) for missing input
    pub fn validate(&self, positions: Option<&FingerPositions>, targets: &[TargetPosition]) -> ValidationResult {
        let requirements = group_by_finger(targets);
        let positions = match positions {
            Some(p) if !p.is_empty() && !requirements.is_empty() => p,
            _ => return ValidationResult::default(),
        };

        let mut fingers = BTreeMap::new();
        for req in &requirements {
            let feedback = match positions.get(&req.finger) {
                None => FingerFeedback::missing(),
                Some(sample) if req.targets.len() > 1 => self.score_barre(sample, &req.targets),
                Some(sample) => self.score_single(sample, req.targets[0]),
            };
            fingers.insert(req.finger, feedback);
        }

        let overall_accuracy = fingers.values().map(|f| f.score).sum::<f32>() / fingers.len() as f32;
        let passed = requirements.iter().all(|req| {
            fingers
                .get(&req.finger)
                .is_some_and(|f| f.target.is_some() && f.tier.is_acceptable())
        });

        trace!("Validation: passed={} overall={:.2}", passed, overall_accuracy);
        ValidationResult { passed, fingers, overall_accuracy }
    }

    /// Three-band score for a distance from target.
    ///
    /// * good: `1 - d / good`, from 1 at the target to 0 at the band edge
    /// * okay: 0.7 falling linearly to 0.4 across the band
    /// * poor: 0.4 decaying toward 0 over twice the okay radius, floored at 0
    pub fn score_distance(&self, distance: f32) -> (Tier, f32) {
        let good = self.config.tolerance_good;
        let okay = self.config.tolerance_okay;
        if distance <= good {
            let score = if good > 0.0 { 1.0 - distance / good } else { 1.0 };
            (Tier::Good, score)
        } else if distance <= okay {
            (Tier::Okay, 0.7 - 0.3 * ((distance - good) / (okay - good)))
        } else {
            let decay = 0.4 * ((distance - okay) / (okay * 2.0));
            (Tier::Poor, (0.4 - decay).max(0.0))
        }
    }

    fn score_single(&self, sample: &FingerSample, target: &TargetPosition) -> FingerFeedback {
        let Some(actual) = sample.centroid() else {
            return FingerFeedback::missing();
        };
        let (tier, score) = self.score_distance(actual.distance_to(&target.point));
        FingerFeedback {
            tier,
            score,
            target: Some(MatchedTarget {
                point: target.point,
                string: Some(target.position.string),
                fret: target.position.fret,
            }),
            barre: None,
        }
    }

    /// Scores one finger laid across several strings.
    fn score_barre(&self, sample: &FingerSample, targets: &[&TargetPosition]) -> FingerFeedback {
        let points = sample.points();
        if points.is_empty() {
            return FingerFeedback::missing();
        }
        let n = points.len() as f32;
        let mean_x = points.iter().map(|p| p.x).sum::<f32>() / n;
        let mean_y = points.iter().map(|p| p.y).sum::<f32>() / n;
        let (finger_lo, finger_hi) = span_of(points.iter().map(|p| p.y));

        let fret_x = targets.iter().map(|t| t.point.x).sum::<f32>() / targets.len() as f32;
        let (barre_lo, barre_hi) = span_of(targets.iter().map(|t| t.point.y));
        let barre_span = barre_hi - barre_lo;
        let center_y = (barre_lo + barre_hi) / 2.0;

        let fret_distance = (mean_x - fret_x).abs();
        let fret_accuracy = 1.0 - (fret_distance / self.config.tolerance_okay).clamp(0.0, 1.0);

        let overlap = (finger_hi.min(barre_hi) - finger_lo.max(barre_lo)).max(0.0);
        let coverage = if barre_span > 0.0 { (overlap / barre_span).clamp(0.0, 1.0) } else { 0.0 };

        let center_distance = (mean_y - center_y).abs();
        let centering = 1.0
            - (center_distance / (barre_span / 2.0 + self.config.barre_center_epsilon)).clamp(0.0, 1.0);

        // Tiers gate on raw fret distance and coverage, not on the combined score.
        let combined = 0.5 * fret_accuracy + 0.4 * coverage + 0.1 * centering;
        let (tier, score) = if fret_distance <= self.config.tolerance_good && coverage >= 0.7 {
            (Tier::Good, combined)
        } else if fret_distance <= self.config.tolerance_okay && coverage >= 0.5 {
            (Tier::Okay, combined * 0.8)
        } else {
            (Tier::Poor, (combined * 0.5).max(0.0))
        };

        FingerFeedback {
            tier,
            score,
            target: Some(MatchedTarget {
                point: Point::new(fret_x, center_y),
                string: None,
                fret: targets[0].position.fret,
            }),
            barre: Some(BarreMetrics { fret_distance, fret_accuracy, coverage, centering }),
        }
    }
}

/// Groups fingered targets by finger, in finger order. Unowned targets are skipped.
fn group_by_finger(targets: &[TargetPosition]) -> Vec<Requirement<'_>> {
    let mut grouped: BTreeMap<Finger, Vec<&TargetPosition>> = BTreeMap::new();
    for target in targets {
        if let Some(finger) = target.finger {
            grouped.entry(finger).or_default().push(target);
        }
    }
    grouped
        .into_iter()
        .map(|(finger, targets)| Requirement { finger, targets })
        .collect()
}

/// A target at an arbitrary point, for callers building their own target lists.
pub fn target_at(point: Point, string: u8, fret: i8, finger: Finger) -> TargetPosition {
    TargetPosition { point, position: StringFret::new(string, fret), finger: Some(finger) }
}
