//! # Pose Sample Module
//!
//! Types describing what the external hand-pose estimator hands us every
//! camera frame: per-finger extension flags and normalized landmark points.
//!
//! ## Features
//! - Five-flag `FingerState` with thumb-aware counting
//! - 21-point hand landmark model (wrist, four joints per finger)
//! - Extension derivation from raw landmarks
//! - Fretboard-space finger samples as a tagged single point / point sequence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Landmark indices of the 21-point hand model delivered by the pose estimator.
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    /// Number of points in a complete hand sample.
    pub const COUNT: usize = 21;
}

/// Minimum horizontal tip-to-joint offset for the thumb to count as extended.
const THUMB_EXTENSION_OFFSET: f32 = 0.04;
/// A finger tip must sit this far above its middle joint to count as extended.
const FINGER_EXTENSION_MARGIN: f32 = 0.02;

/// A 2D point in normalized coordinates (frame-relative or fretboard-relative).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One of the four fingers that can fret a string. The thumb never frets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// Converts conventional guitar finger numbering (1 = index .. 4 = pinky).
    ///
    /// Returns `None` for 0 (the thumb) and anything above 4.
    pub fn from_number(number: u8) -> Option<Finger> {
        match number {
            1 => Some(Finger::Index),
            2 => Some(Finger::Middle),
            3 => Some(Finger::Ring),
            4 => Some(Finger::Pinky),
            _ => None,
        }
    }

    /// Conventional guitar finger number (1 = index .. 4 = pinky).
    pub fn number(&self) -> u8 {
        match self {
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Pinky => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }

    /// Landmark index of this finger's tip.
    pub fn tip_landmark(&self) -> usize {
        match self {
            Finger::Index => landmarks::INDEX_TIP,
            Finger::Middle => landmarks::MIDDLE_TIP,
            Finger::Ring => landmarks::RING_TIP,
            Finger::Pinky => landmarks::PINKY_TIP,
        }
    }
}

/// Whether the thumb counts toward the extended-finger tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    #[default]
    WithThumb,
    WithoutThumb,
}

/// Extension flags for the five digits of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    /// Builds a state from `[thumb, index, middle, ring, pinky]`.
    pub fn from_flags(flags: [bool; 5]) -> Self {
        let [thumb, index, middle, ring, pinky] = flags;
        Self { thumb, index, middle, ring, pinky }
    }

    pub fn flags(&self) -> [bool; 5] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
    }

    /// Number of extended fingers, honoring the thumb-inclusion mode.
    pub fn extended_count(&self, mode: CountMode) -> usize {
        let flags = self.flags();
        let counted = match mode {
            CountMode::WithThumb => &flags[..],
            CountMode::WithoutThumb => &flags[1..],
        };
        counted.iter().filter(|&&up| up).count()
    }

    /// Derives extension flags from a full hand sample.
    ///
    /// The thumb is extended when its tip is horizontally clear of its lower
    /// joint; every other finger when its tip is clearly above its middle joint
    /// (image y grows downward). Returns `None` for an incomplete sample.
    pub fn from_landmarks(hand: &HandLandmarks) -> Option<Self> {
        if !hand.is_complete() {
            return None;
        }
        let p = &hand.points;

        let thumb = (p[landmarks::THUMB_TIP].x - p[landmarks::THUMB_MCP].x).abs()
            > THUMB_EXTENSION_OFFSET;
        let raised = |tip: usize, pip: usize| p[tip].y < p[pip].y - FINGER_EXTENSION_MARGIN;

        Some(Self {
            thumb,
            index: raised(landmarks::INDEX_TIP, landmarks::INDEX_PIP),
            middle: raised(landmarks::MIDDLE_TIP, landmarks::MIDDLE_PIP),
            ring: raised(landmarks::RING_TIP, landmarks::RING_PIP),
            pinky: raised(landmarks::PINKY_TIP, landmarks::PINKY_PIP),
        })
    }
}

/// The landmark points of one tracked hand, normalized to the camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks {
    pub points: Vec<Point>,
}

impl HandLandmarks {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= landmarks::COUNT
    }

    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// The wrist point, used as the strum reference.
    pub fn wrist(&self) -> Option<Point> {
        self.get(landmarks::WRIST)
    }
}

/// Everything the pose estimator reports for one hand in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandPose {
    /// Extension flags, when the estimator supplies them directly.
    #[serde(default)]
    pub fingers: Option<FingerState>,
    #[serde(default)]
    pub landmarks: HandLandmarks,
}

impl HandPose {
    /// Reported flags, falling back to derivation from the landmarks.
    pub fn finger_state(&self) -> Option<FingerState> {
        self.fingers.or_else(|| FingerState::from_landmarks(&self.landmarks))
    }
}

/// A finger's observed position in fretboard space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerSample {
    /// The fingertip alone.
    SinglePoint(Point),
    /// Ordered points along the finger, tip first. Used for barre coverage.
    PointSequence(Vec<Point>),
}

impl FingerSample {
    /// Mean position of the sample; `None` for an empty sequence.
    pub fn centroid(&self) -> Option<Point> {
        match self {
            FingerSample::SinglePoint(point) => Some(*point),
            FingerSample::PointSequence(points) if points.is_empty() => None,
            FingerSample::PointSequence(points) => {
                let n = points.len() as f32;
                let (sx, sy) = points
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
                Some(Point::new(sx / n, sy / n))
            }
        }
    }

    /// The sample as a list of points.
    pub fn points(&self) -> &[Point] {
        match self {
            FingerSample::SinglePoint(point) => std::slice::from_ref(point),
            FingerSample::PointSequence(points) => points,
        }
    }
}

/// Fretboard-space samples for each detected fretting finger.
pub type FingerPositions = BTreeMap<Finger, FingerSample>;

#[cfg(test)]
pub(crate) fn open_hand() -> HandLandmarks {
    // Palm near the bottom of the frame, every finger raised well above its joints.
    let mut points = vec![Point::new(0.5, 0.9); landmarks::COUNT];
    points[landmarks::THUMB_MCP] = Point::new(0.40, 0.75);
    points[landmarks::THUMB_TIP] = Point::new(0.30, 0.70);
    for (pip, tip, x) in [
        (landmarks::INDEX_PIP, landmarks::INDEX_TIP, 0.42),
        (landmarks::MIDDLE_PIP, landmarks::MIDDLE_TIP, 0.48),
        (landmarks::RING_PIP, landmarks::RING_TIP, 0.54),
        (landmarks::PINKY_PIP, landmarks::PINKY_TIP, 0.60),
    ] {
        points[pip] = Point::new(x, 0.6);
        points[tip] = Point::new(x, 0.4);
    }
    HandLandmarks::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_count_modes() {
        let state = FingerState::from_flags([true, true, false, false, true]);
        assert_eq!(state.extended_count(CountMode::WithThumb), 3);
        assert_eq!(state.extended_count(CountMode::WithoutThumb), 2);
    }

    #[test]
    fn test_open_hand_is_fully_extended() {
        let state = FingerState::from_landmarks(&open_hand()).unwrap();
        assert_eq!(state.flags(), [true; 5]);
    }

    #[test]
    fn test_curled_fingers_within_margin_are_down() {
        let mut hand = open_hand();
        // Tip only slightly above the joint: inside the margin, so still curled.
        hand.points[landmarks::MIDDLE_TIP].y = 0.59;
        // Thumb tucked in line with its joint.
        hand.points[landmarks::THUMB_TIP].x = 0.41;
        let state = FingerState::from_landmarks(&hand).unwrap();
        assert_eq!(state.flags(), [false, true, false, true, true]);
    }

    #[test]
    fn test_incomplete_hand_has_no_state() {
        let hand = HandLandmarks::new(vec![Point::default(); 5]);
        assert!(FingerState::from_landmarks(&hand).is_none());
        let pose = HandPose { fingers: None, landmarks: hand };
        assert!(pose.finger_state().is_none());
    }

    #[test]
    fn test_reported_flags_take_precedence() {
        let reported = FingerState::from_flags([false, true, false, false, false]);
        let pose = HandPose { fingers: Some(reported), landmarks: open_hand() };
        assert_eq!(pose.finger_state(), Some(reported));
    }

    #[test]
    fn test_finger_numbering_excludes_thumb() {
        assert_eq!(Finger::from_number(0), None);
        assert_eq!(Finger::from_number(5), None);
        for finger in Finger::ALL {
            assert_eq!(Finger::from_number(finger.number()), Some(finger));
        }
    }

    #[test]
    fn test_sample_centroid() {
        let seq = FingerSample::PointSequence(vec![Point::new(0.0, 0.2), Point::new(0.2, 0.4)]);
        let c = seq.centroid().unwrap();
        assert!((c.x - 0.1).abs() < 1e-6 && (c.y - 0.3).abs() < 1e-6);
        assert!(FingerSample::PointSequence(Vec::new()).centroid().is_none());
        assert_eq!(seq.points().len(), 2);
    }
}
