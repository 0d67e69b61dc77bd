//! # Fretboard Geometry Module
//!
//! Normalized fretboard space: strings run horizontally and are stacked
//! vertically (string 0 at the top), frets divide the board along x. Target
//! finger positions are derived from string/fret indices and fixed spacing,
//! never hand-authored.

use crate::chords::{Barre, ChordShape, StringFret};
use crate::pose::{Finger, FingerPositions, FingerSample, HandLandmarks, Point};
use serde::{Deserialize, Serialize};

/// Landmarks sampled along the index finger for barre coverage, tip first.
const INDEX_SEQUENCE: [usize; 4] = [
    crate::pose::landmarks::INDEX_TIP,
    crate::pose::landmarks::INDEX_DIP,
    crate::pose::landmarks::INDEX_PIP,
    crate::pose::landmarks::INDEX_MCP,
];

/// Spacing constants for the diagram the player is matching against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FretboardLayout {
    pub strings: usize,
    /// Frets shown past the nut.
    pub frets: usize,
    /// Frets are drawn closer than an even split; this scales their spacing.
    pub fret_compression: f32,
    /// Offset of fret lines from their nominal index, in fret spacings.
    pub fret_offset: f32,
}

impl Default for FretboardLayout {
    fn default() -> Self {
        Self {
            strings: crate::chords::STRING_COUNT,
            frets: 5,
            fret_compression: 0.4,
            fret_offset: 0.1,
        }
    }
}

/// Where one fretted note of a chord should be pressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub point: Point,
    pub position: StringFret,
    pub finger: Option<Finger>,
}

impl FretboardLayout {
    pub fn string_spacing(&self) -> f32 {
        1.0 / (self.strings as f32 + 1.0)
    }

    pub fn fret_spacing(&self) -> f32 {
        self.fret_compression / (self.frets as f32 + 2.0)
    }

    pub fn string_y(&self, string: u8) -> f32 {
        self.string_spacing() * (string as f32 + 1.0)
    }

    pub fn fret_x(&self, fret: i8) -> f32 {
        self.fret_spacing() * (fret as f32 + self.fret_offset)
    }

    pub fn point_for(&self, position: StringFret) -> Point {
        Point::new(self.fret_x(position.fret), self.string_y(position.string))
    }

    /// One target per fretted position of the shape, in string order.
    pub fn targets(&self, shape: &ChordShape) -> Vec<TargetPosition> {
        shape
            .fretted()
            .map(|position| TargetPosition {
                point: self.point_for(position),
                position,
                finger: shape.finger_for(position),
            })
            .collect()
    }

    /// Fret x of the barre and the y midway between its outermost strings.
    pub fn barre_center(&self, barre: &Barre) -> Point {
        let (min_y, max_y) = self.barre_span(barre);
        Point::new(self.fret_x(barre.fret), (min_y + max_y) / 2.0)
    }

    /// Lowest and highest y among the barred strings.
    pub fn barre_span(&self, barre: &Barre) -> (f32, f32) {
        span_of(barre.strings.iter().map(|&s| self.string_y(s)))
    }
}

/// Min and max of a set of coordinates; `(0, 0)` when empty.
pub(crate) fn span_of(values: impl Iterator<Item = f32>) -> (f32, f32) {
    let (min, max) = values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_finite() { (min, max) } else { (0.0, 0.0) }
}

/// Placement of the fretboard diagram inside the camera frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FretboardRect {
    pub frame_width: f32,
    pub frame_height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for FretboardRect {
    /// A 600x200 board centred horizontally near the bottom of a 1280x720 frame.
    fn default() -> Self {
        Self {
            frame_width: 1280.0,
            frame_height: 720.0,
            x: 340.0,
            y: 500.0,
            width: 600.0,
            height: 200.0,
        }
    }
}

impl FretboardRect {
    /// Converts a frame-normalized landmark into fretboard space.
    ///
    /// Values outside 0..1 are valid and mean the point is off the board.
    /// A degenerate board dimension maps that axis to 0.
    pub fn to_fretboard(&self, landmark: Point) -> Point {
        let axis = |normalized: f32, frame: f32, origin: f32, extent: f32| {
            if extent > 0.0 { (normalized * frame - origin) / extent } else { 0.0 }
        };
        Point::new(
            axis(landmark.x, self.frame_width, self.x, self.width),
            axis(landmark.y, self.frame_height, self.y, self.height),
        )
    }

    /// Fretboard-space samples for every fretting finger present in the hand.
    ///
    /// The index finger is sampled along its length for barre checks; the
    /// others contribute their tip only.
    pub fn finger_positions(&self, hand: &HandLandmarks) -> FingerPositions {
        let mut positions = FingerPositions::new();
        for finger in Finger::ALL {
            let sample = match finger {
                Finger::Index => {
                    let points: Vec<Point> = INDEX_SEQUENCE
                        .iter()
                        .filter_map(|&i| hand.get(i))
                        .map(|p| self.to_fretboard(p))
                        .collect();
                    if points.is_empty() {
                        continue;
                    }
                    FingerSample::PointSequence(points)
                }
                _ => match hand.get(finger.tip_landmark()) {
                    Some(tip) => FingerSample::SinglePoint(self.to_fretboard(tip)),
                    None => continue,
                },
            };
            positions.insert(finger, sample);
        }
        positions
    }

    /// Inverse of [`Self::to_fretboard`], handy for placing synthetic hands.
    pub fn to_frame(&self, board: Point) -> Point {
        let axis = |value: f32, frame: f32, origin: f32, extent: f32| {
            if frame > 0.0 { (value * extent + origin) / frame } else { 0.0 }
        };
        Point::new(
            axis(board.x, self.frame_width, self.x, self.width),
            axis(board.y, self.frame_height, self.y, self.height),
        )
    }
}
