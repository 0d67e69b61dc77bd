//! # Performance Session Module
//!
//! Per-frame orchestration of the interpreters: the chord hand goes to the
//! classifier (free play) or the validator (practice), the strum hand goes to
//! the strum detector, and every accepted strum is handed to a [`ChordSink`]
//! together with the current chord.

use crate::chords::Chord;
use crate::classifier::ChordSelector;
use crate::config::Settings;
use crate::fretboard::{FretboardRect, TargetPosition};
use crate::pose::HandPose;
use crate::strum::{StrumDetector, StrumDirection, StrumOutput, StrumState};
use crate::validator::{PositionValidator, ValidationResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What the chord hand controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Mode {
    /// Gestures pick the chord.
    FreePlay,
    /// The player practises fretting an explicitly chosen chord.
    Practice { target: Chord },
}

/// One camera frame's worth of pose input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Seconds since the session started.
    pub timestamp: f64,
    #[serde(default)]
    pub chord_hand: Option<HandPose>,
    #[serde(default)]
    pub strum_hand: Option<HandPose>,
}

/// A chord to sound, as sent to the audio side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub chord: Chord,
    pub direction: StrumDirection,
    /// Playback volume in the configured dynamics range.
    pub volume: f32,
    pub timestamp: f64,
}

/// Receiver of play events; the audio renderer implements this.
pub trait ChordSink {
    fn play(&mut self, event: PlayEvent);
}

impl ChordSink for Vec<PlayEvent> {
    fn play(&mut self, event: PlayEvent) {
        self.push(event);
    }
}

/// Everything interpreted from one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// The chord in effect after this frame.
    pub chord: Option<Chord>,
    pub strum: StrumOutput,
    /// Practice feedback; `None` in free play.
    pub validation: Option<ValidationResult>,
    pub played: Option<PlayEvent>,
}

/// State of one playing session. Not meant to be shared between threads.
#[derive(Debug)]
pub struct PerformanceSession {
    mode: Mode,
    selector: ChordSelector,
    detector: StrumDetector,
    strum_state: StrumState,
    validator: PositionValidator,
    fretboard: FretboardRect,
    practice_targets: Vec<TargetPosition>,
}

impl PerformanceSession {
    pub fn new(settings: &Settings, mode: Mode) -> Self {
        let mut session = Self {
            mode: Mode::FreePlay,
            selector: ChordSelector::new(settings.count_mode),
            detector: StrumDetector::new(settings.strum.clone()),
            strum_state: StrumState::new(),
            validator: PositionValidator::new(settings.validator.clone(), settings.layout),
            fretboard: settings.fretboard,
            practice_targets: Vec::new(),
        };
        session.set_mode(mode);
        session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches mode, dropping the selected chord and all strum memory.
    pub fn set_mode(&mut self, mode: Mode) {
        info!("Session mode: {:?}", mode);
        self.mode = mode;
        self.selector.clear();
        self.strum_state.reset();
        self.practice_targets = match mode {
            Mode::FreePlay => Vec::new(),
            Mode::Practice { target } => self.validator.targets_for(target),
        };
    }

    /// The chord a strum would play right now.
    pub fn current_chord(&self) -> Option<Chord> {
        match self.mode {
            Mode::FreePlay => self.selector.current(),
            Mode::Practice { target } => Some(target),
        }
    }

    pub fn strum_state(&self) -> &StrumState {
        &self.strum_state
    }

    /// Target positions of the practice chord (empty in free play).
    pub fn practice_targets(&self) -> &[TargetPosition] {
        &self.practice_targets
    }

    /// Clears strum memory and the selected chord, keeping the mode.
    pub fn reset(&mut self) {
        self.selector.clear();
        self.strum_state.reset();
    }

    /// Interprets one frame and sends any resulting strum to `sink`.
    pub fn process(&mut self, frame: &Frame, sink: &mut impl ChordSink) -> FrameReport {
        let validation = match self.mode {
            Mode::FreePlay => {
                let state = frame.chord_hand.as_ref().and_then(HandPose::finger_state);
                self.selector.update(state.as_ref());
                None
            }
            Mode::Practice { .. } => {
                let positions = frame
                    .chord_hand
                    .as_ref()
                    .map(|hand| self.fretboard.finger_positions(&hand.landmarks));
                Some(self.validator.validate(positions.as_ref(), &self.practice_targets))
            }
        };

        let wrist_y = frame
            .strum_hand
            .as_ref()
            .and_then(|hand| hand.landmarks.wrist())
            .map(|p| p.y);
        let strum = self.detector.update(&mut self.strum_state, wrist_y, frame.timestamp);

        let chord = self.current_chord();
        let played = match (strum.direction, chord) {
            (Some(direction), Some(chord)) if strum.triggered => {
                let event = PlayEvent { chord, direction, volume: strum.dynamics, timestamp: frame.timestamp };
                sink.play(event);
                Some(event)
            }
            (Some(_), None) => {
                debug!("Strum at {:.3}s with no chord selected", frame.timestamp);
                None
            }
            _ => None,
        };

        FrameReport { chord, strum, validation, played }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{landmarks, FingerState, HandLandmarks, Point};

    fn strum_hand(y: f32) -> HandPose {
        let mut points = vec![Point::new(0.7, y); landmarks::COUNT];
        points[landmarks::WRIST] = Point::new(0.7, y);
        HandPose { fingers: None, landmarks: HandLandmarks::new(points) }
    }

    fn chord_hand(flags: [bool; 5]) -> HandPose {
        HandPose { fingers: Some(FingerState::from_flags(flags)), landmarks: HandLandmarks::default() }
    }

    fn frame(t: f64, chord: Option<HandPose>, strum_y: Option<f32>) -> Frame {
        Frame { timestamp: t, chord_hand: chord, strum_hand: strum_y.map(strum_hand) }
    }

    #[test]
    fn test_strum_without_chord_plays_nothing() {
        let mut session = PerformanceSession::new(&Settings::default(), Mode::FreePlay);
        let mut sink = Vec::new();
        session.process(&frame(0.0, None, Some(0.2)), &mut sink);
        let report = session.process(&frame(0.05, None, Some(0.5)), &mut sink);
        assert!(report.strum.triggered);
        assert!(report.played.is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_chord_is_retained_when_hand_disappears() {
        let mut session = PerformanceSession::new(&Settings::default(), Mode::FreePlay);
        let mut sink = Vec::new();
        session.process(&frame(0.0, Some(chord_hand([false, true, true, false, false])), Some(0.2)), &mut sink);
        assert_eq!(session.current_chord(), Some(Chord::G));

        let report = session.process(&frame(0.05, None, Some(0.5)), &mut sink);
        assert_eq!(report.chord, Some(Chord::G));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].chord, Chord::G);
        assert_eq!(sink[0].direction, StrumDirection::Down);
    }

    #[test]
    fn test_practice_mode_plays_target_and_validates() {
        let settings = Settings::default();
        let mut session = PerformanceSession::new(&settings, Mode::Practice { target: Chord::Em });
        assert_eq!(session.practice_targets().len(), 2);

        // Build a chord hand whose fingertips sit exactly on the Em targets.
        let rect = settings.fretboard;
        let mut points = vec![Point::new(0.0, 0.0); landmarks::COUNT];
        for target in session.practice_targets().to_vec() {
            let finger = target.finger.unwrap();
            points[finger.tip_landmark()] = rect.to_frame(target.point);
        }
        // Lay the rest of the index finger over its tip.
        for i in [landmarks::INDEX_DIP, landmarks::INDEX_PIP, landmarks::INDEX_MCP] {
            points[i] = points[landmarks::INDEX_TIP];
        }
        let hand = HandPose { fingers: None, landmarks: HandLandmarks::new(points) };

        let mut sink = Vec::new();
        let report = session.process(&frame(0.0, Some(hand.clone()), Some(0.5)), &mut sink);
        let validation = report.validation.unwrap();
        assert!(validation.passed, "{validation:?}");
        assert_eq!(report.chord, Some(Chord::Em));

        let report = session.process(&frame(0.05, Some(hand), Some(0.2)), &mut sink);
        assert_eq!(report.played.map(|e| e.chord), Some(Chord::Em));
        assert_eq!(sink[0].direction, StrumDirection::Up);

        let report = session.process(&frame(0.1, None, None), &mut sink);
        assert_eq!(report.validation, Some(ValidationResult::default()));
    }

    #[test]
    fn test_mode_switch_resets_state() {
        let mut session = PerformanceSession::new(&Settings::default(), Mode::FreePlay);
        let mut sink = Vec::new();
        session.process(&frame(0.0, Some(chord_hand([false; 5])), Some(0.2)), &mut sink);
        session.process(&frame(0.05, None, Some(0.5)), &mut sink);
        assert!(session.strum_state().last_direction().is_some());

        session.set_mode(Mode::Practice { target: Chord::F });
        assert_eq!(session.current_chord(), Some(Chord::F));
        assert!(session.strum_state().last_direction().is_none());
        assert_eq!(session.practice_targets().len(), 6);

        session.set_mode(Mode::FreePlay);
        assert_eq!(session.current_chord(), None);
        assert!(session.practice_targets().is_empty());
    }
}
