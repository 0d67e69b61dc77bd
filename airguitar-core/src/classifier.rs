//! # Gesture Classifier Module
//!
//! Maps the chord hand's finger-extension flags to a chord. Two compound
//! gestures are checked first, then the plain extended-finger count is looked
//! up in a fixed table.

use crate::chords::Chord;
use crate::pose::{CountMode, FingerState};
use tracing::debug;

/// Chord for each extended-finger count, fist (0) to open hand (5).
pub const COUNT_CHORDS: [Chord; 6] = [Chord::Am, Chord::C, Chord::G, Chord::D, Chord::E, Chord::A];

/// Thumb, index and pinky out, middle and ring curled.
pub const SIDE_ROCK_CHORD: Chord = Chord::Em;

/// Index and pinky out, middle and ring curled, thumb either way.
pub const ROCK_CHORD: Chord = Chord::F;

/// Recognized hand gestures, before they are turned into chords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SideRock,
    Rock,
    Count(usize),
}

impl Gesture {
    /// Reads the gesture from a finger state.
    ///
    /// Side rock is a thumb-extended superset of rock, so it is checked first.
    pub fn recognize(state: &FingerState, mode: CountMode) -> Gesture {
        let horns = state.index && state.pinky && !state.middle && !state.ring;
        if horns && state.thumb {
            Gesture::SideRock
        } else if horns {
            Gesture::Rock
        } else {
            Gesture::Count(state.extended_count(mode))
        }
    }

    pub fn chord(&self) -> Option<Chord> {
        match *self {
            Gesture::SideRock => Some(SIDE_ROCK_CHORD),
            Gesture::Rock => Some(ROCK_CHORD),
            Gesture::Count(n) => COUNT_CHORDS.get(n).copied(),
        }
    }
}

/// Classifies a finger state; a missing state is "no match".
pub fn classify(state: Option<&FingerState>, mode: CountMode) -> Option<Chord> {
    let state = state?;
    Gesture::recognize(state, mode).chord()
}

/// Holds the currently selected chord across frames.
///
/// Only a fresh match replaces the selection; a miss leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct ChordSelector {
    mode: CountMode,
    current: Option<Chord>,
}

impl ChordSelector {
    pub fn new(mode: CountMode) -> Self {
        Self { mode, current: None }
    }

    /// Classifies this frame's state and returns the match, if any.
    pub fn update(&mut self, state: Option<&FingerState>) -> Option<Chord> {
        let detected = classify(state, self.mode)?;
        if self.current != Some(detected) {
            debug!("Chord changed: {:?} -> {}", self.current, detected);
        }
        self.current = Some(detected);
        Some(detected)
    }

    pub fn current(&self) -> Option<Chord> {
        self.current
    }

    /// Name to show for the current selection.
    pub fn display_name(&self) -> &'static str {
        self.current.map_or("No Chord", |c| c.name())
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(flags: [bool; 5]) -> FingerState {
        FingerState::from_flags(flags)
    }

    /// Every one of the 32 flag combinations.
    fn all_states() -> impl Iterator<Item = FingerState> {
        (0u8..32).map(|bits| {
            state([bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0, bits & 16 != 0])
        })
    }

    #[test]
    fn test_rock_and_side_rock_precedence() {
        let rock = state([false, true, false, false, true]);
        let side = state([true, true, false, false, true]);
        for mode in [CountMode::WithThumb, CountMode::WithoutThumb] {
            assert_eq!(classify(Some(&rock), mode), Some(ROCK_CHORD));
            assert_eq!(classify(Some(&side), mode), Some(SIDE_ROCK_CHORD));
        }
    }

    #[test]
    fn test_counts_follow_table() {
        for mode in [CountMode::WithThumb, CountMode::WithoutThumb] {
            for s in all_states() {
                let horns = s.index && s.pinky && !s.middle && !s.ring;
                if horns {
                    continue;
                }
                let expected = COUNT_CHORDS[s.extended_count(mode)];
                assert_eq!(classify(Some(&s), mode), Some(expected), "{s:?} {mode:?}");
            }
        }
    }

    #[test]
    fn test_thumb_mode_changes_count() {
        let thumb_and_index = state([true, true, false, false, false]);
        assert_eq!(classify(Some(&thumb_and_index), CountMode::WithThumb), Some(Chord::G));
        assert_eq!(classify(Some(&thumb_and_index), CountMode::WithoutThumb), Some(Chord::C));

        let open = state([true; 5]);
        assert_eq!(classify(Some(&open), CountMode::WithThumb), Some(Chord::A));
        assert_eq!(classify(Some(&open), CountMode::WithoutThumb), Some(Chord::E));
    }

    #[test]
    fn test_missing_state_is_no_match() {
        assert_eq!(classify(None, CountMode::WithThumb), None);
    }

    #[test]
    fn test_selector_keeps_chord_on_miss() {
        let mut selector = ChordSelector::new(CountMode::WithThumb);
        assert_eq!(selector.display_name(), "No Chord");

        assert_eq!(selector.update(Some(&state([false, true, false, false, true]))), Some(Chord::F));
        assert_eq!(selector.update(None), None);
        assert_eq!(selector.current(), Some(Chord::F));

        assert_eq!(selector.update(Some(&state([false; 5]))), Some(Chord::Am));
        assert_eq!(selector.display_name(), "Am");

        selector.clear();
        assert_eq!(selector.current(), None);
    }
}
