//! # Text Reporting
//!
//! Console rendering of what the session interpreted: play events, practice
//! feedback lines and an end-of-replay summary.

use airguitar_core::chords::{ChordShape, StringFret, STRING_NAMES};
use airguitar_core::fretboard::FretboardLayout;
use airguitar_core::validator::ValidationResult;
use airguitar_core::{Chord, ChordSink, FrameReport, PlayEvent};
use std::fmt::Write;
use tracing::info;

/// Audio stand-in: logs every play event and keeps a tally.
#[derive(Debug, Default)]
pub struct LogSink {
    pub played: Vec<PlayEvent>,
}

impl ChordSink for LogSink {
    fn play(&mut self, event: PlayEvent) {
        info!(
            "[{:>7.3}s] play {:<2} {:<4} volume {:.2}",
            event.timestamp,
            event.chord.name(),
            event.direction.as_str(),
            event.volume
        );
        self.played.push(event);
    }
}

/// One-line practice feedback, e.g. `PASS 0.91 | index good 0.95 | middle okay 0.62`.
pub fn feedback_line(result: &ValidationResult) -> String {
    let mut line = format!(
        "{} {:.2}",
        if result.passed { "PASS" } else { "----" },
        result.overall_accuracy
    );
    for (finger, feedback) in &result.fingers {
        let _ = write!(line, " | {} {} {:.2}", finger.as_str(), feedback.tier.as_str(), feedback.score);
    }
    line
}

/// Tab-style fingering, low string first: `x32010`.
pub fn fingering_tab(shape: &ChordShape) -> String {
    shape
        .fingering
        .iter()
        .map(|pos| match pos.fret {
            StringFret::MUTED => 'x',
            fret => char::from_digit(fret.max(0) as u32, 10).unwrap_or('?'),
        })
        .collect()
}

/// Multi-line description of a chord: tab, finger assignments and targets.
pub fn describe_shape(shape: &ChordShape, layout: &FretboardLayout) -> String {
    let mut out = format!("{:<3} {}", shape.chord.name(), fingering_tab(shape));
    if let Some(barre) = shape.barre() {
        let _ = write!(out, "  (barre: {} at fret {})", barre.finger.as_str(), barre.fret);
    }
    for target in layout.targets(shape) {
        let string = target.position.string as usize;
        let _ = write!(
            out,
            "\n    string {} ({}) fret {} -> {:<6} at ({:.3}, {:.3})",
            string,
            STRING_NAMES.get(string).copied().unwrap_or("?"),
            target.position.fret,
            target.finger.map_or("-", |f| f.as_str()),
            target.point.x,
            target.point.y
        );
    }
    out
}

/// Running totals over a replay.
#[derive(Debug, Default)]
pub struct Summary {
    pub frames: usize,
    pub strums: usize,
    pub chord_changes: usize,
    pub practice_frames: usize,
    pub practice_passes: usize,
    last_chord: Option<Chord>,
    last_passed: Option<bool>,
}

impl Summary {
    /// Accounts for one frame, logging chord and pass/fail transitions.
    pub fn record(&mut self, report: &FrameReport, timestamp: f64) {
        self.frames += 1;
        if report.strum.triggered {
            self.strums += 1;
        }
        if report.chord != self.last_chord {
            if let Some(chord) = report.chord {
                self.chord_changes += 1;
                info!("[{:>7.3}s] chord {}", timestamp, chord);
            }
            self.last_chord = report.chord;
        }
        if let Some(validation) = &report.validation {
            self.practice_frames += 1;
            if validation.passed {
                self.practice_passes += 1;
            }
            if self.last_passed != Some(validation.passed) {
                info!("[{:>7.3}s] {}", timestamp, feedback_line(validation));
                self.last_passed = Some(validation.passed);
            }
        }
    }

    pub fn render(&self, played: usize) -> String {
        let mut out = format!(
            "frames: {}\nstrums: {} (played {})\nchord changes: {}",
            self.frames, self.strums, played, self.chord_changes
        );
        if self.practice_frames > 0 {
            let ratio = self.practice_passes as f32 / self.practice_frames as f32;
            let _ = write!(
                out,
                "\nshape held: {}/{} frames ({:.0}%)",
                self.practice_passes,
                self.practice_frames,
                ratio * 100.0
            );
        }
        out
    }
}
