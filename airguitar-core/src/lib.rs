// airguitar-core/src/lib.rs

//! The core logic for the gesture-controlled guitar.
//! This crate interprets hand-pose samples into chords, strums and
//! fretting feedback. It is completely headless: no camera, audio or
//! drawing code lives here, only the per-frame interpreters.

pub mod chords;
pub mod classifier;
pub mod config;
pub mod fretboard;
pub mod pose;
pub mod session;
pub mod strum;
pub mod validator;

pub use chords::{catalog, Chord};
pub use config::Settings;
pub use session::{ChordSink, Frame, FrameReport, Mode, PerformanceSession, PlayEvent};
