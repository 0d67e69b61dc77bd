//! # Frame Replay
//!
//! Reads recorded pose frames (one JSON object per line) on a dedicated
//! thread and streams them to the interpreting loop over a channel.

use airguitar_core::Frame;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Frames buffered between the reader and the interpreter.
const CHANNEL_CAPACITY: usize = 256;

/// Handle to the reader thread.
pub struct FrameReader {
    pub frames: Receiver<Frame>,
    thread_handle: Option<JoinHandle<ReadStats>>,
}

/// What the reader saw in the input.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadStats {
    pub lines: usize,
    pub frames: usize,
    pub malformed: usize,
}

impl FrameReader {
    /// Opens `path` and starts streaming its frames.
    pub fn spawn(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening recording {}", path.display()))?;
        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let thread_handle = thread::Builder::new()
            .name("frame-reader".into())
            .spawn(move || read_frames(BufReader::new(file), tx))
            .context("spawning frame reader thread")?;
        Ok(Self { frames: rx, thread_handle: Some(thread_handle) })
    }

    /// Waits for the reader to finish and returns its statistics.
    pub fn finish(mut self) -> ReadStats {
        match self.thread_handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                warn!("Frame reader thread panicked");
                ReadStats::default()
            }
            None => ReadStats::default(),
        }
    }
}

/// Parses JSON lines from `input`, sending every well-formed frame.
///
/// Blank lines are skipped. Lines that are not valid UTF-8 or not a valid
/// frame are logged, counted and skipped. Stops at any other read error or
/// when the receiving side hangs up.
pub fn read_frames(input: impl BufRead, tx: Sender<Frame>) -> ReadStats {
    let mut stats = ReadStats::default();
    for (number, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            // The offending line is already consumed; move on to the next one.
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                stats.lines += 1;
                stats.malformed += 1;
                warn!("Skipping line {} with invalid UTF-8: {}", number + 1, e);
                continue;
            }
            Err(e) => {
                warn!("Stopped reading at line {}: {}", number + 1, e);
                break;
            }
        };
        stats.lines += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Frame>(&line) {
            Ok(frame) => {
                stats.frames += 1;
                if tx.send(frame).is_err() {
                    debug!("Interpreter hung up, reader exiting");
                    break;
                }
            }
            Err(e) => {
                stats.malformed += 1;
                warn!("Skipping malformed frame on line {}: {}", number + 1, e);
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_frames_and_skips_bad_lines() {
        let input = concat!(
            r#"{"timestamp": 0.0, "strum_hand": {"landmarks": [{"x": 0.5, "y": 0.2}]}}"#,
            "\n\n",
            "not json\n",
            r#"{"timestamp": 0.033, "chord_hand": {"fingers": {"thumb": false, "index": true, "middle": false, "ring": false, "pinky": true}}}"#,
            "\n",
        );
        let (tx, rx) = crossbeam_channel::unbounded();
        let stats = read_frames(Cursor::new(input), tx);
        assert_eq!((stats.lines, stats.frames, stats.malformed), (4, 2, 1));

        let frames: Vec<Frame> = rx.iter().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].strum_hand.as_ref().unwrap().landmarks.wrist().unwrap().y, 0.2);
        assert!(frames[1].chord_hand.as_ref().unwrap().fingers.unwrap().pinky);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"timestamp\": 0.0}\n");
        input.extend_from_slice(&[0xff, 0xfe, b'\n']);
        input.extend_from_slice(b"{\"timestamp\": 0.1}\n{\"timestamp\": 0.2}\n");
        let (tx, rx) = crossbeam_channel::unbounded();
        let stats = read_frames(Cursor::new(input), tx);
        assert_eq!((stats.lines, stats.frames, stats.malformed), (4, 3, 1));

        let timestamps: Vec<f64> = rx.iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn test_stops_when_receiver_is_gone() {
        let input = "{\"timestamp\": 0.0}\n{\"timestamp\": 0.1}\n";
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let stats = read_frames(Cursor::new(input), tx);
        assert_eq!(stats.frames, 1);
    }
}
