//! # Air Guitar - Command Line Front End
//!
//! Replays recorded hand-pose frames through the interpreter and reports the
//! chords, strums and practice feedback it produces.
//!
//! ## Architecture
//! - **Main Thread**: runs the [`PerformanceSession`] frame by frame
//! - **Reader Thread**: parses the JSON-lines recording
//! - **Communication**: a bounded crossbeam channel between the two

mod replay;
mod report;

use airguitar_core::fretboard::FretboardLayout;
use airguitar_core::{catalog, Chord, Mode, PerformanceSession, Settings};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use replay::FrameReader;
use report::{LogSink, Summary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "airguitar", about = "Gesture-controlled guitar interpreter")]
struct Cli {
    /// Settings file (JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interpret a recording of pose frames, one JSON object per line
    Replay {
        input: PathBuf,

        /// Practise this chord instead of selecting chords by gesture
        #[arg(long, value_name = "CHORD")]
        practice: Option<String>,

        /// Write every play event as a JSON line to this file
        #[arg(long, value_name = "PATH")]
        events: Option<PathBuf>,
    },
    /// List the chord catalog with target positions
    Chords,
    /// Write the default settings to a file
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airguitar=info,airguitar_core=info".into()),
        )
        .init();

    match cli.command {
        Command::Replay { input, practice, events } => {
            let settings = load_settings(cli.config.as_deref())?;
            let mode = match practice {
                Some(name) => match Chord::from_name(&name) {
                    Some(target) => Mode::Practice { target },
                    None => bail!("unknown chord `{}`", name),
                },
                None => Mode::FreePlay,
            };
            run_replay(&settings, mode, &input, events.as_deref())
        }
        Command::Chords => {
            let settings = load_settings(cli.config.as_deref())?;
            print_catalog(&settings.layout);
            Ok(())
        }
        Command::InitConfig { path } => {
            Settings::default()
                .save(&path)
                .with_context(|| format!("writing settings to {}", path.display()))?;
            info!("Default settings written to {}", path.display());
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn run_replay(settings: &Settings, mode: Mode, input: &Path, events: Option<&Path>) -> Result<()> {
    let mut session = PerformanceSession::new(settings, mode);
    let mut sink = LogSink::default();
    let mut summary = Summary::default();

    let reader = FrameReader::spawn(input)?;
    let mut last_timestamp = f64::NEG_INFINITY;
    for frame in reader.frames.iter() {
        if frame.timestamp < last_timestamp {
            warn!("Frame at {:.3}s is earlier than {:.3}s", frame.timestamp, last_timestamp);
        }
        last_timestamp = last_timestamp.max(frame.timestamp);
        let report = session.process(&frame, &mut sink);
        summary.record(&report, frame.timestamp);
    }
    let stats = reader.finish();
    info!(
        "Read {} lines: {} frames, {} malformed",
        stats.lines, stats.frames, stats.malformed
    );

    if let Some(path) = events {
        write_events(path, &sink)?;
    }
    println!("{}", summary.render(sink.played.len()));
    Ok(())
}

fn write_events(path: &Path, sink: &LogSink) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for event in &sink.played {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    }
    out.flush()?;
    info!("Wrote {} play events to {}", sink.played.len(), path.display());
    Ok(())
}

fn print_catalog(layout: &FretboardLayout) {
    for shape in catalog().shapes() {
        println!("{}", report::describe_shape(shape, layout));
    }
}
