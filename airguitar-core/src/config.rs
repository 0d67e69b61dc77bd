//! # Settings Module
//!
//! Every tunable threshold of the interpreter in one serializable tree,
//! persisted as pretty-printed JSON.

use crate::fretboard::{FretboardLayout, FretboardRect};
use crate::pose::CountMode;
use crate::strum::StrumConfig;
use crate::validator::ValidatorConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete interpreter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether the thumb counts toward the finger tally in free play.
    pub count_mode: CountMode,
    pub strum: StrumConfig,
    pub validator: ValidatorConfig,
    pub layout: FretboardLayout,
    pub fretboard: FretboardRect,
}

impl Settings {
    /// Loads settings from a JSON file and validates them.
    ///
    /// Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let settings: Settings = serde_json::from_str(&data)?;
        if let Err(e) = settings.validate() {
            warn!("Rejected settings: {}", e);
            return Err(e);
        }
        Ok(settings)
    }

    /// Writes the settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }

    /// Checks the relationships between thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strum;
        let v = &self.validator;
        let checks: [(bool, &'static str, String); 10] = [
            (
                v.tolerance_good > 0.0 && v.tolerance_good < v.tolerance_okay,
                "validator.tolerance_good",
                format!("must be positive and below tolerance_okay ({})", v.tolerance_okay),
            ),
            (
                v.barre_center_epsilon >= 0.0,
                "validator.barre_center_epsilon",
                "must not be negative".into(),
            ),
            (s.threshold > 0.0, "strum.threshold", "must be positive".into()),
            (s.cooldown_s >= 0.0, "strum.cooldown_s", "must not be negative".into()),
            (s.min_elapsed_s > 0.0, "strum.min_elapsed_s", "must be positive".into()),
            (s.velocity_window >= 1, "strum.velocity_window", "must hold at least one sample".into()),
            (
                s.min_velocity >= 0.0 && s.min_velocity < s.max_velocity,
                "strum.min_velocity",
                format!("must be non-negative and below max_velocity ({})", s.max_velocity),
            ),
            (s.curve_exponent > 1.0, "strum.curve_exponent", "must be greater than 1".into()),
            (
                0.0 <= s.min_dynamics && s.min_dynamics <= s.max_dynamics && s.max_dynamics <= 1.0,
                "strum.min_dynamics",
                "dynamics range must satisfy 0 <= min <= max <= 1".into(),
            ),
            (
                self.layout.strings > 0 && self.layout.frets > 0,
                "layout",
                "needs at least one string and one fret".into(),
            ),
        ];

        match checks.into_iter().find(|(ok, _, _)| !ok) {
            Some((_, field, reason)) => Err(ConfigError::Invalid { field, reason }),
            None => Ok(()),
        }
    }
}
