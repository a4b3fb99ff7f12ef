// Pitch classes, triads, and chords.
//
// A `PitchClass` is one of the twelve octave-independent pitches, stored as
// its semitone offset above C. Enharmonic spellings (A# / Bb) are the same
// variant, so all interval math treats them identically.
//
// A `Chord` is a root pitch class plus a `TriadType`. Triads are described by
// their cyclic interval pattern (major = 4,3,5; minor = 3,4,5), which lets
// `Chord::note_at` walk any number of chord degrees up or down across
// octaves. Pitches are folded back into MIDI range by whole octaves.
//
// Used by harmony.rs to decode chord tokens and by notator.rs to turn melodic
// chord degrees into MIDI keys.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semitones per octave.
pub const NOTES_IN_OCTAVE: i32 = 12;

/// Highest MIDI key number.
pub const MAX_MIDI_NOTE: i32 = 127;

/// The twelve pitch classes in canonical (ascending from C) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C = 0,
    CSharp = 1,
    D = 2,
    DSharp = 3,
    E = 4,
    F = 5,
    FSharp = 6,
    G = 7,
    GSharp = 8,
    A = 9,
    ASharp = 10,
    B = 11,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitone offset above C (0-11). Also the MIDI key of this pitch in
    /// octave 0.
    pub fn offset(self) -> i32 {
        self as i32
    }

    /// The pitch class at any semitone offset from C, wrapping modulo 12.
    pub fn from_offset(offset: i32) -> Self {
        Self::ALL[offset.rem_euclid(NOTES_IN_OCTAVE) as usize]
    }

    /// The pitch class `interval` semitones above (or below, if negative)
    /// `tonic`.
    pub fn from_interval(tonic: PitchClass, interval: i32) -> Self {
        Self::from_offset(tonic.offset() + interval)
    }

    /// Sharp-spelled name, e.g. "C#".
    pub fn name(self) -> &'static str {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        NAMES[self as usize]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = ParseError;

    /// Accepts a letter A-G followed by an optional accidental, in any case:
    /// `SHARP`/`#`/`♯` raise, `FLAT`/`B`/`♭` lower ("ASHARP", "A#", "BFLAT",
    /// "Bb" all parse).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let mut chars = upper.chars();
        let natural = match chars.next() {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(ParseError::UnknownPitch(s.to_string())),
        };
        let accidental = match chars.as_str() {
            "" => 0,
            "SHARP" | "#" | "♯" => 1,
            "FLAT" | "B" | "♭" => -1,
            _ => return Err(ParseError::UnknownPitch(s.to_string())),
        };
        Ok(PitchClass::from_offset(natural + accidental))
    }
}

/// Character marking a major triad in chord tokens and profiles.
pub const MAJOR_TRIAD_CHAR: char = 'M';

/// Character marking a minor triad in chord tokens and profiles.
pub const MINOR_TRIAD_CHAR: char = 'm';

/// Triad quality with its cyclic interval pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriadType {
    Major,
    Minor,
}

impl TriadType {
    /// Semitones from each chord tone to the next, wrapping back to the root
    /// an octave up.
    pub fn pattern(self) -> &'static [i32; 3] {
        match self {
            TriadType::Major => &[4, 3, 5],
            TriadType::Minor => &[3, 4, 5],
        }
    }

    pub fn to_char(self) -> char {
        match self {
            TriadType::Major => MAJOR_TRIAD_CHAR,
            TriadType::Minor => MINOR_TRIAD_CHAR,
        }
    }

    /// Decode a quality character. Anything other than `M` is minor.
    pub fn from_char(c: char) -> Self {
        if c == MAJOR_TRIAD_CHAR {
            TriadType::Major
        } else {
            TriadType::Minor
        }
    }
}

/// The harmony sounding over one span of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub root: PitchClass,
    pub triad: TriadType,
}

impl Chord {
    pub fn new(root: PitchClass, triad: TriadType) -> Self {
        Chord { root, triad }
    }

    /// MIDI key of the chord tone `degree` steps from the root, in `octave`.
    ///
    /// Positive degrees walk up the interval pattern (degree 3 is the root an
    /// octave higher), negative degrees walk down it. The result is moved by
    /// whole octaves into 0..=127, never truncated.
    pub fn note_at(&self, degree: i32, octave: i32) -> u8 {
        let pattern = self.triad.pattern();
        let len = pattern.len() as i32;
        let mut note = self.root.offset();

        if degree >= 0 {
            for step in 0..degree {
                note += pattern[(step % len) as usize];
            }
        } else {
            for step in 0..-degree {
                note -= pattern[(len - 1 - step % len) as usize];
            }
        }

        note += octave * NOTES_IN_OCTAVE;

        if note < 0 {
            let octaves = (-note + NOTES_IN_OCTAVE - 1) / NOTES_IN_OCTAVE;
            note += octaves * NOTES_IN_OCTAVE;
        } else if note > MAX_MIDI_NOTE {
            let octaves = (note - MAX_MIDI_NOTE + NOTES_IN_OCTAVE - 1) / NOTES_IN_OCTAVE;
            note -= octaves * NOTES_IN_OCTAVE;
        }

        note as u8
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.triad {
            TriadType::Major => write!(f, "{}", self.root),
            TriadType::Minor => write!(f, "{}m", self.root),
        }
    }
}
