// Major and minor scale profiles.
//
// Each scale carries two 12-entry tables indexed by semitones above the
// tonic:
// - a consonance profile: how well a pitch at that interval fits the key
//   (positive = consonant, negative = dissonant)
// - a triad profile: whether the chord built on that pitch is major or minor
//
// The values mix common-practice theory with taste; they are data, not
// algorithm. harmony.rs combines them into the weighted chord-transition
// grammar.

use crate::error::ParseError;
use crate::pitch::TriadType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use TriadType::{Major as Maj, Minor as Min};

/// Consonance of each interval above the tonic in a major key.
pub const MAJOR_CONSONANCE: [i32; 12] = [4, -3, 1, -3, 1, 2, -3, 4, -3, 1, 1, -3];

/// Consonance of each interval above the tonic in a minor key.
pub const MINOR_CONSONANCE: [i32; 12] = [4, -3, 1, 2, -3, 2, -3, 4, 1, -3, 2, -3];

/// Triad quality built on each interval above the tonic in a major key.
pub const MAJOR_TRIADS: [TriadType; 12] = [Maj, Min, Min, Maj, Min, Maj, Min, Maj, Min, Min, Maj, Min];

/// Triad quality built on each interval above the tonic in a minor key.
pub const MINOR_TRIADS: [TriadType; 12] = [Min, Maj, Maj, Maj, Min, Min, Maj, Min, Maj, Min, Maj, Min];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    pub const ALL: [Scale; 2] = [Scale::Major, Scale::Minor];

    pub fn consonance_profile(self) -> &'static [i32; 12] {
        match self {
            Scale::Major => &MAJOR_CONSONANCE,
            Scale::Minor => &MINOR_CONSONANCE,
        }
    }

    pub fn triad_profile(self) -> &'static [TriadType; 12] {
        match self {
            Scale::Major => &MAJOR_TRIADS,
            Scale::Minor => &MINOR_TRIADS,
        }
    }

    /// The scale whose consonance profile describes movement away from a
    /// chord of the given quality.
    pub fn for_triad(triad: TriadType) -> Self {
        match triad {
            TriadType::Major => Scale::Major,
            TriadType::Minor => Scale::Minor,
        }
    }

    /// Quality of the tonic chord implied by the scale itself (major scale,
    /// major tonic). Used for the closing chord.
    pub fn tonic_triad(self) -> TriadType {
        match self {
            Scale::Major => TriadType::Major,
            Scale::Minor => TriadType::Minor,
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Major => f.write_str("MAJOR"),
            Scale::Minor => f.write_str("MINOR"),
        }
    }
}

impl FromStr for Scale {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MAJOR" => Ok(Scale::Major),
            "MINOR" => Ok(Scale::Minor),
            _ => Err(ParseError::UnknownScale(s.to_string())),
        }
    }
}
