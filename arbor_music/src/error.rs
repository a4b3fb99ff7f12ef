// Error types for the composer.
//
// Each failure domain gets its own `thiserror` enum: parsing user-facing
// names, loading and validating configuration, assembling the harmony, and
// writing MIDI. `ComposeError` is the umbrella returned by `notator::compose`.
//
// Melody rewrites that would divide a minimum-length note are not errors
// (see melody.rs), and an unbalanced `]` during rendering is an internal
// invariant violation that panics (see notator.rs).

use std::path::PathBuf;
use thiserror::Error;

/// Failure to interpret a tonic or scale name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown pitch name '{0}' (expected e.g. C, CSHARP, C#, DFLAT, Db)")]
    UnknownPitch(String),

    #[error("unknown scale '{0}' (expected MAJOR or MINOR)")]
    UnknownScale(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Harmony progression assembly and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarmonyError {
    #[error(
        "harmony grammar stalled at {produced} of {required} characters: no rewrite fits the remaining space"
    )]
    Stalled { produced: usize, required: usize },

    #[error("malformed chord token '{token}' at character {position}")]
    MalformedToken { position: usize, token: String },
}

/// MIDI encoding or output errors.
#[derive(Debug, Error)]
pub enum MidiError {
    #[error("sequence resolution {0} ticks per quarter does not fit a MIDI header")]
    Resolution(u32),

    #[error("event delta {0} exceeds the MIDI variable-length limit")]
    DeltaOverflow(u32),

    #[error("tempo of {0} bpm cannot be encoded as a MIDI tempo")]
    Tempo(u32),

    #[error("I/O error writing MIDI: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the composition pipeline.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("structure string is empty")]
    EmptyStructure,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Harmony(#[from] HarmonyError),
}
