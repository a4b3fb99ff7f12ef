// Composition parameters.
//
// `ComposerConfig` gathers every tunable number the pipeline reads: timing
// resolution, phrase-length and melody-iteration ranges, voice octaves, and
// MIDI output settings. `Default` is the reference profile (8 ticks per
// quarter, 4/4 bars, phrases of 1-4 bars, 2-7 melody iterations, voices from
// octave 3). A config can also be loaded from JSON; missing fields fall back
// to the defaults.
//
// Determinism: the config feeds directly into the random draws (range sizes)
// and rendering, so the same seed only reproduces a piece under the same
// config.

use crate::error::ConfigError;
use crate::notator::NUM_VOICES;
use crate::pitch::{MAX_MIDI_NOTE, NOTES_IN_OCTAVE};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// MIDI resolution: ticks in one quarter note.
    pub ticks_per_quarter: u32,
    /// Quarter notes per bar. Each quarter carries one chord.
    pub quarters_per_bar: u32,
    /// Shortest phrase, in bars.
    pub min_phrase_bars: u32,
    /// Longest phrase, in bars.
    pub max_phrase_bars: u32,
    /// Fewest melody-grammar steps per voice.
    pub min_melody_iterations: u32,
    /// Most melody-grammar steps per voice.
    pub max_melody_iterations: u32,
    /// Octave of the lowest voice; each further voice is one octave higher.
    pub min_octave: i32,
    /// Note-on velocity for every note.
    pub velocity: u8,
    /// Tempo written to MIDI output, in quarter notes per minute.
    pub tempo_bpm: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            ticks_per_quarter: 8,
            quarters_per_bar: 4,
            min_phrase_bars: 1,
            max_phrase_bars: 4,
            min_melody_iterations: 2,
            max_melody_iterations: 7,
            min_octave: 3,
            velocity: 64,
            tempo_bpm: 120,
        }
    }
}

impl ComposerConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ComposerConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Ticks in one bar; also the starting note duration of a melody.
    pub fn bar_ticks(&self) -> u32 {
        self.ticks_per_quarter * self.quarters_per_bar
    }

    /// Check the invariants the generator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.ticks_per_quarter == 0 {
            return invalid("ticks_per_quarter must be positive".into());
        }
        // The harmony grammar emits chords in pairs and the cadence takes
        // two quarters, so every piece length must leave an even count.
        if self.quarters_per_bar < 2 || self.quarters_per_bar % 2 != 0 {
            return invalid(format!(
                "quarters_per_bar must be even and at least 2, got {}",
                self.quarters_per_bar
            ));
        }
        if !self.bar_ticks().is_power_of_two() {
            return invalid(format!(
                "bar length of {} ticks must be a power of two so durations halve cleanly",
                self.bar_ticks()
            ));
        }
        if self.min_phrase_bars == 0 || self.min_phrase_bars > self.max_phrase_bars {
            return invalid(format!(
                "phrase bars range {}..={} is empty or starts at zero",
                self.min_phrase_bars, self.max_phrase_bars
            ));
        }
        if self.min_melody_iterations > self.max_melody_iterations {
            return invalid(format!(
                "melody iterations range {}..={} is empty",
                self.min_melody_iterations, self.max_melody_iterations
            ));
        }
        let top_octave = self.min_octave + NUM_VOICES as i32 - 1;
        if self.min_octave < 0 || top_octave * NOTES_IN_OCTAVE > MAX_MIDI_NOTE {
            return invalid(format!(
                "voice octaves {}..={} fall outside the MIDI range",
                self.min_octave, top_octave
            ));
        }
        if self.velocity == 0 || self.velocity as i32 > MAX_MIDI_NOTE {
            return invalid(format!("velocity {} must be within 1..=127", self.velocity));
        }
        if self.tempo_bpm == 0 {
            return invalid("tempo_bpm must be positive".into());
        }
        Ok(())
    }
}
