// Arbor Music
//
// An L-system composer that grows four-voice polyphonic pieces from a tonic,
// a scale, and a structure string such as "aaba". Chord progressions and
// melodies are both produced by stochastic, context-sensitive string
// rewriting: the harmony grammar is derived from consonance profiles of the
// scale, the melody grammar subdivides and ornaments whole-bar notes. The
// resulting strings are interpreted into timed note events.
//
// Architecture:
// - pitch.rs: Pitch classes, triad types, chords and chord-tone lookup
// - scale.rs: MAJOR/MINOR scales with their consonance and triad profiles
// - rule.rs: Rewriting rules with optional left/right context and weights
// - lsystem.rs: The stochastic rewriting engine
// - harmony.rs: Chord-token grammar, progression assembly and decoding
// - melody.rs: Melody grammar with its renderability check and retry step
// - notator.rs: Phrase planning, melody rendering and the final cadence
// - sequence.rs: Tracks of timed note-on/note-off events
// - midi.rs: Standard MIDI File output
// - config.rs: Tunable composition parameters (JSON-loadable)
// - error.rs: Error types
//
// The composer is deterministic given a seed and a config.

pub mod config;
pub mod error;
pub mod harmony;
pub mod lsystem;
pub mod melody;
pub mod midi;
pub mod notator;
pub mod pitch;
pub mod rule;
pub mod scale;
pub mod sequence;
