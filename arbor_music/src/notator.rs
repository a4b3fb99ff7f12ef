// Structured notator: from (tonic, scale, structure) to a four-track piece.
//
// The structure string names phrases by character: "aba" means phrase a,
// then phrase b, then phrase a again. Each distinct character becomes a
// `Phrase` built once and rendered at every position it occurs, so repeats
// are exact.
//
// Pipeline (all randomness from one `ArborRng`, in this order):
// 1. Token discovery: distinct characters in order of first appearance, and
//    the phrase order as indices into them.
// 2. Phrase sizing: a random bar count per distinct phrase.
// 3. Harmony: one progression for the whole piece (harmony.rs), dealt out
//    to phrases in first-appearance order, one chord per quarter note.
// 4. Melody: per phrase and voice, a random number of melody-grammar steps
//    (melody.rs).
// 5. Rendering: each melodic string is interpreted by a small stack machine
//    into notes on the voice's track, at the phrase's absolute offset.
// 6. Cadence: a final tonic chord, each voice on a random chord tone, held
//    for two bars.
//
// Voices are numbered from the lowest; voice i sits in octave
// `min_octave + i`.

use crate::config::ComposerConfig;
use crate::error::ComposeError;
use crate::harmony::{HarmonyGrammar, decode_progression, required_harmony_len};
use crate::melody::MelodyGrammar;
use crate::pitch::{Chord, PitchClass};
use crate::scale::Scale;
use crate::sequence::{Sequence, Track};
use arbor_prng::ArborRng;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, trace};

/// Number of independent melodic voices.
pub const NUM_VOICES: usize = 4;

/// One melodic line of the piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    /// Position from the lowest voice; selects the voice's melody in a phrase.
    pub index: usize,
    pub octave: i32,
}

impl Voice {
    /// All voices, lowest first.
    pub fn all(min_octave: i32) -> [Voice; NUM_VOICES] {
        std::array::from_fn(|index| Voice {
            index,
            octave: min_octave + index as i32,
        })
    }
}

/// Distinct phrase symbols and the order in which phrases are played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureAnalysis {
    /// Distinct characters, in order of first appearance.
    pub symbols: Vec<char>,
    /// For each character of the structure string, its index in `symbols`.
    pub order: Vec<usize>,
}

/// Split a structure string into distinct phrase symbols and play order.
pub fn analyze_structure(structure: &str) -> Result<StructureAnalysis, ComposeError> {
    if structure.is_empty() {
        return Err(ComposeError::EmptyStructure);
    }

    let mut symbols = Vec::new();
    let mut index_of: HashMap<char, usize> = HashMap::new();
    let order = structure
        .chars()
        .map(|c| {
            *index_of.entry(c).or_insert_with(|| {
                symbols.push(c);
                symbols.len() - 1
            })
        })
        .collect();

    Ok(StructureAnalysis { symbols, order })
}

/// A distinct phrase: its length, harmony and one melody per voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub symbol: char,
    pub bars: u32,
    /// One chord per quarter note.
    pub chords: Vec<Chord>,
    /// Melodic command strings, indexed by voice.
    pub melodies: [String; NUM_VOICES],
}

#[derive(Debug, Clone, Copy)]
struct RenderState {
    duration: u32,
    degree: i32,
}

/// Interpret one melodic string onto `track`, starting at tick `offset`.
/// Returns the number of ticks the melody spans.
///
/// `F` plays the current chord tone, taking the chord for whichever quarter
/// note the melody has reached. Grammar-grown melodies span exactly the
/// phrase, so there is always a chord for every quarter they reach.
///
/// Panics on a `]` without a matching `[`; the melody grammar never produces
/// one.
pub fn render_melody(
    melody: &str,
    chords: &[Chord],
    voice: Voice,
    offset: u32,
    config: &ComposerConfig,
    track: &mut Track,
) -> u32 {
    let ticks_per_quarter = config.ticks_per_quarter as i64;
    let mut state = RenderState {
        duration: config.bar_ticks(),
        degree: 0,
    };
    let mut stack: Vec<RenderState> = Vec::new();
    let mut elapsed: u32 = 0;
    let mut last_quarter: i64 = -1;
    let mut next_chord = 0;
    let mut chord: Option<Chord> = None;

    for c in melody.chars() {
        match c {
            'F' => {
                while elapsed as i64 / ticks_per_quarter > last_quarter {
                    debug_assert!(
                        next_chord < chords.len(),
                        "melody {melody:?} runs past its {} chords",
                        chords.len()
                    );
                    chord = chords.get(next_chord).copied();
                    next_chord += 1;
                    last_quarter += 1;
                }
                if let Some(chord) = chord {
                    let key = chord.note_at(state.degree, voice.octave);
                    track.add_note(offset + elapsed, state.duration, key, config.velocity);
                }
                elapsed += state.duration;
            }
            '+' => state.degree += 1,
            '-' => state.degree -= 1,
            'd' => state.duration /= 2,
            'D' => state.duration *= 2,
            '[' => stack.push(state),
            ']' => {
                state = stack
                    .pop()
                    .unwrap_or_else(|| panic!("unbalanced ']' in melodic string {melody:?}"));
            }
            _ => {}
        }
    }

    elapsed
}

/// A finished composition.
#[derive(Debug, Clone)]
pub struct Piece {
    pub tonic: PitchClass,
    pub scale: Scale,
    /// Distinct phrases, in order of first appearance.
    pub phrases: Vec<Phrase>,
    /// Play order as indices into `phrases`.
    pub order: Vec<usize>,
    /// Absolute start tick of each entry in `order`.
    pub offsets: Vec<u32>,
    /// The whole progression as chord tokens, cadence included.
    pub harmony: String,
    pub cadence: Chord,
    /// Chord degree each voice holds in the final chord.
    pub cadence_degrees: [i32; NUM_VOICES],
    /// Tick at which the final chord starts.
    pub cadence_tick: u32,
    pub sequence: Sequence,
}

impl Piece {
    /// Length of the phrases as played, in bars (excluding the final chord).
    pub fn total_bars(&self) -> u32 {
        self.order.iter().map(|&i| self.phrases[i].bars).sum()
    }

    /// Compact text overview for debugging.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let order: String = self.order.iter().map(|&i| self.phrases[i].symbol).collect();
        let _ = writeln!(
            out,
            "{} {}: {} phrase(s) played as {:?}, {} bars + final chord",
            self.tonic,
            self.scale,
            self.phrases.len(),
            order,
            self.total_bars()
        );

        for (index, phrase) in self.phrases.iter().enumerate() {
            let starts: Vec<String> = self
                .order
                .iter()
                .zip(&self.offsets)
                .filter(|&(&i, _)| i == index)
                .map(|(_, tick)| tick.to_string())
                .collect();
            let chords: Vec<String> = phrase.chords.iter().map(Chord::to_string).collect();
            let _ = writeln!(
                out,
                "[{:?}] {} bar(s) at ticks {}: {}",
                phrase.symbol,
                phrase.bars,
                starts.join(", "),
                chords.join(" ")
            );
            for (voice, melody) in phrase.melodies.iter().enumerate() {
                let _ = writeln!(out, "    v{voice}: {melody}");
            }
        }

        let _ = writeln!(
            out,
            "final {} at tick {}, degrees {:?}",
            self.cadence, self.cadence_tick, self.cadence_degrees
        );
        out
    }
}

/// Compose a piece. See the module header for the pipeline.
pub fn compose(
    tonic: PitchClass,
    scale: Scale,
    structure: &str,
    config: &ComposerConfig,
    rng: &mut ArborRng,
) -> Result<Piece, ComposeError> {
    config.validate()?;
    let analysis = analyze_structure(structure)?;
    let voices = Voice::all(config.min_octave);
    let bar_ticks = config.bar_ticks();
    let quarters_per_bar = config.quarters_per_bar as usize;

    let lengths: Vec<u32> = analysis
        .symbols
        .iter()
        .map(|_| {
            rng.range_usize_inclusive(
                config.min_phrase_bars as usize,
                config.max_phrase_bars as usize,
            ) as u32
        })
        .collect();
    let total_bars: u32 = lengths.iter().sum();
    debug!(
        phrases = analysis.symbols.len(),
        ?lengths,
        total_bars,
        "phrase lengths chosen"
    );

    let required = required_harmony_len(total_bars as usize * quarters_per_bar);
    let harmony = HarmonyGrammar::new(scale).progression(required, rng)?;
    let chords = decode_progression(&harmony, tonic)?;
    debug!(chords = chords.len(), "harmony decoded");

    let mut chord_queue = chords.into_iter();
    let mut phrases = Vec::with_capacity(analysis.symbols.len());
    for (&symbol, &bars) in analysis.symbols.iter().zip(&lengths) {
        let chords: Vec<Chord> = chord_queue
            .by_ref()
            .take(bars as usize * quarters_per_bar)
            .collect();

        let mut grammar = MelodyGrammar::new(bars, bar_ticks);
        let melodies: [String; NUM_VOICES] = std::array::from_fn(|voice| {
            let iterations = rng.range_usize_inclusive(
                config.min_melody_iterations as usize,
                config.max_melody_iterations as usize,
            );
            let melody = grammar.generate(iterations, rng);
            trace!(?symbol, voice, iterations, %melody, "melody generated");
            melody
        });

        phrases.push(Phrase {
            symbol,
            bars,
            chords,
            melodies,
        });
    }

    let mut sequence = Sequence::with_tracks(config.ticks_per_quarter, NUM_VOICES);
    let mut offsets = Vec::with_capacity(analysis.order.len());
    let mut offset = 0;
    for &index in &analysis.order {
        let phrase = &phrases[index];
        offsets.push(offset);
        for voice in voices {
            render_melody(
                &phrase.melodies[voice.index],
                &phrase.chords,
                voice,
                offset,
                config,
                &mut sequence.tracks_mut()[voice.index],
            );
        }
        offset += phrase.bars * bar_ticks;
    }

    let cadence = Chord::new(tonic, scale.tonic_triad());
    let chord_tones = cadence.triad.pattern().len();
    let mut cadence_degrees = [0; NUM_VOICES];
    for voice in voices {
        let degree = rng.range_usize(0, chord_tones) as i32;
        cadence_degrees[voice.index] = degree;
        sequence.tracks_mut()[voice.index].add_note(
            offset,
            bar_ticks * 2,
            cadence.note_at(degree, voice.octave),
            config.velocity,
        );
    }
    debug!(end_tick = sequence.end_tick(), "piece rendered");

    Ok(Piece {
        tonic,
        scale,
        phrases,
        order: analysis.order,
        offsets,
        harmony,
        cadence,
        cadence_degrees,
        cadence_tick: offset,
        sequence,
    })
}
