// Harmony grammar: chord progressions as string rewriting.
//
// A chord is written as a 3-character token: a 1-based, zero-padded scale
// degree (semitones above the tonic + 1) followed by its triad character,
// e.g. "01M" for the tonic major triad or "08M" for the dominant.
//
// The grammar is derived from a scale's profiles. For every ordered pair of
// degrees (i, j), the transition i -> j scores
//   profile_of(Q[i])[(j - i) mod 12] + C[j]
// where C is the scale's consonance profile, Q its triad profile, and
// profile_of picks the major or minor consonance table matching chord i's own
// quality. Transitions scoring below 1 are dropped; the rest become rules
// weighted by their score.
//
// Each rule matches chord i's quality letter with chord i's degree digits as
// left context. The engine only replaces the matched letter and leaves the
// digits in place, so the stored successor is Q[i] followed by token(j): the
// token "iiQ" becomes "iiQjjR". Every step therefore turns each chord into
// itself followed by a weighted-random successor chord, doubling the
// progression while keeping it a whole number of tokens.
//
// `HarmonyGrammar::progression` stitches runs of this grammar together until
// a required length is met, then appends a forced dominant-dominant ending;
// `decode_progression` turns the string into `Chord`s, one per quarter note.

use crate::error::HarmonyError;
use crate::lsystem::LSystem;
use crate::pitch::{Chord, PitchClass, TriadType};
use crate::rule::Rule;
use crate::scale::Scale;
use arbor_prng::ArborRng;
use tracing::debug;

/// Characters per chord token.
pub const CHORD_TOKEN_LEN: usize = 3;

/// Quarter notes at the end of the piece reserved for the forced cadence.
pub const CADENCE_QUARTERS: usize = 2;

/// Two major triads on the fifth degree, closing every progression.
pub const CADENCE_SUFFIX: &str = "08M08M";

/// One decoded chord token: 0-based degree (semitones above the tonic) and
/// triad quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordToken {
    pub degree: u8,
    pub triad: TriadType,
}

impl ChordToken {
    pub fn new(degree: u8, triad: TriadType) -> Self {
        ChordToken { degree, triad }
    }

    /// The two-digit, 1-based degree label, e.g. "08" for degree 7.
    pub fn degree_label(&self) -> String {
        format!("{:02}", self.degree + 1)
    }

    /// Parse a token such as "08M". Returns `None` unless the first two
    /// characters are digits naming degree 1-12.
    pub fn parse(token: &[char]) -> Option<Self> {
        let [tens, ones, quality] = token else {
            return None;
        };
        let number = tens.to_digit(10)? * 10 + ones.to_digit(10)?;
        if !(1..=12).contains(&number) {
            return None;
        }
        Some(ChordToken::new((number - 1) as u8, TriadType::from_char(*quality)))
    }

    /// The chord this token names in the key of `tonic`.
    pub fn to_chord(&self, tonic: PitchClass) -> Chord {
        Chord::new(PitchClass::from_interval(tonic, self.degree as i32), self.triad)
    }
}

impl std::fmt::Display for ChordToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.degree_label(), self.triad.to_char())
    }
}

/// Score of moving from degree `from` to degree `to` in `scale`.
pub fn transition_score(scale: Scale, from: usize, to: usize) -> i32 {
    let interval = (to + 12 - from) % 12;
    let from_triad = scale.triad_profile()[from];
    Scale::for_triad(from_triad).consonance_profile()[interval] + scale.consonance_profile()[to]
}

/// All acceptable chord transitions of `scale` as rewriting rules, ordered
/// by source degree then target degree.
pub fn harmony_rules(scale: Scale) -> Vec<Rule> {
    let triads = scale.triad_profile();
    let mut rules = Vec::new();

    for from in 0..12 {
        let source = ChordToken::new(from as u8, triads[from]);
        for to in 0..12 {
            let score = transition_score(scale, from, to);
            if score < 1 {
                continue;
            }
            let target = ChordToken::new(to as u8, triads[to]);
            let successor = format!("{}{}", source.triad.to_char(), target);
            rules.push(
                Rule::new(source.triad.to_char(), successor, score as u32)
                    .with_left(source.degree_label()),
            );
        }
    }

    rules
}

/// The starting progression: the tonic chord alone.
pub fn harmony_axiom(scale: Scale) -> String {
    ChordToken::new(0, scale.triad_profile()[0]).to_string()
}

/// Length in characters of the generated part of the progression for a
/// piece of `total_quarters` quarter notes (the cadence is added on top).
pub fn required_harmony_len(total_quarters: usize) -> usize {
    total_quarters.saturating_sub(CADENCE_QUARTERS) * CHORD_TOKEN_LEN
}

/// A chord-progression grammar for one scale.
#[derive(Debug, Clone)]
pub struct HarmonyGrammar {
    system: LSystem,
}

impl HarmonyGrammar {
    pub fn new(scale: Scale) -> Self {
        HarmonyGrammar {
            system: LSystem::new(harmony_axiom(scale), harmony_rules(scale), true),
        }
    }

    /// Build a progression of exactly `required` characters followed by
    /// `CADENCE_SUFFIX`.
    ///
    /// Repeatedly resets the grammar and grows it step by step, keeping the
    /// longest string that still fits in the remaining space; that string is
    /// appended and the grammar reset again. A run that cannot contribute
    /// anything (its first step already overflows, or it stops growing while
    /// still empty-handed) means the requirement can never be met and yields
    /// `HarmonyError::Stalled`.
    pub fn progression(
        &mut self,
        required: usize,
        rng: &mut ArborRng,
    ) -> Result<String, HarmonyError> {
        let mut harmony = String::with_capacity(required + CADENCE_SUFFIX.len());

        while harmony.len() < required {
            self.system.reset();
            let remaining = required - harmony.len();
            let mut best = String::new();

            loop {
                let next = self.system.step(rng);
                if next.len() > remaining {
                    break;
                }
                if next.len() <= best.len() {
                    // Fixed point: further steps cannot grow the string.
                    break;
                }
                best = next.to_string();
            }

            if best.is_empty() {
                return Err(HarmonyError::Stalled {
                    produced: harmony.len(),
                    required,
                });
            }

            debug!(
                chunk = best.len(),
                steps = self.system.iterations(),
                total = harmony.len() + best.len(),
                required,
                "harmony run appended"
            );
            harmony.push_str(&best);
        }

        harmony.push_str(CADENCE_SUFFIX);
        Ok(harmony)
    }
}

/// Decode a progression string into one chord per token, in the key of
/// `tonic`.
pub fn decode_progression(harmony: &str, tonic: PitchClass) -> Result<Vec<Chord>, HarmonyError> {
    let chars: Vec<char> = harmony.chars().collect();
    chars
        .chunks(CHORD_TOKEN_LEN)
        .enumerate()
        .map(|(i, token)| {
            ChordToken::parse(token)
                .map(|t| t.to_chord(tonic))
                .ok_or_else(|| HarmonyError::MalformedToken {
                    position: i * CHORD_TOKEN_LEN,
                    token: token.iter().collect(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(harmony: &str) -> Vec<String> {
        let chars: Vec<char> = harmony.chars().collect();
        chars.chunks(CHORD_TOKEN_LEN).map(|c| c.iter().collect()).collect()
    }

    #[test]
    fn test_axioms() {
        assert_eq!(harmony_axiom(Scale::Major), "01M");
        assert_eq!(harmony_axiom(Scale::Minor), "01m");
    }

    #[test]
    fn test_rule_weights_positive_and_shaped() {
        for scale in Scale::ALL {
            let rules = harmony_rules(scale);
            assert!(!rules.is_empty());
            for rule in &rules {
                assert!(rule.weight() >= 1);
                let p = &rule.predecessor;
                assert_eq!(p.left.len(), 2);
                assert!(p.right.is_empty());
                assert_eq!(rule.successor.len(), 1 + CHORD_TOKEN_LEN);
                assert!(rule.successor.starts_with(p.letter));
            }
        }
    }

    #[test]
    fn test_every_degree_can_move() {
        // Staying put always scores at least 4 - 3 = 1, so no chord is a
        // dead end.
        for scale in Scale::ALL {
            let rules = harmony_rules(scale);
            for degree in 0..12u8 {
                let label = ChordToken::new(degree, TriadType::Major).degree_label();
                assert!(rules.iter().any(|r| r.predecessor.left == label));
            }
        }
    }

    #[test]
    fn test_known_transition_scores() {
        // I -> V in major: major profile[7] + C[7] = 4 + 4
        assert_eq!(transition_score(Scale::Major, 0, 7), 8);
        // I -> bII in major: -3 + -3, rejected
        assert_eq!(transition_score(Scale::Major, 0, 1), -6);
        let rules = harmony_rules(Scale::Major);
        let tonic_to_dominant = rules
            .iter()
            .find(|r| r.predecessor.left == "01" && r.successor == "M08M")
            .unwrap();
        assert_eq!(tonic_to_dominant.weight(), 8);
        assert!(!rules.iter().any(|r| r.predecessor.left == "01" && r.successor == "M02m"));
    }

    #[test]
    fn test_step_appends_successor_to_each_chord() {
        let mut grammar = HarmonyGrammar::new(Scale::Major);
        let mut rng = ArborRng::new(3);
        let first = grammar.system.step(&mut rng).to_string();
        assert_eq!(first.len(), 6);
        assert!(first.starts_with("01M"));

        let second = grammar.system.step(&mut rng).to_string();
        let t1 = tokens(&first);
        let t2 = tokens(&second);
        assert_eq!(t2.len(), 4);
        assert_eq!(t2[0], t1[0]);
        assert_eq!(t2[2], t1[1]);
        for t in &t2 {
            assert!(ChordToken::parse(&t.chars().collect::<Vec<_>>()).is_some(), "bad token {t}");
        }
    }

    #[test]
    fn test_progression_length_and_cadence() {
        for bars in 1..=8 {
            let required = required_harmony_len(bars * 4);
            let mut grammar = HarmonyGrammar::new(Scale::Minor);
            let mut rng = ArborRng::new(bars as u64);
            let harmony = grammar.progression(required, &mut rng).unwrap();
            assert_eq!(harmony.len(), bars * 4 * CHORD_TOKEN_LEN);
            assert!(harmony.ends_with(CADENCE_SUFFIX));
        }
    }

    #[test]
    fn test_progression_stalls_on_unreachable_length() {
        // Runs only produce multiples of 6 characters, so 3 can never be met.
        let mut grammar = HarmonyGrammar::new(Scale::Major);
        let mut rng = ArborRng::new(1);
        assert_eq!(
            grammar.progression(3, &mut rng),
            Err(HarmonyError::Stalled { produced: 0, required: 3 })
        );
    }

    #[test]
    fn test_decode_progression() {
        let chords = decode_progression("01M08M06M10m", PitchClass::C).unwrap();
        assert_eq!(
            chords,
            vec![
                Chord::new(PitchClass::C, TriadType::Major),
                Chord::new(PitchClass::G, TriadType::Major),
                Chord::new(PitchClass::F, TriadType::Major),
                Chord::new(PitchClass::A, TriadType::Minor),
            ]
        );

        let shifted = decode_progression("08M", PitchClass::ASharp).unwrap();
        assert_eq!(shifted[0].root, PitchClass::F);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(
            decode_progression("01MxyM", PitchClass::C),
            Err(HarmonyError::MalformedToken { position: 3, token: "xyM".to_string() })
        );
        assert!(decode_progression("13M", PitchClass::C).is_err());
        assert!(decode_progression("01", PitchClass::C).is_err());
    }
}
