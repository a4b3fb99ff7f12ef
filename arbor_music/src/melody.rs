// Melody grammar: rhythmic subdivision and branching as string rewriting.
//
// A melodic string is a program for the renderer in notator.rs:
//   F      play a note with the current duration and chord degree
//   d / D  halve / double the current duration
//   + / -  move the chord degree up / down one chord tone
//   [ / ]  push / pop the (duration, degree) state
//
// The axiom is one `F` per bar, each starting as a whole-bar note. The rule
// table is a "random branching" grammar: usually a note is held, sometimes it
// splits into two shorter notes (optionally bracketed so the duration is
// restored afterwards), and a note following a `+` or `-` step may elaborate
// that motion further.
//
// Not every rewrite is renderable: halving a note that is already one tick
// long would leave a zero-length note. Each step therefore retries the
// rewrite of the same source up to `MAX_REWRITE_ATTEMPTS` times and falls
// back to the unchanged source if none is valid.

use crate::lsystem::LSystem;
use crate::rule::Rule;
use arbor_prng::ArborRng;
use tracing::warn;

/// Rewrite attempts per step before giving up and keeping the source.
pub const MAX_REWRITE_ATTEMPTS: usize = 20;

/// The fixed melody rule table.
pub fn melody_rules() -> Vec<Rule> {
    let mut rules = vec![Rule::new('F', "F", 26)];

    for successor in ["dFFD", "[dFF]", "d-F+FD", "[d-F+F]", "d+F-FD", "[d+F-F]"] {
        rules.push(Rule::new('F', successor, 1));
    }
    // Context stays in place and only the final `F` is rewritten, so each
    // successor continues from the state the context left behind.
    for successor in ["d+F-FD", "[d+F-F]", "d-F+FD", "[d-F+F]"] {
        rules.push(Rule::new('F', successor, 1).with_left("F"));
    }
    for successor in [
        "d+F-FD",
        "[d+F-F]-",
        "d++F--FD",
        "[d++F--F]-",
        "d--F++FD",
        "[d--F++F]-",
        "d---F+++FD",
        "[d---F+++F]-",
    ] {
        rules.push(Rule::new('F', successor, 1).with_left("F+"));
    }
    for successor in [
        "d++F-FD",
        "[d++F-F]+",
        "d+++F--FD",
        "[d+++F--F]+",
        "d-F++FD",
        "[d-F++F]+",
        "d--F+++FD",
        "[d--F+++F]+",
    ] {
        rules.push(Rule::new('F', successor, 1).with_left("F-"));
    }

    rules
}

/// One whole-bar note per bar.
pub fn melody_axiom(bars: u32) -> String {
    "F".repeat(bars as usize)
}

/// True if rendering `melody` never halves a one-tick duration, starting
/// from a duration of `bar_ticks`. Only `d`, `D`, `[` and `]` are simulated.
/// An unmatched `]` also makes the string invalid.
pub fn is_renderable(melody: &str, bar_ticks: u32) -> bool {
    let mut duration = bar_ticks;
    let mut stack = Vec::new();

    for c in melody.chars() {
        match c {
            'd' => {
                if duration <= 1 {
                    return false;
                }
                duration /= 2;
            }
            'D' => duration *= 2,
            '[' => stack.push(duration),
            ']' => match stack.pop() {
                Some(saved) => duration = saved,
                None => return false,
            },
            _ => {}
        }
    }

    true
}

/// Up to `MAX_REWRITE_ATTEMPTS` independent rewrites of `source`; the first
/// one `accept` takes, or `None` once every attempt is rejected.
pub fn first_accepted_rewrite(
    system: &LSystem,
    source: &str,
    rng: &mut ArborRng,
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    (0..MAX_REWRITE_ATTEMPTS)
        .map(|_| system.rewrite(source, rng))
        .find(|candidate| accept(candidate))
}

/// The melody L-system for a phrase of a given length, with its
/// validate-and-retry step.
#[derive(Debug, Clone)]
pub struct MelodyGrammar {
    system: LSystem,
    bar_ticks: u32,
}

impl MelodyGrammar {
    pub fn new(bars: u32, bar_ticks: u32) -> Self {
        Self::with_axiom(melody_axiom(bars), bar_ticks)
    }

    /// A grammar growing from an arbitrary melodic string.
    pub fn with_axiom(axiom: impl Into<String>, bar_ticks: u32) -> Self {
        MelodyGrammar {
            system: LSystem::new(axiom, melody_rules(), true),
            bar_ticks,
        }
    }

    pub fn current(&self) -> &str {
        self.system.current()
    }

    pub fn iterations(&self) -> usize {
        self.system.iterations()
    }

    pub fn reset(&mut self) {
        self.system.reset();
    }

    /// Advance one step: the first renderable rewrite of the current string
    /// out of `MAX_REWRITE_ATTEMPTS`, or the current string unchanged.
    pub fn step(&mut self, rng: &mut ArborRng) -> &str {
        let source = self.system.current().to_string();
        let bar_ticks = self.bar_ticks;
        let next = first_accepted_rewrite(&self.system, &source, rng, |candidate| {
            is_renderable(candidate, bar_ticks)
        });

        let next = match next {
            Some(next) => next,
            None => {
                warn!(
                    attempts = MAX_REWRITE_ATTEMPTS,
                    len = source.len(),
                    "no renderable melody rewrite, keeping source"
                );
                source
            }
        };
        self.system.advance_to(next)
    }

    /// Reset, then step `iterations` times; returns the final string.
    pub fn generate(&mut self, iterations: usize, rng: &mut ArborRng) -> String {
        self.reset();
        for _ in 0..iterations {
            self.step(rng);
        }
        self.current().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ticks covered by the notes of `melody`, starting from `bar_ticks`.
    fn span(melody: &str, bar_ticks: u32) -> u32 {
        let mut duration = bar_ticks;
        let mut stack = Vec::new();
        let mut total = 0;
        for c in melody.chars() {
            match c {
                'F' => total += duration,
                'd' => duration /= 2,
                'D' => duration *= 2,
                '[' => stack.push(duration),
                ']' => duration = stack.pop().unwrap(),
                _ => {}
            }
        }
        total
    }

    #[test]
    fn test_rule_table_shape() {
        let rules = melody_rules();
        assert_eq!(rules.len(), 27);
        assert!(rules.iter().all(|r| r.letter() == 'F' && r.predecessor.right.is_empty()));
        let total: u32 = rules.iter().filter(|r| r.predecessor.left.is_empty()).map(|r| r.weight()).sum();
        assert_eq!(total, 32);
        for rule in &rules {
            assert!(is_renderable(&rule.successor, 32), "{} unbalanced", rule.successor);
        }
    }

    #[test]
    fn test_axiom() {
        assert_eq!(melody_axiom(1), "F");
        assert_eq!(melody_axiom(4), "FFFF");
    }

    #[test]
    fn test_is_renderable() {
        assert!(is_renderable("F", 32));
        // 32 -> 1 through five halvings, a note at 1 is fine
        assert!(is_renderable("dddddF", 32));
        assert!(!is_renderable("ddddddF", 32));
        // Brackets restore the duration
        assert!(is_renderable("[ddddd]ddddd", 32));
        assert!(!is_renderable("[ddddd]dddddd", 32));
        // Doubling makes room again
        assert!(is_renderable("dddddDd", 32));
        assert!(!is_renderable("F]", 32));
    }

    #[test]
    fn test_every_rule_preserves_duration() {
        // The context is left in place, so a successor must fill exactly the
        // one note it replaces.
        for rule in melody_rules() {
            assert_eq!(span(&rule.successor, 32), 32, "{} changes duration", rule.successor);
        }
    }

    #[test]
    fn test_rejecting_every_rewrite_consumes_max_attempts() {
        let system = LSystem::new("FF", melody_rules(), true);
        let mut rng = ArborRng::new(9);
        let mut reference = rng.clone();

        assert_eq!(first_accepted_rewrite(&system, "FF", &mut rng, |_| false), None);
        for _ in 0..MAX_REWRITE_ATTEMPTS {
            system.rewrite("FF", &mut reference);
        }
        assert_eq!(rng.next_u64(), reference.next_u64());
    }

    #[test]
    fn test_first_accepted_rewrite_stops_early() {
        let system = LSystem::new("FF", melody_rules(), true);
        let mut rng = ArborRng::new(9);
        let mut reference = rng.clone();

        let accepted = first_accepted_rewrite(&system, "FF", &mut rng, |_| true).unwrap();
        assert_eq!(accepted, system.rewrite("FF", &mut reference));
        assert_eq!(rng.next_u64(), reference.next_u64());
    }

    #[test]
    fn test_step_falls_back_to_source() {
        // At one tick per bar the leading `d` already divides a one-tick note,
        // and it survives every rewrite, so all attempts are rejected.
        let mut grammar = MelodyGrammar::with_axiom("dF", 1);
        let mut rng = ArborRng::new(4);
        let mut reference = rng.clone();

        assert_eq!(grammar.step(&mut rng), "dF");
        assert_eq!(grammar.iterations(), 1);

        let system = LSystem::new("dF", melody_rules(), true);
        for _ in 0..MAX_REWRITE_ATTEMPTS {
            assert!(!is_renderable(&system.rewrite("dF", &mut reference), 1));
        }
        assert_eq!(rng.next_u64(), reference.next_u64());
    }

    #[test]
    fn test_generated_melodies_fill_their_bars() {
        let mut rng = ArborRng::new(160);
        for bars in 1..=4 {
            let mut grammar = MelodyGrammar::new(bars, 32);
            for iterations in 2..=7 {
                for _ in 0..10 {
                    let melody = grammar.generate(iterations, &mut rng);
                    assert_eq!(span(&melody, 32), bars * 32, "{melody}");
                }
            }
        }
    }

    #[test]
    fn test_generated_melodies_stay_renderable() {
        let mut rng = ArborRng::new(2718);
        for bars in 1..=4 {
            let mut grammar = MelodyGrammar::new(bars, 32);
            for iterations in 2..=7 {
                let melody = grammar.generate(iterations, &mut rng);
                assert!(is_renderable(&melody, 32), "unrenderable: {melody}");
                assert_eq!(grammar.iterations(), iterations);
            }
        }
    }

    #[test]
    fn test_valid_melodies_keep_integral_durations() {
        let mut rng = ArborRng::new(31);
        let mut grammar = MelodyGrammar::new(2, 32);
        for _ in 0..20 {
            let melody = grammar.generate(7, &mut rng);
            let mut duration = 32u32;
            let mut stack = Vec::new();
            for c in melody.chars() {
                match c {
                    'd' => {
                        assert!(duration % 2 == 0, "odd duration halved in {melody}");
                        duration /= 2;
                        assert!(duration > 0);
                    }
                    'D' => duration *= 2,
                    '[' => stack.push(duration),
                    ']' => duration = stack.pop().unwrap(),
                    _ => {}
                }
            }
        }
    }
}
