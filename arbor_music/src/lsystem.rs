// Stochastic, context-sensitive L-system engine.
//
// Holds an axiom, an ordered rule table, and the current string. Each step
// rewrites every position of the current string in parallel: the rules
// matching a position (by letter, and by context when context sensitivity is
// on) are collected, and one is drawn with probability proportional to its
// weight. Positions with no matching rule copy their character through, so
// symbols outside a grammar's vocabulary survive untouched.
//
// The same engine drives both grammars. harmony.rs uses it directly;
// melody.rs wraps `rewrite` in a validate-and-retry loop and commits the
// accepted string with `advance_to`.
//
// Weights are summed over the current candidates only, never a global total.
// All randomness comes from the caller's `ArborRng`, one draw per position
// that has candidates, left to right.

use crate::rule::Rule;
use arbor_prng::ArborRng;

#[derive(Debug, Clone)]
pub struct LSystem {
    axiom: String,
    current: String,
    rules: Vec<Rule>,
    context_sensitive: bool,
    iterations: usize,
}

impl LSystem {
    pub fn new(axiom: impl Into<String>, rules: Vec<Rule>, context_sensitive: bool) -> Self {
        let axiom = axiom.into();
        LSystem {
            current: axiom.clone(),
            axiom,
            rules,
            context_sensitive,
            iterations: 0,
        }
    }

    pub fn axiom(&self) -> &str {
        &self.axiom
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_context_sensitive(&self) -> bool {
        self.context_sensitive
    }

    /// Number of steps taken since construction or the last reset.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Return to the axiom.
    pub fn reset(&mut self) {
        self.current.clone_from(&self.axiom);
        self.iterations = 0;
    }

    /// Every rule able to rewrite `source[index]`, in rule-table order.
    pub fn candidates(&self, source: &[char], index: usize) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(source, index, self.context_sensitive))
            .collect()
    }

    /// One parallel rewriting pass over `source`, leaving the system's own
    /// state untouched.
    pub fn rewrite(&self, source: &str, rng: &mut ArborRng) -> String {
        let chars: Vec<char> = source.chars().collect();
        let mut out = String::with_capacity(source.len() * 2);

        for (index, &c) in chars.iter().enumerate() {
            let candidates = self.candidates(&chars, index);
            let weights: Vec<u64> = candidates.iter().map(|r| r.weight() as u64).collect();
            match rng.weighted_index(&weights) {
                Some(choice) => out.push_str(&candidates[choice].successor),
                None => out.push(c),
            }
        }

        out
    }

    /// Rewrite the current string once and return the result.
    pub fn step(&mut self, rng: &mut ArborRng) -> &str {
        let next = self.rewrite(&self.current, rng);
        self.advance_to(next)
    }

    /// Replace the current string with an externally chosen successor
    /// (e.g. a filtered rewrite) and count it as one step.
    pub fn advance_to(&mut self, next: String) -> &str {
        self.current = next;
        self.iterations += 1;
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_symbols_pass_through() {
        let system = LSystem::new("a", vec![Rule::new('a', "ab", 1)], true);
        let mut rng = ArborRng::new(1);
        assert_eq!(system.rewrite("[x]-a 1", &mut rng), "[x]-ab 1");
    }

    #[test]
    fn test_deterministic_growth() {
        // Classic algae system: a -> ab, b -> a
        let rules = vec![Rule::new('a', "ab", 1), Rule::new('b', "a", 1)];
        let mut system = LSystem::new("a", rules, false);
        let mut rng = ArborRng::new(0);
        assert_eq!(system.step(&mut rng), "ab");
        assert_eq!(system.step(&mut rng), "aba");
        assert_eq!(system.step(&mut rng), "abaab");
        assert_eq!(system.iterations(), 3);
    }

    #[test]
    fn test_reset_restores_axiom() {
        let mut system = LSystem::new("a", vec![Rule::new('a', "aa", 1)], false);
        let mut rng = ArborRng::new(0);
        system.step(&mut rng);
        system.step(&mut rng);
        assert_eq!(system.current(), "aaaa");
        system.reset();
        assert_eq!(system.current(), "a");
        assert_eq!(system.iterations(), 0);
    }

    #[test]
    fn test_rewrites_read_the_source_not_the_output() {
        // If output were fed back in, "b" emitted for position 0 would give
        // position 1 a 'b' left context.
        let rules = vec![Rule::new('a', "b", 1), Rule::new('a', "c", 1).with_left("b")];
        let system = LSystem::new("aa", rules, true);
        let mut rng = ArborRng::new(5);
        assert_eq!(system.rewrite("aa", &mut rng), "bb");
    }

    #[test]
    fn test_context_selects_candidates() {
        let rules = vec![
            Rule::new('F', "1", 1),
            Rule::new('F', "2", 1).with_left("F"),
            Rule::new('F', "3", 1).with_left("F+"),
        ];
        let system = LSystem::new("F", rules, true);
        let src: Vec<char> = "FF+F".chars().collect();
        let successors = |i| -> Vec<String> {
            system.candidates(&src, i).iter().map(|r| r.successor.clone()).collect()
        };
        assert_eq!(successors(0), vec!["1"]);
        assert_eq!(successors(1), vec!["1", "2"]);
        assert_eq!(successors(2), Vec::<String>::new());
        assert_eq!(successors(3), vec!["1", "3"]);
    }

    #[test]
    fn test_weights_are_relative_to_candidates() {
        // 'x' only ever sees the two x rules; the heavy 'y' rule must not
        // dilute their split.
        let rules = vec![
            Rule::new('x', "A", 1),
            Rule::new('x', "B", 1),
            Rule::new('y', "C", 1000),
        ];
        let system = LSystem::new("x", rules, false);
        let mut rng = ArborRng::new(99);
        let mut a = 0;
        let n = 4000;
        for _ in 0..n {
            if system.rewrite("x", &mut rng) == "A" {
                a += 1;
            }
        }
        let pct = a as f64 / n as f64;
        assert!((0.45..0.55).contains(&pct), "expected ~50% A, got {:.1}%", pct * 100.0);
    }

    #[test]
    fn test_same_seed_same_rewrite() {
        let rules = vec![Rule::new('a', "ab", 3), Rule::new('a', "ba", 2), Rule::new('b', "a", 1)];
        let mut one = LSystem::new("ab", rules.clone(), false);
        let mut two = LSystem::new("ab", rules, false);
        let mut r1 = ArborRng::new(17);
        let mut r2 = ArborRng::new(17);
        for _ in 0..6 {
            assert_eq!(one.step(&mut r1).to_string(), two.step(&mut r2));
        }
    }
}
