// Weighted, context-sensitive rewriting rules.
//
// A rule rewrites a single letter. It may additionally require literal text
// immediately before (left context) and after (right context) the letter;
// the context is only inspected, never replaced. Several rules can share a
// letter and context: the L-system engine picks among all matching rules by
// their relative weights, which is where the grammars get their randomness.
//
// Matching works on `char` slices so multi-byte characters in a source
// string line up with their positions.

use serde::{Deserialize, Serialize};

/// The matching half of a production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predecessor {
    /// Text that must immediately precede the letter.
    pub left: String,
    /// The letter being rewritten.
    pub letter: char,
    /// Text that must immediately follow the letter.
    pub right: String,
    /// Relative selection weight among matching rules. Always positive.
    pub weight: u32,
}

/// A production: predecessor plus the text that replaces the matched letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub predecessor: Predecessor,
    pub successor: String,
}

impl Rule {
    /// A context-free rule. Panics if `weight` is zero.
    pub fn new(letter: char, successor: impl Into<String>, weight: u32) -> Self {
        assert!(weight > 0, "rule weight must be positive");
        Rule {
            predecessor: Predecessor {
                left: String::new(),
                letter,
                right: String::new(),
                weight,
            },
            successor: successor.into(),
        }
    }

    /// Require `left` to immediately precede the letter.
    pub fn with_left(mut self, left: impl Into<String>) -> Self {
        self.predecessor.left = left.into();
        self
    }

    /// Require `right` to immediately follow the letter.
    pub fn with_right(mut self, right: impl Into<String>) -> Self {
        self.predecessor.right = right.into();
        self
    }

    pub fn letter(&self) -> char {
        self.predecessor.letter
    }

    pub fn weight(&self) -> u32 {
        self.predecessor.weight
    }

    /// True if this rule can rewrite `source[index]`.
    ///
    /// With `context_sensitive` off only the letter is compared. Otherwise
    /// the text around `index` must equal the rule's contexts exactly; a
    /// context window that would run past either end of `source` fails.
    pub fn matches(&self, source: &[char], index: usize, context_sensitive: bool) -> bool {
        if source.get(index) != Some(&self.predecessor.letter) {
            return false;
        }
        if !context_sensitive {
            return true;
        }
        left_context_matches(&self.predecessor.left, source, index)
            && right_context_matches(&self.predecessor.right, source, index)
    }
}

fn left_context_matches(left: &str, source: &[char], index: usize) -> bool {
    let len = left.chars().count();
    if len > index {
        return false;
    }
    source[index - len..index].iter().copied().eq(left.chars())
}

fn right_context_matches(right: &str, source: &[char], index: usize) -> bool {
    let len = right.chars().count();
    let start = index + 1;
    if start + len > source.len() {
        return false;
    }
    source[start..start + len].iter().copied().eq(right.chars())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_context_free_match() {
        let rule = Rule::new('F', "FF", 1);
        let src = chars("dFD");
        assert!(!rule.matches(&src, 0, true));
        assert!(rule.matches(&src, 1, true));
        assert!(!rule.matches(&src, 3, true));
    }

    #[test]
    fn test_left_context() {
        let rule = Rule::new('F', "x", 1).with_left("F+");
        let src = chars("F+FF");
        assert!(rule.matches(&src, 2, true));
        assert!(!rule.matches(&src, 3, true));
        // Window would start before the string.
        assert!(!rule.matches(&src, 0, true));
        // Context ignored when insensitive.
        assert!(rule.matches(&src, 0, false));
    }

    #[test]
    fn test_right_context() {
        let rule = Rule::new('a', "x", 1).with_right("bc");
        assert!(rule.matches(&chars("abc"), 0, true));
        assert!(!rule.matches(&chars("ab"), 0, true));
        assert!(!rule.matches(&chars("abd"), 0, true));
    }

    #[test]
    fn test_multibyte_context() {
        let rule = Rule::new('M', "M", 1).with_left("é♯");
        let src = chars("é♯M");
        assert!(rule.matches(&src, 2, true));
    }

    #[test]
    #[should_panic(expected = "weight must be positive")]
    fn test_zero_weight_rejected() {
        Rule::new('F', "F", 0);
    }
}
