// Deterministic, portable pseudo-random number generator for Arbor.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Hand-rolled so that a composition seed reproduces the same piece on every
// platform and toolchain.
//
// `arbor_music` threads a single `ArborRng` through the whole generation
// pipeline: phrase lengths, harmony rewriting, melody rewriting, and the final
// cadence all draw from it in a fixed order. Two runs with the same seed must
// therefore produce byte-identical output.
//
// **Critical constraint: determinism.** Every method must produce identical
// output given the same prior state. Keep floating point out of the sampling
// paths that feed the grammars (`range_u64`, `weighted_index`).

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG, the sole source of randomness for composition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArborRng {
    s: [u64; 4],
}

impl ArborRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Generate a uniform random `usize` in `[low, high]` (inclusive on both ends).
    ///
    /// Panics if `low > high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "range_usize_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as usize
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Draws a uniform integer in `[0, Σweights)` and returns the first index
    /// whose cumulative weight exceeds the draw, so zero-weight entries are
    /// never chosen. Returns `None` without consuming randomness when the
    /// slice is empty or every weight is zero.
    pub fn weighted_index(&mut self, weights: &[u64]) -> Option<usize> {
        let total: u64 = weights.iter().sum();
        if total == 0 {
            return None;
        }
        let target = self.range_u64(0, total);
        let mut cumulative = 0;
        for (i, &w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative > target {
                return Some(i);
            }
        }
        // Unreachable: cumulative reaches `total` > `target` on the last entry.
        None
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = ArborRng::new(42);
        let mut b = ArborRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn range_usize_inclusive_reaches_both_ends() {
        let mut rng = ArborRng::new(666);
        let mut seen = [false; 4];
        for _ in 0..10_000 {
            let v = rng.range_usize_inclusive(1, 4);
            assert!((1..=4).contains(&v), "range_usize_inclusive out of range: {v}");
            seen[v - 1] = true;
        }
        assert!(seen.iter().all(|&s| s), "every phrase length should be drawn");
    }

    #[test]
    fn range_usize_covers_chord_degrees() {
        let mut rng = ArborRng::new(3);
        let mut seen = [0usize; 3];
        for _ in 0..3000 {
            seen[rng.range_usize(0, 3)] += 1;
        }
        assert!(seen.iter().all(|&n| n > 800), "uneven degree draws: {seen:?}");
    }

    #[test]
    fn weighted_index_empty_and_zero() {
        let mut rng = ArborRng::new(7);
        assert_eq!(rng.weighted_index(&[]), None);
        assert_eq!(rng.weighted_index(&[0, 0]), None);
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = ArborRng::new(7);
        for _ in 0..1000 {
            let i = rng.weighted_index(&[0, 3, 0, 1]).unwrap();
            assert!(i == 1 || i == 3, "zero-weight index chosen: {i}");
        }
    }

    #[test]
    fn weighted_index_follows_weights() {
        let mut rng = ArborRng::new(2024);
        let mut counts = [0usize; 2];
        let n = 20_000;
        for _ in 0..n {
            counts[rng.weighted_index(&[26, 6]).unwrap()] += 1;
        }
        // 26/32 = 81.25%
        let pct = counts[0] as f64 / n as f64;
        assert!((0.78..0.85).contains(&pct), "heavy weight picked {:.1}%", pct * 100.0);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = ArborRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: ArborRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
