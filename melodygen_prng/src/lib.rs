// Deterministic, portable random source for melody generation.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding,
// plus the `RandomSource` trait that every random-consuming operation in
// `melodygen_music` takes as an explicit argument. Nothing in the engine
// reaches for a global or thread-local generator: batch generation,
// ornamentation, and the fragment/extend development methods all draw from
// whatever source the caller hands them.
//
// Tests that need to force or suppress a Bernoulli draw implement
// `RandomSource` directly with a scripted sequence instead of hunting for a
// seed that happens to produce the wanted outcome.
//
// **Determinism:** `MelodyRng` must produce identical output given the same
// prior state on every platform. The core generator uses integer arithmetic
// only; floats are derived from its output, never fed back into it.

use serde::{Deserialize, Serialize};

/// A source of uniformly distributed random bits.
///
/// Only `next_u64` is required; the remaining methods derive from it. The
/// trait stays object-safe so operator tables can hold
/// `&mut dyn RandomSource`.
pub trait RandomSource {
    /// Generate the next `u64` in the sequence.
    fn next_u64(&mut self) -> u64;

    /// Generate a `u32` by taking the upper 32 bits of a `u64`.
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
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
    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Generate a uniform random `i32` in `[low, high]` (inclusive on both
    /// ends, like a die roll). Panics if `low > high`.
    fn range_i32_inclusive(&mut self, low: i32, high: i32) -> i32 {
        assert!(low <= high, "range_i32_inclusive: low must be <= high");
        let span = (high as i64 - low as i64) as u64 + 1;
        (low as i64 + self.range_u64(0, span) as i64) as i32
    }

    /// Return `true` with probability `p`. `p <= 0.0` is always false and
    /// `p >= 1.0` always true.
    fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Pick one element uniformly. Returns `None` for an empty slice without
/// consuming a draw.
pub fn choose<'a, T, R: RandomSource + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    Some(&items[rng.range_usize(0, items.len())])
}

/// Xoshiro256++ PRNG, the workspace's default `RandomSource`.
///
/// Two `MelodyRng` instances created with the same seed produce identical
/// variation batches and ornamentations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MelodyRng {
    s: [u64; 4],
}

impl MelodyRng {
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

    /// Seed from the wall clock. Only the CLI uses this, when no `--seed`
    /// is given; library code always receives an explicit source.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos)
    }
}

impl RandomSource for MelodyRng {
    fn next_u64(&mut self) -> u64 {
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

    /// Replays a fixed list of `u64`s, cycling when exhausted.
    struct Scripted {
        values: Vec<u64>,
        pos: usize,
    }

    impl RandomSource for Scripted {
        fn next_u64(&mut self) -> u64 {
            let v = self.values[self.pos % self.values.len()];
            self.pos += 1;
            v
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = MelodyRng::new(42);
        let mut b = MelodyRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = MelodyRng::new(42);
        let mut b = MelodyRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = MelodyRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_i32_inclusive_hits_both_ends() {
        let mut rng = MelodyRng::new(7);
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..10_000 {
            let v = rng.range_i32_inclusive(-7, -1);
            assert!((-7..=-1).contains(&v), "out of range: {v}");
            seen_low |= v == -7;
            seen_high |= v == -1;
        }
        assert!(seen_low && seen_high);
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = MelodyRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = MelodyRng::new(42);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn random_bool_roughly_fair() {
        let mut rng = MelodyRng::new(42);
        let n = 10_000;
        let hits = (0..n).filter(|_| rng.random_bool(0.3)).count();
        let pct = hits as f64 / n as f64;
        assert!((0.27..0.33).contains(&pct), "expected ~30%, got {pct}");
    }

    #[test]
    fn choose_empty_consumes_nothing() {
        let mut rng = Scripted { values: vec![0], pos: 0 };
        let empty: [u8; 0] = [];
        assert!(choose(&mut rng, &empty).is_none());
        assert_eq!(rng.pos, 0);
    }

    #[test]
    fn scripted_source_drives_choice() {
        // A zero draw always selects the first element; the maximum value
        // maps into the last bucket of a power-of-two range.
        let mut rng = Scripted { values: vec![0, u64::MAX], pos: 0 };
        let items = ["a", "b", "c", "d"];
        assert_eq!(choose(&mut rng, &items), Some(&"a"));
        assert_eq!(choose(&mut rng, &items), Some(&"d"));
    }

    #[test]
    fn works_through_dyn() {
        let mut rng = MelodyRng::new(9);
        let dynamic: &mut dyn RandomSource = &mut rng;
        let v = dynamic.range_i32_inclusive(1, 4);
        assert!((1..=4).contains(&v));
    }

    #[test]
    fn serialization_roundtrip_continues_stream() {
        let mut rng = MelodyRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: MelodyRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
