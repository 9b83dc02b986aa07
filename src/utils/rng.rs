//! Seedable random number stream.
//!
//! A small xorshift PRNG keeps every random draw in the crate (weight
//! randomization, input jitter, mutation, pair sampling, mating) reproducible
//! from a single seed without pulling in external crates.

use std::time::{SystemTime, UNIX_EPOCH};

const FALLBACK_STATE: u64 = 0x9e3779b97f4a7c15;

/// Xorshift random number generator.
///
/// Not cryptographic. A zero seed is replaced by a fixed non-zero state since
/// xorshift never leaves the all-zero state.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let mut rng = Self { state: 0 };
        rng.reseed(seed);
        rng
    }

    /// Restart the stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.state = if seed == 0 { FALLBACK_STATE } else { seed };
    }

    /// Reseed based on the current time.
    pub fn reseed_from_time(&mut self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.reseed(nanos);
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform sample in [0, 1].
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / u32::MAX as f64
    }

    /// Uniform sample in [low, high].
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Uniform sample in [-1, 1], the unit used for weight noise.
    pub fn random_weight(&mut self) -> f64 {
        self.gen_range_f64(-1.0, 1.0)
    }

    /// Index sample in [lower, upper); returns `lower` for an empty range.
    pub fn random_index(&mut self, lower: usize, upper: usize) -> usize {
        if lower >= upper {
            return lower;
        }
        let value = (self.next_f64() * (upper - lower) as f64) as usize + lower;
        value.min(upper - 1)
    }
}
