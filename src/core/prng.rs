// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It is used only for stimulus side assignment, where a fair and independent
// coin flip per trial is all that is required.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    /// Seed from the wall clock, so every session draws a fresh side layout.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        // Spread the low-entropy clock bits before the first draw.
        let mut rng = Self::new(nanos ^ 0xD1B54A32D192ED03);
        rng.next_u64();
        rng
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        // Marsaglia / Vigna family. Simple, fast, decent for simulation noise.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Fair coin. Uses the top output bit; the low bits of xorshift64* are weaker.
    #[inline]
    pub fn next_bool(&mut self) -> bool {
        (self.next_u64() >> 63) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_is_remapped() {
        let mut a = Prng::new(0);
        let mut b = Prng::new(0x9E3779B97F4A7C15);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn coin_is_unbiased() {
        let mut rng = Prng::new(42);
        let n = 10_000;
        let heads = (0..n).filter(|_| rng.next_bool()).count();
        let rate = heads as f64 / n as f64;
        assert!((0.47..=0.53).contains(&rate), "heads rate {rate}");
    }

    #[test]
    fn consecutive_flips_are_uncorrelated() {
        let mut rng = Prng::new(7);
        let flips: Vec<bool> = (0..10_000).map(|_| rng.next_bool()).collect();
        let repeats = flips.windows(2).filter(|w| w[0] == w[1]).count();
        let rate = repeats as f64 / (flips.len() - 1) as f64;
        assert!((0.47..=0.53).contains(&rate), "repeat rate {rate}");
    }
}
