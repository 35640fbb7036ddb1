//! Seeded linear congruential generator used by playouts and search.
//!
//! Every random decision in the engine is drawn from one [`Rng`] owned by
//! the search context, so a fixed seed reproduces playouts exactly.

/// 32-bit LCG (Numerical Recipes constants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    /// Create a generator. Seed 0 asks for a seed from system entropy.
    pub fn new(seed: u32) -> Self {
        if seed == 0 {
            Self::from_entropy()
        } else {
            Self { state: seed }
        }
    }

    pub fn from_entropy() -> Self {
        let seed = fastrand::u32(1..);
        log::debug!("random seed {seed}");
        Self { state: seed }
    }

    /// Current internal state (reseeding with it reproduces the stream).
    pub fn state(&self) -> u32 {
        self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Uniform integer in `0..n`.
    #[inline]
    pub fn below(&mut self, n: u32) -> u32 {
        ((self.next_u32() as u64 * n as u64) >> 32) as u32
    }

    /// True with probability `prob` (resolution 1/10000).
    #[inline]
    pub fn chance(&mut self, prob: f64) -> bool {
        self.below(10000) as f64 <= prob * 10000.0
    }

    /// Knuth shuffle, drawing from the last element down.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for k in (1..items.len()).rev() {
            let j = self.below(k as u32 + 1) as usize;
            items.swap(k, j);
        }
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(1)
    }
}
