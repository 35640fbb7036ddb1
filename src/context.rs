//! Mutable search state shared by playouts and tree search.
//!
//! Everything that would otherwise be a process-wide global (the random
//! generator, scratch mark sets, playout ownership statistics) lives in a
//! [`SearchContext`] that the caller threads through every operation.

use crate::config::Params;
use crate::constants::{BOARDSIZE, MAX_BLOCKS, N};
use crate::mark::Mark;
use crate::patterns::{Pat3Patterns, PatternSource};
use crate::rng::Rng;

pub struct SearchContext<P: PatternSource = Pat3Patterns> {
    pub params: Params,
    pub rng: Rng,
    pub patterns: P,
    /// Points already offered by the current playout heuristic.
    pub(crate) suggested_points: Mark,
    /// Blocks already examined by the capture heuristic.
    pub(crate) suggested_blocks: Mark,
    /// Per point: playouts ending with a black point minus those ending white.
    pub owner_map: Vec<i32>,
    /// Histogram of raw Black area scores, offset by N*N.
    pub score_count: Vec<u32>,
    /// Playouts since the statistics were last reset.
    pub playouts: usize,
}

impl SearchContext<Pat3Patterns> {
    pub fn new(params: Params) -> Self {
        Self::with_patterns(params, Pat3Patterns::init())
    }
}

impl Default for SearchContext<Pat3Patterns> {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl<P: PatternSource> SearchContext<P> {
    pub fn with_patterns(params: Params, patterns: P) -> Self {
        let rng = Rng::new(params.random_seed);
        Self {
            params,
            rng,
            patterns,
            suggested_points: Mark::new(BOARDSIZE),
            suggested_blocks: Mark::new(MAX_BLOCKS),
            owner_map: vec![0; BOARDSIZE],
            score_count: vec![0; 2 * N * N + 1],
            playouts: 0,
        }
    }

    /// Clear ownership map, score histogram and playout counter.
    pub fn reset_statistics(&mut self) {
        self.owner_map.fill(0);
        self.score_count.fill(0);
        self.playouts = 0;
    }

    /// Most frequent raw Black area score seen in playouts, if any.
    pub fn most_likely_score(&self) -> Option<i32> {
        self.score_count
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .max_by_key(|&(i, &count)| (count, std::cmp::Reverse(i)))
            .map(|(i, _)| i as i32 - (N * N) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_likely_score() {
        let mut ctx = SearchContext::default();
        assert_eq!(ctx.most_likely_score(), None);

        let offset = N * N;
        ctx.score_count[offset + 7] = 3;
        ctx.score_count[offset - 4] = 5;
        ctx.score_count[offset + 1] = 1;
        assert_eq!(ctx.most_likely_score(), Some(-4));

        // Ties go to the lower score
        ctx.score_count[offset + 7] = 5;
        assert_eq!(ctx.most_likely_score(), Some(-4));

        ctx.reset_statistics();
        assert_eq!(ctx.most_likely_score(), None);
    }
}
