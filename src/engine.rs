//! Game-level façade over the rules engine and the search.
//!
//! [`Engine`] owns the current position, the search context and the move
//! history. The position itself only remembers one ply for undo, so deeper
//! undo is done by replaying the history from the (handicap) start.

use std::time::Duration;

use thiserror::Error;

use crate::config::Params;
use crate::constants::{N, PASS_MOVE, RESIGN_MOVE};
use crate::context::SearchContext;
use crate::mcts::{TreeNode, tree_search};
use crate::patterns::{Pat3Patterns, PatternSource};
use crate::position::{
    Color, IllegalMove, Point, Position, empty_position, pass_move, place_stone, play_move,
    str_coord, undo_move,
};
use crate::status::{ScoreEstimate, compute_all_status, final_score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("nothing to undo")]
pub struct NothingToUndo;

pub struct Engine<P: PatternSource = Pat3Patterns> {
    pos: Position,
    ctx: SearchContext<P>,
    /// Moves played since the handicap stones, passes included.
    history: Vec<(Color, Point)>,
    handicap: Vec<Point>,
    /// The last history entry can be taken back with `undo_move`.
    undo_ready: bool,
    /// Side the engine last generated a move for.
    computer_color: Color,
}

impl Engine<Pat3Patterns> {
    pub fn new(params: Params) -> Self {
        Self::with_context(SearchContext::new(params))
    }
}

impl Default for Engine<Pat3Patterns> {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl<P: PatternSource> Engine<P> {
    pub fn with_context(ctx: SearchContext<P>) -> Self {
        Self {
            pos: Position::new(),
            ctx,
            history: Vec::new(),
            handicap: Vec::new(),
            undo_ready: false,
            computer_color: Color::Black,
        }
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    pub fn context(&self) -> &SearchContext<P> {
        &self.ctx
    }

    pub fn params(&self) -> &Params {
        &self.ctx.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.ctx.params
    }

    pub fn color(&self, pt: Point) -> Color {
        self.pos.color(pt)
    }

    /// Stones captured by `c` so far.
    pub fn captures(&self, c: Color) -> u32 {
        self.pos.captures(c)
    }

    /// Current ko point, `PASS_MOVE` when there is none.
    pub fn ko(&self) -> Point {
        self.pos.ko
    }

    pub fn to_play(&self) -> Color {
        self.pos.to_play
    }

    /// Hand the move to `color` without playing anything.
    pub fn set_to_play(&mut self, color: Color) {
        self.pos.to_play = color;
    }

    pub fn history(&self) -> &[(Color, Point)] {
        &self.history
    }

    pub fn handicap(&self) -> &[Point] {
        &self.handicap
    }

    /// Start a new game, keeping komi and parameters.
    pub fn clear(&mut self) {
        empty_position(&mut self.pos);
        self.history.clear();
        self.handicap.clear();
        self.undo_ready = false;
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.pos.komi = komi;
    }

    /// Play `pt` for the player to move.
    pub fn play(&mut self, pt: Point) -> Result<(), IllegalMove> {
        if pt == PASS_MOVE {
            self.pass();
            return Ok(());
        }
        let color = self.pos.to_play;
        play_move(&mut self.pos, pt)?;
        self.history.push((color, pt));
        self.undo_ready = true;
        Ok(())
    }

    /// Play `pt` (or pass) for `color`, whoever is to move.
    pub fn play_as(&mut self, color: Color, pt: Point) -> Result<(), IllegalMove> {
        let to_play = self.pos.to_play;
        self.pos.to_play = color;
        let result = self.play(pt);
        if result.is_err() {
            self.pos.to_play = to_play;
        }
        result
    }

    pub fn pass(&mut self) {
        let color = self.pos.to_play;
        pass_move(&mut self.pos);
        self.history.push((color, PASS_MOVE));
        self.undo_ready = true;
    }

    /// Take back the last move.
    pub fn undo(&mut self) -> Result<(), NothingToUndo> {
        let Some((color, _)) = self.history.pop() else {
            return Err(NothingToUndo);
        };
        if self.undo_ready {
            undo_move(&mut self.pos);
            self.pos.to_play = color;
            self.undo_ready = false;
        } else {
            self.replay();
        }
        Ok(())
    }

    /// Rebuild the position from the handicap stones and the history.
    fn replay(&mut self) {
        log::debug!("replaying {} moves", self.history.len());
        empty_position(&mut self.pos);
        for &pt in &self.handicap {
            if let Err(e) = place_stone(&mut self.pos, pt, Color::Black) {
                log::error!("handicap stone {} rejected on replay: {e}", str_coord(pt));
                panic!("history replay diverged at handicap stone {}", str_coord(pt));
            }
        }
        if !self.handicap.is_empty() {
            self.pos.to_play = Color::White;
        }
        for &(color, pt) in &self.history {
            self.pos.to_play = color;
            if pt == PASS_MOVE {
                pass_move(&mut self.pos);
            } else if let Err(e) = play_move(&mut self.pos, pt) {
                log::error!("move {} rejected on replay: {e}", str_coord(pt));
                panic!("history replay diverged at {}", str_coord(pt));
            }
        }
        self.undo_ready = false;
    }

    /// Place handicap stones for Black; White moves next.
    pub fn set_free_handicap(&mut self, stones: &[Point]) -> Result<(), IllegalMove> {
        for &pt in stones {
            place_stone(&mut self.pos, pt, Color::Black)?;
            self.handicap.push(pt);
        }
        self.pos.to_play = Color::White;
        self.undo_ready = false;
        Ok(())
    }

    /// Komi correction for handicap games, fading out as the game goes on.
    pub fn update_dynamic_komi(&mut self) {
        let handicap = self.handicap.len() as f64;
        let stones = self.pos.stone_count() as f64;
        let moves_to_play = ((N * N * 3 / 4) as f64 - stones) / 2.0;
        let endmove = self.pos.n as f64 + moves_to_play;
        let mut dkm = if endmove > 0.0 {
            handicap * self.ctx.params.komi_per_handicap_stone * moves_to_play / endmove
        } else {
            0.0
        };
        if dkm < 0.0 {
            dkm = 0.0;
        }
        if self.pos.to_play == Color::White {
            dkm = -dkm;
        }
        self.pos.delta_komi = dkm as f32;
        log::debug!("delta komi {dkm:.1}");
    }

    /// Search the current position without playing the result.
    pub fn search(&mut self, max_sims: usize, time_budget: Option<Duration>) -> Point {
        if self.ctx.params.use_dynamic_komi {
            self.update_dynamic_komi();
        }
        self.ctx.reset_statistics();
        let mut tree = TreeNode::root(self.ctx.params.prior_even);
        tree_search(&mut self.ctx, &self.pos, &mut tree, max_sims, time_budget)
    }

    /// Score estimate from a status resolving search, with unknown points
    /// counted against (pessimistic) or for (optimistic) `computer`.
    pub fn score_estimate(&mut self, computer: Color) -> ScoreEstimate {
        let status = compute_all_status(&mut self.ctx, &self.pos);
        final_score(&self.pos, &status, computer)
    }

    /// After an opponent pass, decide whether the game is settled enough to
    /// pass back.
    pub fn is_better_to_pass(&mut self) -> bool {
        if self.ctx.params.play_until_the_end || self.pos.last != PASS_MOVE || self.pos.n <= 2 {
            return false;
        }
        let me = self.pos.to_play;
        let score = self.score_estimate(me);
        let (sure_win, sure_loss) = settled_outcome(&score, me);
        if sure_win {
            log::info!("opponent passed and the game looks won");
        } else if sure_loss {
            log::info!("opponent passed and the game looks lost");
        } else {
            log::info!("opponent passed but the game is not decided");
        }
        sure_win || sure_loss
    }

    /// Choose a move for the player to move and play it. Resignation is
    /// returned without changing the position.
    pub fn genmove(&mut self, time_budget: Option<Duration>) -> Point {
        self.computer_color = self.pos.to_play;
        let mv = if self.is_better_to_pass() {
            PASS_MOVE
        } else {
            self.search(self.ctx.params.n_sims, time_budget)
        };
        match mv {
            RESIGN_MOVE => {}
            PASS_MOVE => self.pass(),
            pt => {
                if let Err(e) = self.play(pt) {
                    log::warn!("generated move {} is illegal: {e}", str_coord(pt));
                    self.pass();
                    return PASS_MOVE;
                }
            }
        }
        mv
    }

    /// Final score for the game, from the engine's side for the bounds.
    pub fn final_score(&mut self) -> ScoreEstimate {
        self.score_estimate(self.computer_color)
    }
}

/// Whether a score estimate reads as a sure win or a sure loss for `me`.
///
/// The estimate's bounds are from Black's point of view, ordered for `me`.
/// With fewer than 21 points in doubt the signs decide; otherwise only a
/// margin close to zero on the unfavourable side counts as settled.
pub fn settled_outcome(score: &ScoreEstimate, me: Color) -> (bool, bool) {
    let in_doubt = (score.optimistic - score.pessimistic).abs();
    if in_doubt < 21.0 {
        if me == Color::Black {
            (score.pessimistic > 0.0, score.optimistic < 0.0)
        } else {
            (score.pessimistic < 0.0, score.optimistic > 0.0)
        }
    } else if me == Color::Black {
        (score.pessimistic > -0.9, score.optimistic < 1.9)
    } else {
        (score.pessimistic < 0.9, score.optimistic > -1.9)
    }
}
