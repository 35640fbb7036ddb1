//! Life and death status of points and blocks, and final score estimation.
//!
//! Status comes from the playout ownership map: a point owned by the same
//! color in more than 80% of the playouts belongs to that color. A block
//! is alive when its points are owned by its own color and dead when they
//! are owned by the opponent.

use crate::constants::{BOARD_IMAX, BOARD_IMIN, BOARDSIZE, MAX_BLOCKS, OWNERSHIP_THRES};
use crate::context::SearchContext;
use crate::mcts::{TreeNode, tree_search};
use crate::patterns::PatternSource;
use crate::position::{Color, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    OwnedByBlack,
    OwnedByWhite,
    Alive,
    Dead,
    Unknown,
}

/// Status of every point (`OwnedBy*` or `Unknown`) and of every block id
/// (`Alive`, `Dead` or `Unknown`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMap {
    pub points: Vec<Status>,
    pub blocks: Vec<Status>,
}

/// Pessimistic, raw and optimistic area scores, positive when Black wins.
///
/// Pessimistic and optimistic are from the computer's side: unknown stones
/// and points are counted against or for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEstimate {
    pub pessimistic: f64,
    pub raw: f64,
    pub optimistic: f64,
}

/// Ownership status of one point from its ownership count over `playouts`.
pub fn point_status(owner: i32, playouts: usize) -> Status {
    let thres = OWNERSHIP_THRES * playouts as f64;
    if owner as f64 > thres {
        Status::OwnedByBlack
    } else if (owner as f64) < -thres {
        Status::OwnedByWhite
    } else {
        Status::Unknown
    }
}

/// Classify every point and block of `pos` from an ownership map.
///
/// A block whose points disagree is `Unknown`.
pub fn classify(pos: &Position, owner_map: &[i32], playouts: usize) -> StatusMap {
    let mut points = vec![Status::Unknown; BOARDSIZE];
    let mut blocks: Vec<Option<Status>> = vec![None; MAX_BLOCKS];

    for pt in BOARD_IMIN..BOARD_IMAX {
        let c = pos.color(pt);
        if c == Color::Out {
            continue;
        }
        let p_status = point_status(owner_map[pt], playouts);
        points[pt] = p_status;
        if !c.is_stone() {
            continue;
        }
        let b_status = match (p_status, c) {
            (Status::OwnedByBlack, Color::Black) | (Status::OwnedByWhite, Color::White) => Status::Alive,
            (Status::OwnedByBlack, Color::White) | (Status::OwnedByWhite, Color::Black) => Status::Dead,
            _ => Status::Unknown,
        };
        let slot = &mut blocks[pos.block(pt) as usize];
        *slot = match *slot {
            None => Some(b_status),
            Some(s) if s == b_status => Some(s),
            Some(_) => Some(Status::Unknown),
        };
    }

    StatusMap {
        points,
        blocks: blocks.into_iter().map(|s| s.unwrap_or(Status::Unknown)).collect(),
    }
}

/// Run a status resolving search from `pos` (2 x N_SIMS simulations, fast
/// play disabled) and classify the result.
pub fn compute_all_status<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &Position) -> StatusMap {
    let saved = (ctx.params.fastplay5_thres, ctx.params.fastplay20_thres);
    ctx.params.fastplay5_thres = f64::INFINITY;
    ctx.params.fastplay20_thres = f64::INFINITY;

    ctx.reset_statistics();
    let mut tree = TreeNode::root(ctx.params.prior_even);
    let n = 2 * ctx.params.n_sims;
    tree_search(ctx, pos, &mut tree, n, None);

    (ctx.params.fastplay5_thres, ctx.params.fastplay20_thres) = saved;
    match ctx.most_likely_score() {
        Some(score) => log::info!("status search: {} playouts, most likely score {score}", ctx.playouts),
        None => log::info!("status search: {} playouts", ctx.playouts),
    }
    classify(pos, &ctx.owner_map, ctx.playouts)
}

/// Area score of `pos` given a status map (Chinese rules, komi included).
pub fn final_score(pos: &Position, status: &StatusMap, computer: Color) -> ScoreEstimate {
    let mut score = 0.0;
    let mut unknown_stones = 0.0;
    let mut unknown_empty = 0.0;

    for pt in BOARD_IMIN..BOARD_IMAX {
        match pos.color(pt) {
            c @ (Color::Black | Color::White) => {
                let sign = if c == Color::Black { 1.0 } else { -1.0 };
                match status.blocks[pos.block(pt) as usize] {
                    Status::Alive => score += sign,
                    Status::Dead => score -= sign,
                    _ => unknown_stones += 1.0,
                }
            }
            Color::Empty => match status.points[pt] {
                Status::OwnedByBlack => score += 1.0,
                Status::OwnedByWhite => score -= 1.0,
                _ => unknown_empty += 1.0,
            },
            Color::Out => {}
        }
    }

    score -= pos.komi as f64;
    let unknown = unknown_stones + unknown_empty;
    let estimate = if computer == Color::Black {
        ScoreEstimate {
            pessimistic: score - unknown,
            raw: score,
            optimistic: score + unknown,
        }
    } else {
        ScoreEstimate {
            pessimistic: score + unknown,
            raw: score,
            optimistic: score - unknown,
        }
    };
    log::info!(
        "unknown points: {unknown:.0}, scores: {:.1}, {:.1}, {:.1}",
        estimate.pessimistic,
        estimate.raw,
        estimate.optimistic
    );
    estimate
}
