//! Monte Carlo playouts: heuristic move selection and terminal scoring.
//!
//! A playout plays moves until two consecutive passes (or the game length
//! ceiling). Each move comes from the first policy that produces one:
//!
//! 1. capture/escape moves around the last two moves (`fix_atari`)
//! 2. 3x3 pattern moves around the last two moves
//! 3. a random legal move that does not fill one of our own eyes
//!
//! Every candidate is subject to a probabilistic self-atari rejection.

use crate::constants::{BOARD_IMAX, BOARD_IMIN, MAX_GAME_LEN, N, PASS_MOVE};
use crate::context::SearchContext;
use crate::patterns::PatternSource;
use crate::position::{
    Color, Point, Position, all_neighbors, is_eye, is_eyeish, pass_move, play_move, undo_move,
};
use crate::tactics::fix_atari;

/// The last move and its 8 neighbors (shuffled), then the neighbors of the
/// second-to-last move that are not already listed (shuffled).
pub fn last_moves_neighbors<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &Position) -> Vec<Point> {
    let mut points = Vec::with_capacity(18);
    ctx.suggested_points.clear();
    for last in [pos.last, pos.last2] {
        if last == PASS_MOVE {
            continue;
        }
        let start = points.len();
        for p in std::iter::once(last).chain(all_neighbors(last)) {
            if !ctx.suggested_points.is_marked(p) {
                ctx.suggested_points.mark(p);
                points.push(p);
            }
        }
        ctx.rng.shuffle(&mut points[start..]);
    }
    points
}

/// Capture and escape moves for every block touching `points`, with the
/// size of the block each move affects.
///
/// With `expensive_ok` the ladder read runs for all 2-liberty blocks,
/// otherwise only for those on the first line.
pub fn gen_capture_moves<P: PatternSource>(
    ctx: &mut SearchContext<P>,
    pos: &mut Position,
    points: &[Point],
    expensive_ok: bool,
) -> Vec<(Point, u32)> {
    let mut moves: Vec<(Point, u32)> = Vec::new();
    ctx.suggested_blocks.clear();
    for &pt in points {
        if !pos.color(pt).is_stone() {
            continue;
        }
        let b = pos.block(pt) as usize;
        if ctx.suggested_blocks.is_marked(b) {
            continue;
        }
        ctx.suggested_blocks.mark(b);
        let analysis = fix_atari(pos, pt, false, true, !expensive_ok);
        for (mv, size) in analysis.moves.into_iter().zip(analysis.sizes) {
            if !moves.iter().any(|&(m, _)| m == mv) {
                moves.push((mv, size));
            }
        }
    }
    moves
}

/// Empty points of `points` where a 3x3 pattern matches.
pub fn gen_pat3_moves<P: PatternSource>(ctx: &SearchContext<P>, pos: &Position, points: &[Point]) -> Vec<Point> {
    points
        .iter()
        .copied()
        .filter(|&pt| pos.color(pt) == Color::Empty && ctx.patterns.pat3_match(pos, pt))
        .collect()
}

/// Play the first acceptable move of `moves`.
///
/// Points already tried by this heuristic round are skipped. After a
/// legal move, with probability `PROB_SSAREJECT` a self-atari is taken back.
/// Returns the move left on the board, or `PASS_MOVE` (nothing played).
fn choose_from<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &mut Position, moves: &[Point]) -> Point {
    for &pt in moves {
        if ctx.suggested_points.is_marked(pt) {
            continue;
        }
        ctx.suggested_points.mark(pt);
        if play_move(pos, pt).is_err() {
            continue;
        }
        if ctx.rng.chance(ctx.params.prob_ssareject) && !fix_atari(pos, pt, true, true, true).moves.is_empty() {
            undo_move(pos);
            continue;
        }
        return pt;
    }
    PASS_MOVE
}

fn choose_capture_move<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &mut Position, points: &[Point]) -> Point {
    ctx.suggested_blocks.clear();
    ctx.suggested_points.clear();
    for &pt in points {
        if !pos.color(pt).is_stone() {
            continue;
        }
        let b = pos.block(pt) as usize;
        if ctx.suggested_blocks.is_marked(b) {
            continue;
        }
        ctx.suggested_blocks.mark(b);
        let mut moves = fix_atari(pos, pt, false, true, true).moves;
        ctx.rng.shuffle(&mut moves);
        let mv = choose_from(ctx, pos, &moves);
        if mv != PASS_MOVE {
            return mv;
        }
    }
    PASS_MOVE
}

/// Scan the board from `start` (with wraparound) and play the first legal
/// move that does not fill an own eye and survives the random self-atari
/// rejection test. Returns `PASS_MOVE` if there is none.
pub fn choose_random_move<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &mut Position, start: Point) -> Point {
    let mut i = start;
    loop {
        if pos.color(i) == Color::Empty && is_eye(pos, i) != Some(pos.to_play) && play_move(pos, i).is_ok() {
            if ctx.rng.chance(ctx.params.prob_rsareject) && !fix_atari(pos, i, true, true, true).moves.is_empty() {
                undo_move(pos);
            } else {
                return i;
            }
        }
        i += 1;
        if i >= BOARD_IMAX {
            i = BOARD_IMIN - 1;
        }
        if i == start {
            return PASS_MOVE;
        }
    }
}

/// Play a heuristic random game to the end and score it.
///
/// `amaf_map` records, for each point, which color played there first
/// (1 Black, -1 White); entries already set by the tree descent are kept.
/// Returns the final score from the point of view of the player to move
/// when the playout started.
pub fn mcplayout<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &mut Position, amaf_map: &mut [i8]) -> f64 {
    let start_color = pos.to_play;
    let mut passes = if pos.n > 0 && pos.last == PASS_MOVE { 1 } else { 0 };

    while passes < 2 && pos.n < MAX_GAME_LEN {
        let heuristic = last_moves_neighbors(ctx, pos);

        let mut mv = PASS_MOVE;
        if ctx.rng.chance(ctx.params.prob_heuristic_capture) {
            mv = choose_capture_move(ctx, pos, &heuristic);
        }
        if mv == PASS_MOVE && ctx.rng.chance(ctx.params.prob_heuristic_pat3) {
            let moves = gen_pat3_moves(ctx, pos, &heuristic);
            if !moves.is_empty() {
                ctx.suggested_points.clear();
                mv = choose_from(ctx, pos, &moves);
            }
        }
        if mv == PASS_MOVE {
            let x0 = ctx.rng.below(N as u32) as usize + 1;
            let y0 = ctx.rng.below(N as u32) as usize + 1;
            mv = choose_random_move(ctx, pos, y0 * (N + 1) + x0);
        }

        if mv == PASS_MOVE {
            pass_move(pos);
            passes += 1;
        } else {
            // The move is already on the board, so to_play is the opponent
            if amaf_map[mv] == 0 {
                amaf_map[mv] = if pos.to_play == Color::White { 1 } else { -1 };
            }
            passes = 0;
        }
    }

    let score = playout_score(ctx, pos);
    log::trace!("playout ended after move {} with score {:.1}", pos.n, score);
    if start_color == Color::Black { score } else { -score }
}

/// Area score of a finished playout from Black's point of view, komi
/// included. Eyeish empty points count for their owner. Also feeds the
/// ownership map and the score histogram.
pub fn playout_score<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &Position) -> f64 {
    let mut s: i32 = 0;
    for pt in BOARD_IMIN..BOARD_IMAX {
        let c = match pos.color(pt) {
            Color::Empty => is_eyeish(pos, pt).unwrap_or(Color::Empty),
            c => c,
        };
        match c {
            Color::Black => {
                s += 1;
                ctx.owner_map[pt] += 1;
            }
            Color::White => {
                s -= 1;
                ctx.owner_map[pt] -= 1;
            }
            _ => {}
        }
    }
    ctx.score_count[(s + (N * N) as i32) as usize] += 1;
    ctx.playouts += 1;
    s as f64 - pos.komi as f64 - pos.delta_komi as f64
}
