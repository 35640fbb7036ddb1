//! Monte Carlo Tree Search (MCTS) implementation with RAVE.
//!
//! This module implements MCTS with:
//! - RAVE urgency for node selection (blending real and All-Moves-As-First statistics)
//! - Delayed expansion once a leaf has been visited `EXPAND_VISITS` times
//! - Heuristic priors (pseudo visits and wins) for fresh children
//! - Heuristic playouts for leaf evaluation
//!
//! Nodes do not hold positions. Every simulation copies the root position
//! once and replays the chosen moves on that scratch copy while descending.

use std::time::{Duration, Instant};

use crate::constants::{BOARD_IMAX, BOARD_IMIN, BOARDSIZE, PASS_MOVE, RESIGN_MOVE};
use crate::context::SearchContext;
use crate::patterns::PatternSource;
use crate::playout::{gen_capture_moves, mcplayout};
use crate::position::{
    Color, Point, Position, is_eye, pass_move, play_move, str_coord, undo_move,
};
use crate::rng::Rng;
use crate::tactics::{cfg_distances, empty_area, fix_atari, line_height};

/// A node in the MCTS search tree.
///
/// Each node stores statistics for both regular visits (v, w) and AMAF visits (av, aw),
/// as well as prior values (pv, pw) for initialization. Wins are counted for the
/// player who played `mv`.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Move leading to this node (`PASS_MOVE` for the root)
    pub mv: Point,
    /// Number of visits
    pub v: u32,
    /// Number of wins (winrate = w/v)
    pub w: u32,
    /// Prior visits
    pub pv: u32,
    /// Prior wins
    pub pw: u32,
    /// AMAF (All Moves As First) visits
    pub av: u32,
    /// AMAF wins
    pub aw: u32,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// A fresh node for `mv` carrying the even prior.
    pub fn new(mv: Point, prior_even: u32) -> Self {
        Self {
            mv,
            v: 0,
            w: 0,
            pv: prior_even,
            pw: prior_even / 2,
            av: 0,
            aw: 0,
            children: Vec::new(),
        }
    }

    /// An unexpanded root node.
    pub fn root(prior_even: u32) -> Self {
        Self::new(PASS_MOVE, prior_even)
    }

    /// Calculate the winrate for this node.
    #[inline]
    pub fn winrate(&self) -> f64 {
        if self.v > 0 {
            self.w as f64 / self.v as f64
        } else {
            -0.1 // Indicate unvisited
        }
    }

    /// Winrate of the AMAF statistics, if any.
    pub fn rave_winrate(&self) -> Option<f64> {
        (self.av > 0).then(|| self.aw as f64 / self.av as f64)
    }
}

/// Heuristic prior contributors, in the order they are applied at expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorKind {
    /// Captures or saves a block in atari (bigger bonus for bigger blocks)
    Capture,
    /// Matches a 3x3 shape
    Pattern3,
    /// Close to the last move in common fate graph distance
    CfgDistance,
    /// Puts the mover in atari (visits only, acts as a penalty)
    SelfAtari,
    /// First or second line play far from any stone (penalty), third line (bonus)
    EmptyArea,
    /// Scaled by the large pattern probability
    LargePattern,
}

impl PriorKind {
    pub const ORDER: [PriorKind; 6] = [
        PriorKind::Capture,
        PriorKind::Pattern3,
        PriorKind::CfgDistance,
        PriorKind::SelfAtari,
        PriorKind::EmptyArea,
        PriorKind::LargePattern,
    ];

    /// The (visits, wins) pseudo-counts this contributor adds for a move at
    /// `pt`. `pos` is the parent position and is left unchanged.
    fn delta<P: PatternSource>(
        self,
        ctx: &SearchContext<P>,
        inputs: &PriorInputs,
        pos: &mut Position,
        pt: Point,
    ) -> (u32, u32) {
        let params = &ctx.params;
        match self {
            PriorKind::Capture => match inputs.capture_size[pt] {
                0 => (0, 0),
                1 => (params.prior_capture_one, params.prior_capture_one),
                _ => (params.prior_capture_many, params.prior_capture_many),
            },
            PriorKind::Pattern3 => {
                if ctx.patterns.pat3_match(pos, pt) {
                    (params.prior_pat3, params.prior_pat3)
                } else {
                    (0, 0)
                }
            }
            PriorKind::CfgDistance => match inputs.cfg.as_ref().map(|cfg| cfg[pt]) {
                Some(d @ 1..=3) => {
                    let bonus = params.prior_cfg[(d - 1) as usize];
                    (bonus, bonus)
                }
                _ => (0, 0),
            },
            PriorKind::SelfAtari => {
                if play_move(pos, pt).is_err() {
                    return (0, 0);
                }
                let in_atari = !fix_atari(pos, pt, true, true, false).moves.is_empty();
                undo_move(pos);
                if in_atari { (params.prior_selfatari, 0) } else { (0, 0) }
            }
            PriorKind::EmptyArea => {
                let height = line_height(pt);
                if height <= 2 && empty_area(pos, pt, 3) {
                    let wins = if height == 2 { params.prior_emptyarea } else { 0 };
                    (params.prior_emptyarea, wins)
                } else {
                    (0, 0)
                }
            }
            PriorKind::LargePattern => {
                let prob = ctx.patterns.large_pattern_probability(pos, pt);
                if prob > 0.0 {
                    let bonus = (prob.sqrt() * params.prior_largepattern as f64) as u32;
                    (bonus, bonus)
                } else {
                    (0, 0)
                }
            }
        }
    }
}

/// Board-wide analyses shared by all children of one expansion.
struct PriorInputs {
    /// Size of the block a capture/escape move at the point affects, 0 if none.
    capture_size: Vec<u32>,
    cfg: Option<Vec<i16>>,
}

/// Expand a node by generating all legal child moves of `pos`, the
/// position the node represents.
///
/// Own true eyes are never candidates. A pass child is added when there are
/// at most two other moves (useful in seki).
pub fn expand<P: PatternSource>(ctx: &mut SearchContext<P>, pos: &mut Position, node: &mut TreeNode) {
    if !node.children.is_empty() {
        return;
    }
    let prior_even = ctx.params.prior_even;

    for pt in BOARD_IMIN..BOARD_IMAX {
        if pos.color(pt) != Color::Empty || is_eye(pos, pt) == Some(pos.to_play) {
            continue;
        }
        if play_move(pos, pt).is_ok() {
            undo_move(pos);
            node.children.push(TreeNode::new(pt, prior_even));
        }
    }

    let all_points: Vec<Point> = (BOARD_IMIN..BOARD_IMAX).collect();
    let mut capture_size = vec![0u32; BOARDSIZE];
    for (mv, size) in gen_capture_moves(ctx, pos, &all_points, true) {
        capture_size[mv] = size;
    }
    let inputs = PriorInputs {
        capture_size,
        cfg: (pos.last != PASS_MOVE).then(|| cfg_distances(pos, pos.last)),
    };

    for child in &mut node.children {
        for kind in PriorKind::ORDER {
            let (dv, dw) = kind.delta(ctx, &inputs, pos, child.mv);
            child.pv += dv;
            child.pw += dw;
        }
    }

    if node.children.len() <= 2 {
        node.children.push(TreeNode::new(PASS_MOVE, prior_even));
    }
}

/// Compute the RAVE urgency score for node selection.
///
/// Combines the node's prior-blended winrate with AMAF statistics.
/// The AMAF weight `beta` decreases as the node gets more visits.
pub fn rave_urgency(node: &TreeNode, rave_equiv: u32) -> f64 {
    let v = (node.v + node.pv) as f64;
    let expectation = (node.w + node.pw) as f64 / v;

    if node.av == 0 {
        return expectation;
    }

    let av = node.av as f64;
    let rave_expectation = node.aw as f64 / av;
    let beta = av / (av + v + v * av / rave_equiv as f64);
    beta * rave_expectation + (1.0 - beta) * expectation
}

/// Shuffle the children, then return the index of the first one with the
/// strictly highest urgency.
pub fn most_urgent(rng: &mut Rng, children: &mut [TreeNode], rave_equiv: u32) -> usize {
    rng.shuffle(children);
    let mut best = 0;
    let mut umax = 0.0;
    for (i, child) in children.iter().enumerate() {
        let urgency = rave_urgency(child, rave_equiv);
        if urgency > umax {
            umax = urgency;
            best = i;
        }
    }
    best
}

/// Descend through the tree to a leaf, playing the chosen moves on `pos`.
///
/// Returns the path of child indices from the root. Moves are recorded in
/// `amaf_map` (1 Black, -1 White) and a leaf is expanded once it has been
/// visited `EXPAND_VISITS` times.
pub fn tree_descend<P: PatternSource>(
    ctx: &mut SearchContext<P>,
    pos: &mut Position,
    tree: &mut TreeNode,
    amaf_map: &mut [i8],
) -> Vec<usize> {
    let mut path = Vec::new();
    let mut node = tree;
    let mut passes = 0;

    while !node.children.is_empty() && passes < 2 {
        let idx = most_urgent(&mut ctx.rng, &mut node.children, ctx.params.rave_equiv);
        path.push(idx);
        node = &mut node.children[idx];

        if node.mv == PASS_MOVE {
            passes += 1;
            pass_move(pos);
        } else {
            passes = 0;
            if let Err(e) = play_move(pos, node.mv) {
                log::warn!("tree move {} rejected during descent: {e}", str_coord(node.mv));
                break;
            }
            if amaf_map[node.mv] == 0 {
                amaf_map[node.mv] = if pos.to_play == Color::Black { -1 } else { 1 };
            }
        }

        if node.children.is_empty() && node.v >= ctx.params.expand_visits {
            expand(ctx, pos, node);
        }
    }

    path
}

/// Credit one simulation to a node and the AMAF statistics of its children.
///
/// `score` is from the point of view of the player to move at the node,
/// whose AMAF sign is `amaf_value`.
fn credit(node: &mut TreeNode, amaf_map: &[i8], amaf_value: i8, score: f64) {
    node.v += 1;
    if score < 0.0 {
        node.w += 1;
    }
    for child in &mut node.children {
        if child.mv != PASS_MOVE && amaf_map[child.mv] == amaf_value {
            child.av += 1;
            if score > 0.0 {
                child.aw += 1;
            }
        }
    }
}

/// Update tree statistics after a playout.
///
/// `score` is from the point of view of `root_to_play`. It flips sign at every
/// ply down the path, as does the AMAF color.
pub fn tree_update(tree: &mut TreeNode, path: &[usize], amaf_map: &[i8], score: f64, root_to_play: Color) {
    let mut score = score;
    let mut amaf_value: i8 = if root_to_play == Color::Black { 1 } else { -1 };

    let mut node = tree;
    credit(node, amaf_map, amaf_value, score);
    for &idx in path {
        score = -score;
        amaf_value = -amaf_value;
        node = &mut node.children[idx];
        credit(node, amaf_map, amaf_value, score);
    }
}

/// The most visited child, skipping moves listed in `except`. Ties go to the
/// first child.
pub fn best_move<'a>(node: &'a TreeNode, except: &[Point]) -> Option<&'a TreeNode> {
    let mut best: Option<&TreeNode> = None;
    for child in &node.children {
        if except.contains(&child.mv) {
            continue;
        }
        if best.is_none_or(|b| child.v > b.v) {
            best = Some(child);
        }
    }
    best
}

/// Visit counts of the two most visited children.
fn two_most_visited(node: &TreeNode) -> (u32, u32) {
    let mut first = 0;
    let mut second = 0;
    for child in &node.children {
        if child.v > first {
            second = first;
            first = child.v;
        } else if child.v > second {
            second = child.v;
        }
    }
    (first, second)
}

/// Run MCTS search from `pos` for at most `n` simulations.
///
/// The first half of the budget may stop early when the best move is clearly
/// winning. In the second half the search is cut short once the runner-up
/// can no longer overtake the leader. An optional wall clock budget also ends
/// the loop (results are then no longer reproducible).
///
/// Returns `PASS_MOVE` when the best move is a pass answering a pass,
/// `RESIGN_MOVE` when the best move's winrate is below the resignation
/// threshold, otherwise the most visited move.
pub fn tree_search<P: PatternSource>(
    ctx: &mut SearchContext<P>,
    pos: &Position,
    tree: &mut TreeNode,
    n: usize,
    time_budget: Option<Duration>,
) -> Point {
    let started = Instant::now();
    if tree.children.is_empty() {
        let mut scratch = pos.clone();
        expand(ctx, &mut scratch, tree);
    }

    let root_to_play = pos.to_play;
    let mut amaf_map = vec![0i8; BOARDSIZE];
    let mut i = 0;
    while i < n {
        if time_budget.is_some_and(|budget| started.elapsed() >= budget) {
            log::info!("time budget exhausted after {i} simulations");
            break;
        }
        if i > 0 && ctx.params.report_period > 0 && i % ctx.params.report_period == 0 {
            log::info!("{}", tree_summary(tree, i));
        }

        let mut work = pos.clone();
        amaf_map.fill(0);
        let path = tree_descend(ctx, &mut work, tree, &mut amaf_map);
        let leaf_to_play = work.to_play;
        let s = mcplayout(ctx, &mut work, &mut amaf_map);
        let score = if leaf_to_play == root_to_play { s } else { -s };
        tree_update(tree, &path, &amaf_map, score, root_to_play);

        if i < n / 2 {
            let best_wr = best_move(tree, &[]).map_or(0.0, TreeNode::winrate);
            let progress = i as f64 / n as f64;
            if (best_wr > ctx.params.fastplay5_thres && progress > 0.05)
                || (best_wr > ctx.params.fastplay20_thres && progress > 0.2)
            {
                log::info!("tree search breaks at {i} ({best_wr:.3})");
                break;
            }
        } else {
            let (v0, v1) = two_most_visited(tree);
            if v1 as usize + n - i < v0 as usize {
                log::info!("early abort saves {} / {n} simulations", n - i);
                break;
            }
        }
        i += 1;
    }

    let Some(best) = best_move(tree, &[]) else {
        return PASS_MOVE;
    };
    log::info!("{}", search_infos(tree, best, pos));
    log::debug!("\n{}", dump_subtree(tree, ctx.params.n_sims as u32 / 50, "", true, ctx.params.rave_equiv));
    log::info!("{}", tree_summary(tree, i));

    if best.mv == PASS_MOVE && pos.last == PASS_MOVE {
        PASS_MOVE
    } else if best.v > 0 && best.winrate() < ctx.params.resign_thres {
        RESIGN_MOVE
    } else {
        best.mv
    }
}

/// Best sequence of (up to 5) moves according to the tree.
pub fn principal_variation(tree: &TreeNode) -> Vec<Point> {
    let mut moves = Vec::with_capacity(5);
    let mut node = tree;
    while moves.len() < 5 {
        let Some(next) = best_move(node, &[]) else { break };
        moves.push(next.mv);
        node = next;
    }
    moves
}

/// The 5 most visited root moves with their winrates, e.g. `E5(0.561) D4(0.540)`.
pub fn best_moves_summary(tree: &TreeNode) -> String {
    let mut seen: Vec<Point> = Vec::with_capacity(5);
    let mut parts = Vec::with_capacity(5);
    while seen.len() < 5 {
        let Some(node) = best_move(tree, &seen) else { break };
        seen.push(node.mv);
        if node.v > 0 {
            parts.push(format!("{}({:.3})", str_coord(node.mv), node.winrate()));
        } else {
            parts.push(format!("{}(nan)", str_coord(node.mv)));
        }
    }
    parts.join(" ")
}

/// One-line progress report.
pub fn tree_summary(tree: &TreeNode, sims: usize) -> String {
    let winrate = best_move(tree, &[]).map_or(f64::NAN, TreeNode::winrate);
    let seq: Vec<String> = principal_variation(tree).into_iter().map(str_coord).collect();
    format!(
        "[{sims:4}] winrate {winrate:.3} | seq {} | can {}",
        seq.join(" "),
        best_moves_summary(tree)
    )
}

/// Best move, runner-up and expected reply with their winrate margins.
fn search_infos(tree: &TreeNode, best: &TreeNode, pos: &Position) -> String {
    let best_wr = best.winrate();
    let (second, ratio) = match best_move(tree, &[best.mv]) {
        Some(second) => (str_coord(second.mv), best_wr / second.winrate()),
        None => (String::new(), 0.0),
    };
    let (reply, margin) = match best_move(best, &[]) {
        Some(reply) => (str_coord(reply.mv), best_wr - reply.winrate()),
        None => (String::new(), 0.0),
    };
    format!(
        "delta komi {:5.1} best {:>3} ({:>3}) reply {:>3} {ratio:5.2} {margin:6.3} {best_wr:6.3}",
        pos.delta_komi,
        str_coord(best.mv),
        second,
        reply,
    )
}

/// Render a node, and with `recurse` its children visited at least `thres`
/// times, one per line.
pub fn dump_subtree(node: &TreeNode, thres: u32, indent: &str, recurse: bool, rave_equiv: u32) -> String {
    let winrate = if node.v > 0 {
        format!("{:.3}", node.winrate())
    } else {
        "nan".to_string()
    };
    let rave = node.rave_winrate().map_or("nan".to_string(), |r| format!("{r:.3}"));
    let mut out = format!(
        "{indent}+- {} {winrate:>5} ({:6}/{:<6}, prior {:3}/{:<3}, rave {:6}/{:<6}={rave:>5}, urgency {:.3})\n",
        str_coord(node.mv),
        node.w,
        node.v,
        node.pw,
        node.pv,
        node.aw,
        node.av,
        rave_urgency(node, rave_equiv),
    );
    if recurse {
        let indent = format!("{indent}   ");
        for child in node.children.iter().filter(|c| c.v >= thres) {
            out.push_str(&dump_subtree(child, thres, &indent, false, rave_equiv));
        }
    }
    out
}
