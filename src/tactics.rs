//! Tactical analysis: atari escapes, ladders and local geometry.
//!
//! [`fix_atari`] is the workhorse behind the playout capture heuristic, the
//! self-atari rejection test and the capture/self-atari priors. It may play
//! and undo moves on the position it is given, but always hands it back
//! unchanged.

use std::collections::VecDeque;

use crate::constants::{BOARDSIZE, MAX_LADDER_DEPTH, N, PASS_MOVE};
use crate::position::{Block, Color, Point, Position, neighbors, play_move, str_coord, undo_move};

/// Result of [`fix_atari`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtariAnalysis {
    /// The block has exactly one liberty.
    pub in_atari: bool,
    /// Capturing or escaping moves, without duplicates.
    pub moves: Vec<Point>,
    /// For each move, the size of the block it captures or saves.
    pub sizes: Vec<u32>,
}

impl AtariAnalysis {
    fn add(&mut self, mv: Point, size: u32) {
        if !self.moves.contains(&mv) {
            self.moves.push(mv);
            self.sizes.push(size);
        }
    }
}

/// Opponent blocks touching the block at `pt` that are in atari.
pub fn neighbor_blocks_in_atari(pos: &Position, pt: Point) -> Vec<Block> {
    let b = pos.block(pt);
    let other = pos.color(pt).other();
    let mut found = Vec::new();
    let mut visited = [false; BOARDSIZE];
    let mut stack = vec![pt];
    visited[pt] = true;
    while let Some(p) = stack.pop() {
        for n in neighbors(p) {
            if pos.color(n) == other {
                let b1 = pos.block(n);
                if pos.block_nlibs(b1) == 1 && !found.contains(&b1) {
                    found.push(b1);
                }
            } else if pos.block(n) == b && !visited[n] {
                visited[n] = true;
                stack.push(n);
            }
        }
    }
    found
}

/// Single liberties of the neighbor blocks in atari, sorted and deduplicated,
/// paired with the size of the block each one captures.
fn counter_captures(pos: &Position, pt: Point) -> Vec<(Point, u32)> {
    let mut moves: Vec<(Point, u32)> = neighbor_blocks_in_atari(pos, pt)
        .into_iter()
        .filter_map(|b| {
            let lib = pos.block_libs(b, 1).first().copied()?;
            Some((lib, pos.block_size(b)))
        })
        .collect();
    moves.sort_unstable_by_key(|&(lib, _)| lib);
    moves.dedup_by_key(|&mut (lib, _)| lib);
    moves
}

fn two_libs(pos: &Position, b: Block) -> Option<[Point; 2]> {
    match pos.block_libs(b, 2).as_slice() {
        &[l1, l2] => Some([l1, l2]),
        _ => None,
    }
}

/// Analyze the block at `pt` for atari and ladder threats.
///
/// - `singlept_ok`: a lone stone is not worth analyzing; return at once.
/// - `twolib_test`: for a 2-liberty block of several stones, read the
///   ladder and report a working attack as a capture move.
/// - `twolib_edgeonly`: only do that when both liberties are on the first line.
///
/// When the block is in atari and belongs to the opponent of the player to
/// move, its liberty is the capturing move. When it belongs to the player
/// to move, the moves are counter-captures followed by the escape on the
/// last liberty if that escape survives.
pub fn fix_atari(
    pos: &mut Position,
    pt: Point,
    singlept_ok: bool,
    twolib_test: bool,
    twolib_edgeonly: bool,
) -> AtariAnalysis {
    let mut result = AtariAnalysis::default();
    if !pos.color(pt).is_stone() {
        return result;
    }
    let b = pos.block(pt);
    let size = pos.block_size(b);
    if singlept_ok && size == 1 {
        return result;
    }

    if pos.block_nlibs(b) >= 2 {
        if twolib_test && size > 1 {
            if let Some(libs) = two_libs(pos, b) {
                if twolib_edgeonly && (line_height(libs[0]) > 0 || line_height(libs[1]) > 0) {
                    return result;
                }
                let mut work = pos.clone();
                let attack = read_ladder_attack(&mut work, pt, libs, 0);
                if attack != PASS_MOVE {
                    result.add(attack, size);
                }
            }
        }
        return result;
    }

    result.in_atari = true;
    let Some(&lib) = pos.block_libs(b, 1).first() else {
        return result;
    };
    if pos.color(pt) == pos.to_play.other() {
        result.add(lib, size);
        return result;
    }

    for (mv, captured) in counter_captures(pos, pt) {
        result.add(mv, captured);
    }

    if play_move(pos, lib).is_err() {
        return result;
    }
    let nb = pos.block(lib);
    let nlibs = pos.block_nlibs(nb);
    if nlibs >= 3 || (nlibs == 2 && !result.moves.is_empty()) {
        result.add(lib, size);
    } else if nlibs == 2 {
        if let Some(libs) = two_libs(pos, nb) {
            let mut work = pos.clone();
            if read_ladder_attack(&mut work, lib, libs, 0) == PASS_MOVE {
                result.add(lib, size);
            }
        }
    }
    undo_move(pos);
    result
}

/// Atari analysis inside ladder reading: works destructively on a scratch
/// position and always reads 2-liberty escapes.
fn fix_atari_r(pos: &mut Position, pt: Point, depth: usize) -> (bool, Vec<Point>) {
    let b = pos.block(pt);
    if pos.block_nlibs(b) >= 2 {
        return (false, Vec::new());
    }
    let Some(&lib) = pos.block_libs(b, 1).first() else {
        return (false, Vec::new());
    };
    if pos.color(pt) == pos.to_play.other() {
        return (true, vec![lib]);
    }

    let mut moves: Vec<Point> = counter_captures(pos, pt).into_iter().map(|(mv, _)| mv).collect();
    if play_move(pos, lib).is_err() {
        return (true, moves);
    }
    let nb = pos.block(lib);
    let nlibs = pos.block_nlibs(nb);
    let escapes = if nlibs >= 3 || (nlibs == 2 && !moves.is_empty()) {
        true
    } else if nlibs == 2 {
        two_libs(pos, nb).is_some_and(|libs| read_ladder_attack(pos, lib, libs, depth + 1) == PASS_MOVE)
    } else {
        false
    };
    if escapes && !moves.contains(&lib) {
        moves.push(lib);
    }
    (true, moves)
}

/// Try to capture the 2-liberty block at `pt` with a ladder.
///
/// Returns the attacking move that leaves the block in atari with no
/// escape, or `PASS_MOVE` if neither liberty works. `pos` is used as a
/// scratch board and is left in an arbitrary state.
pub fn read_ladder_attack(pos: &mut Position, pt: Point, libs: [Point; 2], depth: usize) -> Point {
    if depth > MAX_LADDER_DEPTH {
        log::error!("ladder reading at {} exceeded depth {}", str_coord(pt), MAX_LADDER_DEPTH);
        panic!("ladder reading too deep");
    }
    let [a, b] = libs;
    // A liberty with 3 empty neighbors is the only sensible attack; otherwise
    // chase from the liberty off the first line first.
    let (first, last) = if pos.point_nlibs(a) == 3 {
        (None, a)
    } else if pos.point_nlibs(b) == 3 {
        (None, b)
    } else if line_height(a) > 0 {
        (Some(a), b)
    } else {
        (Some(b), a)
    };

    if let Some(l1) = first {
        let mut work = Box::new(pos.clone());
        if play_move(&mut work, l1).is_ok() {
            let (in_atari, escapes) = fix_atari_r(&mut work, pt, depth);
            if in_atari && escapes.is_empty() {
                log::trace!("ladder on {} works from {}", str_coord(pt), str_coord(l1));
                return l1;
            }
        }
    }
    if play_move(pos, last).is_ok() {
        let (in_atari, escapes) = fix_atari_r(pos, pt, depth);
        if in_atari && escapes.is_empty() {
            log::trace!("ladder on {} works from {}", str_coord(pt), str_coord(last));
            return last;
        }
    }
    PASS_MOVE
}

/// Distance to the nearest edge: 0 on the first line, 1 on the second...
pub fn line_height(pt: Point) -> usize {
    let mut row = pt / (N + 1);
    let mut col = pt % (N + 1);
    if row > N / 2 {
        row = N + 1 - row;
    }
    if col > N / 2 {
        col = N + 1 - col;
    }
    row.min(col) - 1
}

/// Common fate graph distance from `start` to every point.
///
/// Stepping onto a stone of the same color as the current stone is free,
/// any other step costs 1. Border points stay at -1.
pub fn cfg_distances(pos: &Position, start: Point) -> Vec<i16> {
    let mut cfg = vec![-1i16; BOARDSIZE];
    cfg[start] = 0;
    let mut fringe = VecDeque::from([start]);
    while let Some(p) = fringe.pop_front() {
        for n in neighbors(p) {
            let c = pos.color(n);
            if c == Color::Out || (0 <= cfg[n] && cfg[n] <= cfg[p]) {
                continue;
            }
            let before = cfg[n];
            cfg[n] = if c != Color::Empty && c == pos.color(p) {
                cfg[p]
            } else {
                cfg[p] + 1
            };
            if before < 0 || before > cfg[n] {
                fringe.push_back(n);
            }
        }
    }
    cfg
}

/// True when no stone can be reached from `pt` within `dist` steps over
/// empty points.
pub fn empty_area(pos: &Position, pt: Point, dist: u32) -> bool {
    for n in neighbors(pt) {
        match pos.color(n) {
            Color::Black | Color::White => return false,
            Color::Empty if dist > 1 && !empty_area(pos, n, dist - 1) => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{parse_coord, place_stone};

    fn pt(s: &str) -> Point {
        parse_coord(s).unwrap()
    }

    fn setpos(black: &[&str], white: &[&str], to_play: Color) -> Position {
        let mut pos = Position::new();
        for s in black {
            place_stone(&mut pos, pt(s), Color::Black).unwrap();
        }
        for s in white {
            place_stone(&mut pos, pt(s), Color::White).unwrap();
        }
        pos.to_play = to_play;
        pos
    }

    #[test]
    fn test_line_height() {
        assert_eq!(line_height(pt("A1")), 0);
        assert_eq!(line_height(pt("C1")), 0);
        assert_eq!(line_height(pt("B2")), 1);
        assert_eq!(line_height(pt("C3")), 2);
        assert_eq!(line_height(pt(&format!("C{}", N - 2))), 2);
    }

    #[test]
    fn test_cfg_distances_contract_groups() {
        let pos = setpos(&["D5", "E5", "F5"], &[], Color::White);
        let cfg = cfg_distances(&pos, pt("D5"));
        assert_eq!(cfg[pt("D5")], 0);
        assert_eq!(cfg[pt("F5")], 0);
        assert_eq!(cfg[pt("G5")], 1);
        assert_eq!(cfg[pt("H5")], 2);
        assert_eq!(cfg[pt("C5")], 1);
        assert_eq!(cfg[0], -1);
    }

    #[test]
    fn test_empty_area() {
        let pos = setpos(&["E5"], &[], Color::White);
        assert!(!empty_area(&pos, pt("E3"), 3));
        assert!(empty_area(&pos, pt("A1"), 3));
        assert!(empty_area(&pos, pt("E3"), 1));
    }

    #[test]
    fn test_opponent_in_atari_is_captured() {
        // White E5 with a single liberty at E4, black to move
        let mut pos = setpos(&["D5", "F5", "E6"], &["E5"], Color::Black);
        let before = pos.clone();
        let analysis = fix_atari(&mut pos, pt("E5"), false, true, false);
        assert!(analysis.in_atari);
        assert_eq!(analysis.moves, vec![pt("E4")]);
        assert_eq!(analysis.sizes, vec![1]);
        assert!(pos.state_eq(&before));
    }

    #[test]
    fn test_single_point_skipped() {
        let mut pos = setpos(&["D5", "F5", "E6"], &["E5"], Color::Black);
        let analysis = fix_atari(&mut pos, pt("E5"), true, true, false);
        assert!(!analysis.in_atari);
        assert!(analysis.moves.is_empty());
    }

    #[test]
    fn test_own_escape_into_open_space() {
        // White E5 in atari but white to move: extending to E4 gives 3 liberties
        let mut pos = setpos(&["D5", "F5", "E6"], &["E5"], Color::White);
        let before = pos.clone();
        let analysis = fix_atari(&mut pos, pt("E5"), false, true, false);
        assert!(analysis.in_atari);
        assert_eq!(analysis.moves, vec![pt("E4")]);
        assert!(pos.state_eq(&before));
    }

    #[test]
    fn test_counter_capture_listed_before_escape() {
        // White A1+B1 in atari (lib C1); black A2+B2 in atari too (lib C2)
        let mut pos = setpos(&["A2", "B2"], &["A1", "B1", "A3", "B3"], Color::White);
        let analysis = fix_atari(&mut pos, pt("A1"), false, true, false);
        assert!(analysis.in_atari);
        assert_eq!(analysis.moves, vec![pt("C2"), pt("C1")]);
        assert_eq!(analysis.sizes, vec![2, 2]);
    }

    #[test]
    fn test_neighbor_blocks_in_atari() {
        // Black C3 touches white D3 which only has D2 left
        let pos = setpos(&["C3", "D4", "E3"], &["D3"], Color::White);
        let blocks = neighbor_blocks_in_atari(&pos, pt("C3"));
        assert_eq!(blocks, vec![pos.block(pt("D3"))]);
    }
}
