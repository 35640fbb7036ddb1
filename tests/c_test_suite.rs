//! Atari and ladder regression cases.
//!
//! Each case sets up a position by alternating moves (Black first, "pass"
//! skips a turn) and checks the moves `fix_atari` proposes for one block.

use michi_engine::position::{Point, Position, parse_coord, pass_move, play_move, str_coord};
use michi_engine::tactics::{AtariAnalysis, fix_atari};

// =============================================================================
// Helper functions
// =============================================================================

fn pt(s: &str) -> Point {
    parse_coord(s).unwrap_or_else(|| panic!("bad coordinate {s}"))
}

/// Set up stones by playing the moves alternately: Black, White, Black, ...
fn setpos(moves: &[&str]) -> Position {
    let mut pos = Position::new();
    for mv in moves {
        if mv.eq_ignore_ascii_case("pass") {
            pass_move(&mut pos);
            continue;
        }
        if let Err(e) = play_move(&mut pos, pt(mv)) {
            panic!("illegal move {mv} in setpos: {e}");
        }
    }
    pos
}

/// Atari analysis as used by the playout capture heuristic.
fn analyse(pos: &mut Position, at: &str) -> AtariAnalysis {
    fix_atari(pos, pt(at), false, true, false)
}

fn format_moves(moves: &[Point]) -> String {
    moves.iter().map(|&m| str_coord(m)).collect::<Vec<_>>().join(" ")
}

fn assert_analysis(case: u32, result: &AtariAnalysis, in_atari: bool, expected: &[&str]) {
    let expected: Vec<Point> = expected.iter().map(|s| pt(s)).collect();
    assert_eq!(
        result.in_atari, in_atari,
        "Test {case}: wrong atari flag, moves [{}]",
        format_moves(&result.moves)
    );
    assert_eq!(
        result.moves,
        expected,
        "Test {case}: expected [{}], got [{}]",
        format_moves(&expected),
        format_moves(&result.moves)
    );
    assert_eq!(result.sizes.len(), result.moves.len());
}

// =============================================================================
// Escapes and captures of blocks in atari
// =============================================================================

#[test]
fn test_fix_atari_10_escape() {
    let mut pos = setpos(&["C8", "C9", "E9", "B8", "F9", "D8"]);
    let result = analyse(&mut pos, "C8");
    assert_analysis(10, &result, true, &["C7"]);
    assert_eq!(result.sizes, vec![1]);
}

#[test]
fn test_fix_atari_20_capture_opponent() {
    // White B1 is in atari and Black is to move: the liberty captures
    let mut pos = setpos(&["C1", "G7", "B2", "B1"]);
    assert_analysis(20, &analyse(&mut pos, "B1"), true, &["A1"]);
}

#[test]
fn test_fix_atari_30_escape_into_atari() {
    // Same shape with White to move: extending to A1 leaves one liberty
    let mut pos = setpos(&["C1", "G7", "B2", "B1", "E5"]);
    assert_analysis(30, &analyse(&mut pos, "B1"), true, &[]);
}

#[test]
fn test_fix_atari_110_counter_capture() {
    let mut pos = setpos(&["A1", "E5", "B2", "A2"]);
    assert_analysis(110, &analyse(&mut pos, "A1"), true, &["A3", "B1"]);
}

// =============================================================================
// Ladders
// =============================================================================

#[test]
fn test_fix_atari_210_ladder_works() {
    let mut pos = setpos(&["A1", "A2"]);
    assert_analysis(210, &analyse(&mut pos, "A1"), true, &[]);
}

#[test]
fn test_fix_atari_220_opponent_in_atari() {
    // With White to move the black stone is simply captured at B1
    let mut pos = setpos(&["A1", "A2", "G1"]);
    assert_analysis(220, &analyse(&mut pos, "A1"), true, &["B1"]);
}

#[test]
fn test_fix_atari_230_ladder_blocked() {
    let mut pos = setpos(&["A1", "A2", "G1", "D2"]);
    assert_analysis(230, &analyse(&mut pos, "A1"), true, &[]);
}

#[test]
fn test_fix_atari_240_twolib_attack() {
    let mut pos = setpos(&["G5", "F5", "A1", "G4", "A2", "H4", "A3", "G6", "H5"]);
    let result = analyse(&mut pos, "G5");
    assert!(!result.in_atari, "Test 240: block has two liberties");
    assert_eq!(
        result.moves.len(),
        1,
        "Test 240: expected one ladder attack, got [{}]",
        format_moves(&result.moves)
    );
    assert!(
        result.moves[0] == pt("H6") || result.moves[0] == pt("J5"),
        "Test 240: expected H6 or J5, got {}",
        str_coord(result.moves[0])
    );
}

#[test]
fn test_fix_atari_250_twolib_attack() {
    let mut pos = setpos(&["E5", "D5", "A1", "E4", "A2", "F4", "A3", "E6", "F5"]);
    assert_analysis(250, &analyse(&mut pos, "E5"), false, &["G5"]);
}

#[test]
fn test_fix_atari_260_no_escape() {
    let mut pos = setpos(&["D3", "F3", "E3", "G3", "F2", "E2", "G2", "H2", "D2"]);
    assert_analysis(260, &analyse(&mut pos, "E2"), true, &[]);
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn test_fix_atari_leaves_position_unchanged() {
    let mut pos = setpos(&["A1", "A2", "G1", "D2"]);
    let before = pos.clone();
    analyse(&mut pos, "A1");
    assert!(pos.state_eq(&before));
    assert_eq!(pos.to_play, before.to_play);
}

#[test]
fn test_fix_atari_singlept_ok_skips_lone_stones() {
    let mut pos = setpos(&["C8", "C9", "E9", "B8", "F9", "D8"]);
    let result = fix_atari(&mut pos, pt("C8"), true, true, false);
    assert_eq!(result, AtariAnalysis::default());
}

#[test]
fn test_fix_atari_twolib_edgeonly() {
    // Test 250 without the off-edge ladder read
    let mut pos = setpos(&["E5", "D5", "A1", "E4", "A2", "F4", "A3", "E6", "F5"]);
    let result = fix_atari(&mut pos, pt("E5"), false, true, true);
    assert!(!result.in_atari);
    assert!(result.moves.is_empty());
}

#[test]
fn test_fix_atari_empty_point() {
    let mut pos = Position::new();
    assert_eq!(fix_atari(&mut pos, pt("E5"), false, true, false), AtariAnalysis::default());
}
