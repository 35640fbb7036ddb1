//! Integration tests for the Michi Go engine.
//!
//! These exercise the public API across modules: rules and bookkeeping of
//! [`Position`], tactical reading, playouts, tree search and the [`Engine`]
//! game façade.

use michi_engine::config::Params;
use michi_engine::constants::{BOARD_IMAX, BOARD_IMIN, BOARDSIZE, N, PASS_MOVE};
use michi_engine::context::SearchContext;
use michi_engine::engine::{Engine, NothingToUndo};
use michi_engine::mcts::{TreeNode, tree_search};
use michi_engine::playout::mcplayout;
use michi_engine::position::{
    Color, IllegalMove, Point, Position, is_eye, neighbors, parse_coord, pass_move, place_stone,
    play_move, str_coord, undo_move,
};
use michi_engine::rng::Rng;
use michi_engine::tactics::fix_atari;

// =============================================================================
// Helper functions
// =============================================================================

fn pt(s: &str) -> Point {
    parse_coord(s).unwrap_or_else(|| panic!("bad coordinate {s}"))
}

/// Play the moves alternately, Black first.
fn setup_position(moves: &[&str]) -> Position {
    let mut pos = Position::new();
    for mv in moves {
        if let Err(e) = play_move(&mut pos, pt(mv)) {
            panic!("setup move {mv} rejected: {e}");
        }
    }
    pos
}

/// Place setup stones of one color without counting them as moves.
fn place(pos: &mut Position, c: Color, stones: &[&str]) {
    for s in stones {
        place_stone(pos, pt(s), c).unwrap_or_else(|e| panic!("cannot place {s}: {e}"));
    }
}

fn params(seed: u32) -> Params {
    Params {
        random_seed: seed,
        ..Params::default()
    }
}

/// Play a legal random move (or pass when there is none).
fn random_move(pos: &mut Position, rng: &mut Rng) -> Point {
    let mut empties: Vec<Point> = (BOARD_IMIN..BOARD_IMAX).filter(|&p| pos.color(p) == Color::Empty).collect();
    rng.shuffle(&mut empties);
    for p in empties {
        if play_move(pos, p).is_ok() {
            return p;
        }
    }
    pass_move(pos);
    PASS_MOVE
}

/// Every on-board point is empty or in exactly one block, and block sizes
/// and liberty sets agree with the board.
fn assert_consistent(pos: &Position) {
    let mut seen = vec![false; BOARDSIZE];
    let mut stones_in_blocks = 0;
    let mut empties = 0;
    let mut out = 0;
    for p in 0..BOARDSIZE {
        match pos.color(p) {
            Color::Out => out += 1,
            Color::Empty => {
                empties += 1;
                assert_eq!(pos.block(p), 0, "empty {} has a block", str_coord(p));
            }
            Color::Black | Color::White => {
                let b = pos.block(p);
                assert_ne!(b, 0, "stone {} has no block", str_coord(p));
                if seen[b as usize] {
                    continue;
                }
                seen[b as usize] = true;
                stones_in_blocks += pos.block_size(b) as usize;

                let libs = pos.block_libs(b, BOARDSIZE);
                assert_eq!(libs.len(), pos.block_nlibs(b), "liberty count of {}", str_coord(p));
                for l in libs {
                    assert_eq!(pos.color(l), Color::Empty, "liberty {} is not empty", str_coord(l));
                    assert!(
                        neighbors(l).iter().any(|&m| pos.color(m).is_stone() && pos.block(m) == b),
                        "liberty {} does not touch its block",
                        str_coord(l)
                    );
                }
            }
        }
    }
    assert_eq!(stones_in_blocks + empties + out, BOARDSIZE);
    assert_eq!(stones_in_blocks, pos.stone_count());
    assert!(pos.env4_ok());
    assert!(pos.all_blocks_ok());
}

// =============================================================================
// Rules
// =============================================================================

#[test]
fn test_simple_game() {
    let mut pos = setup_position(&["E5"]);
    let b = pos.block(pt("E5"));
    assert_eq!(pos.color(pt("E5")), Color::Black);
    assert_eq!(pos.block_size(b), 1);
    assert_eq!(pos.block_nlibs(b), 4);
    assert_eq!(pos.to_play, Color::White);

    play_move(&mut pos, pt("E6")).unwrap();
    let w = pos.block(pt("E6"));
    assert_eq!(pos.color(pt("E6")), Color::White);
    assert_eq!(pos.block_nlibs(w), 3);
    assert_eq!(pos.block_nlibs(b), 3);
    assert!(!pos.is_block_lib(b, pt("E6")));
    assert_eq!(pos.n, 2);
    assert_eq!(pos.last, pt("E6"));
    assert_eq!(pos.last2, pt("E5"));
    assert_consistent(&pos);
}

#[test]
fn test_illegal_moves() {
    let mut pos = setup_position(&["E5"]);
    let before = pos.clone();
    assert_eq!(play_move(&mut pos, pt("E5")), Err(IllegalMove::Occupied));
    assert!(pos.state_eq(&before));

    // White A1 into a black corner
    let mut pos = Position::new();
    place(&mut pos, Color::Black, &["A2", "B1"]);
    pos.to_play = Color::White;
    let before = pos.clone();
    assert_eq!(play_move(&mut pos, pt("A1")), Err(IllegalMove::Suicide));
    assert!(pos.state_eq(&before));
}

#[test]
fn test_capture() {
    let mut pos = setup_position(&["D5", "E5", "F5", "A1", "E4", "A9", "E6"]);
    assert_eq!(pos.color(pt("E5")), Color::Empty);
    assert_eq!(pos.block(pt("E5")), 0);
    assert_eq!(pos.captures(Color::Black), 1);
    assert_eq!(pos.captures(Color::White), 0);
    for s in ["D5", "F5", "E4", "E6"] {
        let b = pos.block(pt(s));
        assert!(pos.is_block_lib(b, pt("E5")), "{s} should regain E5 as a liberty");
    }
    assert_consistent(&pos);
}

#[test]
fn test_ko() {
    let mut pos = setup_position(&["C5", "D5", "D6", "E6", "D4", "F5", "A9", "E4", "E5"]);
    assert_eq!(pos.color(pt("D5")), Color::Empty);
    assert_eq!(pos.ko, pt("D5"));

    let before = pos.clone();
    assert_eq!(play_move(&mut pos, pt("D5")), Err(IllegalMove::KoRetake));
    assert!(pos.state_eq(&before));

    play_move(&mut pos, pt("J1")).unwrap();
    assert_eq!(pos.ko, PASS_MOVE);
    play_move(&mut pos, pt("A1")).unwrap();
    // The ko can be taken back after the exchange
    play_move(&mut pos, pt("D5")).unwrap();
    assert_eq!(pos.color(pt("E5")), Color::Empty);
    assert_eq!(pos.ko, pt("E5"));
}

#[test]
fn test_undo_ko_capture() {
    let mut pos = setup_position(&["C5", "D5", "D6", "E6", "D4", "F5", "A9", "E4"]);
    let before = pos.clone();
    let white_block = pos.block(pt("D5"));
    play_move(&mut pos, pt("E5")).unwrap();
    assert_eq!(pos.ko, pt("D5"));
    undo_move(&mut pos);
    assert!(pos.state_eq(&before));
    assert_eq!(pos.block(pt("D5")), white_block);
    assert_eq!(pos.color(pt("E5")), Color::Empty);
    assert_consistent(&pos);

    // The same capture can be replayed after the undo
    play_move(&mut pos, pt("E5")).unwrap();
    assert_eq!(pos.color(pt("D5")), Color::Empty);
    assert_consistent(&pos);
}

#[test]
fn test_pass_clears_ko() {
    let mut pos = setup_position(&["C5", "D5", "D6", "E6", "D4", "F5", "A9", "E4", "E5"]);
    pass_move(&mut pos);
    assert_eq!(pos.ko, PASS_MOVE);
    assert_eq!(pos.last, PASS_MOVE);
    assert_eq!(pos.to_play, Color::Black);
}

#[test]
fn test_eyes() {
    let mut pos = Position::new();
    place(&mut pos, Color::Black, &["D5", "F5", "E4", "E6"]);
    place(&mut pos, Color::White, &["D4"]);
    assert_eq!(is_eye(&pos, pt("E5")), Some(Color::Black));

    place(&mut pos, Color::White, &["F6"]);
    assert_eq!(is_eye(&pos, pt("E5")), None);
}

#[test]
fn test_random_games_keep_invariants() {
    let mut rng = Rng::new(12345);
    let mut pos = Position::new();
    while pos.n < 2 * N * N {
        random_move(&mut pos, &mut rng);
        if pos.n % 7 == 0 {
            assert_consistent(&pos);
        }
        if pos.last == PASS_MOVE && pos.last2 == PASS_MOVE {
            break;
        }
    }
    assert_consistent(&pos);
}

#[test]
fn test_play_undo_roundtrip() {
    let mut rng = Rng::new(777);
    let mut pos = Position::new();
    for _ in 0..120 {
        let before = pos.clone();
        let mut lookahead = rng.clone();
        let mv = random_move(&mut pos, &mut lookahead);
        undo_move(&mut pos);
        assert!(pos.state_eq(&before), "undo of {} did not restore the position", str_coord(mv));

        let replayed = random_move(&mut pos, &mut rng);
        assert_eq!(replayed, mv);
    }
    assert_consistent(&pos);
}

// =============================================================================
// Tactics
// =============================================================================

#[test]
fn test_atari_depends_on_player_to_move() {
    let mut pos = Position::new();
    place(&mut pos, Color::Black, &["A1"]);
    place(&mut pos, Color::White, &["A2"]);

    pos.to_play = Color::Black;
    let defend = fix_atari(&mut pos, pt("A1"), false, true, false);
    assert!(defend.in_atari);
    assert!(defend.moves.is_empty(), "the ladder works, got {:?}", defend.moves);

    pos.to_play = Color::White;
    let attack = fix_atari(&mut pos, pt("A1"), false, true, false);
    assert!(attack.in_atari);
    assert_eq!(attack.moves, vec![pt("B1")]);
}

#[test]
fn test_atari_escape_in_open_space() {
    let mut pos = Position::new();
    place(&mut pos, Color::White, &["E5"]);
    place(&mut pos, Color::Black, &["D5", "F5", "E6"]);
    pos.to_play = Color::White;
    let result = fix_atari(&mut pos, pt("E5"), false, true, false);
    assert!(result.in_atari);
    assert_eq!(result.moves, vec![pt("E4")]);
    assert_eq!(result.sizes, vec![1]);
}

// =============================================================================
// Playouts and search
// =============================================================================

#[test]
fn test_playouts_are_deterministic() {
    let scores = |seed: u32| -> (Vec<f64>, Vec<u32>, Vec<i32>) {
        let mut ctx = SearchContext::new(params(seed));
        let pos = setup_position(&["E5", "C3"]);
        let mut amaf = vec![0i8; BOARDSIZE];
        let scores = (0..5)
            .map(|_| {
                amaf.fill(0);
                mcplayout(&mut ctx, &mut pos.clone(), &mut amaf)
            })
            .collect();
        (scores, ctx.score_count.clone(), ctx.owner_map.clone())
    };
    assert_eq!(scores(42), scores(42));
}

#[test]
fn test_playout_plays_out_a_copy() {
    let mut ctx = SearchContext::new(params(3));
    let pos = setup_position(&["E5", "C3", "G7"]);
    let mut work = pos.clone();
    let mut amaf = vec![0i8; BOARDSIZE];
    let score = mcplayout(&mut ctx, &mut work, &mut amaf);
    assert_eq!(pos.stone_count(), 3);
    assert!(work.n > pos.n);
    assert!(score.abs() <= (N * N) as f64 + 10.0);
    assert_eq!(ctx.playouts, 1);
    assert_consistent(&work);
}

#[test]
fn test_tree_search_is_deterministic() {
    let run = || {
        let mut ctx = SearchContext::new(Params {
            n_sims: 60,
            ..params(9)
        });
        let pos = setup_position(&["E5"]);
        let mut tree = TreeNode::root(ctx.params.prior_even);
        let n = ctx.params.n_sims;
        let mv = tree_search(&mut ctx, &pos, &mut tree, n, None);
        (mv, tree, ctx.score_count.clone())
    };
    let (mv1, tree1, counts1) = run();
    let (mv2, tree2, counts2) = run();
    assert_eq!(mv1, mv2);
    assert_eq!(tree1, tree2);
    assert_eq!(counts1, counts2);
}

#[test]
fn test_tree_search_returns_legal_move() {
    let mut ctx = SearchContext::new(Params {
        n_sims: 50,
        resign_thres: 0.0,
        ..params(5)
    });
    let pos = setup_position(&["E5", "D4"]);
    let mut tree = TreeNode::root(ctx.params.prior_even);
    let n = ctx.params.n_sims;
    let mv = tree_search(&mut ctx, &pos, &mut tree, n, None);
    let mut after = pos.clone();
    assert!(play_move(&mut after, mv).is_ok(), "{} is not legal", str_coord(mv));
    assert!(tree.v > 0);
}

// =============================================================================
// Engine
// =============================================================================

#[test]
fn test_engine_undo() {
    let mut engine = Engine::new(params(1));
    assert_eq!(engine.undo(), Err(NothingToUndo));

    engine.play(pt("E5")).unwrap();
    engine.play(pt("E6")).unwrap();
    engine.play(pt("D4")).unwrap();
    engine.undo().unwrap();
    engine.undo().unwrap();

    let expected = setup_position(&["E5"]);
    assert!(engine.position().state_eq(&expected));
    assert_eq!(engine.history(), &[(Color::Black, pt("E5"))]);
    engine.undo().unwrap();
    assert_eq!(engine.undo(), Err(NothingToUndo));
}

#[test]
fn test_engine_counts_captures() {
    let mut engine = Engine::new(params(1));
    for s in ["D5", "E5", "F5", "A1", "E4", "A9", "E6"] {
        engine.play(pt(s)).unwrap();
    }
    assert_eq!(engine.captures(Color::Black), 1);
    assert_eq!(engine.color(pt("E5")), Color::Empty);
    engine.undo().unwrap();
    assert_eq!(engine.captures(Color::Black), 0);
    assert_eq!(engine.color(pt("E5")), Color::White);
}

#[test]
fn test_engine_score_estimate_bounds() {
    let mut engine = Engine::new(Params {
        n_sims: 30,
        ..params(11)
    });
    engine.play(pt("E5")).unwrap();
    let black = engine.score_estimate(Color::Black);
    assert!(black.pessimistic <= black.raw && black.raw <= black.optimistic);
    let white = engine.score_estimate(Color::White);
    assert!(white.optimistic <= white.raw && white.raw <= white.pessimistic);
    // The search does not touch the game
    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.to_play(), Color::White);
}
