//! Board geometry, special move values and default engine tunables.
//!
//! The board is a 1D array with a one point `OUT` border. Row 0 and the
//! trailing row are padding, and every row starts with one padding column,
//! so the right border of a row doubles as the left border of the next.
//!
//! The side length `N` is fixed at compile time by exactly one of the
//! `board9x9` (default), `board13x13` and `board19x19` features, e.g.
//! `cargo build --no-default-features --features board19x19`.
//!
//! The search tunables below are only defaults; the values actually used
//! live in [`crate::config::Params`].

// =============================================================================
// Geometry
// =============================================================================

#[cfg(feature = "board9x9")]
pub const N: usize = 9;

#[cfg(feature = "board13x13")]
pub const N: usize = 13;

#[cfg(feature = "board19x19")]
pub const N: usize = 19;

#[cfg(any(
    all(feature = "board9x9", feature = "board13x13"),
    all(feature = "board9x9", feature = "board19x19"),
    all(feature = "board13x13", feature = "board19x19"),
))]
compile_error!("Enable exactly one of 'board9x9', 'board13x13' or 'board19x19'");

#[cfg(not(any(feature = "board9x9", feature = "board13x13", feature = "board19x19")))]
compile_error!("Must enable one board size feature: 'board9x9', 'board13x13' or 'board19x19'");

/// Board width including the padding column.
pub const W: usize = N + 2;

/// Total board array size including all padding.
pub const BOARDSIZE: usize = (N + 1) * W + 1;

/// First index of the first board row (its padding column).
pub const BOARD_IMIN: usize = N + 1;

/// One past the last playable index.
pub const BOARD_IMAX: usize = BOARDSIZE - N - 1;

/// Move ceiling for a single playout.
pub const MAX_GAME_LEN: usize = N * N * 3;

/// Number of 32-bit words in a block liberty bitset (bit `l - N` for point `l`).
pub const LIBS_SIZE: usize = (BOARDSIZE - N).div_ceil(32);

/// Size of the block id space. Id 0 means "no block".
pub const MAX_BLOCKS: usize = if N < 11 { 128 } else { 256 };

/// Recursion limit of the ladder reader; every level consumes one move.
pub const MAX_LADDER_DEPTH: usize = 500;

// =============================================================================
// Moves and directions
// =============================================================================

/// Index 0 is border padding, so it can double as the pass move.
pub const PASS_MOVE: usize = 0;

pub const RESIGN_MOVE: usize = usize::MAX;

/// Step from a point to its neighbor in direction k: the four orthogonal
/// directions N, E, S, W first, then the diagonals NE, SE, SW, NW.
pub const DELTA: [isize; 8] = [
    -(N as isize) - 1,
    1,
    (N as isize) + 1,
    -1,
    -(N as isize),
    W as isize,
    N as isize,
    -(W as isize),
];

// =============================================================================
// Search defaults
// =============================================================================

pub const N_SIMS: usize = 1400;

/// AMAF visits at which RAVE and real statistics weigh the same.
pub const RAVE_EQUIV: u32 = 3500;

/// A leaf gets children once it has this many visits.
pub const EXPAND_VISITS: u32 = 8;

/// Simulations between two progress lines in the log.
pub const REPORT_PERIOD: usize = 200;

/// Resign when the best move wins less often than this.
pub const RESIGN_THRES: f64 = 0.2;

/// Stop searching when the best winrate passes this after 20% of the budget.
pub const FASTPLAY20_THRES: f64 = 0.8;

/// Stop searching when the best winrate passes this after 5% of the budget.
pub const FASTPLAY5_THRES: f64 = 0.95;

// =============================================================================
// Priors, as (visits, wins) pseudo-counts on new tree nodes
// =============================================================================

pub const PRIOR_EVEN: u32 = 10;

/// Added to the visits only, so it lowers the winrate.
pub const PRIOR_SELFATARI: u32 = 10;

pub const PRIOR_CAPTURE_ONE: u32 = 15;
pub const PRIOR_CAPTURE_MANY: u32 = 30;
pub const PRIOR_PAT3: u32 = 10;

/// Scaled by the square root of the large pattern probability.
pub const PRIOR_LARGEPATTERN: u32 = 100;

/// Indexed by common fate graph distance to the last move minus one.
pub const PRIOR_CFG: [u32; 3] = [24, 22, 8];

/// Edge moves far from any stone: a malus on lines 1-2, a bonus on line 3.
pub const PRIOR_EMPTYAREA: u32 = 10;

// =============================================================================
// Playout policy
// =============================================================================

pub const PROB_HEURISTIC_CAPTURE: f64 = 0.9;
pub const PROB_HEURISTIC_PAT3: f64 = 0.95;

/// Chance that a self-atari proposed by a heuristic is taken back.
pub const PROB_SSAREJECT: f64 = 0.9;

/// Chance that a random self-atari is taken back. Lower, so nakade
/// sacrifices still get played.
pub const PROB_RSAREJECT: f64 = 0.5;

// =============================================================================
// Game
// =============================================================================

pub const KOMI: f32 = 7.5;

/// Komi worth of one handicap stone, used by dynamic komi.
pub const KOMI_PER_HANDICAP_STONE: f64 = 7.0;

/// Playout ownership fraction above which a point is considered owned.
pub const OWNERSHIP_THRES: f64 = 0.8;
