//! Shape knowledge consulted by playouts and tree expansion.
//!
//! The core only asks two questions, expressed by [`PatternSource`]:
//! does a 3x3 pattern match at a point, and what is the empirical
//! probability of a large pattern match there.
//!
//! [`Pat3Patterns`] answers the first with a bit table indexed by the
//! 16-bit `env8` neighborhood code of a point, filled from the classic Michi
//! shapes under all rotations, reflections and color swaps. No large
//! pattern database is bundled, so its large pattern probability is always
//! 0 and the large pattern prior never fires.

use crate::position::{Color, Point, Position};
use std::sync::OnceLock;

/// Pattern knowledge the search consults. Both functions are pure in the
/// current board state.
pub trait PatternSource {
    /// True when a 3x3 pattern matches around the empty point `pt`.
    fn pat3_match(&self, pos: &Position, pt: Point) -> bool;

    /// Probability in `[0, 1]` that the best large pattern at `pt` is played.
    fn large_pattern_probability(&self, pos: &Position, pt: Point) -> f64;
}

/// Classic Michi 3x3 shapes around the empty center point. Glyphs: `X` and
/// `O` stones of either color (colors are swapped during expansion), `.`
/// empty, `#` off board, `x` anything but `X`, `o` anything but `O`, `?`
/// anything.
const PAT3_SRC: &[&str] = &[
    "XOX...???", // hane: enclosing hane
    "XO....?.?", // hane: non-cutting hane
    "XO?X..x.?", // hane: magari
    ".O.X.....", // katatsuke or diagonal attachment
    "XO?O.o?o?", // kiri: unprotected cut
    "XO?O.X???", // kiri: peeped cut
    "?X?O.Oooo", // de
    "OX?o.O???", // cut keima
    "X.?O.?##?", // side: chase
    "OX?X.O###", // side: block side cut
    "?X?x.O###", // side: block side connection
    "?XOx.x###", // side: sagari
    "?OXX.O###", // side: cut
];

/// One bit per `env8` code.
type Pat3Set = [u8; 8192];

static PAT3SET: OnceLock<Pat3Set> = OnceLock::new();

/// The built-in 3x3 shape table, without large patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pat3Patterns;

impl Pat3Patterns {
    /// Build the lookup table now instead of on first match.
    pub fn init() -> Self {
        PAT3SET.get_or_init(build_pat3set);
        Self
    }
}

impl PatternSource for Pat3Patterns {
    #[inline]
    fn pat3_match(&self, pos: &Position, pt: Point) -> bool {
        pat3_match(pos, pt)
    }

    fn large_pattern_probability(&self, _pos: &Position, _pt: Point) -> f64 {
        0.0
    }
}

/// Check if the neighborhood of `pt` is one of the built-in shapes.
#[inline]
pub fn pat3_match(pos: &Position, pt: Point) -> bool {
    let set = PAT3SET.get_or_init(build_pat3set);
    let env8 = pos.env8(pt);
    set[(env8 >> 3) as usize] & (1 << (env8 & 7)) != 0
}

fn build_pat3set() -> Pat3Set {
    let mut set = [0u8; 8192];
    for src in PAT3_SRC {
        let Ok(grid) = <[u8; 9]>::try_from(src.as_bytes()) else {
            log::error!("malformed 3x3 pattern {src:?}");
            continue;
        };
        for variant in symmetries(grid) {
            insert_expanded(&mut set, variant, 0);
        }
    }
    set
}

/// Grid index permutations, `new[i] = old[PERM[i]]`, on the layout
/// ```text
/// 0 1 2
/// 3 4 5
/// 6 7 8
/// ```
const ROT90: [usize; 9] = [2, 5, 8, 1, 4, 7, 0, 3, 6];
const MIRROR: [usize; 9] = [2, 1, 0, 5, 4, 3, 8, 7, 6];

fn permute(grid: &[u8; 9], perm: &[usize; 9]) -> [u8; 9] {
    std::array::from_fn(|i| grid[perm[i]])
}

fn swap_glyph(g: u8) -> u8 {
    match g {
        b'X' => b'O',
        b'O' => b'X',
        b'x' => b'o',
        b'o' => b'x',
        other => other,
    }
}

/// The 8 rotations and reflections of `grid`, each with both color
/// assignments.
fn symmetries(grid: [u8; 9]) -> Vec<[u8; 9]> {
    let mut out = Vec::with_capacity(16);
    let mut rotated = grid;
    for _ in 0..4 {
        rotated = permute(&rotated, &ROT90);
        for variant in [rotated, permute(&rotated, &MIRROR)] {
            out.push(variant);
            out.push(variant.map(swap_glyph));
        }
    }
    out
}

/// Resolve the wildcards from position `i` on and set the bit of every
/// concrete neighborhood.
fn insert_expanded(set: &mut Pat3Set, grid: [u8; 9], i: usize) {
    let Some(offset) = grid[i..].iter().position(|g| matches!(g, b'?' | b'x' | b'o')) else {
        let env8 = env8_code(&grid);
        set[(env8 >> 3) as usize] |= 1 << (env8 & 7);
        return;
    };
    let at = i + offset;
    let choices: &[u8] = match grid[at] {
        b'?' => b"XO.#",
        b'x' => b"O.#",
        _ => b"X.#",
    };
    for &g in choices {
        let mut next = grid;
        next[at] = g;
        insert_expanded(set, next, at + 1);
    }
}

/// The `env8` code a board point would have with this concrete grid
/// around it: orthogonals in the low byte, diagonals in the high byte,
/// each in N, E, S, W (NE, SE, SW, NW) order.
fn env8_code(grid: &[u8; 9]) -> u16 {
    const ORTHOGONAL: [usize; 4] = [1, 5, 7, 3];
    const DIAGONAL: [usize; 4] = [2, 8, 6, 0];
    let mut env8: u16 = 0;
    for k in 0..4 {
        env8 |= glyph_bits(grid[ORTHOGONAL[k]], k);
        env8 |= glyph_bits(grid[DIAGONAL[k]], k) << 8;
    }
    env8
}

/// Color code bits of one neighbor in direction `k`: the high bit of the
/// code goes to bit `k + 4`, the low bit to bit `k`.
fn glyph_bits(g: u8, k: usize) -> u16 {
    let color = match g {
        b'O' => Color::White,
        b'X' => Color::Black,
        b'#' => Color::Out,
        _ => Color::Empty,
    };
    let c = color as u16;
    (((c >> 1) << 4) | (c & 1)) << k
}
