//! Go position representation and move execution.
//!
//! This module provides the core game logic for Go, including:
//! - Board state representation using a 1D array with padding
//! - Incremental block (connected group) and liberty bookkeeping
//! - Capture, suicide and simple ko enforcement
//! - One ply undo
//! - Eye detection for playout optimization
//!
//! Every point carries two packed bytes caching the colors of its four
//! orthogonal (`env4`) and four diagonal (`env4d`) neighbors. Neighbor `k`
//! stores the high bit of its color code at bit `k + 4` and the low bit at
//! bit `k`, which makes "which neighbors are empty/black/white" a couple of
//! bit operations.

use std::fmt;

use thiserror::Error;

use crate::constants::*;

/// A point on the board, represented as an index into the 1D board array.
pub type Point = usize;

/// Block identifier. 0 means "no block".
pub type Block = u8;

/// Color of a board point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Empty = 0,
    Out = 1,
    White = 2,
    Black = 3,
}

impl Color {
    /// Opposite stone color. `Empty` and `Out` map to themselves.
    #[inline]
    pub fn other(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            c => c,
        }
    }

    #[inline]
    pub fn is_stone(self) -> bool {
        (self as u8) & 2 != 0
    }

    /// Index into per-color arrays: White 0, Black 1.
    #[inline]
    pub(crate) fn index(self) -> usize {
        (self as u8 & 1) as usize
    }

    #[inline]
    fn env_code(self) -> u8 {
        let c = self as u8;
        ((c >> 1) << 4) | (c & 1)
    }

    /// Single character used when rendering a board.
    pub fn symbol(self) -> char {
        match self {
            Color::Empty => '.',
            Color::Out => ' ',
            Color::White => 'O',
            Color::Black => 'X',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Empty => "empty",
            Color::Out => "out",
            Color::White => "white",
            Color::Black => "black",
        };
        f.write_str(name)
    }
}

/// Reason a move was rejected. The position is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("Error Illegal move: point not EMPTY")]
    Occupied,
    #[error("Error Illegal move: retakes ko")]
    KoRetake,
    #[error("Error Illegal move: suicide")]
    Suicide,
}

/// What the last `play_move`/`pass_move` changed beyond the board itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct UndoRecord {
    /// Bit k set when the block in direction k was captured.
    captured: u8,
    captured_ids: [Block; 4],
    /// Ids absorbed by a merge, in N, E, S, W discovery order.
    merged_ids: [Block; 3],
    last3: Point,
    ko_old: Point,
}

/// How a newly placed stone touches friendly stones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contact {
    NoContact,
    /// Exactly one friendly neighbor, in the given direction.
    Extend(usize),
    /// Two to four friendly neighbors; the first `count` entries are used.
    Merge { dirs: [usize; 4], count: usize },
}

fn classify_contact(code: u8) -> Contact {
    match code.count_ones() {
        0 => Contact::NoContact,
        1 => Contact::Extend(code.trailing_zeros() as usize),
        _ => {
            let mut dirs = [0; 4];
            let mut count = 0;
            for k in 0..4 {
                if code & (1 << k) != 0 {
                    dirs[count] = k;
                    count += 1;
                }
            }
            Contact::Merge { dirs, count }
        }
    }
}

/// A Go position (board state).
///
/// Flat and fixed-size, so a scratch copy is a plain `clone()`.
#[derive(Clone)]
pub struct Position {
    color: [Color; BOARDSIZE],
    env4: [u8; BOARDSIZE],
    env4d: [u8; BOARDSIZE],
    block: [Block; BOARDSIZE],
    nlibs: [u16; MAX_BLOCKS],
    bsize: [u8; MAX_BLOCKS],
    libs: [[u32; LIBS_SIZE]; MAX_BLOCKS],
    caps: [u32; 2],
    undo: UndoRecord,
    /// Player to move
    pub to_play: Color,
    /// Move number (0 = start of game)
    pub n: usize,
    /// Ko point (0 if no ko)
    pub ko: Point,
    /// Ko point before the last move (restored on undo)
    pub ko_old: Point,
    /// Last move played
    pub last: Point,
    /// Second-to-last move
    pub last2: Point,
    /// Third-to-last move
    pub last3: Point,
    /// Komi (compensation points for White)
    pub komi: f32,
    /// Dynamic komi adjustment applied on top of `komi` in playouts
    pub delta_komi: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    pub fn new() -> Self {
        let mut p = Position {
            color: [Color::Out; BOARDSIZE],
            env4: [0; BOARDSIZE],
            env4d: [0; BOARDSIZE],
            block: [0; BOARDSIZE],
            nlibs: [0; MAX_BLOCKS],
            bsize: [0; MAX_BLOCKS],
            libs: [[0; LIBS_SIZE]; MAX_BLOCKS],
            caps: [0; 2],
            undo: UndoRecord::default(),
            to_play: Color::Black,
            n: 0,
            ko: 0,
            ko_old: 0,
            last: 0,
            last2: 0,
            last3: 0,
            komi: KOMI,
            delta_komi: 0.0,
        };
        empty_position(&mut p);
        p
    }

    #[inline]
    pub fn color(&self, pt: Point) -> Color {
        self.color[pt]
    }

    /// Block id at `pt` (0 for empty and border points).
    #[inline]
    pub fn block(&self, pt: Point) -> Block {
        self.block[pt]
    }

    /// Stone count of a block, saturating at 255.
    #[inline]
    pub fn block_size(&self, b: Block) -> u32 {
        self.bsize[b as usize] as u32
    }

    #[inline]
    pub fn block_nlibs(&self, b: Block) -> usize {
        self.nlibs[b as usize] as usize
    }

    /// Liberties of block `b` in ascending point order, at most `max` of them.
    pub fn block_libs(&self, b: Block, max: usize) -> Vec<Point> {
        let mut libs = Vec::with_capacity(max.min(self.block_nlibs(b)));
        for (k, &word) in self.libs[b as usize].iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                if libs.len() >= max {
                    return libs;
                }
                let j = bits.trailing_zeros() as usize;
                libs.push(N + 32 * k + j);
                bits &= bits - 1;
            }
        }
        libs
    }

    /// True when `l` is recorded as a liberty of block `b`.
    #[inline]
    pub fn is_block_lib(&self, b: Block, l: Point) -> bool {
        let (k, m) = lib_slot(l);
        self.libs[b as usize][k] & m != 0
    }

    /// Packed orthogonal neighbor colors of `pt`.
    #[inline]
    pub fn env4(&self, pt: Point) -> u8 {
        self.env4[pt]
    }

    /// Packed diagonal neighbor colors of `pt`.
    #[inline]
    pub fn env4d(&self, pt: Point) -> u8 {
        self.env4d[pt]
    }

    /// The 16-bit 3x3 neighborhood code used by the pattern matcher.
    #[inline]
    pub fn env8(&self, pt: Point) -> u16 {
        (self.env4[pt] as u16) | ((self.env4d[pt] as u16) << 8)
    }

    /// Number of empty orthogonal neighbors of `pt`.
    #[inline]
    pub fn point_nlibs(&self, pt: Point) -> u32 {
        select_empty(self.env4[pt]).count_ones()
    }

    /// Stones captured by `c` so far.
    #[inline]
    pub fn captures(&self, c: Color) -> u32 {
        self.caps[c.index()]
    }

    /// Number of stones on the board.
    pub fn stone_count(&self) -> usize {
        (BOARD_IMIN..BOARD_IMAX)
            .filter(|&pt| self.color[pt].is_stone())
            .count()
    }

    /// Direction code of the blocks captured by the last move (bit k = DELTA[k]).
    pub fn last_captured(&self) -> u8 {
        self.undo.captured
    }

    /// Field-wise equality, ignoring the one-ply undo slot.
    pub fn state_eq(&self, other: &Position) -> bool {
        self.color == other.color
            && self.env4 == other.env4
            && self.env4d == other.env4d
            && self.block == other.block
            && self.nlibs == other.nlibs
            && self.bsize == other.bsize
            && self.libs == other.libs
            && self.caps == other.caps
            && self.to_play == other.to_play
            && self.n == other.n
            && self.ko == other.ko
            && self.ko_old == other.ko_old
            && self.last == other.last
            && self.last2 == other.last2
            && self.last3 == other.last3
            && self.komi == other.komi
            && self.delta_komi == other.delta_komi
    }

    // -------------------------------------------------------------------------
    // Stones and neighbor caches
    // -------------------------------------------------------------------------

    fn put_stone(&mut self, pt: Point, c: Color) {
        self.color[pt] = c;
        self.update_env(pt, c.env_code());
    }

    fn remove_stone(&mut self, pt: Point) {
        self.color[pt] = Color::Empty;
        self.update_env(pt, 0);
    }

    /// Rewrite the cached color of `pt` in all 8 neighbors' env bytes.
    fn update_env(&mut self, pt: Point, code: u8) {
        for k in 0..4 {
            let n = offset(pt, k);
            let dir = (k + 2) % 4;
            let mask = 0x11u8 << dir;
            self.env4[n] = (self.env4[n] & !mask) | (code << dir);
        }
        for k in 4..8 {
            let n = offset(pt, k);
            let dir = (k - 2) % 4;
            let mask = 0x11u8 << dir;
            self.env4d[n] = (self.env4d[n] & !mask) | (code << dir);
        }
    }

    /// Recompute a neighbor byte from the board (directions `first..first + 4`).
    fn compute_env(&self, pt: Point, first: usize) -> u8 {
        let mut env = 0u8;
        for k in first..first + 4 {
            env |= self.color[offset(pt, k)].env_code() << (k - first);
        }
        env
    }

    // -------------------------------------------------------------------------
    // Block bookkeeping
    // -------------------------------------------------------------------------

    fn new_block_id(&self) -> Block {
        match (1..MAX_BLOCKS).find(|&b| self.bsize[b] == 0) {
            Some(b) => b as Block,
            None => {
                log::error!("all {} block ids are in use", MAX_BLOCKS - 1);
                panic!("block id space exhausted (MAX_BLOCKS = {MAX_BLOCKS})");
            }
        }
    }

    fn add_lib(&mut self, b: Block, l: Point) -> bool {
        let (k, m) = lib_slot(l);
        let libs = &mut self.libs[b as usize][k];
        if *libs & m != 0 {
            return false;
        }
        *libs |= m;
        self.nlibs[b as usize] += 1;
        true
    }

    fn remove_lib(&mut self, b: Block, l: Point) -> bool {
        let (k, m) = lib_slot(l);
        let libs = &mut self.libs[b as usize][k];
        if *libs & m == 0 {
            return false;
        }
        *libs &= !m;
        self.nlibs[b as usize] -= 1;
        true
    }

    fn count_libs(&self, b: Block) -> u16 {
        self.libs[b as usize].iter().map(|w| w.count_ones() as u16).sum()
    }

    fn free_block(&mut self, b: Block) {
        self.libs[b as usize] = [0; LIBS_SIZE];
        self.nlibs[b as usize] = 0;
        self.bsize[b as usize] = 0;
    }

    fn extend_block(&mut self, b: Block, pt: Point) {
        self.bsize[b as usize] = self.bsize[b as usize].saturating_add(1);
        self.block[pt] = b;
        self.remove_lib(b, pt);
    }

    /// Absorb `b2` into `b1`. The caller recounts `b1`'s liberties.
    fn merge_blocks(&mut self, b1: Block, b2: Block) {
        for pt in BOARD_IMIN..BOARD_IMAX {
            if self.block[pt] == b2 {
                self.block[pt] = b1;
            }
        }
        let (i1, i2) = (b1 as usize, b2 as usize);
        self.bsize[i1] = self.bsize[i1].saturating_add(self.bsize[i2]);
        for k in 0..LIBS_SIZE {
            self.libs[i1][k] |= self.libs[i2][k];
        }
        self.free_block(b2);
    }

    /// Remove every stone of block `b` (which contains `pt`) and hand the
    /// vacated points to the surrounding blocks as liberties.
    fn capture_block(&mut self, b: Block, pt: Point) -> u32 {
        let mut stack = vec![pt];
        self.remove_stone(pt);
        self.block[pt] = 0;
        let mut count = 0;
        while let Some(p) = stack.pop() {
            count += 1;
            for n in neighbors(p) {
                let b1 = self.block[n];
                if b1 == b {
                    self.remove_stone(n);
                    self.block[n] = 0;
                    stack.push(n);
                } else if b1 != 0 {
                    self.add_lib(b1, p);
                }
            }
        }
        self.free_block(b);
        count
    }

    /// Stones and liberties of the 4-connected group containing stone `pt`,
    /// found by flood fill over colors (block ids are not consulted).
    fn flood_group(&self, pt: Point, visited: &mut [bool; BOARDSIZE]) -> (Vec<Point>, Vec<Point>) {
        let c = self.color[pt];
        let mut stones = Vec::new();
        let mut libs = Vec::new();
        let mut seen_lib = [false; BOARDSIZE];
        let mut stack = vec![pt];
        visited[pt] = true;
        while let Some(p) = stack.pop() {
            stones.push(p);
            for n in neighbors(p) {
                let nc = self.color[n];
                if nc == c && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                } else if nc == Color::Empty && !seen_lib[n] {
                    seen_lib[n] = true;
                    libs.push(n);
                }
            }
        }
        (stones, libs)
    }

    /// Empty region 4-connected to `pt`.
    fn empty_region(&self, pt: Point) -> Vec<Point> {
        let mut seen = [false; BOARDSIZE];
        let mut region = Vec::new();
        let mut stack = vec![pt];
        seen[pt] = true;
        while let Some(p) = stack.pop() {
            region.push(p);
            for n in neighbors(p) {
                if self.color[n] == Color::Empty && !seen[n] {
                    seen[n] = true;
                    stack.push(n);
                }
            }
        }
        region
    }

    // -------------------------------------------------------------------------
    // Consistency checks
    // -------------------------------------------------------------------------

    /// True when every cached neighbor byte matches the board.
    pub fn env4_ok(&self) -> bool {
        for pt in BOARD_IMIN..BOARD_IMAX {
            if self.color[pt] == Color::Out {
                continue;
            }
            if self.env4[pt] != self.compute_env(pt, 0) {
                log::error!("env4 mismatch at {}", str_coord(pt));
                return false;
            }
            if self.env4d[pt] != self.compute_env(pt, 4) {
                log::error!("env4d mismatch at {}", str_coord(pt));
                return false;
            }
        }
        true
    }

    /// Verify the block containing `pt` against a flood fill of the board.
    pub fn check_block(&self, pt: Point) -> bool {
        if !self.color[pt].is_stone() {
            if self.block[pt] != 0 {
                log::error!("non-stone point {} has block {}", str_coord(pt), self.block[pt]);
                return false;
            }
            return true;
        }
        let b = self.block[pt];
        if b == 0 {
            log::error!("stone at {} has no block", str_coord(pt));
            return false;
        }
        let mut visited = [false; BOARDSIZE];
        let (stones, libs) = self.flood_group(pt, &mut visited);
        if let Some(&s) = stones.iter().find(|&&s| self.block[s] != b) {
            log::error!("stone {} of block {} has id {}", str_coord(s), b, self.block[s]);
            return false;
        }
        if self.bsize[b as usize] as usize != stones.len().min(255) {
            log::error!(
                "block {} at {}: size {} but {} stones",
                b,
                str_coord(pt),
                self.bsize[b as usize],
                stones.len()
            );
            return false;
        }
        let mut expected = [0u32; LIBS_SIZE];
        for &l in &libs {
            let (k, m) = lib_slot(l);
            expected[k] |= m;
        }
        if expected != self.libs[b as usize] || self.count_libs(b) != self.nlibs[b as usize] {
            log::error!(
                "block {} at {}: nlibs {} but liberties are {:?}",
                b,
                str_coord(pt),
                self.nlibs[b as usize],
                libs.iter().map(|&l| str_coord(l)).collect::<Vec<_>>()
            );
            return false;
        }
        if libs.is_empty() {
            log::error!("block {} at {} has no liberty", b, str_coord(pt));
            return false;
        }
        true
    }

    /// Check the blocks around the last move (cheap, local).
    pub fn blocks_ok(&self, pt: Point) -> bool {
        if pt == PASS_MOVE {
            return true;
        }
        self.check_block(pt)
            && neighbors(pt)
                .into_iter()
                .all(|n| self.color[n] == Color::Out || self.check_block(n))
    }

    /// Check every block on the board and that no orphan ids remain.
    pub fn all_blocks_ok(&self) -> bool {
        let mut seen = [false; MAX_BLOCKS];
        for pt in BOARD_IMIN..BOARD_IMAX {
            let b = self.block[pt] as usize;
            if self.color[pt] == Color::Out || (b != 0 && seen[b]) {
                continue;
            }
            if !self.check_block(pt) {
                return false;
            }
            seen[b] = true;
        }
        for b in 1..MAX_BLOCKS {
            if !seen[b] && (self.bsize[b] != 0 || self.nlibs[b] != 0) {
                log::error!("orphan block id {} (size {}, nlibs {})", b, self.bsize[b], self.nlibs[b]);
                return false;
            }
        }
        true
    }

    fn verify_after_move(&self, pt: Point) {
        debug_assert!(self.blocks_ok(pt), "block bookkeeping broken around {}", str_coord(pt));
        if cfg!(feature = "paranoid") && !(self.env4_ok() && self.all_blocks_ok()) {
            log::error!("position invariants violated after {}\n{}", str_coord(pt), self);
            panic!("position invariants violated");
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Move: {:<3}   Black: {} caps   White: {} caps   Komi: {:.1}",
            self.n,
            self.caps[Color::Black.index()],
            self.caps[Color::White.index()],
            self.komi
        )?;
        for row in 1..=N {
            write!(f, " {:>2} ", N + 1 - row)?;
            for col in 1..=N {
                let pt = row * (N + 1) + col;
                let c = self.color[pt].symbol();
                if pt == self.last {
                    write!(f, "({c})")?;
                } else if pt == self.ko {
                    write!(f, " * ")?;
                } else {
                    write!(f, " {c} ")?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "    ")?;
        for col in 1..=N {
            write!(f, " {} ", column_letter(col))?;
        }
        writeln!(f)
    }
}

#[inline]
fn lib_slot(l: Point) -> (usize, u32) {
    let i = l - N;
    (i >> 5, 1u32 << (i & 31))
}

#[inline]
fn offset(pt: Point, k: usize) -> Point {
    pt.wrapping_add_signed(DELTA[k])
}

/// Bits of the orthogonal neighbors that are empty.
#[inline]
pub fn select_empty(env4: u8) -> u8 {
    !((env4 >> 4) | env4) & 0xf
}

/// Bits of the orthogonal neighbors holding a stone of color `c`.
#[inline]
pub fn select_color(env4: u8, c: Color) -> u8 {
    match c {
        Color::Black => (env4 >> 4) & env4 & 0xf,
        Color::White => (env4 >> 4) & !env4 & 0xf,
        Color::Empty => select_empty(env4),
        Color::Out => !(env4 >> 4) & env4 & 0xf,
    }
}

/// Reset a position to the initial empty board state, keeping komi.
pub fn empty_position(pos: &mut Position) {
    let komi = pos.komi;
    pos.color = [Color::Out; BOARDSIZE];
    for row in 1..=N {
        for col in 1..=N {
            pos.color[row * (N + 1) + col] = Color::Empty;
        }
    }
    pos.env4 = [0; BOARDSIZE];
    pos.env4d = [0; BOARDSIZE];
    for pt in BOARD_IMIN..BOARD_IMAX {
        if pos.color[pt] != Color::Out {
            pos.env4[pt] = pos.compute_env(pt, 0);
            pos.env4d[pt] = pos.compute_env(pt, 4);
        }
    }
    pos.block = [0; BOARDSIZE];
    pos.nlibs = [0; MAX_BLOCKS];
    pos.bsize = [0; MAX_BLOCKS];
    pos.libs = [[0; LIBS_SIZE]; MAX_BLOCKS];
    pos.caps = [0; 2];
    pos.undo = UndoRecord::default();
    pos.to_play = Color::Black;
    pos.n = 0;
    pos.ko = 0;
    pos.ko_old = 0;
    pos.last = 0;
    pos.last2 = 0;
    pos.last3 = 0;
    pos.komi = komi;
    pos.delta_komi = 0.0;
}

/// Execute a pass move.
///
/// Increments the move counter, flips the player to move and clears the ko.
pub fn pass_move(pos: &mut Position) {
    pos.undo = UndoRecord {
        last3: pos.last3,
        ko_old: pos.ko_old,
        ..UndoRecord::default()
    };
    pos.ko_old = pos.ko;
    pos.ko = 0;
    pos.n += 1;
    pos.last3 = pos.last2;
    pos.last2 = pos.last;
    pos.last = PASS_MOVE;
    pos.to_play = pos.to_play.other();
}

/// Play a move for `pos.to_play` at the given point.
///
/// Handles pass moves, legality checking, captures, ko detection and the
/// incremental block update. On error the position is unchanged.
///
/// # Errors
/// - [`IllegalMove::Occupied`] - the point is not empty
/// - [`IllegalMove::KoRetake`] - the move retakes the ko
/// - [`IllegalMove::Suicide`] - the stone would have no liberties
pub fn play_move(pos: &mut Position, pt: Point) -> Result<(), IllegalMove> {
    if pt == PASS_MOVE {
        pass_move(pos);
        return Ok(());
    }
    if pos.color[pt] != Color::Empty {
        return Err(IllegalMove::Occupied);
    }
    if pt == pos.ko {
        return Err(IllegalMove::KoRetake);
    }

    let me = pos.to_play;
    let other = me.other();
    let mut record = UndoRecord {
        last3: pos.last3,
        ko_old: pos.ko_old,
        ..UndoRecord::default()
    };

    // Take the liberty away from opponent neighbors, capturing on zero.
    let mut captured = 0;
    for (k, n) in neighbors(pt).into_iter().enumerate() {
        if pos.color[n] != other {
            continue;
        }
        let b = pos.block[n];
        if pos.remove_lib(b, pt) && pos.nlibs[b as usize] == 0 {
            captured += pos.capture_block(b, n);
            record.captured |= 1 << k;
            record.captured_ids[k] = b;
        }
    }

    let empty_code = select_empty(pos.env4[pt]);
    if empty_code == 0 {
        let connects_out = neighbors(pt)
            .into_iter()
            .any(|n| pos.color[n] == me && pos.nlibs[pos.block[n] as usize] > 1);
        if !connects_out {
            // No capture happened (the point would have an empty neighbor).
            for n in neighbors(pt) {
                if pos.color[n] == other {
                    let b = pos.block[n];
                    pos.add_lib(b, pt);
                }
            }
            return Err(IllegalMove::Suicide);
        }
    }

    pos.caps[me.index()] += captured;
    let ko_before = pos.ko;
    pos.ko = 0;
    let contact = classify_contact(select_color(pos.env4[pt], me));
    pos.put_stone(pt, me);

    let b = match contact {
        Contact::NoContact => {
            let b = pos.new_block_id();
            pos.bsize[b as usize] = 1;
            pos.block[pt] = b;
            if captured == 1 && empty_code.count_ones() == 1 {
                pos.ko = offset(pt, empty_code.trailing_zeros() as usize);
            }
            b
        }
        Contact::Extend(dir) => {
            let b = pos.block[offset(pt, dir)];
            pos.extend_block(b, pt);
            b
        }
        Contact::Merge { dirs, count } => {
            let b = pos.block[offset(pt, dirs[0])];
            let mut merged = 0;
            for &dir in &dirs[1..count] {
                let b2 = pos.block[offset(pt, dir)];
                if b2 != b {
                    pos.merge_blocks(b, b2);
                    record.merged_ids[merged] = b2;
                    merged += 1;
                }
            }
            pos.nlibs[b as usize] = pos.count_libs(b);
            pos.extend_block(b, pt);
            b
        }
    };
    for n in neighbors(pt) {
        if pos.color[n] == Color::Empty {
            pos.add_lib(b, n);
        }
    }

    pos.undo = record;
    pos.ko_old = ko_before;
    pos.n += 1;
    pos.last3 = pos.last2;
    pos.last2 = pos.last;
    pos.last = pt;
    pos.to_play = other;
    pos.verify_after_move(pt);
    Ok(())
}

/// Place a setup stone of color `c` without counting it as a move.
///
/// Afterwards the opponent of `c` is to play.
pub fn place_stone(pos: &mut Position, pt: Point, c: Color) -> Result<(), IllegalMove> {
    let to_play = pos.to_play;
    pos.to_play = c;
    if let Err(err) = play_move(pos, pt) {
        pos.to_play = to_play;
        return Err(err);
    }
    pos.n -= 1;
    Ok(())
}

/// Undo the last `play_move` or `pass_move`.
///
/// Only one ply is recorded: calling this twice in a row without an
/// intervening move leaves the position in an unspecified state.
pub fn undo_move(pos: &mut Position) {
    let last = pos.last;
    let record = pos.undo;

    pos.last = pos.last2;
    pos.last2 = pos.last3;
    pos.last3 = record.last3;
    pos.ko = pos.ko_old;
    pos.ko_old = record.ko_old;
    pos.n -= 1;
    pos.to_play = pos.to_play.other();
    pos.undo = UndoRecord::default();
    if last == PASS_MOVE {
        return;
    }

    // The stone goes first: a lone stone may hold the id of a block it
    // captured, and that id is handed back to the captured block below.
    let c = pos.color[last];
    let other = c.other();
    let bl = pos.block[last];
    // Captured regions are bounded by `last` only while it is occupied.
    let regions: Vec<(Block, Vec<Point>)> = (0..4)
        .filter(|&k| record.captured & (1 << k) != 0)
        .map(|k| (record.captured_ids[k], pos.empty_region(offset(last, k))))
        .collect();
    pos.remove_stone(last);
    pos.block[last] = 0;
    pos.free_block(bl);

    // Split the former group back into its pieces, reusing the original ids.
    let mut ids = std::iter::once(bl).chain(record.merged_ids.into_iter().filter(|&b| b != 0));
    let mut visited = [false; BOARDSIZE];
    for n in neighbors(last) {
        let nc = pos.color[n];
        if nc == other {
            let b = pos.block[n];
            pos.add_lib(b, last);
        } else if nc == c && !visited[n] {
            let (stones, libs) = pos.flood_group(n, &mut visited);
            let id = match ids.next() {
                Some(id) => id,
                None => pos.new_block_id(),
            };
            for &s in &stones {
                pos.block[s] = id;
            }
            pos.bsize[id as usize] = stones.len().min(255) as u8;
            for l in libs {
                pos.add_lib(id, l);
            }
        }
    }

    // Put the captured blocks back; `last` was their only liberty.
    let mut restored = 0;
    for (bn, region) in regions {
        for &s in &region {
            pos.put_stone(s, other);
            pos.block[s] = bn;
            for m in neighbors(s) {
                if pos.color[m] == c {
                    let b = pos.block[m];
                    pos.remove_lib(b, s);
                }
            }
        }
        pos.bsize[bn as usize] = region.len().min(255) as u8;
        pos.add_lib(bn, last);
        restored += region.len() as u32;
    }
    pos.caps[c.index()] -= restored;
    pos.verify_after_move(last);
}

/// Check if a point is "eyeish" (surrounded by stones of one color).
///
/// Out of bounds neighbors are ignored. Returns the color of the
/// surrounding stones, or `None`. This may return a color for false eyes.
pub fn is_eyeish(pos: &Position, pt: Point) -> Option<Color> {
    let mut eyecolor = None;
    for n in neighbors(pt) {
        match pos.color[n] {
            Color::Out => continue,
            Color::Empty => return None,
            c => match eyecolor {
                None => eyecolor = Some(c),
                Some(e) if e != c => return None,
                Some(_) => {}
            },
        }
    }
    eyecolor
}

/// Check if a point is a true eye.
///
/// Eyeish, and the opponent holds fewer than two diagonals, where lying on
/// the edge counts as one opponent diagonal already.
pub fn is_eye(pos: &Position, pt: Point) -> Option<Color> {
    let eyecolor = is_eyeish(pos, pt)?;
    let falsecolor = eyecolor.other();
    let mut at_edge = false;
    let mut false_count = 0;
    for d in diagonal_neighbors(pt) {
        match pos.color[d] {
            Color::Out => at_edge = true,
            c if c == falsecolor => false_count += 1,
            _ => {}
        }
    }
    if at_edge {
        false_count += 1;
    }
    if false_count >= 2 { None } else { Some(eyecolor) }
}

/// Get the 4 orthogonal neighbors of a point.
#[inline]
pub fn neighbors(pt: Point) -> [Point; 4] {
    [offset(pt, 0), offset(pt, 1), offset(pt, 2), offset(pt, 3)]
}

/// Get the 4 diagonal neighbors of a point.
#[inline]
pub fn diagonal_neighbors(pt: Point) -> [Point; 4] {
    [offset(pt, 4), offset(pt, 5), offset(pt, 6), offset(pt, 7)]
}

/// Get all 8 neighbors (orthogonal first, then diagonal).
#[inline]
pub fn all_neighbors(pt: Point) -> [Point; 8] {
    std::array::from_fn(|k| offset(pt, k))
}

fn column_letter(col: usize) -> char {
    let c = (b'@' + col as u8) as char;
    if c >= 'I' { (c as u8 + 1) as char } else { c }
}

/// Parse a coordinate string (e.g., "D4", "pass") into a Point.
///
/// Columns use letters A-T skipping I. Returns `None` for anything that is
/// not "pass" or a point on this board.
pub fn parse_coord(s: &str) -> Option<Point> {
    if s.eq_ignore_ascii_case("pass") {
        return Some(PASS_MOVE);
    }
    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let col_char = bytes[0].to_ascii_uppercase();
    if !col_char.is_ascii_uppercase() || col_char == b'I' {
        return None;
    }
    let mut col = (col_char - b'A' + 1) as usize;
    if col_char > b'I' {
        col -= 1;
    }
    let row: usize = s[1..].parse().ok()?;
    if !(1..=N).contains(&col) || !(1..=N).contains(&row) {
        return None;
    }
    Some((N - row + 1) * (N + 1) + col)
}

/// Convert a Point to a coordinate string (e.g., "D4").
pub fn str_coord(pt: Point) -> String {
    match pt {
        PASS_MOVE => "pass".into(),
        RESIGN_MOVE => "resign".into(),
        _ => {
            let row = pt / (N + 1);
            let col = pt % (N + 1);
            format!("{}{}", column_letter(col), N + 1 - row)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(s: &str) -> Point {
        parse_coord(s).unwrap()
    }

    fn setpos(black: &[&str], white: &[&str]) -> Position {
        let mut pos = Position::new();
        for s in black {
            place_stone(&mut pos, pt(s), Color::Black).unwrap();
        }
        for s in white {
            place_stone(&mut pos, pt(s), Color::White).unwrap();
        }
        pos.to_play = Color::Black;
        pos
    }

    #[test]
    fn test_empty_position() {
        let pos = Position::new();
        assert_eq!(pos.n, 0);
        assert_eq!(pos.to_play, Color::Black);
        assert_eq!(pos.stone_count(), 0);
        assert_eq!(pos.color(pt("A1")), Color::Empty);
        assert_eq!(pos.color(0), Color::Out);
        assert!(pos.env4_ok());
        assert!(pos.all_blocks_ok());
        // Corner has two empty neighbors, center four
        assert_eq!(pos.point_nlibs(pt("A1")), 2);
        assert_eq!(pos.point_nlibs(pt("E5")), 4);
    }

    #[test]
    fn test_contact_classification() {
        assert_eq!(classify_contact(0), Contact::NoContact);
        assert_eq!(classify_contact(0b0100), Contact::Extend(2));
        assert_eq!(
            classify_contact(0b1010),
            Contact::Merge { dirs: [1, 3, 0, 0], count: 2 }
        );
    }

    #[test]
    fn test_select_colors() {
        let pos = setpos(&["E6"], &["F5"]);
        let env = pos.env4(pt("E5"));
        assert_eq!(select_color(env, Color::Black), 0b0001);
        assert_eq!(select_color(env, Color::White), 0b0010);
        assert_eq!(select_empty(env), 0b1100);
        let corner = pos.env4(pt("A1"));
        assert_eq!(select_color(corner, Color::Out), 0b1100);
    }

    #[test]
    fn test_single_stone_block() {
        let mut pos = Position::new();
        play_move(&mut pos, pt("E5")).unwrap();
        let b = pos.block(pt("E5"));
        assert_ne!(b, 0);
        assert_eq!(pos.block_size(b), 1);
        assert_eq!(pos.block_nlibs(b), 4);
        assert_eq!(pos.to_play, Color::White);
        assert_eq!(pos.last, pt("E5"));
    }

    #[test]
    fn test_merge_keeps_first_id() {
        let mut pos = setpos(&["D5", "F5"], &[]);
        // East is scanned before West
        let east = pos.block(pt("F5"));
        play_move(&mut pos, pt("E5")).unwrap();
        let b = pos.block(pt("E5"));
        assert_eq!(b, east);
        assert_eq!(pos.block(pt("D5")), b);
        assert_eq!(pos.block(pt("F5")), b);
        assert_eq!(pos.block_size(b), 3);
        assert_eq!(pos.block_nlibs(b), 8);
        assert!(pos.all_blocks_ok());
    }

    #[test]
    fn test_suicide_rejected_without_mutation() {
        let mut pos = setpos(&[], &["A2", "B1"]);
        let before = pos.clone();
        assert_eq!(play_move(&mut pos, pt("A1")), Err(IllegalMove::Suicide));
        assert!(pos.state_eq(&before));
    }

    #[test]
    fn test_occupied_rejected() {
        let mut pos = setpos(&["C3"], &[]);
        assert_eq!(play_move(&mut pos, pt("C3")), Err(IllegalMove::Occupied));
    }

    #[test]
    fn test_corner_capture_updates_captures() {
        let mut pos = setpos(&["B1"], &["A1"]);
        play_move(&mut pos, pt("A2")).unwrap();
        assert_eq!(pos.color(pt("A1")), Color::Empty);
        assert_eq!(pos.block(pt("A1")), 0);
        assert_eq!(pos.captures(Color::Black), 1);
        assert!(pos.is_block_lib(pos.block(pt("A2")), pt("A1")));
        assert!(pos.is_block_lib(pos.block(pt("B1")), pt("A1")));
    }

    #[test]
    fn test_undo_restores_capture_and_ids() {
        let mut pos = setpos(&["B1", "C2"], &["A1", "B2"]);
        let before = pos.clone();
        play_move(&mut pos, pt("A2")).unwrap();
        assert_eq!(pos.color(pt("A1")), Color::Empty);
        assert_eq!(pos.last_captured(), 0b0100);
        undo_move(&mut pos);
        assert!(pos.state_eq(&before));
        assert!(pos.all_blocks_ok());
    }

    #[test]
    fn test_undo_lone_capture_that_reused_the_captured_id() {
        let mut pos = setpos(&["B1", "C2"], &["A1", "B2"]);
        let before = pos.clone();
        let captured_id = pos.block(pt("A1"));
        play_move(&mut pos, pt("A2")).unwrap();
        // The new stone touches no friendly block and takes the freed id
        assert_eq!(pos.block(pt("A2")), captured_id);
        undo_move(&mut pos);
        assert!(pos.state_eq(&before));
        assert!(pos.all_blocks_ok());
        let b = pos.block(pt("A1"));
        assert_eq!(b, captured_id);
        assert_eq!(pos.color(pt("A1")), Color::White);
        assert_eq!(pos.block_size(b), 1);
        assert_eq!(pos.block_nlibs(b), 1);
        assert!(pos.is_block_lib(b, pt("A2")));
        assert_eq!(pos.color(pt("A2")), Color::Empty);
    }

    #[test]
    fn test_undo_restores_multi_stone_capture() {
        let mut pos = setpos(&["A2", "B3", "C2"], &["A1", "B1", "B2"]);
        let before = pos.clone();
        play_move(&mut pos, pt("C1")).unwrap();
        assert_eq!(pos.captures(Color::Black), 3);
        assert_eq!(pos.block(pt("B2")), 0);
        undo_move(&mut pos);
        assert!(pos.state_eq(&before));
        assert_eq!(pos.captures(Color::Black), 0);
        assert!(pos.all_blocks_ok());
    }

    #[test]
    fn test_undo_after_merge_restores_ids() {
        let mut pos = setpos(&["D5", "F5", "E4"], &[]);
        let before = pos.clone();
        play_move(&mut pos, pt("E5")).unwrap();
        assert_eq!(pos.block_size(pos.block(pt("E5"))), 4);
        undo_move(&mut pos);
        assert!(pos.state_eq(&before));
        assert!(pos.all_blocks_ok());
    }

    #[test]
    fn test_pass_and_undo() {
        let mut pos = setpos(&["C3"], &[]);
        let before = pos.clone();
        pass_move(&mut pos);
        assert_eq!(pos.last, PASS_MOVE);
        assert_eq!(pos.to_play, Color::White);
        undo_move(&mut pos);
        assert!(pos.state_eq(&before));
    }

    #[test]
    fn test_is_eyeish_and_eye() {
        let pos = setpos(&["E6", "D5", "F5", "E4"], &["D6"]);
        assert_eq!(is_eyeish(&pos, pt("E5")), Some(Color::Black));
        assert_eq!(is_eye(&pos, pt("E5")), Some(Color::Black));

        let pos = setpos(&["E6", "D5", "F5", "E4"], &["D6", "F4"]);
        assert_eq!(is_eyeish(&pos, pt("E5")), Some(Color::Black));
        assert_eq!(is_eye(&pos, pt("E5")), None);
    }

    #[test]
    fn test_edge_eye_tolerates_no_opponent_diagonal() {
        let pos = setpos(&["A6", "A4", "B5"], &[]);
        assert_eq!(is_eye(&pos, pt("A5")), Some(Color::Black));
        let pos = setpos(&["A6", "A4", "B5"], &["B6"]);
        assert_eq!(is_eye(&pos, pt("A5")), None);
    }

    #[test]
    fn test_parse_coord_roundtrip() {
        assert_eq!(parse_coord("pass"), Some(PASS_MOVE));
        assert_eq!(str_coord(pt("A1")), "A1");
        assert_eq!(str_coord(pt("J1")), "J1");
        assert_eq!(str_coord(pt("c3")), "C3");
        assert_eq!(parse_coord("I5"), None);
        assert_eq!(parse_coord("Z1"), None);
        assert_eq!(parse_coord("A0"), None);
        assert_eq!(parse_coord(&format!("A{}", N + 1)), None);
        assert_eq!(str_coord(RESIGN_MOVE), "resign");
    }

    #[test]
    fn test_display_marks_last_move() {
        let mut pos = Position::new();
        play_move(&mut pos, pt("C3")).unwrap();
        let board = pos.to_string();
        assert!(board.contains("(X)"));
        assert!(board.contains(" A "));
    }
}
