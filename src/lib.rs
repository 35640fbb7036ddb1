//! Michi: a minimalistic Go MCTS engine.
//!
//! This crate provides a Monte Carlo Tree Search (MCTS) based Go engine
//! with RAVE, heuristic playouts and incremental block and liberty
//! bookkeeping.
//!
//! ## Modules
//!
//! - [`constants`] - Board dimensions and default parameters
//! - [`position`] - Board state and rules (moves, captures, ko, undo)
//! - [`tactics`] - Atari and ladder reading, distance helpers
//! - [`patterns`] - 3x3 pattern matching and the pattern source trait
//! - [`playout`] - Heuristic game simulation for position evaluation
//! - [`mcts`] - Monte Carlo Tree Search with RAVE
//! - [`status`] - Life and death status and score estimation
//! - [`engine`] - Game façade with history, undo and move generation
//! - [`gtp`] - Go Text Protocol front end
//! - [`config`], [`context`], [`rng`], [`mark`] - Search parameters and state
//!
//! ## Example
//!
//! ```
//! use michi_engine::config::Params;
//! use michi_engine::context::SearchContext;
//! use michi_engine::mcts::{TreeNode, tree_search};
//! use michi_engine::position::{Position, parse_coord, play_move, str_coord};
//!
//! // Create a new game
//! let mut pos = Position::new();
//!
//! // Play a move
//! play_move(&mut pos, parse_coord("D4").unwrap()).unwrap();
//!
//! // Run MCTS to find the best response
//! let mut ctx = SearchContext::new(Params::default());
//! let mut root = TreeNode::root(ctx.params.prior_even);
//! let best = tree_search(&mut ctx, &pos, &mut root, 100, None);
//! println!("Best move: {}", str_coord(best));
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod engine;
pub mod gtp;
pub mod mark;
pub mod mcts;
pub mod patterns;
pub mod playout;
pub mod position;
pub mod rng;
pub mod status;
pub mod tactics;
