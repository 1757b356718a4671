//! # Game Implementations Module
//!
//! Each game implements the [`Board`](crate::Board) trait so the search can
//! play it without knowing which rule set it is running.
//!
//! ## Supported Games
//! - **Connect 4**: gravity-based 4-in-a-row on a 7x6 grid, plus retract moves
//! - **Gobang (Five in a Row)**: N-in-a-row on an NxN grid
//! - **Reversi (Othello)**: disc flipping on an NxN board with an explicit pass action
//!
//! ## Board Encoding
//! All variants index cells as `row * width + col` with row 0 at the bottom,
//! and encode positions for the policy/value function from the perspective
//! of the player to move.

pub mod connect4;
pub mod gobang;
pub mod reversi;
