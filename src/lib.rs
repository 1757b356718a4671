//! # AlphaZero-style Monte Carlo Tree Search
//!
//! A policy-guided MCTS engine for two-player, perfect-information board games.
//! The search consults an externally supplied policy/value function (see
//! [`policy::PolicyValueFn`]) instead of random rollouts, and plays any game
//! that implements the [`Board`] trait.
//!
//! ## Layout
//! - [`node`]: arena-backed search tree with PUCT selection
//! - [`mcts`]: playouts, move probabilities and tree reuse
//! - [`player`]: turns move probabilities into one concrete action
//! - [`games`]: Connect 4 (with retract moves), Gobang and Reversi
//! - [`game_controller`]: game loop and self-play data collection
//! - [`arena`]: parallel head-to-head evaluation

use std::fmt;

pub mod arena;
pub mod config;
pub mod error;
pub mod game_controller;
pub mod game_wrapper;
pub mod games;
pub mod mcts;
pub mod node;
pub mod player;
pub mod policy;

pub use config::SearchConfig;
pub use error::{ArenaError, BoardError, GameError, PolicyError, SearchError};
pub use mcts::{Mcts, RESET_MOVE};
pub use player::{Agent, MctsPlayer};
pub use policy::{ActionProb, PolicyValue, PolicyValueFn};

/// A linear action index in `[0, Board::action_count())`.
pub type Action = usize;

/// One of the two players. Wire ids are 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Both players in seat order.
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    /// Player for a seat index (0 or 1).
    pub fn from_index(index: usize) -> Option<Player> {
        Self::ALL.get(index).copied()
    }

    /// The numeric id used on the wire and in line scans.
    pub fn id(self) -> i32 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub(crate) fn from_id(id: i32) -> Option<Player> {
        match id {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.id())
    }
}

/// Current game status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Game is still in progress
    InProgress,
    /// Game ended with a winner
    Win(Player),
    /// Game ended in a draw
    Draw,
}

impl GameStatus {
    /// Check if the game is over
    pub fn is_game_over(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    pub fn winner(&self) -> Option<Player> {
        match self {
            GameStatus::Win(p) => Some(*p),
            _ => None,
        }
    }

    /// Winner id, or -1 for a draw or an unfinished game.
    pub fn winner_id(&self) -> i32 {
        self.winner().map_or(-1, Player::id)
    }
}

/// Dense `[1, channels, height, width]` tensor handed to the policy/value function.
///
/// Row 0 is the top row of the board as displayed. The layout is the input
/// format of the externally trained model and must stay stable.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTensor {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl StateTensor {
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
            data: vec![0.0; channels * height * width],
        }
    }

    /// Shape including the leading batch dimension of 1.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.channels, self.height, self.width]
    }

    pub fn get(&self, channel: usize, row: usize, col: usize) -> f32 {
        self.data[self.offset(channel, row, col)]
    }

    pub fn set(&mut self, channel: usize, row: usize, col: usize, value: f32) {
        let idx = self.offset(channel, row, col);
        self.data[idx] = value;
    }

    /// Sets every cell of one channel.
    pub fn fill_channel(&mut self, channel: usize, value: f32) {
        let plane = self.height * self.width;
        self.data[channel * plane..(channel + 1) * plane].fill(value);
    }

    /// Row-major data in `shape()` order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn offset(&self, channel: usize, row: usize, col: usize) -> usize {
        (channel * self.height + row) * self.width + col
    }
}

/// The capability set every game exposes to the search.
///
/// `Clone` is the deep copy: implementations own all of their storage so a
/// clone never shares mutable state with its source. `Send` and `Sync` are
/// required for parallel leaf evaluation.
pub trait Board: Clone + Send + Sync {
    /// Resets to the opening position with `start_player` to move.
    fn init_board(&mut self, start_player: Player);

    /// Encodes the position from the perspective of the player to move.
    ///
    /// Channel 0 holds the mover's stones, channel 1 the opponent's; further
    /// channels are variant specific.
    fn current_state(&self) -> StateTensor;

    /// Plays `action` for the player to move.
    ///
    /// `action` must be one of [`Board::available_moves`]; anything else is a
    /// precondition violation.
    fn do_move(&mut self, action: Action);

    fn game_end(&self) -> GameStatus;

    fn current_player(&self) -> Player;

    /// Size of the action space. Every action lies in `[0, action_count())`.
    fn action_count(&self) -> usize;

    /// Legal actions for the player to move.
    fn available_moves(&self) -> Vec<Action>;

    /// Independent copy for a playout.
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}
