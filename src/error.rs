//! Error types for boards, the policy/value collaborator, search and game loops.

use thiserror::Error;

use crate::Action;

/// Errors raised while constructing a board.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("board {width}x{height} cannot hold a line of {n_in_row}")]
    BoardTooSmall {
        width: usize,
        height: usize,
        n_in_row: usize,
    },

    #[error("board size must be even and at least 4, got {0}")]
    InvalidReversiSize(usize),
}

/// Failures of the policy/value collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("malformed policy output: {0}")]
    Malformed(String),
}

/// Errors that can occur during MCTS search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("No legal moves available")]
    NoLegalMoves,

    #[error("search finished without expanding the root")]
    RootNotExpanded,

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
}

/// Errors that end a game loop early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("illegal move {action} for the player to move")]
    IllegalMove { action: Action },

    #[error("game is already over")]
    GameAlreadyOver,

    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// Errors from a batch of arena games.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArenaError {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),

    #[error("game {index} failed: {source}")]
    Game {
        index: usize,
        #[source]
        source: GameError,
    },
}
