//! # Game Wrapper Module
//!
//! Runtime selection over the supported games. [`GameWrapper`] implements
//! [`Board`] by delegating to the wrapped state, so the search, the players
//! and the game loop can be driven by a game chosen on the command line
//! without trait objects.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   MCTS Engine   │◄──►│   GameWrapper    │◄──►│ Connect4State   │
//! │   GameController│    │   (Board impl)   │    │ GobangState     │
//! │   Arena         │    │                  │    │ ReversiState    │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```

use std::fmt;

use crate::error::BoardError;
use crate::games::connect4::Connect4State;
use crate::games::gobang::GobangState;
use crate::games::reversi::ReversiState;
use crate::{Action, Board, GameStatus, Player, StateTensor};

/// Which game to build, together with [`GameWrapper::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    Connect4,
    Gobang,
    Reversi,
}

impl GameKind {
    /// Board size used when none is given.
    pub fn default_size(self) -> usize {
        match self {
            GameKind::Connect4 => 7,
            GameKind::Gobang => 10,
            GameKind::Reversi => 8,
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameKind::Connect4 => "Connect 4",
            GameKind::Gobang => "Gobang",
            GameKind::Reversi => "Reversi",
        };
        f.write_str(name)
    }
}

/// Wrapper enum for all supported game types
#[derive(Debug, Clone)]
pub enum GameWrapper {
    /// Connect 4 with retract moves
    Connect4(Connect4State),
    /// Five in a row
    Gobang(GobangState),
    /// Reversi / Othello
    Reversi(ReversiState),
}

impl GameWrapper {
    /// Builds a fresh game of `kind` on a board of `size`.
    ///
    /// Connect 4 uses `size` columns and `size - 1` rows, Gobang a
    /// `size × size` board with five in a row and Reversi a `size × size` board.
    pub fn build(kind: GameKind, size: usize) -> Result<Self, BoardError> {
        match kind {
            GameKind::Connect4 => {
                let height = size.saturating_sub(1);
                Connect4State::with_line_size(size, height, 4).map(GameWrapper::Connect4)
            }
            GameKind::Gobang => GobangState::new(size, 5).map(GameWrapper::Gobang),
            GameKind::Reversi => ReversiState::new(size).map(GameWrapper::Reversi),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            GameWrapper::Connect4(_) => GameKind::Connect4,
            GameWrapper::Gobang(_) => GameKind::Gobang,
            GameWrapper::Reversi(_) => GameKind::Reversi,
        }
    }

    pub fn last_move(&self) -> Option<Action> {
        match self {
            GameWrapper::Connect4(g) => g.last_move(),
            GameWrapper::Gobang(g) => g.last_move(),
            GameWrapper::Reversi(g) => g.last_move(),
        }
    }

    /// Columns of the rendered board
    pub fn width(&self) -> usize {
        match self {
            GameWrapper::Connect4(g) => g.width(),
            GameWrapper::Gobang(g) => g.width(),
            GameWrapper::Reversi(g) => g.width(),
        }
    }

    /// Rows of the rendered board
    pub fn height(&self) -> usize {
        match self {
            GameWrapper::Connect4(g) => g.height(),
            GameWrapper::Gobang(g) => g.width(),
            GameWrapper::Reversi(g) => g.width(),
        }
    }
}

impl Board for GameWrapper {
    fn init_board(&mut self, start_player: Player) {
        match self {
            GameWrapper::Connect4(g) => g.init_board(start_player),
            GameWrapper::Gobang(g) => g.init_board(start_player),
            GameWrapper::Reversi(g) => g.init_board(start_player),
        }
    }

    fn current_state(&self) -> StateTensor {
        match self {
            GameWrapper::Connect4(g) => g.current_state(),
            GameWrapper::Gobang(g) => g.current_state(),
            GameWrapper::Reversi(g) => g.current_state(),
        }
    }

    fn do_move(&mut self, action: Action) {
        match self {
            GameWrapper::Connect4(g) => g.do_move(action),
            GameWrapper::Gobang(g) => g.do_move(action),
            GameWrapper::Reversi(g) => g.do_move(action),
        }
    }

    fn game_end(&self) -> GameStatus {
        match self {
            GameWrapper::Connect4(g) => g.game_end(),
            GameWrapper::Gobang(g) => g.game_end(),
            GameWrapper::Reversi(g) => g.game_end(),
        }
    }

    fn current_player(&self) -> Player {
        match self {
            GameWrapper::Connect4(g) => g.current_player(),
            GameWrapper::Gobang(g) => g.current_player(),
            GameWrapper::Reversi(g) => g.current_player(),
        }
    }

    fn action_count(&self) -> usize {
        match self {
            GameWrapper::Connect4(g) => g.action_count(),
            GameWrapper::Gobang(g) => g.action_count(),
            GameWrapper::Reversi(g) => g.action_count(),
        }
    }

    fn available_moves(&self) -> Vec<Action> {
        match self {
            GameWrapper::Connect4(g) => g.available_moves(),
            GameWrapper::Gobang(g) => g.available_moves(),
            GameWrapper::Reversi(g) => g.available_moves(),
        }
    }
}

impl fmt::Display for GameWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameWrapper::Connect4(g) => fmt::Display::fmt(g, f),
            GameWrapper::Gobang(g) => fmt::Display::fmt(g, f),
            GameWrapper::Reversi(g) => fmt::Display::fmt(g, f),
        }
    }
}
