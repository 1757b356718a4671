//! # Connect 4 Game Implementation
//!
//! Connect 4 with an extra "retract" move. Players take turns dropping
//! pieces into columns, trying to get 4 pieces in a row (horizontally,
//! vertically, or diagonally).
//!
//! ## Rules
//! - Actions `0..width` drop a piece into column `c`; it lands on the lowest empty cell
//! - Actions `width..2*width` retract the bottom piece of column `c - width`; every
//!   piece above it slides down one row. Only legal when the player to move owns
//!   that bottom piece
//! - First player to get 4 pieces in a row wins
//! - Two different winners on the same board count as a draw
//! - Game is a draw when nobody has a line and no action is left

use std::fmt;

use mcts_shared::scan_lines;

use crate::error::BoardError;
use crate::{Action, Board, GameStatus, Player, StateTensor};

/// Represents the complete state of a Connect 4 game
///
/// Cells are stored row-major with row 0 at the bottom, so the cell index of
/// `(row, col)` is `row * width + col`.
#[derive(Debug, Clone)]
pub struct Connect4State {
    /// Occupant of each cell, `None` when empty
    cells: Vec<Option<Player>>,
    /// Board width (number of columns)
    width: usize,
    /// Board height (number of rows)
    height: usize,
    /// Number of pieces needed in a row to win
    n_in_row: usize,
    /// Player to move
    current_player: Player,
    /// Last action played, if any
    last_move: Option<Action>,
    /// Pieces currently on the board
    stones: usize,
}

impl Connect4State {
    /// Creates a new game with 4 in a row to win and Player One to move
    pub fn new(width: usize, height: usize) -> Result<Self, BoardError> {
        Self::with_line_size(width, height, 4)
    }

    /// Creates a game with a custom line length
    pub fn with_line_size(width: usize, height: usize, n_in_row: usize) -> Result<Self, BoardError> {
        if width == 0 || height == 0 || n_in_row == 0 || (width < n_in_row && height < n_in_row) {
            return Err(BoardError::BoardTooSmall {
                width,
                height,
                n_in_row,
            });
        }
        let mut state = Self {
            cells: vec![None; width * height],
            width,
            height,
            n_in_row,
            current_player: Player::One,
            last_move: None,
            stones: 0,
        };
        state.init_board(Player::One);
        Ok(state)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn last_move(&self) -> Option<Action> {
        self.last_move
    }

    /// Occupant of `(row, col)`, row 0 being the bottom row
    pub fn cell(&self, row: usize, col: usize) -> Option<Player> {
        self.cells[row * self.width + col]
    }

    /// Checks if an action is legal in the current game state
    pub fn is_legal(&self, action: Action) -> bool {
        if action < self.width {
            self.cells[action + self.width * (self.height - 1)].is_none()
        } else if action < 2 * self.width {
            self.cells[action - self.width] == Some(self.current_player)
        } else {
            false
        }
    }

    fn drop_piece(&mut self, col: usize) {
        let mut loc = col;
        while self.cells[loc].is_some() {
            loc += self.width;
        }
        self.cells[loc] = Some(self.current_player);
        self.stones += 1;
    }

    fn retract_piece(&mut self, col: usize) {
        let size = self.cells.len();
        for loc in (col..size).step_by(self.width) {
            if self.cells[loc].is_none() {
                break;
            }
            let above = loc + self.width;
            if above >= size || self.cells[above].is_none() {
                self.cells[loc] = None;
                self.stones -= 1;
            } else {
                self.cells[loc] = self.cells[above];
            }
        }
    }
}

impl Board for Connect4State {
    fn init_board(&mut self, start_player: Player) {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.current_player = start_player;
        self.last_move = None;
        self.stones = 0;
    }

    fn current_state(&self) -> StateTensor {
        let mut tensor = StateTensor::zeros(3, self.height, self.width);
        for (idx, owner) in self.cells.iter().enumerate() {
            if let Some(owner) = owner {
                let channel = if *owner == self.current_player { 0 } else { 1 };
                tensor.set(channel, self.height - 1 - idx / self.width, idx % self.width, 1.0);
            }
        }
        if self.stones % 2 == 0 {
            tensor.fill_channel(2, 1.0);
        }
        tensor
    }

    fn do_move(&mut self, action: Action) {
        debug_assert!(self.is_legal(action), "illegal Connect 4 action {action}");
        if action < self.width {
            self.drop_piece(action);
        } else {
            self.retract_piece(action - self.width);
        }
        self.current_player = self.current_player.opponent();
        self.last_move = Some(action);
    }

    fn game_end(&self) -> GameStatus {
        let ids: Vec<i32> = self.cells.iter().map(|c| c.map_or(0, Player::id)).collect();
        let scan = scan_lines(&ids, self.width, self.height, self.n_in_row);
        if scan.contradictory {
            return GameStatus::Draw;
        }
        if let Some(winner) = scan.winner.and_then(Player::from_id) {
            return GameStatus::Win(winner);
        }
        if self.available_moves().is_empty() {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }

    fn current_player(&self) -> Player {
        self.current_player
    }

    fn action_count(&self) -> usize {
        self.width * 2
    }

    fn available_moves(&self) -> Vec<Action> {
        (0..self.action_count()).filter(|&a| self.is_legal(a)).collect()
    }
}

impl fmt::Display for Connect4State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in (0..self.height).rev() {
            for c in 0..self.width {
                let symbol = match self.cell(r, c) {
                    Some(Player::One) => "X",
                    Some(Player::Two) => "O",
                    None => ".",
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
