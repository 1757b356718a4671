//! # Gobang (Five in a Row)
//!
//! Players alternate placing stones on an N×N grid; the first to connect
//! `n_in_row` stones horizontally, vertically or diagonally wins. A full board
//! without a line is a draw.

use std::fmt;

use mcts_shared::scan_lines;

use crate::error::BoardError;
use crate::{Action, Board, GameStatus, Player, StateTensor};

#[derive(Debug, Clone)]
pub struct GobangState {
    cells: Vec<Option<Player>>,
    width: usize,
    n_in_row: usize,
    current_player: Player,
    /// Empty cells in ascending order, maintained on every move
    availables: Vec<Action>,
    last_move: Option<Action>,
    stones: usize,
}

impl GobangState {
    pub fn new(width: usize, n_in_row: usize) -> Result<Self, BoardError> {
        if n_in_row == 0 || width < n_in_row {
            return Err(BoardError::BoardTooSmall {
                width,
                height: width,
                n_in_row,
            });
        }
        let mut state = GobangState {
            cells: vec![None; width * width],
            width,
            n_in_row,
            current_player: Player::One,
            availables: Vec::with_capacity(width * width),
            last_move: None,
            stones: 0,
        };
        state.init_board(Player::One);
        Ok(state)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn n_in_row(&self) -> usize {
        self.n_in_row
    }

    pub fn last_move(&self) -> Option<Action> {
        self.last_move
    }

    /// Cell index of `(row, col)`.
    pub fn location_to_move(&self, row: usize, col: usize) -> Action {
        row * self.width + col
    }

    /// `(row, col)` of a cell index.
    pub fn move_to_location(&self, action: Action) -> (usize, usize) {
        (action / self.width, action % self.width)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Player> {
        self.cells[self.location_to_move(row, col)]
    }
}

impl Board for GobangState {
    fn init_board(&mut self, start_player: Player) {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.availables.clear();
        self.availables.extend(0..self.width * self.width);
        self.current_player = start_player;
        self.last_move = None;
        self.stones = 0;
    }

    fn current_state(&self) -> StateTensor {
        let w = self.width;
        let mut tensor = StateTensor::zeros(4, w, w);
        for (idx, owner) in self.cells.iter().enumerate() {
            if let Some(owner) = owner {
                let channel = if *owner == self.current_player { 0 } else { 1 };
                let (row, col) = self.move_to_location(idx);
                tensor.set(channel, w - 1 - row, col, 1.0);
            }
        }
        if let Some(last) = self.last_move {
            let (row, col) = self.move_to_location(last);
            tensor.set(2, w - 1 - row, col, 1.0);
        }
        if self.stones % 2 == 0 {
            tensor.fill_channel(3, 1.0);
        }
        tensor
    }

    fn do_move(&mut self, action: Action) {
        debug_assert!(
            action < self.cells.len() && self.cells[action].is_none(),
            "illegal Gobang action {action}"
        );
        self.cells[action] = Some(self.current_player);
        if let Some(pos) = self.availables.iter().position(|&a| a == action) {
            self.availables.remove(pos);
        }
        self.stones += 1;
        self.current_player = self.current_player.opponent();
        self.last_move = Some(action);
    }

    fn game_end(&self) -> GameStatus {
        let ids: Vec<i32> = self.cells.iter().map(|c| c.map_or(0, Player::id)).collect();
        let scan = scan_lines(&ids, self.width, self.width, self.n_in_row);
        if let Some(winner) = scan.winner.and_then(Player::from_id) {
            return GameStatus::Win(winner);
        }
        if self.availables.is_empty() {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }

    fn current_player(&self) -> Player {
        self.current_player
    }

    fn action_count(&self) -> usize {
        self.width * self.width
    }

    fn available_moves(&self) -> Vec<Action> {
        self.availables.clone()
    }
}

impl fmt::Display for GobangState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in (0..self.width).rev() {
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
