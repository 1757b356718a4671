//! # Reversi (Othello) Game Implementation
//!
//! Players take turns placing discs on an N×N board. A placement must
//! "sandwich" at least one contiguous run of opponent discs between the new
//! disc and an existing disc of the mover's color; every sandwiched run is
//! flipped.
//!
//! ## Rules
//! - Action `N*N` is the pass action. It is the only legal action when the
//!   player to move has no flipping placement, and it only hands the turn over
//! - Game ends when neither player has anything but the pass action
//! - Winner is determined by who has more discs on the board, equal counts draw

use std::fmt;

use crate::error::BoardError;
use crate::{Action, Board, GameStatus, Player, StateTensor};

/// The 8 search directions as (row, col) steps
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1), (0, -1),
    (0, 1), (1, -1), (1, 0), (1, 1),
];

/// Represents the complete state of a Reversi game
///
/// Cell index of `(row, col)` is `row * width + col`.
#[derive(Debug, Clone)]
pub struct ReversiState {
    /// Occupant of each cell, `None` when empty
    cells: Vec<Option<Player>>,
    /// Size of the board (NxN)
    width: usize,
    /// Player to move
    current_player: Player,
    /// Last action made, if any
    last_move: Option<Action>,
}

impl ReversiState {
    /// Creates a new game with the standard four-disc opening and Player One to move
    ///
    /// # Arguments
    /// * `width` - Size of the board (NxN), even and at least 4, typically 8
    pub fn new(width: usize) -> Result<Self, BoardError> {
        if width < 4 || width % 2 != 0 {
            return Err(BoardError::InvalidReversiSize(width));
        }
        let mut state = ReversiState {
            cells: vec![None; width * width],
            width,
            current_player: Player::One,
            last_move: None,
        };
        state.init_board(Player::One);
        Ok(state)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The pass action index
    pub fn pass_move(&self) -> Action {
        self.width * self.width
    }

    pub fn last_move(&self) -> Option<Action> {
        self.last_move
    }

    pub fn location_to_move(&self, row: usize, col: usize) -> Action {
        row * self.width + col
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Player> {
        self.cells[self.location_to_move(row, col)]
    }

    /// Number of discs owned by `player`
    pub fn disc_count(&self, player: Player) -> usize {
        self.cells.iter().filter(|&&c| c == Some(player)).count()
    }

    /// Opponent discs that `player` would flip by placing at `(row, col)`
    ///
    /// Each direction contributes its run only when the run of opponent discs
    /// is closed by one of `player`'s own discs before an empty cell or the edge.
    fn flips(&self, player: Player, row: usize, col: usize) -> Vec<usize> {
        let n = self.width as i32;
        let mut flipped = Vec::new();
        for (dr, dc) in DIRECTIONS.iter() {
            let mut line = Vec::new();
            let mut r = row as i32 + dr;
            let mut c = col as i32 + dc;
            while r >= 0 && r < n && c >= 0 && c < n {
                let idx = (r * n + c) as usize;
                match self.cells[idx] {
                    Some(p) if p == player => {
                        flipped.extend_from_slice(&line);
                        break;
                    }
                    Some(_) => line.push(idx),
                    None => break,
                }
                r += dr;
                c += dc;
            }
        }
        flipped
    }

    /// Legal placements for `player`, or just the pass action when there are none
    fn moves_for(&self, player: Player) -> Vec<Action> {
        let mut moves: Vec<Action> = (0..self.cells.len())
            .filter(|&idx| {
                self.cells[idx].is_none()
                    && !self.flips(player, idx / self.width, idx % self.width).is_empty()
            })
            .collect();
        if moves.is_empty() {
            moves.push(self.pass_move());
        }
        moves
    }

    /// Checks if an action is legal in the current game state
    pub fn is_legal(&self, action: Action) -> bool {
        self.moves_for(self.current_player).contains(&action)
    }
}

impl Board for ReversiState {
    fn init_board(&mut self, start_player: Player) {
        let opponent = start_player.opponent();
        let m = self.width / 2;
        self.cells.iter_mut().for_each(|c| *c = None);
        let diagonal = [(m - 1, m - 1), (m, m)];
        let anti_diagonal = [(m - 1, m), (m, m - 1)];
        for (r, c) in diagonal {
            self.cells[r * self.width + c] = Some(start_player);
        }
        for (r, c) in anti_diagonal {
            self.cells[r * self.width + c] = Some(opponent);
        }
        self.current_player = start_player;
        self.last_move = None;
    }

    fn current_state(&self) -> StateTensor {
        let w = self.width;
        let mut tensor = StateTensor::zeros(3, w, w);
        let mut discs = 0;
        for (idx, owner) in self.cells.iter().enumerate() {
            if let Some(owner) = owner {
                let channel = if *owner == self.current_player { 0 } else { 1 };
                tensor.set(channel, w - 1 - idx / w, idx % w, 1.0);
                discs += 1;
            }
        }
        if discs % 2 == 0 {
            tensor.fill_channel(2, 1.0);
        }
        tensor
    }

    fn do_move(&mut self, action: Action) {
        debug_assert!(self.is_legal(action), "illegal Reversi action {action}");
        if action != self.pass_move() {
            let player = self.current_player;
            let flipped = self.flips(player, action / self.width, action % self.width);
            self.cells[action] = Some(player);
            for idx in flipped {
                self.cells[idx] = Some(player);
            }
        }
        self.current_player = self.current_player.opponent();
        self.last_move = Some(action);
    }

    fn game_end(&self) -> GameStatus {
        let pass = [self.pass_move()];
        let stuck = Player::ALL.iter().all(|&p| self.moves_for(p) == pass);
        if !stuck {
            return GameStatus::InProgress;
        }
        let one = self.disc_count(Player::One);
        let two = self.disc_count(Player::Two);
        match one.cmp(&two) {
            std::cmp::Ordering::Greater => GameStatus::Win(Player::One),
            std::cmp::Ordering::Less => GameStatus::Win(Player::Two),
            std::cmp::Ordering::Equal => GameStatus::Draw,
        }
    }

    fn current_player(&self) -> Player {
        self.current_player
    }

    fn action_count(&self) -> usize {
        self.width * self.width + 1
    }

    fn available_moves(&self) -> Vec<Action> {
        self.moves_for(self.current_player)
    }
}

impl fmt::Display for ReversiState {
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
