//! # Game Controller Module
//!
//! The [`GameController`] owns the authoritative board. Agents only ever see
//! it by reference; every action they return is validated against the legal
//! moves before it is applied, so a misbehaving agent ends the game with
//! [`GameError::IllegalMove`] instead of corrupting the position.
//!
//! Two loops are provided:
//! - [`GameController::start_play`]: two agents play one game
//! - [`GameController::start_self_play`]: one MCTS player plays both sides and
//!   the game is turned into training samples

use tracing::{debug, info};

use crate::error::GameError;
use crate::player::{Agent, MctsPlayer};
use crate::policy::PolicyValueFn;
use crate::{Action, Board, GameStatus, Player, StateTensor};

/// Temperature used by [`GameController::start_play`] unless overridden.
pub const DEFAULT_PLAY_TEMPERATURE: f32 = 1e-3;

/// A single entry in the move history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    /// Player who made the move
    pub player: Player,
    /// The move that was made
    pub action: Action,
    /// Move number (1-indexed)
    pub move_number: usize,
}

/// One position of a self-play game labelled with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    /// Board tensor from the perspective of the player to move
    pub state: StateTensor,
    /// Search distribution over the whole action space
    pub mcts_probs: Vec<f32>,
    /// +1 if the player to move went on to win, -1 if they lost, 0 on a draw
    pub z: f32,
}

/// The game controller that owns the authoritative game state
#[derive(Debug, Clone)]
pub struct GameController<B> {
    board: B,
    move_history: Vec<MoveRecord>,
    status: GameStatus,
    temperature: f32,
    max_moves: Option<usize>,
}

impl<B: Board> GameController<B> {
    pub fn new(board: B) -> Self {
        let status = board.game_end();
        Self {
            board,
            move_history: Vec::new(),
            status,
            temperature: DEFAULT_PLAY_TEMPERATURE,
            max_moves: None,
        }
    }

    /// Temperature handed to the agents by [`GameController::start_play`].
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ends a game as a draw once `max_moves` moves have been played.
    /// `None` (the default) plays until the board reports a result.
    pub fn with_max_moves(mut self, max_moves: Option<usize>) -> Self {
        self.max_moves = max_moves;
        self
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn move_history(&self) -> &[MoveRecord] {
        &self.move_history
    }

    pub fn move_count(&self) -> usize {
        self.move_history.len()
    }

    /// Resets the board to its opening with `start_player` to move.
    pub fn reset(&mut self, start_player: Player) {
        self.board.init_board(start_player);
        self.move_history.clear();
        self.status = self.board.game_end();
    }

    /// Returns Ok(()) if `action` can be played now.
    pub fn validate_move(&self, action: Action) -> Result<(), GameError> {
        if self.status.is_game_over() {
            return Err(GameError::GameAlreadyOver);
        }
        if !self.board.available_moves().contains(&action) {
            return Err(GameError::IllegalMove { action });
        }
        Ok(())
    }

    /// Validates and applies `action`, returning the resulting status.
    pub fn try_make_move(&mut self, action: Action) -> Result<GameStatus, GameError> {
        self.validate_move(action)?;
        let player = self.board.current_player();
        self.board.do_move(action);
        self.move_history.push(MoveRecord {
            player,
            action,
            move_number: self.move_history.len() + 1,
        });
        self.status = self.board.game_end();
        if let Some(cap) = self.max_moves {
            if !self.status.is_game_over() && self.move_history.len() >= cap {
                debug!(moves = cap, "move cap reached, scoring as a draw");
                self.status = GameStatus::Draw;
            }
        }
        Ok(self.status)
    }

    /// Plays one game between `player1` (seat One) and `player2` (seat Two).
    pub fn start_play<A1, A2>(
        &mut self,
        player1: &mut A1,
        player2: &mut A2,
        start_player: Player,
    ) -> Result<GameStatus, GameError>
    where
        A1: Agent<B>,
        A2: Agent<B>,
    {
        self.start_play_with(player1, player2, start_player, |_, _| {})
    }

    /// [`GameController::start_play`], calling `on_move` after every move with
    /// the new position and the record of the move.
    pub fn start_play_with<A1, A2, F>(
        &mut self,
        player1: &mut A1,
        player2: &mut A2,
        start_player: Player,
        mut on_move: F,
    ) -> Result<GameStatus, GameError>
    where
        A1: Agent<B>,
        A2: Agent<B>,
        F: FnMut(&B, &MoveRecord),
    {
        self.reset(start_player);
        player1.set_player_ind(Player::One);
        player2.set_player_ind(Player::Two);

        while !self.status.is_game_over() {
            let action = match self.board.current_player() {
                Player::One => player1.get_action(&self.board, self.temperature)?,
                Player::Two => player2.get_action(&self.board, self.temperature)?,
            };
            self.try_make_move(action)?;
            if let Some(record) = self.move_history.last() {
                on_move(&self.board, record);
            }
        }

        info!(
            winner = self.status.winner_id(),
            moves = self.move_count(),
            "game over"
        );
        Ok(self.status)
    }

    /// One MCTS player plays both sides from the default opening.
    ///
    /// Every position is stored with the search distribution that was sampled
    /// from; once the game ends each sample is labelled from the perspective
    /// of the player who was to move there. The player is reset afterwards.
    pub fn start_self_play<P>(
        &mut self,
        player: &mut MctsPlayer<P>,
        temperature: f32,
    ) -> Result<(GameStatus, Vec<TrainingSample>), GameError>
    where
        P: PolicyValueFn<B> + Sync,
    {
        self.reset(Player::One);
        let mut states = Vec::new();
        let mut mcts_probs = Vec::new();
        let mut movers = Vec::new();

        while !self.status.is_game_over() {
            let (action, probs) = player.get_action_with_probs(&self.board, temperature)?;
            states.push(self.board.current_state());
            mcts_probs.push(probs);
            movers.push(self.board.current_player());
            self.try_make_move(action)?;
        }
        Agent::<B>::reset_player(player);

        let winner = self.status.winner();
        let samples: Vec<TrainingSample> = states
            .into_iter()
            .zip(mcts_probs)
            .zip(movers)
            .map(|((state, mcts_probs), mover)| TrainingSample {
                state,
                mcts_probs,
                z: match winner {
                    Some(w) if w == mover => 1.0,
                    Some(_) => -1.0,
                    None => 0.0,
                },
            })
            .collect();

        debug!(samples = samples.len(), "self-play samples collected");
        info!(
            winner = self.status.winner_id(),
            moves = self.move_count(),
            "self-play game over"
        );
        Ok((self.status, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::error::SearchError;
    use crate::games::connect4::Connect4State;
    use crate::games::gobang::GobangState;
    use crate::policy::UniformPolicy;

    /// Plays a fixed list of actions.
    struct Scripted {
        moves: Vec<Action>,
        next: usize,
        seat: Option<Player>,
    }

    impl Scripted {
        fn new(moves: &[Action]) -> Self {
            Self {
                moves: moves.to_vec(),
                next: 0,
                seat: None,
            }
        }
    }

    impl<B: Board> Agent<B> for Scripted {
        fn set_player_ind(&mut self, player: Player) {
            self.seat = Some(player);
        }

        fn reset_player(&mut self) {
            self.next = 0;
        }

        fn get_action(&mut self, _board: &B, _temperature: f32) -> Result<Action, SearchError> {
            let action = self.moves.get(self.next).copied().ok_or(SearchError::NoLegalMoves)?;
            self.next += 1;
            Ok(action)
        }
    }

    #[test]
    fn test_start_play_reaches_a_win() {
        let mut controller = GameController::new(Connect4State::new(7, 6).unwrap());
        let mut one = Scripted::new(&[0, 0, 0, 0]);
        let mut two = Scripted::new(&[1, 1, 1]);
        let status = controller.start_play(&mut one, &mut two, Player::One).unwrap();

        assert_eq!(status, GameStatus::Win(Player::One));
        assert_eq!(controller.move_count(), 7);
        assert_eq!(one.seat, Some(Player::One));
        assert_eq!(two.seat, Some(Player::Two));
        let last = controller.move_history().last().unwrap();
        assert_eq!(last.player, Player::One);
        assert_eq!(last.move_number, 7);
    }

    #[test]
    fn test_start_player_moves_first() {
        let mut controller = GameController::new(Connect4State::new(7, 6).unwrap());
        let mut one = Scripted::new(&[1, 1, 1]);
        let mut two = Scripted::new(&[0, 0, 0, 0]);
        let mut seen = Vec::new();
        let status = controller
            .start_play_with(&mut one, &mut two, Player::Two, |_, record| {
                seen.push(record.player);
            })
            .unwrap();

        assert_eq!(status, GameStatus::Win(Player::Two));
        assert_eq!(seen.first(), Some(&Player::Two));
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_illegal_move_aborts_game() {
        let mut controller = GameController::new(Connect4State::new(7, 6).unwrap());
        let mut one = Scripted::new(&[3]);
        let mut two = Scripted::new(&[10]);
        let err = controller
            .start_play(&mut one, &mut two, Player::One)
            .unwrap_err();
        assert_eq!(err, GameError::IllegalMove { action: 10 });
        assert_eq!(controller.move_count(), 1);
    }

    #[test]
    fn test_agent_failure_propagates() {
        let mut controller = GameController::new(Connect4State::new(7, 6).unwrap());
        let mut one = Scripted::new(&[]);
        let mut two = Scripted::new(&[]);
        let err = controller
            .start_play(&mut one, &mut two, Player::One)
            .unwrap_err();
        assert_eq!(err, GameError::Search(SearchError::NoLegalMoves));
    }

    #[test]
    fn test_no_moves_after_game_over() {
        let mut controller = GameController::new(Connect4State::new(7, 6).unwrap());
        for a in [0, 1, 0, 1, 0, 1, 0] {
            controller.try_make_move(a).unwrap();
        }
        assert_eq!(controller.try_make_move(2), Err(GameError::GameAlreadyOver));
    }

    #[test]
    fn test_move_cap_ends_drop_retract_cycle_as_draw() {
        let mut controller = GameController::new(Connect4State::new(7, 6).unwrap()).with_max_moves(Some(6));
        let mut one = Scripted::new(&[3, 10, 3, 10]);
        let mut two = Scripted::new(&[4, 11, 4, 11]);
        let status = controller.start_play(&mut one, &mut two, Player::One).unwrap();

        assert_eq!(status, GameStatus::Draw);
        assert_eq!(controller.move_count(), 6);
        assert_eq!(controller.board().game_end(), GameStatus::InProgress);
        assert_eq!(controller.try_make_move(0), Err(GameError::GameAlreadyOver));
    }

    #[test]
    fn test_mcts_players_finish_a_game() {
        let mut controller = GameController::new(GobangState::new(4, 3).unwrap());
        let mut one = MctsPlayer::new(UniformPolicy, SearchConfig::for_testing(), 1);
        let mut two = MctsPlayer::new(UniformPolicy, SearchConfig::for_testing(), 2);
        let status = controller.start_play(&mut one, &mut two, Player::One).unwrap();
        assert!(status.is_game_over());
        assert_eq!(status, controller.board().game_end());
    }

    #[test]
    fn test_self_play_labels_samples() {
        let mut controller = GameController::new(GobangState::new(4, 3).unwrap());
        let mut player = MctsPlayer::self_play(UniformPolicy, SearchConfig::for_testing(), 3);
        let (status, samples) = controller.start_self_play(&mut player, 1.0).unwrap();

        assert_eq!(samples.len(), controller.move_count());
        assert!(samples.iter().all(|s| s.mcts_probs.len() == 16));
        assert!(samples
            .iter()
            .all(|s| (s.mcts_probs.iter().sum::<f32>() - 1.0).abs() < 1e-4));
        assert_eq!(player.mcts().tree().len(), 1);

        match status.winner() {
            Some(winner) => {
                for (sample, record) in samples.iter().zip(controller.move_history()) {
                    let expected = if record.player == winner { 1.0 } else { -1.0 };
                    assert_eq!(sample.z, expected);
                }
            }
            None => assert!(samples.iter().all(|s| s.z == 0.0)),
        }
    }
}
