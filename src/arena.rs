//! Head-to-head evaluation of two agents over many independent games.
//!
//! Games run on a dedicated rayon pool. Each game builds its own board and
//! agents from the factories, so nothing is shared between workers.

use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::info;

use crate::error::ArenaError;
use crate::game_controller::GameController;
use crate::player::Agent;
use crate::{Board, GameStatus, Player};

/// Results of a batch of games, indexed by seat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchTally {
    /// Wins of the seat-One agent and of the seat-Two agent
    pub wins: [usize; 2],
    pub draws: usize,
}

impl MatchTally {
    pub fn from_status(status: GameStatus) -> Self {
        let mut tally = Self::default();
        tally.record(status);
        tally
    }

    pub fn record(&mut self, status: GameStatus) {
        match status {
            GameStatus::Win(Player::One) => self.wins[0] += 1,
            GameStatus::Win(Player::Two) => self.wins[1] += 1,
            GameStatus::Draw => self.draws += 1,
            GameStatus::InProgress => {}
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.wins[0] += other.wins[0];
        self.wins[1] += other.wins[1];
        self.draws += other.draws;
        self
    }

    pub fn games(&self) -> usize {
        self.wins[0] + self.wins[1] + self.draws
    }

    /// Wins plus half the draws, over all games.
    pub fn score(&self, player: Player) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        let wins = match player {
            Player::One => self.wins[0],
            Player::Two => self.wins[1],
        };
        (wins as f64 + 0.5 * self.draws as f64) / games as f64
    }
}

/// Plays `n_games` games between the agents returned by `make_agents`.
///
/// Game `i` is started by seat One when `i` is even and by seat Two when it
/// is odd. `make_agents(i)` receives the game index, which makes per-game
/// seeding easy. `threads == 0` uses one thread per logical CPU. A game that
/// reaches `max_moves` without a result is scored as a draw.
pub fn play_matches<B, A1, A2, FB, FA>(
    n_games: usize,
    threads: usize,
    max_moves: Option<usize>,
    make_board: FB,
    make_agents: FA,
) -> Result<MatchTally, ArenaError>
where
    B: Board,
    A1: Agent<B>,
    A2: Agent<B>,
    FB: Fn() -> B + Sync,
    FA: Fn(usize) -> (A1, A2) + Sync,
{
    let threads = if threads == 0 { num_cpus::get() } else { threads };
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ArenaError::ThreadPool(e.to_string()))?;

    let start = Instant::now();
    let tally = pool.install(|| {
        (0..n_games)
            .into_par_iter()
            .map(|index| {
                let start_player = if index % 2 == 0 { Player::One } else { Player::Two };
                let (mut player1, mut player2) = make_agents(index);
                let mut controller = GameController::new(make_board()).with_max_moves(max_moves);
                controller
                    .start_play(&mut player1, &mut player2, start_player)
                    .map(MatchTally::from_status)
                    .map_err(|source| ArenaError::Game { index, source })
            })
            .try_reduce(MatchTally::default, |a, b| Ok(a.merge(b)))
    })?;

    info!(
        games = tally.games(),
        wins_one = tally.wins[0],
        wins_two = tally.wins[1],
        draws = tally.draws,
        threads,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "arena finished"
    );
    Ok(tally)
}
