//! Policy/value collaborator.
//!
//! The search treats the policy/value function as a black box: given a board
//! it returns `(action, prior)` pairs and a scalar value in `[-1, 1]` for the
//! player to move. A trained network sits behind this trait in production;
//! [`UniformPolicy`] and [`RolloutPolicy`] cover tests and model-free play.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::PolicyError;
use crate::{Action, Board, GameStatus};

/// An action paired with its probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionProb {
    pub action: Action,
    pub prob: f32,
}

impl ActionProb {
    pub fn new(action: Action, prob: f32) -> Self {
        Self { action, prob }
    }
}

/// Output of one policy/value evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyValue {
    /// Priors over (ideally legal) actions. Not required to sum to 1.
    pub action_probs: Vec<ActionProb>,
    /// Outcome estimate for the player to move.
    pub value: f32,
}

impl PolicyValue {
    /// Rejects values outside `[-1, 1]` (NaN included) and non-finite or
    /// negative priors.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !(-1.0..=1.0).contains(&self.value) {
            return Err(PolicyError::Malformed(format!("value {}", self.value)));
        }
        if let Some(bad) = self
            .action_probs
            .iter()
            .find(|ap| !ap.prob.is_finite() || ap.prob < 0.0)
        {
            return Err(PolicyError::Malformed(format!(
                "prior {} for action {}",
                bad.prob, bad.action
            )));
        }
        Ok(())
    }
}

/// The `(p, v) = f(s)` function consulted at every expanded leaf.
pub trait PolicyValueFn<B: Board> {
    fn policy_value(&self, board: &B) -> Result<PolicyValue, PolicyError>;
}

impl<B, F> PolicyValueFn<B> for F
where
    B: Board,
    F: Fn(&B) -> Result<PolicyValue, PolicyError>,
{
    fn policy_value(&self, board: &B) -> Result<PolicyValue, PolicyError> {
        self(board)
    }
}

fn uniform_priors(moves: &[Action]) -> Vec<ActionProb> {
    if moves.is_empty() {
        return Vec::new();
    }
    let prob = 1.0 / moves.len() as f32;
    moves.iter().map(|&a| ActionProb::new(a, prob)).collect()
}

/// Equal priors over the legal moves and a neutral value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPolicy;

impl<B: Board> PolicyValueFn<B> for UniformPolicy {
    fn policy_value(&self, board: &B) -> Result<PolicyValue, PolicyError> {
        Ok(PolicyValue {
            action_probs: uniform_priors(&board.available_moves()),
            value: 0.0,
        })
    }
}

/// Uniform priors, value from one random playout to the end of the game.
#[derive(Debug)]
pub struct RolloutPolicy {
    rng: Mutex<Xoshiro256PlusPlus>,
    max_depth: usize,
}

impl RolloutPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(Xoshiro256PlusPlus::seed_from_u64(seed)),
            max_depth: 1_000,
        }
    }

    /// Rollouts stop after `max_depth` moves and score as a draw.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl<B: Board> PolicyValueFn<B> for RolloutPolicy {
    fn policy_value(&self, board: &B) -> Result<PolicyValue, PolicyError> {
        let perspective = board.current_player();
        let action_probs = uniform_priors(&board.available_moves());

        let mut sim = board.deep_copy();
        let mut rng = self.rng.lock();
        let mut status = sim.game_end();
        let mut depth = 0;
        while !status.is_game_over() && depth < self.max_depth {
            let moves = sim.available_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.random_range(0..moves.len())];
            sim.do_move(mv);
            status = sim.game_end();
            depth += 1;
        }

        let value = match status {
            GameStatus::Win(winner) if winner == perspective => 1.0,
            GameStatus::Win(_) => -1.0,
            _ => 0.0,
        };
        Ok(PolicyValue {
            action_probs,
            value,
        })
    }
}

/// Serializes every call to a collaborator that is not safe to share.
#[derive(Debug)]
pub struct SerializedPolicy<P> {
    inner: Mutex<P>,
}

impl<P> SerializedPolicy<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> P {
        self.inner.into_inner()
    }
}

impl<B: Board, P: PolicyValueFn<B>> PolicyValueFn<B> for SerializedPolicy<P> {
    fn policy_value(&self, board: &B) -> Result<PolicyValue, PolicyError> {
        self.inner.lock().policy_value(board)
    }
}
