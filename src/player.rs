//! Players that turn a search result into one concrete move.

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{trace, warn};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::mcts::{Mcts, RESET_MOVE};
use crate::policy::{ActionProb, PolicyValueFn};
use crate::{Action, Board, Player};

/// Anything the game loop can ask for a move.
pub trait Agent<B: Board> {
    /// Tells the agent which side it plays.
    fn set_player_ind(&mut self, player: Player);

    /// Forgets any state carried from a previous game.
    fn reset_player(&mut self);

    fn get_action(&mut self, board: &B, temperature: f32) -> Result<Action, SearchError>;
}

/// Dirichlet(α) sample of dimension `n`, drawn as normalized Gamma(α, 1) variates.
fn dirichlet_noise<R: Rng>(n: usize, alpha: f64, rng: &mut R) -> Option<Vec<f64>> {
    let gamma = Gamma::new(alpha, 1.0).ok()?;
    let mut samples: Vec<f64> = (0..n).map(|_| gamma.sample(rng)).collect();
    let sum: f64 = samples.iter().sum();
    if sum > 0.0 {
        for s in &mut samples {
            *s /= sum;
        }
    }
    Some(samples)
}

/// Index drawn with probability proportional to `weights`.
///
/// Walks the cumulative sum until it reaches a uniform draw in `[0, Σw)`,
/// falling back to the last index on rounding overshoot.
fn sample_index<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let last = weights.len().saturating_sub(1);
    let sum: f64 = weights.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return last;
    }
    let draw = rng.random_range(0.0..sum);
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative >= draw {
            return i;
        }
    }
    last
}

/// An [`Agent`] backed by policy-guided MCTS.
///
/// In normal play the tree is thrown away after every decision. In self-play
/// the sampled move blends in Dirichlet noise and the tree follows the game.
pub struct MctsPlayer<P> {
    mcts: Mcts<P>,
    player: Option<Player>,
    is_selfplay: bool,
    rng: Xoshiro256PlusPlus,
}

impl<P> MctsPlayer<P> {
    pub fn new(policy: P, config: SearchConfig, seed: u64) -> Self {
        Self {
            mcts: Mcts::new(policy, config),
            player: None,
            is_selfplay: false,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// A player for self-play data generation.
    pub fn self_play(policy: P, config: SearchConfig, seed: u64) -> Self {
        Self {
            is_selfplay: true,
            ..Self::new(policy, config, seed)
        }
    }

    pub fn player(&self) -> Option<Player> {
        self.player
    }

    pub fn is_selfplay(&self) -> bool {
        self.is_selfplay
    }

    pub fn mcts(&self) -> &Mcts<P> {
        &self.mcts
    }

    /// Picks a move and reports the root distribution as a dense vector of
    /// length `board.action_count()`, zero for actions the root never expanded.
    pub fn get_action_with_probs<B>(
        &mut self,
        board: &B,
        temperature: f32,
    ) -> Result<(Action, Vec<f32>), SearchError>
    where
        B: Board,
        P: PolicyValueFn<B> + Sync,
    {
        if board.available_moves().is_empty() {
            return Err(SearchError::NoLegalMoves);
        }
        let probs = self.mcts.get_move_probs(board, temperature)?;

        let mut move_probs = vec![0.0; board.action_count()];
        for ap in &probs {
            if let Some(slot) = move_probs.get_mut(ap.action) {
                *slot = ap.prob;
            }
        }

        let action = if self.is_selfplay {
            let action = self.sample_with_noise(&probs);
            self.mcts.update_with_move(action);
            action
        } else {
            self.mcts.update_with_move(RESET_MOVE);
            let weights: Vec<f64> = probs.iter().map(|ap| f64::from(ap.prob)).collect();
            probs[sample_index(&weights, &mut self.rng)].action
        };

        trace!(
            action,
            player = ?self.player,
            selfplay = self.is_selfplay,
            "sampled action"
        );
        Ok((action, move_probs))
    }

    fn sample_with_noise(&mut self, probs: &[ActionProb]) -> Action {
        let config = self.mcts.config();
        let epsilon = config.dirichlet_epsilon;
        let mut weights: Vec<f64> = probs.iter().map(|ap| f64::from(ap.prob)).collect();
        match dirichlet_noise(weights.len(), config.dirichlet_alpha, &mut self.rng) {
            Some(noise) => {
                for (w, n) in weights.iter_mut().zip(noise) {
                    *w = (1.0 - epsilon) * *w + epsilon * n;
                }
            }
            None => warn!(alpha = config.dirichlet_alpha, "invalid Dirichlet alpha, sampling without noise"),
        }
        probs[sample_index(&weights, &mut self.rng)].action
    }
}

impl<B, P> Agent<B> for MctsPlayer<P>
where
    B: Board,
    P: PolicyValueFn<B> + Sync,
{
    fn set_player_ind(&mut self, player: Player) {
        self.player = Some(player);
    }

    fn reset_player(&mut self) {
        self.mcts.update_with_move(RESET_MOVE);
    }

    fn get_action(&mut self, board: &B, temperature: f32) -> Result<Action, SearchError> {
        self.get_action_with_probs(board, temperature)
            .map(|(action, _)| action)
    }
}

impl<P> std::fmt::Display for MctsPlayer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.player {
            Some(p) => write!(f, "MCTS {}", p),
            None => write!(f, "MCTS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::connect4::Connect4State;
    use crate::games::gobang::GobangState;
    use crate::games::reversi::ReversiState;
    use crate::policy::UniformPolicy;

    #[test]
    fn test_action_is_legal_and_tree_is_reset() {
        let mut player = MctsPlayer::new(UniformPolicy, SearchConfig::for_testing(), 1);
        let board = GobangState::new(6, 4).unwrap();
        let action = player.get_action(&board, 1.0).unwrap();
        assert!(board.available_moves().contains(&action));
        assert_eq!(player.mcts().tree().len(), 1);
    }

    #[test]
    fn test_move_probs_cover_whole_action_space() {
        let mut player = MctsPlayer::new(UniformPolicy, SearchConfig::for_testing(), 2);
        let board = ReversiState::new(8).unwrap();
        let (action, probs) = player.get_action_with_probs(&board, 1.0).unwrap();
        assert_eq!(probs.len(), 65);
        assert!([20, 29, 34, 43].contains(&action));
        for (a, p) in probs.iter().enumerate() {
            if ![20, 29, 34, 43].contains(&a) {
                assert_eq!(*p, 0.0);
            }
        }
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_legal_moves() {
        let mut board = GobangState::new(2, 2).unwrap();
        for a in 0..4 {
            board.do_move(a);
        }
        let mut player = MctsPlayer::new(UniformPolicy, SearchConfig::for_testing(), 3);
        assert_eq!(player.get_action(&board, 1.0), Err(SearchError::NoLegalMoves));
    }

    #[test]
    fn test_self_play_keeps_subtree() {
        let mut player = MctsPlayer::self_play(UniformPolicy, SearchConfig::for_testing(), 4);
        let board = Connect4State::new(7, 6).unwrap();
        let action = player.get_action(&board, 1.0).unwrap();
        assert!(action < 7);
        let tree = player.mcts().tree();
        assert!(tree.get(tree.root()).visits() > 0);
    }

    #[test]
    fn test_reset_player_drops_tree() {
        let mut player = MctsPlayer::self_play(UniformPolicy, SearchConfig::for_testing(), 5);
        let board = Connect4State::new(7, 6).unwrap();
        player.get_action(&board, 1.0).unwrap();
        Agent::<Connect4State>::reset_player(&mut player);
        assert_eq!(player.mcts().tree().len(), 1);
    }

    #[test]
    fn test_same_seed_same_choice() {
        let board = Connect4State::new(7, 6).unwrap();
        let pick = |seed| {
            let mut player = MctsPlayer::new(UniformPolicy, SearchConfig::for_testing(), seed);
            player.get_action(&board, 1.0).unwrap()
        };
        assert_eq!(pick(9), pick(9));
    }

    #[test]
    fn test_sample_index_respects_weights() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(sample_index(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
        assert_eq!(sample_index(&[0.0, 0.0], &mut rng), 1);
    }

    #[test]
    fn test_dirichlet_noise_is_a_distribution() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let noise = dirichlet_noise(10, 0.3, &mut rng).unwrap();
        assert_eq!(noise.len(), 10);
        assert!((noise.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(dirichlet_noise(3, -1.0, &mut rng).is_none());
    }
}
