//! # Policy-guided Monte Carlo Tree Search
//!
//! Each playout descends the tree with PUCT selection on its own copy of the
//! board, expands the leaf it reaches with the policy/value function's priors
//! and backpropagates the leaf value with alternating sign.
//!
//! With `batch_size > 1` several paths are descended before any leaf is
//! evaluated. Nodes on an in-flight path carry a virtual loss so the next
//! descent is steered elsewhere; the collected leaves are then evaluated in
//! parallel with rayon. The tree is only mutated from the calling thread.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{PolicyError, SearchError};
use crate::node::{NodeId, Tree};
use crate::policy::{ActionProb, PolicyValue, PolicyValueFn};
use crate::{Action, Board, GameStatus, Player};

/// Passing this to [`Mcts::update_with_move`] discards the whole tree.
pub const RESET_MOVE: Action = Action::MAX;

/// Visits are offset by this before taking the logarithm.
const VISIT_EPSILON: f64 = 1e-10;

/// Smallest temperature used when converting visits to probabilities.
const MIN_TEMPERATURE: f64 = 1e-8;

/// Turns root visit counts into a move distribution.
///
/// `p_a ∝ exp((ln(n_a + ε) - max_b ln(n_b + ε)) / temperature)`. Subtracting the
/// maximum keeps the largest term at exactly 1, so the sum never vanishes.
pub fn visits_to_probs(visits: &[u32], temperature: f32) -> Vec<f32> {
    if visits.is_empty() {
        return Vec::new();
    }
    let temperature = f64::from(temperature).max(MIN_TEMPERATURE);
    let logits: Vec<f64> = visits
        .iter()
        .map(|&n| (f64::from(n) + VISIT_EPSILON).ln() / temperature)
        .collect();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| (e / sum) as f32).collect()
}

/// Value of a finished game for the player to move at the leaf.
fn terminal_value(status: GameStatus, to_move: Player) -> f32 {
    match status {
        GameStatus::Win(winner) if winner == to_move => 1.0,
        GameStatus::Win(_) => -1.0,
        _ => 0.0,
    }
}

/// Keeps the priors whose action is legal in `state`. No renormalization.
fn legal_priors<B: Board>(state: &B, priors: Vec<ActionProb>) -> Vec<ActionProb> {
    let mut legal = vec![false; state.action_count()];
    for action in state.available_moves() {
        if let Some(slot) = legal.get_mut(action) {
            *slot = true;
        }
    }
    priors
        .into_iter()
        .filter(|ap| legal.get(ap.action).copied().unwrap_or(false))
        .collect()
}

/// A leaf waiting for its policy/value evaluation.
struct PendingLeaf<B> {
    leaf: NodeId,
    state: B,
}

/// The search engine: a tree, its policy/value function and its configuration.
pub struct Mcts<P> {
    tree: Tree,
    policy: P,
    config: SearchConfig,
}

impl<P> Mcts<P> {
    pub fn new(policy: P, config: SearchConfig) -> Self {
        Self {
            tree: Tree::new(),
            policy,
            config,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Commits a real move: reuses the matching subtree or starts over.
    ///
    /// [`RESET_MOVE`] (or any action the root never expanded) discards the tree.
    pub fn update_with_move(&mut self, last_move: Action) {
        if self.tree.promote(last_move) {
            debug!(action = last_move, nodes = self.tree.len(), "reusing subtree");
        }
    }

    /// Runs one playout. `state` is consumed by the descent and must be a copy.
    pub fn playout<B>(&mut self, state: &mut B) -> Result<(), SearchError>
    where
        B: Board,
        P: PolicyValueFn<B>,
    {
        let leaf = self.descend(state);
        let leaf_value = match state.game_end() {
            GameStatus::InProgress => {
                let output = self.evaluate(state)?;
                let priors = legal_priors(state, output.action_probs);
                self.tree.expand(leaf, &priors);
                output.value
            }
            status => terminal_value(status, state.current_player()),
        };
        // The leaf's statistics are kept from the perspective of the player who moved into it.
        self.tree.update_recursive(leaf, -leaf_value);
        Ok(())
    }

    /// Runs the configured playouts from `state` and returns the visit-derived
    /// move distribution over the root's children. `state` is left untouched.
    pub fn get_move_probs<B>(
        &mut self,
        state: &B,
        temperature: f32,
    ) -> Result<Vec<ActionProb>, SearchError>
    where
        B: Board,
        P: PolicyValueFn<B> + Sync,
    {
        self.search(state, temperature, |mcts, state, remaining| {
            let batch = mcts.config.batch_size.min(remaining);
            if batch <= 1 {
                mcts.playout(&mut state.deep_copy())?;
                Ok(1)
            } else {
                mcts.playout_batch(state, batch)
            }
        })
    }

    /// [`Mcts::get_move_probs`] for collaborators that cannot be shared
    /// across threads. Every leaf is evaluated on the calling thread and
    /// `batch_size` is ignored.
    pub fn get_move_probs_serial<B>(
        &mut self,
        state: &B,
        temperature: f32,
    ) -> Result<Vec<ActionProb>, SearchError>
    where
        B: Board,
        P: PolicyValueFn<B>,
    {
        self.search(state, temperature, |mcts, state, _| {
            mcts.playout(&mut state.deep_copy())?;
            Ok(1)
        })
    }

    /// Budget loop shared by both entry points. `step` runs at least one
    /// playout and returns how many it completed.
    fn search<B, F>(
        &mut self,
        state: &B,
        temperature: f32,
        mut step: F,
    ) -> Result<Vec<ActionProb>, SearchError>
    where
        B: Board,
        F: FnMut(&mut Self, &B, usize) -> Result<usize, SearchError>,
    {
        let start = Instant::now();
        let n_playout = self.config.n_playout;
        let mut completed = 0;

        while completed < n_playout {
            if let Some(budget) = self.config.time_budget {
                if completed > 0 && start.elapsed() >= budget {
                    break;
                }
            }
            completed += step(self, state, n_playout - completed)?;
        }

        let root = self.tree.get(self.tree.root());
        debug!(
            playouts = completed,
            root_visits = root.visits(),
            root_q = root.q(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search finished"
        );
        self.root_move_probs(temperature)
    }

    /// Move distribution from the current root's visit counts.
    pub fn root_move_probs(&self, temperature: f32) -> Result<Vec<ActionProb>, SearchError> {
        let root = self.tree.get(self.tree.root());
        if root.is_leaf() {
            return Err(SearchError::RootNotExpanded);
        }
        let visits: Vec<u32> = root
            .children()
            .iter()
            .map(|(_, id)| self.tree.get(*id).visits())
            .collect();
        let probs = visits_to_probs(&visits, temperature);
        Ok(root
            .children()
            .iter()
            .zip(probs)
            .map(|((action, _), prob)| ActionProb::new(*action, prob))
            .collect())
    }

    fn descend<B: Board>(&self, state: &mut B) -> NodeId {
        let mut node = self.tree.root();
        while let Some((action, child)) = self.tree.select(node, self.config.c_puct) {
            state.do_move(action);
            node = child;
        }
        node
    }

    fn evaluate<B>(&self, state: &B) -> Result<PolicyValue, SearchError>
    where
        B: Board,
        P: PolicyValueFn<B>,
    {
        let output = self.policy.policy_value(state)?;
        output.validate()?;
        Ok(output)
    }

    /// Descends `batch` paths, then evaluates their leaves in parallel.
    /// Returns the number of playouts completed.
    fn playout_batch<B>(&mut self, state: &B, batch: usize) -> Result<usize, SearchError>
    where
        B: Board,
        P: PolicyValueFn<B> + Sync,
    {
        let virtual_loss = self.config.virtual_loss;
        let mut pending: Vec<PendingLeaf<B>> = Vec::with_capacity(batch);

        for _ in 0..batch {
            let mut copy = state.deep_copy();
            let leaf = self.descend(&mut copy);
            match copy.game_end() {
                GameStatus::InProgress => {
                    self.tree.add_virtual_loss(leaf, virtual_loss);
                    pending.push(PendingLeaf { leaf, state: copy });
                }
                status => {
                    let value = terminal_value(status, copy.current_player());
                    self.tree.update_recursive(leaf, -value);
                }
            }
        }

        let policy = &self.policy;
        let outputs: Vec<Result<PolicyValue, PolicyError>> = pending
            .par_iter()
            .map(|p| {
                let output = policy.policy_value(&p.state)?;
                output.validate()?;
                Ok(output)
            })
            .collect();

        for p in &pending {
            self.tree.revert_virtual_loss(p.leaf, virtual_loss);
        }
        for (p, output) in pending.into_iter().zip(outputs) {
            let output = output?;
            let priors = legal_priors(&p.state, output.action_probs);
            self.tree.expand(p.leaf, &priors);
            self.tree.update_recursive(p.leaf, -output.value);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::connect4::Connect4State;
    use crate::games::gobang::GobangState;
    use crate::policy::UniformPolicy;
    use std::time::Duration;

    fn winning_connect4() -> Connect4State {
        // Player One to move with three in column 0; Player Two threatens column 1.
        let mut board = Connect4State::new(7, 6).unwrap();
        for a in [0, 1, 0, 1, 0, 1] {
            board.do_move(a);
        }
        board
    }

    #[test]
    fn test_first_playout_expands_root_with_legal_moves() {
        let mut mcts = Mcts::new(UniformPolicy, SearchConfig::for_testing());
        let mut board = Connect4State::new(7, 6).unwrap();
        mcts.playout(&mut board).unwrap();

        let root = mcts.tree().get(mcts.tree().root());
        assert_eq!(root.visits(), 1);
        let actions: Vec<Action> = root.children().iter().map(|(a, _)| *a).collect();
        assert_eq!(actions, (0..7).collect::<Vec<_>>());
        assert!(root.children().iter().all(|(_, id)| {
            (mcts.tree().get(*id).prior() - 1.0 / 7.0).abs() < 1e-6
        }));
    }

    #[test]
    fn test_priors_are_filtered_but_not_renormalized() {
        let policy = |_: &Connect4State| -> Result<PolicyValue, PolicyError> {
            Ok(PolicyValue {
                action_probs: vec![
                    ActionProb::new(0, 0.5),
                    ActionProb::new(9, 0.3),
                    ActionProb::new(99, 0.1),
                    ActionProb::new(1, 0.1),
                ],
                value: 0.2,
            })
        };
        let mut mcts = Mcts::new(policy, SearchConfig::for_testing());
        let mut board = Connect4State::new(7, 6).unwrap();
        mcts.playout(&mut board).unwrap();

        let tree = mcts.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.children().len(), 2);
        assert_eq!(tree.get(tree.child(tree.root(), 0).unwrap()).prior(), 0.5);
        assert_eq!(tree.get(tree.child(tree.root(), 1).unwrap()).prior(), 0.1);
        assert!((root.q() + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_get_move_probs_leaves_state_untouched() {
        let mut mcts = Mcts::new(UniformPolicy, SearchConfig::for_testing());
        let board = GobangState::new(6, 5).unwrap();
        let before = board.current_state();
        let probs = mcts.get_move_probs(&board, 1.0).unwrap();

        assert_eq!(board.current_state(), before);
        assert_eq!(board.available_moves().len(), 36);
        let total: f32 = probs.iter().map(|ap| ap.prob).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert_eq!(mcts.tree().get(mcts.tree().root()).visits(), 50);
    }

    #[test]
    fn test_search_finds_immediate_win() {
        let config = SearchConfig::default().with_playouts(400);
        let mut mcts = Mcts::new(UniformPolicy, config);
        let probs = mcts.get_move_probs(&winning_connect4(), 1e-3).unwrap();
        let best = probs
            .iter()
            .max_by(|a, b| a.prob.partial_cmp(&b.prob).unwrap())
            .unwrap();
        assert_eq!(best.action, 0);
        assert!(best.prob > 0.99);
    }

    #[test]
    fn test_terminal_root_is_never_expanded() {
        let mut board = winning_connect4();
        board.do_move(0);
        let mut mcts = Mcts::new(UniformPolicy, SearchConfig::for_testing());
        let err = mcts.get_move_probs(&board, 1.0).unwrap_err();
        assert_eq!(err, SearchError::RootNotExpanded);

        // Player Two is to move and has lost: the root is scored for Player One.
        let root = mcts.tree().get(mcts.tree().root());
        assert_eq!(root.visits(), 50);
        assert!((root.q() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_policy_failure_propagates() {
        let policy = |_: &Connect4State| -> Result<PolicyValue, PolicyError> {
            Err(PolicyError::EvaluationFailed("model offline".into()))
        };
        let mut mcts = Mcts::new(policy, SearchConfig::for_testing());
        let err = mcts.get_move_probs(&Connect4State::new(7, 6).unwrap(), 1.0).unwrap_err();
        assert!(matches!(err, SearchError::Policy(PolicyError::EvaluationFailed(_))));
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let policy = |b: &Connect4State| -> Result<PolicyValue, PolicyError> {
            let mut output = UniformPolicy.policy_value(b)?;
            output.value = f32::NAN;
            Ok(output)
        };
        let mut mcts = Mcts::new(policy, SearchConfig::for_testing());
        let err = mcts.get_move_probs(&Connect4State::new(7, 6).unwrap(), 1.0).unwrap_err();
        assert!(matches!(err, SearchError::Policy(PolicyError::Malformed(_))));
    }

    #[test]
    fn test_out_of_range_value_never_reaches_the_tree() {
        let policy = |b: &Connect4State| -> Result<PolicyValue, PolicyError> {
            let mut output = UniformPolicy.policy_value(b)?;
            output.value = 50.0;
            Ok(output)
        };
        let mut mcts = Mcts::new(policy, SearchConfig::for_testing());
        let err = mcts.get_move_probs(&Connect4State::new(7, 6).unwrap(), 1.0).unwrap_err();
        assert!(matches!(err, SearchError::Policy(PolicyError::Malformed(_))));
        let root = mcts.tree().get(mcts.tree().root());
        assert_eq!(root.visits(), 0);
        assert_eq!(root.q(), 0.0);
    }

    #[test]
    fn test_serial_search_accepts_thread_local_collaborator() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Local(Rc<Cell<usize>>);
        impl PolicyValueFn<Connect4State> for Local {
            fn policy_value(&self, board: &Connect4State) -> Result<PolicyValue, PolicyError> {
                self.0.set(self.0.get() + 1);
                UniformPolicy.policy_value(board)
            }
        }

        let config = SearchConfig::for_testing().with_batch_size(8);
        let mut mcts = Mcts::new(Local(Rc::new(Cell::new(0))), config);
        let probs = mcts
            .get_move_probs_serial(&winning_connect4(), 1e-3)
            .unwrap();
        assert_eq!(mcts.tree().get(mcts.tree().root()).visits(), 50);
        assert!(mcts.policy().0.get() > 0);
        assert!(mcts.policy().0.get() <= 50);
        let total: f32 = probs.iter().map(|ap| ap.prob).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_update_with_move_reuses_or_resets() {
        let mut mcts = Mcts::new(UniformPolicy, SearchConfig::for_testing());
        let board = Connect4State::new(7, 6).unwrap();
        mcts.get_move_probs(&board, 1.0).unwrap();
        let tree = mcts.tree();
        let child = tree.child(tree.root(), 3).unwrap();
        let child_visits = tree.get(child).visits();

        mcts.update_with_move(3);
        let root = mcts.tree().get(mcts.tree().root());
        assert!(root.is_root());
        assert_eq!(root.visits(), child_visits);

        mcts.update_with_move(RESET_MOVE);
        let root = mcts.tree().get(mcts.tree().root());
        assert!(root.is_leaf());
        assert_eq!(root.visits(), 0);
        assert_eq!(mcts.tree().len(), 1);
    }

    #[test]
    fn test_batched_search_counts_every_playout() {
        let config = SearchConfig::for_testing().with_playouts(64).with_batch_size(8);
        let mut mcts = Mcts::new(UniformPolicy, config);
        let board = Connect4State::new(7, 6).unwrap();
        let probs = mcts.get_move_probs(&board, 1.0).unwrap();

        let root = mcts.tree().get(mcts.tree().root());
        assert_eq!(root.visits(), 64);
        let child_visits: u32 = root
            .children()
            .iter()
            .map(|(_, id)| mcts.tree().get(*id).visits())
            .sum();
        // The first batch lands entirely on the unexpanded root.
        assert_eq!(child_visits, 56);
        let total: f32 = probs.iter().map(|ap| ap.prob).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_batched_search_still_finds_immediate_win() {
        let config = SearchConfig::default().with_playouts(400).with_batch_size(4);
        let mut mcts = Mcts::new(UniformPolicy, config);
        let probs = mcts.get_move_probs(&winning_connect4(), 1e-3).unwrap();
        let win = probs.iter().find(|ap| ap.action == 0).unwrap();
        assert!(win.prob > 0.99);
    }

    #[test]
    fn test_exhausted_time_budget_keeps_partial_result() {
        let config = SearchConfig::default()
            .with_playouts(10_000)
            .with_time_budget(Duration::ZERO);
        let mut mcts = Mcts::new(UniformPolicy, config);
        let probs = mcts.get_move_probs(&Connect4State::new(7, 6).unwrap(), 1.0).unwrap();
        assert_eq!(mcts.tree().get(mcts.tree().root()).visits(), 1);
        let total: f32 = probs.iter().map(|ap| ap.prob).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_low_temperature_concentrates_on_most_visited() {
        let probs = visits_to_probs(&[10, 50, 3, 49], 1e-3);
        assert!(probs[1] > 0.99);
    }

    #[test]
    fn test_zero_visits_give_uniform_distribution() {
        let probs = visits_to_probs(&[0, 0, 0, 0], 1.0);
        assert!(probs.iter().all(|&p| (p - 0.25).abs() < 1e-6));
        let greedy = visits_to_probs(&[0, 0], 1e-3);
        assert!((greedy[0] + greedy[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unit_temperature_is_proportional_to_visits() {
        let probs = visits_to_probs(&[1, 3], 1.0);
        assert!((probs[0] - 0.25).abs() < 1e-5);
        assert!((probs[1] - 0.75).abs() < 1e-5);
    }
}
