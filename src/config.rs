//! MCTS configuration parameters.

use std::time::Duration;

/// Configuration for the policy-guided search and the player driving it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Exploration constant for the PUCT formula.
    /// Higher values lean on the prior, lower values on the mean value Q.
    pub c_puct: f32,

    /// Number of playouts per call to `get_move_probs`.
    pub n_playout: usize,

    /// Playouts collected before their leaves are evaluated together.
    /// 1 evaluates each leaf as soon as it is reached.
    pub batch_size: usize,

    /// Visits credited as losses to every node on an in-flight path.
    /// Only used when `batch_size > 1`.
    pub virtual_loss: u32,

    /// Stop starting new playouts once this much time has elapsed.
    pub time_budget: Option<Duration>,

    /// Dirichlet noise concentration for self-play move sampling.
    pub dirichlet_alpha: f64,

    /// Share of the sampling distribution taken by the noise in self-play.
    pub dirichlet_epsilon: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            c_puct: 5.0,
            n_playout: 300,
            batch_size: 1,
            virtual_loss: 1,
            time_budget: None,
            dirichlet_alpha: 0.3,
            dirichlet_epsilon: 0.25,
        }
    }
}

impl SearchConfig {
    /// Config for playing against an opponent.
    pub fn for_play() -> Self {
        Self::default()
    }

    /// Config for self-play data generation: more playouts, batched leaves.
    pub fn for_self_play() -> Self {
        Self {
            n_playout: 400,
            batch_size: 8,
            ..Self::default()
        }
    }

    /// A fast config for tests.
    pub fn for_testing() -> Self {
        Self {
            n_playout: 50,
            ..Self::default()
        }
    }

    pub fn with_c_puct(mut self, c: f32) -> Self {
        self.c_puct = c;
        self
    }

    pub fn with_playouts(mut self, n: usize) -> Self {
        self.n_playout = n;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_dirichlet(mut self, alpha: f64, epsilon: f64) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }
}
