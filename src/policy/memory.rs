use rand::seq::SliceRandom;
use rand::Rng;

/// Transition store for one or more policy rollouts.
///
/// Parallel arrays, one entry per remembered transition. Cleared by the
/// agent after every learning pass.
#[derive(Debug, Default)]
pub struct RolloutMemory {
    states: Vec<Vec<i64>>,
    actions: Vec<usize>,
    log_probs: Vec<f64>,
    values: Vec<f64>,
    rewards: Vec<f64>,
    dones: Vec<bool>,
    batch_size: usize,
}

impl RolloutMemory {
    /// Creates an empty memory producing minibatches of `batch_size`.
    pub fn new(batch_size: usize) -> Self {
        RolloutMemory {
            batch_size,
            ..RolloutMemory::default()
        }
    }

    /// Appends one transition.
    pub fn store(
        &mut self,
        state: &[i64],
        action: usize,
        log_prob: f64,
        value: f64,
        reward: f64,
        done: bool,
    ) {
        self.states.push(state.to_vec());
        self.actions.push(action);
        self.log_probs.push(log_prob);
        self.values.push(value);
        self.rewards.push(reward);
        self.dones.push(done);
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if no transitions are stored.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Splits the transition indices into shuffled minibatches.
    ///
    /// Every index appears exactly once; the last batch may be short.
    pub fn generate_batches<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        indices
            .chunks(self.batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Drops all stored transitions.
    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.log_probs.clear();
        self.values.clear();
        self.rewards.clear();
        self.dones.clear();
    }

    /// Stored states.
    pub fn states(&self) -> &[Vec<i64>] {
        &self.states
    }

    /// Stored actions.
    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    /// Stored log-probabilities at selection time.
    pub fn log_probs(&self) -> &[f64] {
        &self.log_probs
    }

    /// Stored value estimates at selection time.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Stored rewards.
    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    /// Stored terminal flags.
    pub fn dones(&self) -> &[bool] {
        &self.dones
    }
}
