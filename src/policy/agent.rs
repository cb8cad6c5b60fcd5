use crate::log_additional;
use crate::policy::{ActorNetwork, CriticNetwork, RolloutMemory};
use crate::verbose::{EVENT_AGENT_LOAD, EVENT_AGENT_SAVE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::fs;
use std::path::Path;

/// Weight of the critic loss inside the combined update.
pub const C1: f64 = 0.5;

/// Custom error types for agent checkpointing.
#[derive(Debug)]
pub enum PolicyError {
    /// Filesystem failure while reading or writing a checkpoint.
    Io(std::io::Error),
    /// A checkpoint file did not contain the expected JSON document.
    Serde(serde_json::Error),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::Io(err) => write!(f, "Agent checkpoint I/O failure: {}", err),
            PolicyError::Serde(err) => {
                write!(f, "Agent checkpoint serialization failure: {}", err)
            }
        }
    }
}

impl std::error::Error for PolicyError {}

impl From<std::io::Error> for PolicyError {
    fn from(err: std::io::Error) -> Self {
        PolicyError::Io(err)
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Serde(err)
    }
}

/// The stochastic policy/value pair driving the neighborhood optimizer.
///
/// Holds a linear softmax actor, a linear critic and the rollout memory.
/// [`Agent::learn`] runs a clipped-surrogate update over
/// generalized-advantage estimates and clears the memory.
pub struct Agent {
    gamma: f64,
    gae_lambda: f64,
    policy_clip: f64,
    n_epochs: usize,
    actor: ActorNetwork,
    critic: CriticNetwork,
    memory: RolloutMemory,
    rng: StdRng,
}

impl Agent {
    /// Constructs a new `AgentBuilder` for building an `Agent`.
    ///
    /// # Arguments
    /// * `input_dims` - Length of the state vector.
    /// * `n_actions` - Size of the action space.
    ///
    /// # Example
    /// ```
    /// use traffic_phase_optim::policy::Agent;
    /// let agent = Agent::new(36, 512)
    ///     .with_batch_size(20)
    ///     .with_epochs(5)
    ///     .with_seed(1)
    ///     .build();
    /// ```
    pub fn new(input_dims: usize, n_actions: usize) -> AgentBuilder {
        AgentBuilder {
            input_dims,
            n_actions,
            gamma: 0.99,
            alpha: 3e-4,
            gae_lambda: 0.95,
            policy_clip: 0.2,
            batch_size: 64,
            n_epochs: 10,
            seed: 0,
        }
    }

    /// Samples an action for a state.
    ///
    /// # Returns
    /// The action index, its log-probability under the current policy and
    /// the critic's value estimate.
    pub fn choose_action(&mut self, observation: &[i64]) -> (usize, f64, f64) {
        let state = to_features(observation);
        let probs = self.actor.forward(&state);
        let value = self.critic.forward(&state);

        let draw: f64 = self.rng.random();
        let mut cumulative = 0.0;
        let mut action = probs.len() - 1;
        for (k, &p) in probs.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                action = k;
                break;
            }
        }
        let log_prob = probs[action].max(f64::MIN_POSITIVE).ln();
        (action, log_prob, value)
    }

    /// Stores a transition for the next learning pass.
    pub fn remember(
        &mut self,
        state: &[i64],
        action: usize,
        log_prob: f64,
        value: f64,
        reward: f64,
        done: bool,
    ) {
        self.memory.store(state, action, log_prob, value, reward, done);
    }

    /// Runs the update epochs over the remembered transitions and clears
    /// the memory.
    ///
    /// Per minibatch sample: recompute the action distribution, form the
    /// probability ratio against the remembered log-probability, take the
    /// clipped-surrogate policy gradient and a squared-error critic step
    /// weighted by [`C1`].
    pub fn learn(&mut self) {
        if self.memory.is_empty() {
            return;
        }

        for _ in 0..self.n_epochs {
            let advantages = self.generate_advantages();
            let batches = self.memory.generate_batches(&mut self.rng);

            for batch in batches {
                let scale = 1.0 / batch.len() as f64;
                for &idx in &batch {
                    let state = to_features(&self.memory.states()[idx]);
                    let action = self.memory.actions()[idx];
                    let old_log_prob = self.memory.log_probs()[idx];
                    let advantage = advantages[idx];

                    let probs = self.actor.forward(&state);
                    let new_log_prob = probs[action].max(f64::MIN_POSITIVE).ln();
                    let ratio = (new_log_prob - old_log_prob).exp();

                    let unclipped = ratio * advantage;
                    let clipped =
                        ratio.clamp(1.0 - self.policy_clip, 1.0 + self.policy_clip) * advantage;

                    // d(-min(u, c))/d log_prob; zero when the clamp is
                    // active on the smaller branch.
                    let log_prob_gradient = if unclipped <= clipped {
                        -ratio * advantage
                    } else {
                        0.0
                    };

                    if log_prob_gradient != 0.0 {
                        let logit_gradient: Vec<f64> = probs
                            .iter()
                            .enumerate()
                            .map(|(k, &p)| {
                                let indicator = if k == action { 1.0 } else { 0.0 };
                                log_prob_gradient * (indicator - p) * scale
                            })
                            .collect();
                        self.actor.apply_logit_gradient(&state, &logit_gradient);
                    }

                    let returns = advantage + self.memory.values()[idx];
                    let value = self.critic.forward(&state);
                    let value_gradient = -2.0 * C1 * (returns - value) * scale;
                    self.critic.apply_value_gradient(&state, value_gradient);
                }
            }
        }

        self.memory.clear();
    }

    /// Generalized advantage estimates over the remembered trajectory.
    fn generate_advantages(&self) -> Vec<f64> {
        let rewards = self.memory.rewards();
        let values = self.memory.values();
        let dones = self.memory.dones();
        let n = rewards.len();

        let mut advantages = vec![0.0; n];
        for t in 0..n.saturating_sub(1) {
            let mut discount = 1.0;
            let mut a_t = 0.0;
            for k in t..n - 1 {
                let non_terminal = if dones[k] { 0.0 } else { 1.0 };
                a_t += discount
                    * (rewards[k] + self.gamma * values[k + 1] * non_terminal - values[k]);
                discount *= self.gamma * self.gae_lambda;
            }
            advantages[t] = a_t;
        }
        advantages
    }

    /// Number of transitions waiting for the next learning pass.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Persists both heads as JSON into `directory` (created if missing).
    pub fn save(&self, directory: &Path) -> Result<(), PolicyError> {
        fs::create_dir_all(directory)?;
        fs::write(
            directory.join("actor.json"),
            serde_json::to_vec(&self.actor)?,
        )?;
        fs::write(
            directory.join("critic.json"),
            serde_json::to_vec(&self.critic)?,
        )?;
        log_additional!(EVENT_AGENT_SAVE, "Agent checkpoint written", epochs = self.n_epochs);
        Ok(())
    }

    /// Restores both heads from a directory written by [`Agent::save`].
    pub fn load(&mut self, directory: &Path) -> Result<(), PolicyError> {
        self.actor = serde_json::from_slice(&fs::read(directory.join("actor.json"))?)?;
        self.critic = serde_json::from_slice(&fs::read(directory.join("critic.json"))?)?;
        log_additional!(
            EVENT_AGENT_LOAD,
            "Agent checkpoint restored",
            n_actions = self.actor.n_actions()
        );
        Ok(())
    }
}

/// A builder pattern implementation for constructing `Agent` objects.
pub struct AgentBuilder {
    input_dims: usize,
    n_actions: usize,
    gamma: f64,
    alpha: f64,
    gae_lambda: f64,
    policy_clip: f64,
    batch_size: usize,
    n_epochs: usize,
    seed: u64,
}

impl AgentBuilder {
    /// Sets the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the learning rate for both heads.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the GAE smoothing factor.
    pub fn with_gae_lambda(mut self, gae_lambda: f64) -> Self {
        self.gae_lambda = gae_lambda;
        self
    }

    /// Sets the surrogate clipping range.
    pub fn with_policy_clip(mut self, policy_clip: f64) -> Self {
        self.policy_clip = policy_clip;
        self
    }

    /// Sets the minibatch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of update epochs per learning pass.
    pub fn with_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    /// Seeds the agent's private RNG (weight init and sampling).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the final `Agent`.
    pub fn build(self) -> Agent {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let actor = ActorNetwork::new(self.n_actions, self.input_dims, self.alpha, &mut rng);
        let critic = CriticNetwork::new(self.input_dims, self.alpha, &mut rng);
        Agent {
            gamma: self.gamma,
            gae_lambda: self.gae_lambda,
            policy_clip: self.policy_clip,
            n_epochs: self.n_epochs,
            actor,
            critic,
            memory: RolloutMemory::new(self.batch_size),
            rng,
        }
    }
}

fn to_features(observation: &[i64]) -> Vec<f64> {
    observation.iter().map(|&channel| channel as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_agent() -> Agent {
        Agent::new(4, 3)
            .with_batch_size(4)
            .with_epochs(2)
            .with_seed(123)
            .build()
    }

    #[test]
    fn test_choose_action_in_range() {
        let mut agent = tiny_agent();
        for _ in 0..50 {
            let (action, log_prob, _value) = agent.choose_action(&[1, 0, 2, 3]);
            assert!(action < 3);
            assert!(log_prob <= 0.0);
        }
    }

    #[test]
    fn test_learn_consumes_memory() {
        let mut agent = tiny_agent();
        for k in 0..6 {
            let state = [k, 1, 0, 2];
            let (action, log_prob, value) = agent.choose_action(&state);
            agent.remember(&state, action, log_prob, value, 1.0, k == 5);
        }
        assert_eq!(agent.memory_len(), 6);
        agent.learn();
        assert_eq!(agent.memory_len(), 0);
    }

    #[test]
    fn test_learn_on_empty_memory_is_a_no_op() {
        let mut agent = tiny_agent();
        agent.learn();
        assert_eq!(agent.memory_len(), 0);
    }

    #[test]
    fn test_checkpoint_round_trip_preserves_policy() {
        let mut agent = tiny_agent();
        // Train a little so the weights differ from initialization.
        for k in 0..8 {
            let state = [k, 2, 1, 0];
            let (action, log_prob, value) = agent.choose_action(&state);
            agent.remember(&state, action, log_prob, value, 0.5, k == 7);
        }
        agent.learn();

        let dir = tempfile::tempdir().unwrap();
        agent.save(dir.path()).unwrap();

        let mut restored = tiny_agent();
        restored.load(dir.path()).unwrap();

        // Same state must yield the same distribution, so the same logits.
        let state = to_features(&[3, 1, 4, 1]);
        assert_eq!(agent.actor.forward(&state), restored.actor.forward(&state));
        assert_eq!(agent.critic.forward(&state), restored.critic.forward(&state));
    }
}
