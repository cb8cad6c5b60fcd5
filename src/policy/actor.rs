use rand::Rng;
use serde::{Deserialize, Serialize};

/// Linear softmax policy head: one weight row per action plus a bias.
///
/// Logits are `W s + b`; the forward pass returns the softmax over them.
/// Gradient steps are plain SGD applied directly to the rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorNetwork {
    n_actions: usize,
    input_dims: usize,
    alpha: f64,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl ActorNetwork {
    /// Creates an actor with small random initial weights.
    ///
    /// # Arguments
    /// * `n_actions` - Size of the action space.
    /// * `input_dims` - Length of the state vector.
    /// * `alpha` - Learning rate.
    /// * `rng` - Randomness source for initialization.
    pub fn new<R: Rng + ?Sized>(
        n_actions: usize,
        input_dims: usize,
        alpha: f64,
        rng: &mut R,
    ) -> Self {
        let scale = 1.0 / (input_dims.max(1) as f64).sqrt();
        let weights = (0..n_actions)
            .map(|_| {
                (0..input_dims)
                    .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * scale)
                    .collect()
            })
            .collect();
        ActorNetwork {
            n_actions,
            input_dims,
            alpha,
            weights,
            biases: vec![0.0; n_actions],
        }
    }

    /// Size of the action space.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Length of the expected state vector.
    pub fn input_dims(&self) -> usize {
        self.input_dims
    }

    /// Raw action logits for a state.
    pub fn logits(&self, state: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                row.iter()
                    .zip(state)
                    .map(|(weight, feature)| weight * feature)
                    .sum::<f64>()
                    + bias
            })
            .collect()
    }

    /// Action probabilities for a state (numerically stable softmax).
    pub fn forward(&self, state: &[f64]) -> Vec<f64> {
        let logits = self.logits(state);
        let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max_logit).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }

    /// One SGD step against the given gradient of the loss with respect
    /// to the logits.
    pub fn apply_logit_gradient(&mut self, state: &[f64], logit_gradient: &[f64]) {
        for (k, &gradient) in logit_gradient.iter().enumerate() {
            if gradient == 0.0 {
                continue;
            }
            for (weight, feature) in self.weights[k].iter_mut().zip(state) {
                *weight -= self.alpha * gradient * feature;
            }
            self.biases[k] -= self.alpha * gradient;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_forward_is_a_distribution() {
        let mut rng = StdRng::seed_from_u64(5);
        let actor = ActorNetwork::new(8, 4, 3e-4, &mut rng);
        let probs = actor.forward(&[1.0, 0.0, 2.0, 3.0]);
        assert_eq!(probs.len(), 8);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_gradient_step_shifts_probability() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut actor = ActorNetwork::new(4, 3, 0.1, &mut rng);
        let state = [1.0, 1.0, 1.0];
        let before = actor.forward(&state)[2];

        // Negative logit gradient on action 2 increases its logit.
        let mut gradient = vec![0.0; 4];
        gradient[2] = -1.0;
        for _ in 0..10 {
            actor.apply_logit_gradient(&state, &gradient);
        }
        let after = actor.forward(&state)[2];
        assert!(after > before);
    }
}
