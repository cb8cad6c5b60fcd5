use rand::Rng;
use serde::{Deserialize, Serialize};

/// Linear state-value head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticNetwork {
    input_dims: usize,
    alpha: f64,
    weights: Vec<f64>,
    bias: f64,
}

impl CriticNetwork {
    /// Creates a critic with small random initial weights.
    pub fn new<R: Rng + ?Sized>(input_dims: usize, alpha: f64, rng: &mut R) -> Self {
        let scale = 1.0 / (input_dims.max(1) as f64).sqrt();
        CriticNetwork {
            input_dims,
            alpha,
            weights: (0..input_dims)
                .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * scale)
                .collect(),
            bias: 0.0,
        }
    }

    /// Length of the expected state vector.
    pub fn input_dims(&self) -> usize {
        self.input_dims
    }

    /// State-value estimate for a state.
    pub fn forward(&self, state: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(state)
            .map(|(weight, feature)| weight * feature)
            .sum::<f64>()
            + self.bias
    }

    /// One SGD step against the given gradient of the loss with respect
    /// to the value output.
    pub fn apply_value_gradient(&mut self, state: &[f64], value_gradient: f64) {
        for (weight, feature) in self.weights.iter_mut().zip(state) {
            *weight -= self.alpha * value_gradient * feature;
        }
        self.bias -= self.alpha * value_gradient;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_value_regression_converges_toward_target() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut critic = CriticNetwork::new(3, 0.05, &mut rng);
        let state = [1.0, -1.0, 0.5];
        let target = 2.0;

        let initial_error = (target - critic.forward(&state)).abs();
        for _ in 0..200 {
            let value = critic.forward(&state);
            // Squared-error gradient: d/dv (target - v)^2 = -2 (target - v)
            critic.apply_value_gradient(&state, -2.0 * (target - value));
        }
        let final_error = (target - critic.forward(&state)).abs();
        assert!(final_error < initial_error);
        assert!(final_error < 0.05);
    }
}
