//! # Policy Module
//!
//! The stochastic window policy used by the neighborhood optimizer.
//!
//! The agent pairs a linear softmax actor with a linear critic over the
//! 36-channel window state, remembers rollout transitions, and updates
//! both heads with a clipped-surrogate step over generalized-advantage
//! estimates. The optimizer only relies on the five-method contract:
//! `choose_action`, `remember`, `learn`, `save`, `load`.
//!
//! ## Components
//!
//! - [`Agent`] - The policy/value pair with its rollout memory
//! - [`ActorNetwork`] - Linear logits + softmax over the action space
//! - [`CriticNetwork`] - Linear state-value estimate
//! - [`RolloutMemory`] - Transition store with shuffled minibatches
//! - [`PolicyError`] - Checkpoint persistence errors
//!
//! ## Usage
//!
//! ```rust
//! use traffic_phase_optim::policy::Agent;
//!
//! let mut agent = Agent::new(36, 512).with_seed(7).build();
//! let state = vec![0i64; 36];
//! let (action, log_prob, value) = agent.choose_action(&state);
//! agent.remember(&state, action, log_prob, value, 1.0, true);
//! agent.learn();
//! ```
mod actor;
mod agent;
mod critic;
mod memory;

pub use self::{actor::*, agent::*, critic::*, memory::*};
