//! # Solvers Module
//!
//! Schedule evaluation and the three schedule producers.
//!
//! ## Evaluation
//!
//! [`ScheduleEvaluator`] simulates a [`Schedule`](crate::traffic_lights::Schedule)
//! against one or more cities and combines four grid-level metrics into a
//! scalar fitness in `[0, 4]` (higher is better):
//!
//! | Metric | Better | Normalized score |
//! |--------|--------|------------------|
//! | cars not reaching their destination | fewer | `1 / (1 + x / max)` |
//! | average accumulated wait | less | `1 / (1 + x / max)` |
//! | car movements | more | `x / max` |
//! | sum of squared waits | less | `1 / (1 + x / max)` |
//!
//! ## Solvers
//!
//! - [`BaselineSolver`] - the trivial alternating all-horizontal /
//!   all-vertical schedule
//! - [`GeneticSolver`] - evolutionary search over full schedules
//! - [`PpoSolver`] - per-window policy with majority-vote aggregation
//!
//! All three share the [`Solver`] evaluation contract; `solve` stays
//! solver-specific.
mod baseline;
mod genetic;
mod ppo;
mod solver;

pub use self::{baseline::*, genetic::*, ppo::*, solver::*};
