use crate::city::{City, Neighborhood};
use crate::geom::{Coordinate, Direction};
use crate::log_additional;
use crate::log_main;
use crate::policy::Agent;
use crate::reporter::Reporter;
use crate::solvers::{ScheduleEvaluator, Solver, SolverError};
use crate::traffic_lights::{Assignment, Schedule};
use crate::verbose::{EVENT_ROLLOUT, EVENT_TRAIN_CITY, EVENT_VOTE};
use rand::Rng;
use std::path::PathBuf;

/// Window rows.
pub const NEIGHBORHOOD_N: usize = 3;
/// Window columns.
pub const NEIGHBORHOOD_M: usize = 3;
/// State channels per junction.
pub const NUM_OF_REPRESENTATIONS: usize = 4;
/// Minibatch size of the agent.
pub const BATCH_SIZE: usize = 20;
/// Update epochs per learning pass.
pub const NUM_OF_EPOCHS: usize = 5;
/// Simulated ticks per action evaluation.
pub const NUM_OF_SIMULATIONS: usize = 6;
/// Hard cap on rollout iterations per window.
pub const MAX_ITERATIONS: usize = 100;
/// Ticks advanced with random assignments before training starts on a
/// city, so the policy sees non-empty queues.
pub const WARM_UP_TICKS: usize = 8;

/// Reward granted when the first action application empties the window.
const TERMINAL_BONUS: f64 = 4.0;
/// Draws before giving up on finding a populated window this tick.
const EMPTY_WINDOW_RETRIES: usize = 50;

/// Neighborhood policy solver: a stochastic per-window policy whose
/// decisions are aggregated into full assignments by majority vote.
///
/// The action space is every direction assignment over a 3×3 window -
/// `2^9 = 512` actions. For a full grid the solver slides the window over
/// every position, asks the agent for one action each, and lets every
/// window vote on the cells it covers.
pub struct PpoSolver {
    evaluator: ScheduleEvaluator,
    all_actions: Vec<Assignment>,
    agent: Agent,
    checkpoint_dir: Option<PathBuf>,
}

impl PpoSolver {
    /// Creates a policy solver for `n` × `m` grids over a `t`-tick
    /// horizon.
    ///
    /// # Arguments
    /// * `n`, `m` - Grid dimensions (both at least the window size).
    /// * `t` - Horizon in ticks.
    /// * `reporter` - Metric sink.
    /// * `seed` - Seed for the agent's private RNG.
    pub fn new(n: usize, m: usize, t: usize, reporter: Reporter, seed: u64) -> Self {
        let all_actions = init_all_actions();
        let agent = Agent::new(
            NEIGHBORHOOD_N * NEIGHBORHOOD_M * NUM_OF_REPRESENTATIONS,
            all_actions.len(),
        )
        .with_batch_size(BATCH_SIZE)
        .with_epochs(NUM_OF_EPOCHS)
        .with_seed(seed)
        .build();

        PpoSolver {
            evaluator: ScheduleEvaluator::new(n, m, t, reporter),
            all_actions,
            agent,
            checkpoint_dir: None,
        }
    }

    /// Sets the directory where the best agent and reporter snapshot are
    /// persisted during training. Without it no checkpoints are written.
    pub fn with_checkpoint_dir(mut self, directory: PathBuf) -> Self {
        self.checkpoint_dir = Some(directory);
        self
    }

    /// The policy agent.
    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    /// Number of sliding window positions on the grid.
    pub fn neighborhood_count(&self) -> usize {
        (self.evaluator.rows() - NEIGHBORHOOD_N + 1)
            * (self.evaluator.cols() - NEIGHBORHOOD_M + 1)
    }

    /// Produces a schedule for the city by querying the policy per window
    /// position and aggregating the actions by vote, tick by tick.
    ///
    /// The city is advanced with each aggregated assignment and reset at
    /// the end.
    pub fn solve(&mut self, city: &mut City) -> Result<Schedule, SolverError> {
        let mut solution = Schedule::new(Vec::new());
        for _ in 0..self.evaluator.horizon() {
            let mut actions = Vec::with_capacity(self.neighborhood_count());
            for i in 0..=(self.evaluator.rows() - NEIGHBORHOOD_N) {
                for j in 0..=(self.evaluator.cols() - NEIGHBORHOOD_M) {
                    let (top_left, top_right, bottom_left) = window_corners(i, j);
                    let neighborhood = city.get_neighborhood(top_left, top_right, bottom_left);
                    let (action, _, _) = self.agent.choose_action(&neighborhood.state());
                    actions.push(action);
                }
            }
            let assignment = self.vote_on_assignment(&actions);
            city.update_city(&assignment, false)?;
            solution.push(assignment);
        }
        city.reset_city();
        Ok(solution)
    }

    /// Per-cell vote tallies `[horizontal, vertical]` produced by the
    /// given per-window actions, windows in sliding order.
    pub fn vote_tallies(&self, actions: &[usize]) -> Vec<[u32; 2]> {
        let n = self.evaluator.rows();
        let m = self.evaluator.cols();
        let mut votes = vec![[0u32; 2]; n * m];

        let mut next_action = actions.iter();
        for i in 0..=(n - NEIGHBORHOOD_N) {
            for j in 0..=(m - NEIGHBORHOOD_M) {
                let Some(&action_index) = next_action.next() else {
                    return votes;
                };
                let action = &self.all_actions[action_index];
                for ni in 0..NEIGHBORHOOD_N {
                    for nj in 0..NEIGHBORHOOD_M {
                        let cell = (i + ni) * m + (j + nj);
                        match action.get(ni, nj) {
                            Direction::Horizontal => votes[cell][0] += 1,
                            Direction::Vertical => votes[cell][1] += 1,
                        }
                    }
                }
            }
        }
        votes
    }

    /// Aggregates per-window actions into one full assignment by majority
    /// vote per cell; ties break to horizontal.
    pub fn vote_on_assignment(&self, actions: &[usize]) -> Assignment {
        let n = self.evaluator.rows();
        let m = self.evaluator.cols();
        let votes = self.vote_tallies(actions);

        let mut assignment = Assignment::filled(n, m, Direction::Horizontal);
        for i in 0..n {
            for j in 0..m {
                let [horizontal, vertical] = votes[i * m + j];
                if vertical > horizontal {
                    assignment.set(i, j, Direction::Vertical);
                }
            }
        }
        log_additional!(
            EVENT_VOTE,
            "Window actions aggregated",
            windows = actions.len()
        );
        assignment
    }

    /// Trains the policy across freshly generated cities.
    ///
    /// Per city: a few warm-up ticks under random assignments, then one
    /// window rollout per remaining tick (randomly placed, re-drawn while
    /// empty), a learning pass after each rollout, and one random-assignment
    /// city tick to decouple consecutive rollouts. After each city the
    /// current policy's schedule is scored and recorded; the best-scoring
    /// policy so far is checkpointed together with a reporter snapshot.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        num_cities: usize,
        num_cars: usize,
        rng: &mut R,
    ) -> Result<(), SolverError> {
        let n = self.evaluator.rows();
        let m = self.evaluator.cols();
        let horizon = self.evaluator.horizon();
        let mut cities = City::generate_cities(n, m, num_cars, num_cities, rng)?;
        let mut best_score = f64::NEG_INFINITY;

        for (city_index, city) in cities.iter_mut().enumerate() {
            log_main!(
                EVENT_TRAIN_CITY,
                "Training on city",
                city_number = city_index + 1,
                cities_total = num_cities
            );
            let mut total_score = 0.0;

            for tick in 0..horizon {
                if tick < WARM_UP_TICKS {
                    city.update_city(&Assignment::random(n, m, rng), false)?;
                    continue;
                }

                let Some(mut neighborhood) = self.random_populated_window(city, rng) else {
                    city.update_city(&Assignment::random(n, m, rng), false)?;
                    continue;
                };

                let mut iterations = 0usize;
                let mut total_reward = 0.0;
                loop {
                    iterations += 1;
                    let (reward, done) =
                        self.neighborhood_iteration(&mut neighborhood, iterations)?;
                    total_reward += reward;
                    if done {
                        break;
                    }
                }
                total_score += total_reward / iterations as f64;
                log_additional!(
                    EVENT_ROLLOUT,
                    "Window rollout finished",
                    tick = tick,
                    iterations = iterations
                );

                self.agent.learn();
                city.update_city(&Assignment::random(n, m, rng), false)?;
            }

            let average_score = total_score / horizon as f64;
            log_main!(
                EVENT_TRAIN_CITY,
                "City training pass finished",
                city_number = city_index + 1,
                average_score = average_score
            );

            city.reset_city();
            let solution = self.solve(city)?;
            let score = self
                .evaluator
                .evaluate_solution(&solution, std::slice::from_mut(city), true)?;
            self.evaluator.reporter.record_best_solutions(score, solution);

            if average_score > best_score {
                best_score = average_score;
                if let Some(directory) = self.checkpoint_dir.clone() {
                    self.agent.save(&directory)?;
                    self.evaluator
                        .reporter
                        .save_all_data(&directory, "ppo_best")?;
                }
            }
        }
        Ok(())
    }

    /// One rollout iteration: choose an action on the current window
    /// state, evaluate it over the simulated lookahead, and remember the
    /// transition. The iteration cap turns into a zero-reward terminal.
    fn neighborhood_iteration(
        &mut self,
        neighborhood: &mut Neighborhood,
        iteration: usize,
    ) -> Result<(f64, bool), SolverError> {
        let state = neighborhood.state();
        let (action, log_prob, value) = self.agent.choose_action(&state);
        let (mut reward, mut done) = self.evaluate_neighborhood(action, neighborhood)?;
        if iteration == MAX_ITERATIONS {
            reward = 0.0;
            done = true;
        }
        self.agent
            .remember(&state, action, log_prob, value, reward, done);
        Ok((reward, done))
    }

    /// Applies the action to the window once, then rolls a deep-copied
    /// fork forward with policy-chosen actions for the remaining
    /// simulated ticks and scores the fork's four metrics.
    ///
    /// Emptying the window with the first application is terminal and
    /// earns the flat bonus instead of the metric score.
    fn evaluate_neighborhood(
        &mut self,
        action: usize,
        neighborhood: &mut Neighborhood,
    ) -> Result<(f64, bool), SolverError> {
        neighborhood.update_neighborhood(&self.all_actions[action])?;
        let done = neighborhood.active_cars_amount() == 0;

        let mut fork = neighborhood.deep_copy();
        let mut current_action = self.agent.choose_action(&fork.state()).0;
        for _ in 1..NUM_OF_SIMULATIONS {
            fork.update_neighborhood(&self.all_actions[current_action])?;
            current_action = self.agent.choose_action(&fork.state()).0;
        }

        let total_avg_wait_time = fork.grid().total_avg_wait_time();
        let not_reaching_cars = fork.active_cars_amount() as f64;
        let moving_cars_amount = fork.grid().total_car_movements() as f64;
        let total_wait_time_punishment = fork.grid().wait_time_punishment();

        let reward = self.evaluator.evaluate(
            1,
            neighborhood.original_num_of_cars(),
            not_reaching_cars,
            total_avg_wait_time,
            moving_cars_amount,
            total_wait_time_punishment,
            false,
        );
        let reward = if done { TERMINAL_BONUS } else { reward };
        Ok((reward, done))
    }

    /// Draws random window positions until one holds at least one car.
    ///
    /// Gives up after a bounded number of draws (a drained city has no
    /// populated window to offer).
    fn random_populated_window<R: Rng + ?Sized>(
        &self,
        city: &City,
        rng: &mut R,
    ) -> Option<Neighborhood> {
        for _ in 0..EMPTY_WINDOW_RETRIES {
            let i = rng.random_range(0..=(self.evaluator.rows() - NEIGHBORHOOD_N));
            let j = rng.random_range(0..=(self.evaluator.cols() - NEIGHBORHOOD_M));
            let (top_left, top_right, bottom_left) = window_corners(i, j);
            let neighborhood = city.get_neighborhood(top_left, top_right, bottom_left);
            if neighborhood.original_num_of_cars() > 0 {
                return Some(neighborhood);
            }
        }
        None
    }
}

impl Solver for PpoSolver {
    fn evaluator_mut(&mut self) -> &mut ScheduleEvaluator {
        &mut self.evaluator
    }
}

/// The three window corners for the sliding position `(i, j)`.
fn window_corners(i: usize, j: usize) -> (Coordinate, Coordinate, Coordinate) {
    let top_left = Coordinate::new(i as i32, j as i32);
    let top_right = Coordinate::new(i as i32, (j + NEIGHBORHOOD_M - 1) as i32);
    let bottom_left = Coordinate::new((i + NEIGHBORHOOD_N - 1) as i32, j as i32);
    (top_left, top_right, bottom_left)
}

/// Every direction assignment over the window, indexed `0..512`.
///
/// The first window cell is the most significant bit; a zero bit means
/// horizontal. Index 0 is the all-horizontal window.
fn init_all_actions() -> Vec<Assignment> {
    let cells = NEIGHBORHOOD_N * NEIGHBORHOOD_M;
    (0..(1usize << cells))
        .map(|index| {
            let mut assignment =
                Assignment::filled(NEIGHBORHOOD_N, NEIGHBORHOOD_M, Direction::Horizontal);
            for k in 0..cells {
                if (index >> (cells - 1 - k)) & 1 == 1 {
                    assignment.set(k / NEIGHBORHOOD_M, k % NEIGHBORHOOD_M, Direction::Vertical);
                }
            }
            assignment
        })
        .collect()
}
