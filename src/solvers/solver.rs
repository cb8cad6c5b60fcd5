use crate::city::{City, CityError};
use crate::log_additional;
use crate::policy::PolicyError;
use crate::reporter::{Reporter, ReporterError};
use crate::traffic_lights::Schedule;
use crate::verbose::EVENT_EVALUATION;
use std::fmt;

/// Custom error types shared by the solvers.
#[derive(Debug)]
pub enum SolverError {
    /// The schedule covers fewer ticks than the evaluation horizon.
    ScheduleTooShort { expected: usize, got: usize },
    /// A genetic run was configured with an empty population.
    EmptyPopulation,
    /// A simulation step failed.
    City(CityError),
    /// Persisting the agent checkpoint failed.
    Policy(PolicyError),
    /// Persisting the reporter snapshot failed.
    Reporter(ReporterError),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::ScheduleTooShort { expected, got } => {
                write!(
                    f,
                    "Schedule covers {} ticks but the horizon needs {}",
                    got, expected
                )
            }
            SolverError::EmptyPopulation => {
                write!(f, "Population size must be greater than zero")
            }
            SolverError::City(err) => write!(f, "{}", err),
            SolverError::Policy(err) => write!(f, "{}", err),
            SolverError::Reporter(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<CityError> for SolverError {
    fn from(err: CityError) -> Self {
        SolverError::City(err)
    }
}

impl From<PolicyError> for SolverError {
    fn from(err: PolicyError) -> Self {
        SolverError::Policy(err)
    }
}

impl From<ReporterError> for SolverError {
    fn from(err: ReporterError) -> Self {
        SolverError::Reporter(err)
    }
}

/// Simulates schedules against cities and reduces the collected metrics
/// to a scalar fitness.
///
/// Every solver owns one of these; it carries the grid dimensions, the
/// horizon and the reporter handle.
pub struct ScheduleEvaluator {
    n: usize,
    m: usize,
    t: usize,
    /// Metric sink; public so solvers can record their own series.
    pub reporter: Reporter,
}

impl ScheduleEvaluator {
    /// Creates an evaluator for `n` × `m` grids over a `t`-tick horizon.
    pub fn new(n: usize, m: usize, t: usize, reporter: Reporter) -> Self {
        ScheduleEvaluator { n, m, t, reporter }
    }

    /// Number of grid rows.
    pub fn rows(&self) -> usize {
        self.n
    }

    /// Number of grid columns.
    pub fn cols(&self) -> usize {
        self.m
    }

    /// Evaluation horizon in ticks.
    pub fn horizon(&self) -> usize {
        self.t
    }

    /// Simulates `solution` on every city and returns the combined score.
    ///
    /// Each city is advanced for the full horizon, its four metrics are
    /// accumulated, its all-arrived tick is recorded, and the city is
    /// reset for the next use. An empty city list yields the degenerate
    /// score `4.0` (every zero-cars normalization is defined as `1`).
    ///
    /// # Arguments
    /// * `solution` - The schedule under evaluation.
    /// * `cities` - Cities to simulate; reset after use.
    /// * `report` - When `true`, the per-metric averages are appended to
    ///   the reporter series.
    ///
    /// # Errors
    /// [`SolverError::ScheduleTooShort`] when the schedule does not cover
    /// the horizon; [`SolverError::City`] when a tick fails.
    pub fn evaluate_solution(
        &mut self,
        solution: &Schedule,
        cities: &mut [City],
        report: bool,
    ) -> Result<f64, SolverError> {
        if cities.is_empty() {
            return Ok(self.evaluate(1, 0, 0.0, 0.0, 0.0, 0.0, false));
        }
        if solution.len() < self.t {
            return Err(SolverError::ScheduleTooShort {
                expected: self.t,
                got: solution.len(),
            });
        }

        let cars_per_city = cities[0].cars().len();
        let mut not_reaching_cars = 0.0;
        let mut total_avg_wait_time = 0.0;
        let mut moving_cars_amount = 0.0;
        let mut total_wait_time_punishment = 0.0;

        for city in cities.iter_mut() {
            for t in 0..self.t {
                let assignment = solution
                    .get(t)
                    .expect("schedule length checked against horizon");
                city.update_city(assignment, false)?;
            }

            total_avg_wait_time += city.total_avg_wait_time();
            not_reaching_cars += city.active_cars_amount() as f64;
            moving_cars_amount += city.total_car_movements() as f64;
            total_wait_time_punishment += city.wait_time_punishment();

            log_additional!(
                EVENT_EVALUATION,
                "City simulated over the horizon",
                avg_wait = city.total_avg_wait_time(),
                active_cars = city.active_cars_amount()
            );
            self.reporter
                .record_all_cars_arrive(city.all_cars_arrived_time() as f64);
            city.reset_city();
        }

        Ok(self.evaluate(
            cities.len(),
            cars_per_city,
            not_reaching_cars,
            total_avg_wait_time,
            moving_cars_amount,
            total_wait_time_punishment,
            report,
        ))
    }

    /// Normalizes and combines the four metrics into a single score in
    /// `[0, 4]`.
    ///
    /// Also used directly by the policy rollout with `cities_amount = 1`
    /// and the window's original car count as `cars_amount`.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &mut self,
        cities_amount: usize,
        cars_amount: usize,
        not_reaching_cars: f64,
        total_avg_wait_time: f64,
        moving_cars_amount: f64,
        total_wait_time_punishment: f64,
        report: bool,
    ) -> f64 {
        let score_not_reaching =
            self.normalize_not_reaching_cars(not_reaching_cars, cities_amount, cars_amount, report);
        let score_avg_wait_time =
            self.normalize_avg_wait_time(total_avg_wait_time, cities_amount, cars_amount, report);
        let score_moving_cars =
            self.normalize_moving_cars_amount(moving_cars_amount, cities_amount, cars_amount, report);
        let score_wait_time_punishment = self.normalize_wait_time_punishment(
            total_wait_time_punishment,
            cities_amount,
            cars_amount,
            report,
        );

        score_not_reaching + score_avg_wait_time + score_moving_cars + score_wait_time_punishment
    }

    fn normalize_not_reaching_cars(
        &mut self,
        not_reaching_cars: f64,
        cities_amount: usize,
        cars_amount: usize,
        report: bool,
    ) -> f64 {
        if report && cities_amount > 0 {
            self.reporter
                .record_not_reaching_cars(not_reaching_cars / cities_amount as f64);
        }
        if cars_amount == 0 {
            return 1.0;
        }

        let max_cars = (cars_amount * cities_amount) as f64;
        1.0 / (1.0 + not_reaching_cars / max_cars)
    }

    fn normalize_avg_wait_time(
        &mut self,
        total_avg_wait_time: f64,
        cities_amount: usize,
        cars_amount: usize,
        report: bool,
    ) -> f64 {
        if report && cities_amount > 0 {
            self.reporter
                .record_avg_wait_time(total_avg_wait_time / cities_amount as f64);
        }
        if cars_amount == 0 {
            return 1.0;
        }

        let max_waiting =
            (self.t * cars_amount * cities_amount) as f64 / (self.n * self.m) as f64;
        1.0 / (1.0 + total_avg_wait_time / max_waiting)
    }

    fn normalize_moving_cars_amount(
        &mut self,
        moving_cars_amount: f64,
        cities_amount: usize,
        cars_amount: usize,
        report: bool,
    ) -> f64 {
        if report && cities_amount > 0 {
            self.reporter
                .record_moving_cars(moving_cars_amount / cities_amount as f64);
        }
        if cars_amount == 0 {
            return 1.0;
        }

        let max_moving = (cities_amount * cars_amount * self.t) as f64;
        moving_cars_amount / max_moving
    }

    fn normalize_wait_time_punishment(
        &mut self,
        total_wait_time_punishment: f64,
        cities_amount: usize,
        cars_amount: usize,
        report: bool,
    ) -> f64 {
        if report && cities_amount > 0 {
            self.reporter
                .record_wait_punishment(total_wait_time_punishment / cities_amount as f64);
        }
        if cars_amount == 0 {
            return 1.0;
        }

        let max_punishment = ((self.t * cars_amount * cities_amount) as f64).powi(2);
        1.0 / (1.0 + total_wait_time_punishment / max_punishment)
    }
}

/// Common evaluation contract of the three solvers.
///
/// `solve` stays solver-specific: the baseline takes nothing, the genetic
/// solver takes a generation budget, the policy solver takes a city.
pub trait Solver {
    /// The solver's evaluator.
    fn evaluator_mut(&mut self) -> &mut ScheduleEvaluator;

    /// Scores a schedule against the given cities (no series recording).
    fn evaluate_solution(
        &mut self,
        solution: &Schedule,
        cities: &mut [City],
    ) -> Result<f64, SolverError> {
        self.evaluator_mut().evaluate_solution(solution, cities, false)
    }
}
