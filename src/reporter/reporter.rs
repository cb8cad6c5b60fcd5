use crate::log_additional;
use crate::traffic_lights::Schedule;
use crate::verbose::EVENT_REPORT_SAVE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Custom error types for `Reporter` persistence.
#[derive(Debug)]
pub enum ReporterError {
    /// Filesystem failure while writing or reading a series file.
    Io(std::io::Error),
    /// A series file did not contain the expected JSON document.
    Serde(serde_json::Error),
}

impl fmt::Display for ReporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReporterError::Io(err) => write!(f, "Reporter I/O failure: {}", err),
            ReporterError::Serde(err) => write!(f, "Reporter serialization failure: {}", err),
        }
    }
}

impl std::error::Error for ReporterError {}

impl From<std::io::Error> for ReporterError {
    fn from(err: std::io::Error) -> Self {
        ReporterError::Io(err)
    }
}

impl From<serde_json::Error> for ReporterError {
    fn from(err: serde_json::Error) -> Self {
        ReporterError::Serde(err)
    }
}

/// One recorded `(fitness, schedule)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSolution {
    pub fitness: f64,
    pub solution: Schedule,
}

/// Append-only time-series sinks keyed by metric name.
///
/// The reporter is a plain handle passed into the solvers; it never blocks
/// the hot path beyond a vector push. Each `record_*` method appends to
/// its own series.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Reporter {
    wait_times: Vec<f64>,
    all_cars_arrive_time: Vec<f64>,
    not_reaching_cars: Vec<f64>,
    moving_cars_amount: Vec<f64>,
    wait_time_punishment: Vec<f64>,
    best_solutions: Vec<BestSolution>,
}

impl Reporter {
    /// Creates an empty reporter.
    pub fn new() -> Self {
        Reporter::default()
    }

    /// Appends to the average-wait-time series.
    pub fn record_avg_wait_time(&mut self, avg_wait_time: f64) {
        self.wait_times.push(avg_wait_time);
    }

    /// Appends to the all-cars-arrived-tick series.
    pub fn record_all_cars_arrive(&mut self, time: f64) {
        self.all_cars_arrive_time.push(time);
    }

    /// Appends to the not-reaching-cars series.
    pub fn record_not_reaching_cars(&mut self, cars_num: f64) {
        self.not_reaching_cars.push(cars_num);
    }

    /// Appends to the moving-cars series.
    pub fn record_moving_cars(&mut self, moving_cars: f64) {
        self.moving_cars_amount.push(moving_cars);
    }

    /// Appends to the wait-punishment series.
    pub fn record_wait_punishment(&mut self, wait_punishment: f64) {
        self.wait_time_punishment.push(wait_punishment);
    }

    /// Appends to the best-solutions stream.
    pub fn record_best_solutions(&mut self, fitness: f64, solution: Schedule) {
        self.best_solutions.push(BestSolution { fitness, solution });
    }

    /// The average-wait-time series.
    pub fn wait_times(&self) -> &[f64] {
        &self.wait_times
    }

    /// The all-cars-arrived-tick series.
    pub fn all_cars_arrive_times(&self) -> &[f64] {
        &self.all_cars_arrive_time
    }

    /// The not-reaching-cars series.
    pub fn not_reaching_cars(&self) -> &[f64] {
        &self.not_reaching_cars
    }

    /// The moving-cars series.
    pub fn moving_cars_amounts(&self) -> &[f64] {
        &self.moving_cars_amount
    }

    /// The wait-punishment series.
    pub fn wait_time_punishments(&self) -> &[f64] {
        &self.wait_time_punishment
    }

    /// The best-solutions stream.
    pub fn best_solutions(&self) -> &[BestSolution] {
        &self.best_solutions
    }

    /// Persists every series plus the best-solutions stream into
    /// `directory`, one JSON file per series suffixed with
    /// `experiment_id`. The directory is created if missing.
    pub fn save_all_data(&self, directory: &Path, experiment_id: &str) -> Result<(), ReporterError> {
        fs::create_dir_all(directory)?;
        write_series(directory, "wait_times", experiment_id, &self.wait_times)?;
        write_series(
            directory,
            "all_cars_arrive_time",
            experiment_id,
            &self.all_cars_arrive_time,
        )?;
        write_series(
            directory,
            "not_reaching_cars",
            experiment_id,
            &self.not_reaching_cars,
        )?;
        write_series(
            directory,
            "moving_cars_amount",
            experiment_id,
            &self.moving_cars_amount,
        )?;
        write_series(
            directory,
            "wait_time_punishment",
            experiment_id,
            &self.wait_time_punishment,
        )?;

        let best_path = directory.join(format!("best_solutions_{}.json", experiment_id));
        fs::write(&best_path, serde_json::to_vec(&self.best_solutions)?)?;

        log_additional!(
            EVENT_REPORT_SAVE,
            "Reporter series persisted",
            experiment_id = experiment_id,
            best_solutions = self.best_solutions.len()
        );
        Ok(())
    }

    /// Reconstructs a reporter from files written by
    /// [`Reporter::save_all_data`] with the same directory and experiment
    /// id.
    pub fn load_all_data(directory: &Path, experiment_id: &str) -> Result<Self, ReporterError> {
        let best_path = directory.join(format!("best_solutions_{}.json", experiment_id));
        Ok(Reporter {
            wait_times: read_series(directory, "wait_times", experiment_id)?,
            all_cars_arrive_time: read_series(directory, "all_cars_arrive_time", experiment_id)?,
            not_reaching_cars: read_series(directory, "not_reaching_cars", experiment_id)?,
            moving_cars_amount: read_series(directory, "moving_cars_amount", experiment_id)?,
            wait_time_punishment: read_series(directory, "wait_time_punishment", experiment_id)?,
            best_solutions: serde_json::from_slice(&fs::read(&best_path)?)?,
        })
    }
}

fn write_series(
    directory: &Path,
    name: &str,
    experiment_id: &str,
    series: &[f64],
) -> Result<(), ReporterError> {
    let path = directory.join(format!("{}_{}.json", name, experiment_id));
    fs::write(&path, serde_json::to_vec(series)?)?;
    Ok(())
}

fn read_series(
    directory: &Path,
    name: &str,
    experiment_id: &str,
) -> Result<Vec<f64>, ReporterError> {
    let path = directory.join(format!("{}_{}.json", name, experiment_id));
    Ok(serde_json::from_slice(&fs::read(&path)?)?)
}
