//! Experiment runner: configures one solver from command-line flags,
//! runs it, and persists the reporter series.
//!
//! Exit codes: `0` success, `2` usage error, `1` internal failure.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use traffic_phase_optim::city::City;
use traffic_phase_optim::reporter::Reporter;
use traffic_phase_optim::solvers::{BaselineSolver, GeneticSolver, PpoSolver, Solver};
use traffic_phase_optim::verbose::{set_verbose_level, VerboseLevel};
use uuid::Uuid;

const USAGE: &str = "\
Usage: optimize <baseline|genetic|ppo> [options]

Common options:
  --rows N            Grid rows (default 8)
  --cols M            Grid columns (default 8)
  --horizon T         Ticks per evaluation (default 40)
  --cars C            Cars per city (default 350)
  --cities K          Cities per evaluation batch (default 1)
  --seed S            RNG seed (default 42)
  --output DIR        Reporter output directory (default ./reporter-data)
  --experiment-id ID  Experiment id (default: random UUID)
  --verbose LEVEL     none|main|additional|detailed|all (default main)

Genetic options:
  --population P      Population size (default 600)
  --mutation-rate F   Per-cell flip probability (default 0.025)
  --generations G     Generations (default 200)
  --tournament S      Tournament size (default 50)
";

struct Options {
    solver: String,
    rows: usize,
    cols: usize,
    horizon: usize,
    cars: usize,
    cities: usize,
    seed: u64,
    output: PathBuf,
    experiment_id: String,
    verbose: VerboseLevel,
    population: usize,
    mutation_rate: f64,
    generations: usize,
    tournament: usize,
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        solver: String::new(),
        rows: 8,
        cols: 8,
        horizon: 40,
        cars: 350,
        cities: 1,
        seed: 42,
        output: PathBuf::from("./reporter-data"),
        experiment_id: Uuid::new_v4().to_string(),
        verbose: VerboseLevel::Main,
        population: 600,
        mutation_rate: 0.025,
        generations: 200,
        tournament: 50,
    };

    let mut iter = args.iter();
    options.solver = iter
        .next()
        .ok_or_else(|| "missing solver name".to_string())?
        .clone();
    if !matches!(options.solver.as_str(), "baseline" | "genetic" | "ppo") {
        return Err(format!("unknown solver '{}'", options.solver));
    }

    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("flag '{}' needs a value", flag))?;
        match flag.as_str() {
            "--rows" => options.rows = parse_number(flag, value)?,
            "--cols" => options.cols = parse_number(flag, value)?,
            "--horizon" => options.horizon = parse_number(flag, value)?,
            "--cars" => options.cars = parse_number(flag, value)?,
            "--cities" => options.cities = parse_number(flag, value)?,
            "--seed" => options.seed = parse_number(flag, value)?,
            "--output" => options.output = PathBuf::from(value),
            "--experiment-id" => options.experiment_id = value.clone(),
            "--verbose" => {
                options.verbose = match value.as_str() {
                    "none" => VerboseLevel::None,
                    "main" => VerboseLevel::Main,
                    "additional" => VerboseLevel::Additional,
                    "detailed" => VerboseLevel::Detailed,
                    "all" => VerboseLevel::All,
                    other => return Err(format!("unknown verbose level '{}'", other)),
                }
            }
            "--population" => options.population = parse_number(flag, value)?,
            "--mutation-rate" => {
                options.mutation_rate = value
                    .parse()
                    .map_err(|_| format!("flag '{}' expects a float, got '{}'", flag, value))?
            }
            "--generations" => options.generations = parse_number(flag, value)?,
            "--tournament" => options.tournament = parse_number(flag, value)?,
            other => return Err(format!("unknown flag '{}'", other)),
        }
    }
    Ok(options)
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("flag '{}' expects a number, got '{}'", flag, value))
}

fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let reporter = Reporter::new();

    match options.solver.as_str() {
        "baseline" => {
            let mut solver = BaselineSolver::new(
                options.rows,
                options.cols,
                options.horizon,
                reporter,
            );
            let schedule = solver.solve();
            let mut cities = City::generate_cities(
                options.rows,
                options.cols,
                options.cars,
                options.cities,
                &mut rng,
            )?;
            let score = solver
                .evaluator_mut()
                .evaluate_solution(&schedule, &mut cities, true)?;
            println!("baseline fitness: {:.4}", score);
            solver
                .evaluator_mut()
                .reporter
                .save_all_data(&options.output, &options.experiment_id)?;
        }
        "genetic" => {
            let mut solver = GeneticSolver::new(
                options.population,
                options.mutation_rate,
                options.generations,
                options.rows,
                options.cols,
                options.horizon,
                reporter,
            )
            .with_tournament_size(options.tournament);
            let schedule = solver.solve(options.cities, options.cars, &mut rng)?;
            let mut cities = City::generate_cities(
                options.rows,
                options.cols,
                options.cars,
                options.cities,
                &mut rng,
            )?;
            let score = solver
                .evaluator_mut()
                .evaluate_solution(&schedule, &mut cities, true)?;
            println!("genetic best fitness: {:.4}", score);
            solver
                .evaluator_mut()
                .reporter
                .save_all_data(&options.output, &options.experiment_id)?;
        }
        "ppo" => {
            let mut solver = PpoSolver::new(
                options.rows,
                options.cols,
                options.horizon,
                reporter,
                options.seed,
            )
            .with_checkpoint_dir(options.output.clone());
            solver.train(options.cities, options.cars, &mut rng)?;
            let mut city = City::generate_city(
                options.rows,
                options.cols,
                options.cars,
                &mut rng,
            )?;
            let schedule = solver.solve(&mut city)?;
            let score = solver
                .evaluator_mut()
                .evaluate_solution(&schedule, std::slice::from_mut(&mut city), true)?;
            println!("ppo fitness: {:.4}", score);
            solver
                .evaluator_mut()
                .reporter
                .save_all_data(&options.output, &options.experiment_id)?;
        }
        _ => unreachable!("solver validated during parsing"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    set_verbose_level(options.verbose);

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(1)
        }
    }
}
