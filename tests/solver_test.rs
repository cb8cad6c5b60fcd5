use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use traffic_phase_optim::city::City;
use traffic_phase_optim::geom::Direction;
use traffic_phase_optim::reporter::Reporter;
use traffic_phase_optim::solvers::{
    BaselineSolver, GeneticSolver, PpoSolver, Solver, SolverError,
};

/// The baseline schedule scored on a pinned seed is reproducible and
/// inside the fitness range.
#[test]
fn test_baseline_score_is_deterministic_and_in_range() {
    let mut scores = Vec::new();
    for _ in 0..2 {
        let mut rng = StdRng::seed_from_u64(20_24);
        let mut cities = City::generate_cities(8, 8, 350, 1, &mut rng).unwrap();
        let mut solver = BaselineSolver::new(8, 8, 40, Reporter::new());
        let schedule = solver.solve();
        scores.push(
            solver
                .evaluate_solution(&schedule, &mut cities)
                .unwrap(),
        );
    }
    assert_eq!(scores[0], scores[1]);
    assert!((0.0..=4.0).contains(&scores[0]));
}

/// The baseline schedule starts all-horizontal, alternates, and has
/// period two.
#[test]
fn test_baseline_schedule_shape() {
    let solver = BaselineSolver::new(8, 8, 40, Reporter::new());
    let schedule = solver.solve();
    assert_eq!(schedule.len(), 40);
    assert!(schedule
        .get(0)
        .unwrap()
        .iter()
        .all(|d| d == Direction::Horizontal));
    assert!(schedule
        .get(1)
        .unwrap()
        .iter()
        .all(|d| d == Direction::Vertical));
    for t in 0..38 {
        assert_eq!(schedule.get(t), schedule.get(t + 2));
    }
}

/// With elitism active and a fixed city batch, the recorded
/// per-generation best fitness never decreases.
#[test]
fn test_genetic_elitism_keeps_best_fitness_monotone() {
    let generations = 4;
    let mut solver = GeneticSolver::new(8, 0.0, generations, 4, 4, 6, Reporter::new())
        .with_tournament_size(4)
        .with_fresh_cities(false);
    let mut rng = StdRng::seed_from_u64(31);
    solver.solve(1, 12, &mut rng).unwrap();

    let best_per_generation: Vec<f64> = solver
        .evaluator_mut()
        .reporter
        .best_solutions()
        .iter()
        .take(generations)
        .map(|entry| entry.fitness)
        .collect();
    assert_eq!(best_per_generation.len(), generations);
    for pair in best_per_generation.windows(2) {
        assert!(
            pair[1] >= pair[0],
            "best fitness dropped: {:?}",
            best_per_generation
        );
    }
}

/// The returned schedule is the best individual observed across the run.
#[test]
fn test_genetic_returns_best_observed() {
    let mut solver = GeneticSolver::new(6, 0.05, 3, 4, 4, 6, Reporter::new())
        .with_tournament_size(3)
        .with_fresh_cities(false);
    let mut rng = StdRng::seed_from_u64(8);
    let best = solver.solve(1, 12, &mut rng).unwrap();

    let recorded = solver.evaluator_mut().reporter.best_solutions();
    let top = recorded
        .iter()
        .map(|entry| entry.fitness)
        .fold(f64::NEG_INFINITY, f64::max);
    // The final record holds the returned schedule with the top fitness.
    let last = recorded.last().unwrap();
    assert_eq!(last.solution, best);
    assert_eq!(last.fitness, top);
}

/// Window votes aggregate by per-cell majority with ties to horizontal.
#[test]
fn test_vote_aggregation_majorities_and_ties() {
    let solver = PpoSolver::new(4, 4, 5, Reporter::new(), 0);
    // Four sliding windows on 4x4. Window (0,0) votes all-vertical
    // (action 511), the rest all-horizontal (action 0).
    let actions = vec![511usize, 0, 0, 0];
    let assignment = solver.vote_on_assignment(&actions);

    // (0,0) is covered only by the vertical window.
    assert_eq!(assignment.get(0, 0), Direction::Vertical);
    // (3,3) is covered only by window (1,1): horizontal.
    assert_eq!(assignment.get(3, 3), Direction::Horizontal);
    // (1,1) is covered by all four windows: 1 vertical vs 3 horizontal.
    assert_eq!(assignment.get(1, 1), Direction::Horizontal);
    // (0,1) is covered by windows (0,0) and (0,1): a 1-1 tie goes
    // horizontal.
    assert_eq!(assignment.get(0, 1), Direction::Horizontal);
}

/// Decomposing the tallies back onto the windows reproduces them.
#[test]
fn test_vote_tallies_are_consistent_with_decomposition() {
    let solver = PpoSolver::new(5, 5, 5, Reporter::new(), 0);
    let mut rng = StdRng::seed_from_u64(77);
    let windows = solver.neighborhood_count();
    let actions: Vec<usize> = (0..windows).map(|_| rng.random_range(0..512)).collect();

    let tallies = solver.vote_tallies(&actions);
    // Every cell's vote total equals the number of windows covering it,
    // and the grand total is windows x 9.
    let grand_total: u32 = tallies.iter().map(|[h, v]| h + v).sum();
    assert_eq!(grand_total, (windows * 9) as u32);
    // A corner is covered exactly once.
    assert_eq!(tallies[0][0] + tallies[0][1], 1);
}

/// A policy-produced schedule covers the horizon and scores inside the
/// fitness range.
#[test]
fn test_ppo_schedule_is_scoreable() {
    let mut rng = StdRng::seed_from_u64(64);
    let mut city = City::generate_city(6, 6, 40, &mut rng).unwrap();
    let mut solver = PpoSolver::new(6, 6, 12, Reporter::new(), 7);

    let schedule = solver.solve(&mut city).unwrap();
    assert_eq!(schedule.len(), 12);

    let score = solver
        .evaluate_solution(&schedule, std::slice::from_mut(&mut city))
        .unwrap();
    assert!((0.0..=4.0).contains(&score));
}

/// Short PPO training drives the whole pipeline: warm-up, rollouts,
/// learning passes, per-city schedule scoring and checkpointing.
#[test]
fn test_ppo_training_records_and_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let mut solver = PpoSolver::new(4, 4, 10, Reporter::new(), 11)
        .with_checkpoint_dir(dir.path().to_path_buf());
    let mut rng = StdRng::seed_from_u64(90);
    solver.train(1, 8, &mut rng).unwrap();

    assert!(!solver.evaluator_mut().reporter.best_solutions().is_empty());
    // The best-so-far checkpoint was written.
    assert!(dir.path().join("actor.json").exists());
    assert!(dir.path().join("critic.json").exists());
    assert!(dir.path().join("best_solutions_ppo_best.json").exists());
}

/// Reporter data written by a solver run round-trips from disk.
#[test]
fn test_reporter_round_trip_through_a_run() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut cities = City::generate_cities(8, 8, 60, 1, &mut rng).unwrap();
    let mut solver = BaselineSolver::new(8, 8, 40, Reporter::new());
    let schedule = solver.solve();
    let score = solver
        .evaluator_mut()
        .evaluate_solution(&schedule, &mut cities, true)
        .unwrap();
    solver
        .evaluator_mut()
        .reporter
        .record_best_solutions(score, schedule);

    let dir = tempfile::tempdir().unwrap();
    solver
        .evaluator_mut()
        .reporter
        .save_all_data(dir.path(), "trip")
        .unwrap();
    let loaded = Reporter::load_all_data(dir.path(), "trip").unwrap();

    assert_eq!(
        loaded.best_solutions(),
        solver.evaluator_mut().reporter.best_solutions()
    );
    assert_eq!(
        loaded.all_cars_arrive_times(),
        solver.evaluator_mut().reporter.all_cars_arrive_times()
    );
    assert_eq!(loaded.wait_times().len(), 1);
    assert_eq!(loaded.not_reaching_cars().len(), 1);
}

/// A schedule shorter than the horizon is a contract violation.
#[test]
fn test_short_schedule_is_rejected() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut cities = City::generate_cities(8, 8, 10, 1, &mut rng).unwrap();
    let mut short_solver = BaselineSolver::new(8, 8, 10, Reporter::new());
    let short_schedule = short_solver.solve();

    let mut solver = BaselineSolver::new(8, 8, 40, Reporter::new());
    let result = solver.evaluate_solution(&short_schedule, &mut cities);
    assert!(matches!(
        result,
        Err(SolverError::ScheduleTooShort { expected: 40, got: 10 })
    ));
}
