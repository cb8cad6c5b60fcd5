use crate::city::City;
use crate::log_main;
use crate::reporter::Reporter;
use crate::solvers::{ScheduleEvaluator, Solver, SolverError};
use crate::traffic_lights::Schedule;
use crate::verbose::{EVENT_GENERATION, EVENT_GENERATION_BEST};
use rand::Rng;

/// Default number of individuals per tournament.
pub const DEFAULT_TOURNAMENT_SIZE: usize = 50;

/// Evolutionary search over full schedules.
///
/// Each generation: score the population against a batch of cities,
/// select parents by tournament, pair consecutive parents for uniform
/// crossover, mutate every cell independently, and re-insert the previous
/// best in place of one random child.
pub struct GeneticSolver {
    evaluator: ScheduleEvaluator,
    population_size: usize,
    mutation_rate: f64,
    generations: usize,
    tournament_size: usize,
    fresh_cities_each_generation: bool,
}

impl GeneticSolver {
    /// Creates a genetic solver.
    ///
    /// # Arguments
    /// * `population_size` - Schedules per generation.
    /// * `mutation_rate` - Per-cell flip probability after crossover.
    /// * `generations` - Number of generations to evolve.
    /// * `n`, `m` - Grid dimensions.
    /// * `t` - Horizon in ticks.
    /// * `reporter` - Metric sink.
    pub fn new(
        population_size: usize,
        mutation_rate: f64,
        generations: usize,
        n: usize,
        m: usize,
        t: usize,
        reporter: Reporter,
    ) -> Self {
        GeneticSolver {
            evaluator: ScheduleEvaluator::new(n, m, t, reporter),
            population_size,
            mutation_rate,
            generations,
            tournament_size: DEFAULT_TOURNAMENT_SIZE,
            fresh_cities_each_generation: true,
        }
    }

    /// Sets the tournament size.
    pub fn with_tournament_size(mut self, tournament_size: usize) -> Self {
        self.tournament_size = tournament_size;
        self
    }

    /// Controls whether every generation is scored on a freshly generated
    /// city batch (the default) or the batch from generation zero is
    /// reused throughout the run.
    pub fn with_fresh_cities(mut self, fresh_cities_each_generation: bool) -> Self {
        self.fresh_cities_each_generation = fresh_cities_each_generation;
        self
    }

    /// Runs the evolutionary search and returns the best schedule
    /// observed.
    ///
    /// # Arguments
    /// * `num_cities` - Cities per evaluation batch.
    /// * `num_cars` - Cars per city.
    /// * `rng` - Randomness source for cities, operators and selection.
    ///
    /// # Errors
    /// [`SolverError::EmptyPopulation`] on a zero population size;
    /// city/evaluation errors are propagated.
    pub fn solve<R: Rng + ?Sized>(
        &mut self,
        num_cities: usize,
        num_cars: usize,
        rng: &mut R,
    ) -> Result<Schedule, SolverError> {
        if self.population_size == 0 {
            return Err(SolverError::EmptyPopulation);
        }

        let n = self.evaluator.rows();
        let m = self.evaluator.cols();
        let t = self.evaluator.horizon();

        let mut population: Vec<Schedule> = (0..self.population_size)
            .map(|_| Schedule::random(t, n, m, rng))
            .collect();
        let mut cities = City::generate_cities(n, m, num_cars, num_cities, rng)?;
        let mut best_overall: Option<(f64, Schedule)> = None;

        for generation in 0..self.generations {
            if self.fresh_cities_each_generation && generation > 0 {
                cities = City::generate_cities(n, m, num_cars, num_cities, rng)?;
            }

            let mut fitness_scores = Vec::with_capacity(population.len());
            for individual in &population {
                let score = self
                    .evaluator
                    .evaluate_solution(individual, &mut cities, false)?;
                fitness_scores.push(score);
            }

            let (best_index, best_fitness) = argmax(&fitness_scores);
            let best_solution = population[best_index].clone();

            log_main!(
                EVENT_GENERATION,
                "Generation scored",
                generation = generation + 1,
                best_fitness = best_fitness
            );

            // Metric series for the generation's best individual.
            self.evaluator
                .evaluate_solution(&best_solution, &mut cities, true)?;
            self.evaluator
                .reporter
                .record_best_solutions(best_fitness, best_solution.clone());

            if best_overall
                .as_ref()
                .is_none_or(|(score, _)| best_fitness > *score)
            {
                best_overall = Some((best_fitness, best_solution.clone()));
            }

            let parents = self.tournament_selection(&population, &fitness_scores, rng);
            let mut children = self.create_children(&parents, rng);

            // Elitism: the generation's best survives in a random slot.
            let slot = rng.random_range(0..children.len());
            children[slot] = best_solution;
            population = children;
        }

        let (final_fitness, final_solution) = best_overall.unwrap_or_else(|| {
            // Unreachable with generations > 0; fall back to the first
            // individual for a degenerate zero-generation run.
            (0.0, population[0].clone())
        });
        self.evaluator
            .reporter
            .record_best_solutions(final_fitness, final_solution.clone());
        log_main!(
            EVENT_GENERATION_BEST,
            "Evolution finished",
            best_fitness = final_fitness
        );
        Ok(final_solution)
    }

    /// Tournament selection: `population_size` winners drawn with
    /// replacement across tournaments, without replacement within one.
    fn tournament_selection<R: Rng + ?Sized>(
        &self,
        population: &[Schedule],
        fitness_scores: &[f64],
        rng: &mut R,
    ) -> Vec<Schedule> {
        let tournament_size = self.tournament_size.min(population.len()).max(1);
        (0..self.population_size)
            .map(|_| {
                let contenders = rand::seq::index::sample(rng, population.len(), tournament_size);
                let winner = contenders
                    .iter()
                    .max_by(|&a, &b| fitness_scores[a].total_cmp(&fitness_scores[b]))
                    .unwrap_or(0);
                population[winner].clone()
            })
            .collect()
    }

    /// Pairs consecutive parents and emits two mutated crossover children
    /// per pair.
    fn create_children<R: Rng + ?Sized>(
        &self,
        parents: &[Schedule],
        rng: &mut R,
    ) -> Vec<Schedule> {
        let mut children = Vec::with_capacity(self.population_size);
        let mut index = 0;
        while children.len() < self.population_size {
            let parent1 = &parents[index % parents.len()];
            let parent2 = &parents[(index + 1) % parents.len()];

            let mut child1 = self.uniform_crossover(parent1, parent2, rng);
            self.mutate(&mut child1, rng);
            children.push(child1);

            if children.len() < self.population_size {
                let mut child2 = self.uniform_crossover(parent2, parent1, rng);
                self.mutate(&mut child2, rng);
                children.push(child2);
            }
            index += 2;
        }
        children
    }

    /// Uniform crossover: every cell drawn independently from either
    /// parent with equal probability.
    fn uniform_crossover<R: Rng + ?Sized>(
        &self,
        parent1: &Schedule,
        parent2: &Schedule,
        rng: &mut R,
    ) -> Schedule {
        let mut child = parent1.clone();
        for t in 0..child.len() {
            let donor = parent2
                .get(t)
                .expect("parents share the schedule shape");
            let assignment = child
                .get_mut(t)
                .expect("child inherits the schedule shape");
            for i in 0..assignment.rows() {
                for j in 0..assignment.cols() {
                    if rng.random_bool(0.5) {
                        assignment.set(i, j, donor.get(i, j));
                    }
                }
            }
        }
        child
    }

    /// Flips every cell independently with the mutation rate.
    fn mutate<R: Rng + ?Sized>(&self, solution: &mut Schedule, rng: &mut R) {
        for t in 0..solution.len() {
            let assignment = solution.get_mut(t).expect("index within schedule");
            for i in 0..assignment.rows() {
                for j in 0..assignment.cols() {
                    if rng.random::<f64>() < self.mutation_rate {
                        assignment.flip(i, j);
                    }
                }
            }
        }
    }
}

impl Solver for GeneticSolver {
    fn evaluator_mut(&mut self) -> &mut ScheduleEvaluator {
        &mut self.evaluator
    }
}

fn argmax(scores: &[f64]) -> (usize, f64) {
    let mut best_index = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (index, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_index = index;
            best_score = score;
        }
    }
    (best_index, best_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_population_is_rejected() {
        let mut solver = GeneticSolver::new(0, 0.01, 1, 4, 4, 5, Reporter::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            solver.solve(1, 5, &mut rng),
            Err(SolverError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_crossover_cells_come_from_a_parent() {
        let solver = GeneticSolver::new(2, 0.0, 1, 3, 3, 4, Reporter::new());
        let mut rng = StdRng::seed_from_u64(7);
        let parent1 = Schedule::random(4, 3, 3, &mut rng);
        let parent2 = Schedule::random(4, 3, 3, &mut rng);
        let child = solver.uniform_crossover(&parent1, &parent2, &mut rng);

        for t in 0..4 {
            for i in 0..3 {
                for j in 0..3 {
                    let cell = child.get(t).unwrap().get(i, j);
                    let from_p1 = parent1.get(t).unwrap().get(i, j);
                    let from_p2 = parent2.get(t).unwrap().get(i, j);
                    assert!(cell == from_p1 || cell == from_p2);
                }
            }
        }
    }

    #[test]
    fn test_zero_mutation_preserves_schedules() {
        let solver = GeneticSolver::new(2, 0.0, 1, 3, 3, 4, Reporter::new());
        let mut rng = StdRng::seed_from_u64(9);
        let original = Schedule::random(4, 3, 3, &mut rng);
        let mut mutated = original.clone();
        solver.mutate(&mut mutated, &mut rng);
        assert_eq!(original, mutated);
    }

    #[test]
    fn test_full_mutation_flips_every_cell() {
        let solver = GeneticSolver::new(2, 1.0, 1, 3, 3, 2, Reporter::new());
        let mut rng = StdRng::seed_from_u64(9);
        let original = Schedule::random(2, 3, 3, &mut rng);
        let mut mutated = original.clone();
        solver.mutate(&mut mutated, &mut rng);
        for t in 0..2 {
            for i in 0..3 {
                for j in 0..3 {
                    assert_eq!(
                        mutated.get(t).unwrap().get(i, j),
                        original.get(t).unwrap().get(i, j).flipped()
                    );
                }
            }
        }
    }

    #[test]
    fn test_tournament_picks_a_high_scorer() {
        let solver = GeneticSolver::new(4, 0.0, 1, 2, 2, 2, Reporter::new())
            .with_tournament_size(4);
        let mut rng = StdRng::seed_from_u64(3);
        let population: Vec<Schedule> =
            (0..4).map(|_| Schedule::random(2, 2, 2, &mut rng)).collect();
        let scores = [0.1, 0.9, 0.4, 0.2];

        // Tournament of the whole population must always pick the best.
        let parents = solver.tournament_selection(&population, &scores, &mut rng);
        for parent in &parents {
            assert_eq!(parent, &population[1]);
        }
    }

    #[test]
    fn test_small_run_produces_valid_schedule() {
        let mut solver = GeneticSolver::new(6, 0.05, 2, 4, 4, 6, Reporter::new())
            .with_tournament_size(3);
        let mut rng = StdRng::seed_from_u64(77);
        let schedule = solver.solve(1, 10, &mut rng).unwrap();
        assert_eq!(schedule.len(), 6);
        assert!(!solver.evaluator.reporter.best_solutions().is_empty());
    }
}
