use crate::reporter::Reporter;
use crate::geom::Direction;
use crate::solvers::{ScheduleEvaluator, Solver};
use crate::traffic_lights::{Assignment, Schedule};

/// Produces the trivial alternating schedule: all lights horizontal on
/// even ticks, all vertical on odd ticks.
///
/// Serves as the reference point the optimizers must beat.
pub struct BaselineSolver {
    evaluator: ScheduleEvaluator,
}

impl BaselineSolver {
    /// Creates a baseline solver for `n` × `m` grids over a `t`-tick
    /// horizon.
    pub fn new(n: usize, m: usize, t: usize, reporter: Reporter) -> Self {
        BaselineSolver {
            evaluator: ScheduleEvaluator::new(n, m, t, reporter),
        }
    }

    /// Builds the alternating all-horizontal / all-vertical schedule.
    ///
    /// # Example
    /// ```
    /// use traffic_phase_optim::reporter::Reporter;
    /// use traffic_phase_optim::solvers::BaselineSolver;
    /// let solver = BaselineSolver::new(8, 8, 40, Reporter::new());
    /// let schedule = solver.solve();
    /// assert_eq!(schedule.len(), 40);
    /// ```
    pub fn solve(&self) -> Schedule {
        let n = self.evaluator.rows();
        let m = self.evaluator.cols();
        let mut schedule = Schedule::new(Vec::new());
        for t in 0..self.evaluator.horizon() {
            let direction = if t % 2 == 0 {
                Direction::Horizontal
            } else {
                Direction::Vertical
            };
            schedule.push(Assignment::filled(n, m, direction));
        }
        schedule
    }

    /// The solver's evaluator.
    pub fn evaluator(&self) -> &ScheduleEvaluator {
        &self.evaluator
    }
}

impl Solver for BaselineSolver {
    fn evaluator_mut(&mut self) -> &mut ScheduleEvaluator {
        &mut self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_pattern_with_period_two() {
        let solver = BaselineSolver::new(4, 5, 10, Reporter::new());
        let schedule = solver.solve();
        assert_eq!(schedule.len(), 10);
        for (t, assignment) in schedule.iter().enumerate() {
            let expected = if t % 2 == 0 {
                Direction::Horizontal
            } else {
                Direction::Vertical
            };
            assert!(assignment.iter().all(|direction| direction == expected));
        }
        assert_eq!(schedule.get(0), schedule.get(2));
        assert_eq!(schedule.get(1), schedule.get(3));
    }
}
