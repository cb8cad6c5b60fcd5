use crate::geom::Direction;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An N×M matrix of light directions applied to the grid at a single tick.
///
/// Stored row-major in a flat vector. Cell `(i, j)` is the direction for
/// the light at row `i`, column `j`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    rows: usize,
    cols: usize,
    cells: Vec<Direction>,
}

impl Assignment {
    /// Creates an assignment with every cell set to the same direction.
    ///
    /// # Arguments
    /// * `rows` - Number of grid rows.
    /// * `cols` - Number of grid columns.
    /// * `direction` - The direction for every cell.
    ///
    /// # Example
    /// ```
    /// use traffic_phase_optim::geom::Direction;
    /// use traffic_phase_optim::traffic_lights::Assignment;
    /// let assignment = Assignment::filled(8, 8, Direction::Horizontal);
    /// assert_eq!(assignment.get(3, 5), Direction::Horizontal);
    /// ```
    pub fn filled(rows: usize, cols: usize, direction: Direction) -> Self {
        Assignment {
            rows,
            cols,
            cells: vec![direction; rows * cols],
        }
    }

    /// Creates an assignment with every cell drawn uniformly at random.
    ///
    /// # Arguments
    /// * `rows` - Number of grid rows.
    /// * `cols` - Number of grid columns.
    /// * `rng` - Randomness source.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Assignment {
            rows,
            cols,
            cells: (0..rows * cols).map(|_| Direction::random(rng)).collect(),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the direction at `(i, j)`.
    ///
    /// Panics if `(i, j)` is outside the matrix; callers index within the
    /// dimensions they constructed.
    pub fn get(&self, i: usize, j: usize) -> Direction {
        debug_assert!(i < self.rows && j < self.cols);
        self.cells[i * self.cols + j]
    }

    /// Sets the direction at `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, direction: Direction) {
        debug_assert!(i < self.rows && j < self.cols);
        self.cells[i * self.cols + j] = direction;
    }

    /// Flips the direction at `(i, j)`.
    pub fn flip(&mut self, i: usize, j: usize) {
        let flipped = self.get(i, j).flipped();
        self.set(i, j, flipped);
    }

    /// Iterates over all cells row-major.
    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        self.cells.iter().copied()
    }
}

impl fmt::Display for Assignment {
    /// Renders the matrix as one `H`/`V` letter per cell, one row per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                let letter = match self.get(i, j) {
                    Direction::Horizontal => 'H',
                    Direction::Vertical => 'V',
                };
                write!(f, "{}", letter)?;
            }
            if i + 1 < self.rows {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// A sequence of assignments across the simulation horizon - the plan the
/// optimizers produce and the evaluator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    ticks: Vec<Assignment>,
}

impl Schedule {
    /// Wraps a list of per-tick assignments into a schedule.
    pub fn new(ticks: Vec<Assignment>) -> Self {
        Schedule { ticks }
    }

    /// Creates a schedule of `t` uniformly random assignments.
    ///
    /// # Example
    /// ```
    /// use rand::SeedableRng;
    /// use traffic_phase_optim::traffic_lights::Schedule;
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    /// let schedule = Schedule::random(40, 8, 8, &mut rng);
    /// assert_eq!(schedule.len(), 40);
    /// ```
    pub fn random<R: Rng + ?Sized>(t: usize, rows: usize, cols: usize, rng: &mut R) -> Self {
        Schedule {
            ticks: (0..t).map(|_| Assignment::random(rows, cols, rng)).collect(),
        }
    }

    /// Number of ticks covered by the schedule.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Returns `true` if the schedule covers no ticks.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Returns the assignment for tick `t`, if covered.
    pub fn get(&self, t: usize) -> Option<&Assignment> {
        self.ticks.get(t)
    }

    /// Mutable access to the assignment for tick `t`.
    pub fn get_mut(&mut self, t: usize) -> Option<&mut Assignment> {
        self.ticks.get_mut(t)
    }

    /// Appends an assignment for the next tick.
    pub fn push(&mut self, assignment: Assignment) {
        self.ticks.push(assignment);
    }

    /// Iterates over the per-tick assignments.
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.ticks.iter()
    }
}
