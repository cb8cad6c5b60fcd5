use crate::traffic_lights::{Assignment, TrafficLightRef};
use std::fmt;

/// Custom error types for `TrafficSystem`.
#[derive(Debug, Clone)]
pub enum TrafficSystemError {
    /// The assignment's shape does not match the light matrix.
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        got_rows: usize,
        got_cols: usize,
    },
}

impl fmt::Display for TrafficSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficSystemError::ShapeMismatch {
                expected_rows,
                expected_cols,
                got_rows,
                got_cols,
            } => {
                write!(
                    f,
                    "Assignment shape {}x{} does not match traffic light grid shape {}x{}",
                    got_rows, got_cols, expected_rows, expected_cols
                )
            }
        }
    }
}

impl std::error::Error for TrafficSystemError {}

/// Applies per-tick direction assignments to the shared light matrix.
///
/// The system holds handles to the same lights the junctions read, so an
/// [`apply`](TrafficSystem::apply) is immediately visible to the grid's
/// move resolution. Invalid direction values cannot occur - the element
/// type is the two-variant [`Direction`](crate::geom::Direction) enum - so
/// the only rejected input is a shape mismatch.
#[derive(Debug, Clone)]
pub struct TrafficSystem {
    /// Light handles, row-major, shared with the grid's junctions.
    lights: Vec<Vec<TrafficLightRef>>,
    rows: usize,
    cols: usize,
}

impl TrafficSystem {
    /// Creates a traffic system over an existing light matrix.
    ///
    /// # Arguments
    /// * `lights` - The shared light handles, one per junction.
    ///
    /// # Example
    /// ```
    /// use traffic_phase_optim::traffic_lights::{new_light_matrix, TrafficSystem};
    /// let lights = new_light_matrix(8, 8);
    /// let system = TrafficSystem::new(lights);
    /// ```
    pub fn new(lights: Vec<Vec<TrafficLightRef>>) -> Self {
        let rows = lights.len();
        let cols = lights.first().map_or(0, |row| row.len());
        TrafficSystem { lights, rows, cols }
    }

    /// Applies an assignment: every light takes the direction of its cell.
    ///
    /// # Arguments
    /// * `assignment` - The direction matrix for this tick.
    ///
    /// # Errors
    /// [`TrafficSystemError::ShapeMismatch`] when the assignment dimensions
    /// differ from the light matrix dimensions. The caller has violated the
    /// contract; no lights are modified in that case.
    pub fn apply(&self, assignment: &Assignment) -> Result<(), TrafficSystemError> {
        if assignment.rows() != self.rows || assignment.cols() != self.cols {
            return Err(TrafficSystemError::ShapeMismatch {
                expected_rows: self.rows,
                expected_cols: self.cols,
                got_rows: assignment.rows(),
                got_cols: assignment.cols(),
            });
        }

        for (i, row) in self.lights.iter().enumerate() {
            for (j, light) in row.iter().enumerate() {
                light.borrow_mut().set_direction(assignment.get(i, j));
            }
        }
        Ok(())
    }
}
