use lazy_static::lazy_static;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Custom error types for `Direction`.
#[derive(Debug, Clone)]
pub enum DirectionError {
    /// Indicates that the provided direction string is invalid.
    InvalidDirection(String),
}

impl fmt::Display for DirectionError {
    /// Formats the error message for `DirectionError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionError::InvalidDirection(value) => {
                write!(f, "Invalid direction: '{}'", value)
            }
        }
    }
}

impl std::error::Error for DirectionError {}

lazy_static! {
    static ref DIRECTION_CONVERTER: HashMap<&'static str, Direction> = {
        let mut m = HashMap::new();
        m.insert("h", Direction::Horizontal);
        m.insert("H", Direction::Horizontal);
        m.insert("horizontal", Direction::Horizontal);
        m.insert("v", Direction::Vertical);
        m.insert("V", Direction::Vertical);
        m.insert("vertical", Direction::Vertical);
        m
    };
}

/// Represents the two possible green directions of a traffic light, which
/// double as the two possible step directions of a car.
///
/// `Horizontal` corresponds to movement along increasing column index `y`;
/// `Vertical` corresponds to movement along increasing row index `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Green for cars crossing along the columns axis (`+y`).
    Horizontal,
    /// Green for cars crossing along the rows axis (`+x`).
    Vertical,
}

impl Direction {
    /// Returns the opposite direction.
    ///
    /// # Example
    ///
    /// ```
    /// use traffic_phase_optim::geom::Direction;
    /// assert_eq!(Direction::Horizontal.flipped(), Direction::Vertical);
    /// ```
    pub fn flipped(self) -> Direction {
        match self {
            Direction::Horizontal => Direction::Vertical,
            Direction::Vertical => Direction::Horizontal,
        }
    }

    /// Draws a uniformly random direction.
    ///
    /// # Example
    ///
    /// ```
    /// use traffic_phase_optim::geom::Direction;
    /// let mut rng = rand::rng();
    /// let direction = Direction::random(&mut rng);
    /// assert!(direction == Direction::Horizontal || direction == Direction::Vertical);
    /// ```
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Direction {
        if rng.random_bool(0.5) {
            Direction::Horizontal
        } else {
            Direction::Vertical
        }
    }
}

impl fmt::Display for Direction {
    /// Formats the direction for display.
    ///
    /// Returns a short, lowercase string representation suitable for
    /// logging, debugging, and user interfaces.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use traffic_phase_optim::geom::Direction;
    ///
    /// assert_eq!(format!("{}", Direction::Horizontal), "horizontal");
    /// assert_eq!(format!("{}", Direction::Vertical), "vertical");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Horizontal => write!(f, "horizontal"),
            Direction::Vertical => write!(f, "vertical"),
        }
    }
}

impl FromStr for Direction {
    type Err = DirectionError;

    /// Parses a direction from the strings accepted by the experiment CLI:
    /// `h`, `H`, `horizontal`, `v`, `V`, `vertical`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DIRECTION_CONVERTER
            .get(s)
            .copied()
            .ok_or_else(|| DirectionError::InvalidDirection(s.to_string()))
    }
}
