//! # Geometry Module
//!
//! Grid-space primitives for the simulation.
//!
//! ## Key Components
//!
//! - [`Coordinate`] - Integer position `(x, y)` on the junction grid
//! - [`Direction`] - Two-valued light/step direction tag
//!
//! ## Conventions
//!
//! `x` indexes rows, `y` indexes columns. [`Direction::Horizontal`] means a
//! step of `+1` along `y`; [`Direction::Vertical`] means a step of `+1`
//! along `x`. This mapping is fixed here and used consistently by the path
//! generator, the grid move resolution and the neighborhood state encoding.
//!
//! The reserved value [`Coordinate::none`] (`(-1, -1)`) means
//! "no candidate" and is produced by lookups that found nothing.
//!
//! ## Usage Examples
//!
//! ```rust
//! use traffic_phase_optim::geom::{Coordinate, Direction};
//!
//! let src = Coordinate::new(0, 0);
//! let dst = Coordinate::new(2, 2);
//! assert_eq!(src.manhattan_distance_to(&dst), 4);
//!
//! let step = src.step(Direction::Vertical);
//! assert_eq!(step, Coordinate::new(1, 0));
//! ```

mod coordinate;
mod direction;

pub use self::{coordinate::*, direction::*};
