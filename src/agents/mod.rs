// src/agents/mod.rs
//! # Agents Module
//!
//! This module provides the car agents that traverse the junction grid.
//!
//! ## Key Components
//!
//! - [`Car`] - A single car with a source, destination and a path that is
//!   sampled once at construction and never mutated afterwards
//! - [`CarRef`] - Shared handle (`Rc<RefCell<Car>>`) used by the city and
//!   the junctions
//!
//! ## Path model
//!
//! A path is a sequence of unit Manhattan steps that never overshoots the
//! destination on either axis. At highway cells the path follows the
//! highway direction; elsewhere the step axis is drawn with probability
//! proportional to the remaining distance per axis, and a small fraction
//! of steps ([`NOISE_CAR_PATH`]) is flipped to the other axis.
//!
//! ## Usage
//!
//! ```rust
//! use rand::SeedableRng;
//! use traffic_phase_optim::agents::Car;
//! use traffic_phase_optim::geom::{Coordinate, Direction};
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(11);
//! // No highways anywhere: every cell reports both directions.
//! let car = Car::new("car_0")
//!     .with_source(Coordinate::new(0, 0))
//!     .with_destination(Coordinate::new(2, 2))
//!     .with_start_time(0)
//!     .build_with_route(|_| vec![Direction::Horizontal, Direction::Vertical], &mut rng);
//! assert_eq!(car.path().len(), 5);
//! ```
mod car;

pub use self::car::*;
