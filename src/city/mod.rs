//! # City Module
//!
//! **Top-level simulation orchestration** - owns the cars, the grid, the
//! lights and the clock, and advances them one tick at a time.
//!
//! ## Purpose
//!
//! - Builds the car population (Normal-distributed endpoints and
//!   departure times) and the junction grid
//! - Advances the whole simulation with [`City::update_city`] in the fixed
//!   per-tick order: apply lights → remove arrived → resolve moves →
//!   insert departing → update the arrival sentinel → advance the clock
//! - Resets to the initial state between evaluations, reusing the cars'
//!   prebuilt paths
//! - Extracts [`Neighborhood`] windows: deep-copied sub-grids the policy
//!   optimizer rolls forward in isolation
//!
//! ## Components
//!
//! - [`City`] - The owning simulation state machine
//! - [`Neighborhood`] - A short-lived window sandbox with its own copied
//!   cars, lights and grid
//! - [`CityError`] - Unified error type for city operations
//!
//! ## Usage
//!
//! ```rust
//! use rand::SeedableRng;
//! use traffic_phase_optim::city::City;
//! use traffic_phase_optim::geom::Direction;
//! use traffic_phase_optim::traffic_lights::Assignment;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(5);
//! let mut city = City::generate_city(8, 8, 50, &mut rng).unwrap();
//! let all_horizontal = Assignment::filled(8, 8, Direction::Horizontal);
//! for _ in 0..10 {
//!     city.update_city(&all_horizontal, false).unwrap();
//! }
//! city.reset_city();
//! assert_eq!(city.active_cars_amount(), 50);
//! ```
mod city;
mod neighborhood;

pub use self::{city::*, neighborhood::*};
