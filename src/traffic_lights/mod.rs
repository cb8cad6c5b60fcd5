//! # Traffic Lights Module
//!
//! Signal control for the junction grid.
//!
//! Every junction carries exactly one two-state light. There are no phases
//! or timers: an optimizer decides the whole light matrix anew at every
//! tick by applying an [`Assignment`] through the [`TrafficSystem`]. A
//! sequence of assignments over the simulation horizon is a [`Schedule`] -
//! the unit the optimizers search over.
//!
//! ## Components
//!
//! ### Core Structures
//! - [`TrafficLight`] - Single mutable direction, default horizontal
//! - [`TrafficLightRef`] - Shared handle (`Rc<RefCell<TrafficLight>>`) used
//!   by the grid, the city and the traffic system
//! - [`Assignment`] - An N×M direction matrix applied at a single tick
//! - [`Schedule`] - A T-long sequence of assignments
//! - [`TrafficSystem`] - Applies an assignment to the light matrix and
//!   validates its shape
//!
//! ### Error Handling
//! - [`TrafficSystemError`] - Shape-mismatch rejection
//!
//! ## Usage Examples
//!
//! ```rust
//! use traffic_phase_optim::geom::Direction;
//! use traffic_phase_optim::traffic_lights::{
//!     new_light_matrix, Assignment, TrafficSystem,
//! };
//!
//! let lights = new_light_matrix(2, 2);
//! let system = TrafficSystem::new(lights.clone());
//! let assignment = Assignment::filled(2, 2, Direction::Vertical);
//! system.apply(&assignment).unwrap();
//! assert_eq!(lights[0][0].borrow().get_direction(), Direction::Vertical);
//! ```
mod assignment;
mod light;
mod system;

pub use self::{assignment::*, light::*, system::*};
