//! # Grid Module
//!
//! The junction grid: the spatial heart of the simulation.
//!
//! ## Key Components
//!
//! ### Core Structures
//! - [`Junction`] - A grid cell holding queued cars, per-car accumulated
//!   wait counters and highway flags
//! - [`Grid`] - The 2D junction array with the per-tick two-phase move
//!   resolution and the highway layout
//!
//! ### Highway layout
//! - [`vertical_highway_cells`] / [`horizontal_highway_cells`] - Derive the
//!   fixed highway stripes from [`START_HIGHWAY`], [`END_REF`] and [`GAP`]
//!
//! ## Movement model
//!
//! Each tick the grid resolves movement in two strict phases:
//!
//! 1. **Collect** - every junction (row-major) selects up to its capacity
//!    of cars whose own next step matches the green direction, oldest
//!    waiters first.
//! 2. **Commit** - the collected cars are transferred to their target
//!    cells and advanced along their paths.
//!
//! The separation guarantees a car admitted into a cell this tick cannot
//! be moved onward out of that cell within the same tick.
//!
//! ## Capacity
//!
//! A junction lets [`REGULAR_JUNCTION_LIMIT`] cars through per tick, or
//! [`HIGHWAY_JUNCTION_LIMIT`] when the green direction matches one of its
//! highway flags.
mod grid;
mod highways;
mod junction;

pub use self::{grid::*, highways::*, junction::*};
