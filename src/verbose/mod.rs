//! # Logging Module
//!
//! Structured logging system for simulation and optimizer debugging.
//!
//! This module provides hierarchical logging levels and structured event
//! tracking using the `tracing` crate with JSON output format.
//!
//! **Most of time end-developer should not use this module directly, except
//! for setting the global logging level and using logging macros.**
//!
//! ## Components
//!
//! - [`VerboseLevel`] - Hierarchical debug levels (None → Main → Additional → Detailed → All)
//! - Event constants - Predefined event types for simulation and optimizer phases
//! - Macros - `log_main!`, `log_additional!`, `log_detailed!`
//!
//! ## Quick Start
//!
//! ```rust
//! use traffic_phase_optim::verbose::{set_verbose_level, VerboseLevel, EVENT_CITY_TICK};
//! use traffic_phase_optim::log_main;
//!
//! // Set global logging level
//! set_verbose_level(VerboseLevel::Main);
//!
//! // Log simulation events
//! log_main!(EVENT_CITY_TICK, "Advancing city", tick = 42);
//! ```
//!
//! ## Logging Levels
//!
//! - `None` - No logging
//! - `Main` - Major phases (generations, training cities) only
//! - `Additional` - Per-evaluation and per-rollout details
//! - `Detailed` - Per-tick operations
//! - `All` - Everything (trace level)
pub mod verbose;

pub use self::verbose::*;
