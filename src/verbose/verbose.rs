// src/verbose/verbose.rs
use std::sync::OnceLock;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Hierarchical logging levels for simulation and optimizer debugging.
///
/// Each level includes all lower levels, providing increasingly detailed
/// output. Uses JSON structured logging via the `tracing` crate.
///
/// # Examples
///
/// ```rust
/// use traffic_phase_optim::verbose::{VerboseLevel, set_verbose_level, is_verbose_level};
///
/// // Set logging level
/// set_verbose_level(VerboseLevel::Main);
///
/// // Check current level
/// if is_verbose_level(VerboseLevel::Main) {
///     println!("Will log major phases");
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum VerboseLevel {
    /// No debug at all
    None = 0,
    /// Major optimizer phases - `info` level
    Main = 1,
    /// Function-level details - `debug` level
    Additional = 2,
    /// Loop iterations and fine operations - `debug` level
    Detailed = 3,
    /// Everything including traces - `trace` level
    All = 4,
}

// Event type constants
pub const EVENT_CITY_CREATE: &str = "city_create";
pub const EVENT_CITY_TICK: &str = "city_tick";
pub const EVENT_CITY_RESET: &str = "city_reset";
pub const EVENT_CAR_DROPPED: &str = "car_dropped";
pub const EVENT_EVALUATION: &str = "evaluation";
pub const EVENT_GENERATION: &str = "generation";
pub const EVENT_GENERATION_BEST: &str = "generation_best";
pub const EVENT_TRAIN_CITY: &str = "train_city";
pub const EVENT_ROLLOUT: &str = "rollout";
pub const EVENT_VOTE: &str = "vote";
pub const EVENT_AGENT_SAVE: &str = "agent_save";
pub const EVENT_AGENT_LOAD: &str = "agent_load";
pub const EVENT_REPORT_SAVE: &str = "report_save";

// Global verbose level storage
static VERBOSE_LEVEL: OnceLock<VerboseLevel> = OnceLock::new();
static LOGGER_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Initialize the tracing logger once
pub fn init_logger() {
    if LOGGER_INITIALIZED.set(true).is_ok() {
        tracing_subscriber::registry()
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Sets the global verbose level and updates tracing filter
pub fn set_verbose_level(level: VerboseLevel) {
    let _ = VERBOSE_LEVEL.set(level);
    init_logger();
}

/// Gets the current global verbose level
pub fn get_verbose_level() -> VerboseLevel {
    *VERBOSE_LEVEL.get().unwrap_or(&VerboseLevel::None)
}

/// Checks if current global verbose level is at least the specified level
pub fn is_verbose_level(level: VerboseLevel) -> bool {
    get_verbose_level() >= level
}

// ===== CONVENIENCE MACROS =====

/// Logs an info-level message if the global verbose level is
/// [`VerboseLevel::Main`] or higher.
///
/// Use for major phases: generations, training cities, final results.
#[macro_export]
macro_rules! log_main {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::Main) {
            tracing::info!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}

/// Logs a debug-level message if the global verbose level is [`VerboseLevel::Additional`] or higher.
///
/// Use for function-level details such as single schedule evaluations or
/// policy rollouts.
#[macro_export]
macro_rules! log_additional {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::Additional) {
            tracing::debug!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}

/// Logs a debug-level message if the global verbose level is [`VerboseLevel::Detailed`] or higher.
///
/// Use for fine-grained details such as per-tick operations.
#[macro_export]
macro_rules! log_detailed {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),*) => {
        if $crate::verbose::is_verbose_level($crate::verbose::VerboseLevel::Detailed) {
            tracing::debug!(
                event = $event,
                $($key = $value,)*
                $msg
            );
        }
    };
}
