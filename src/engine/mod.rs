//! # engine
//!
//! The pure part of a run: no I/O, no clock, no retries.
//!
//! ```text
//! bars ─▶ volatility::estimate ─▶ trend::compute_directions ─▶ position_manager::step
//! ```

pub mod position_manager;
pub mod signal;
pub mod trend;
pub mod volatility;

pub use position_manager::{step, StepOutcome};
pub use signal::Signal;
pub use trend::{compute_directions, Direction, TrendPoint};
