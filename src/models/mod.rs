//! # models
//!
//! Plain data shared by the engine, the adapters and the coordinator.

pub mod bar;
pub mod position;

pub use bar::Bar;
pub use position::{OpenPosition, PositionState, Side, NUM_TP};
