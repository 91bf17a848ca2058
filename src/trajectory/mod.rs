//! Trajectory types and collection for turning agent-environment interaction
//! into n-step training windows.
//!
//! This module provides:
//! - [`types::Transition`], [`types::Window`], [`types::RecurrentState`] -- the
//!   data handed to the training loop.
//! - [`recurrent::RecurrentStateCarrier`] -- zeroes the recurrent state at each
//!   episode start and threads it forward otherwise.
//! - [`window::WindowBuffer`] -- the bounded history that windows are cut from.
//! - [`rewards::RewardAccumulator`] -- per-episode reward totals with a
//!   drainable log.
//! - [`collector::TrajectoryCollector`] -- the orchestration layer that drives
//!   the agent-environment loop and yields windows.

pub mod collector;
pub mod error;
pub mod recurrent;
pub mod rewards;
pub mod types;
pub mod window;

// Re-export the most commonly used items at the module level.
pub use collector::{CollectResult, TrajectoryCollector};
pub use error::CollectorError;
pub use recurrent::RecurrentStateCarrier;
pub use rewards::RewardAccumulator;
pub use types::{RecurrentState, Transition, Window};
pub use window::WindowBuffer;
