//! Recurrent n-step trajectory collection for RL agents.
//!
//! Drives a memory-augmented agent against a live, partially observable
//! environment and turns the resulting stream of steps into overlapping
//! n-step windows, handling recurrent-state resets, episode-boundary flushes
//! and the removal of transitions contaminated by the game-over screen.

pub mod agent;
pub mod config;
pub mod env;
pub mod trajectory;
