//! Environment abstractions and concrete implementations.
//!
//! Every environment implements the [`Environment`] trait so that the
//! trajectory collector can interact with it uniformly.
//!
//! Included environments:
//! - **Runner** ([`runner`]) -- a seeded three-lane endless runner with flat
//!   survival and crash rewards.
//! - **Scripted** ([`scripted`]) -- replays canned episodes and injects reset
//!   and step faults, for deterministic tests.

pub mod runner;
pub mod scripted;
pub mod traits;

pub use runner::{RunnerConfig, RunnerEnv};
pub use scripted::{ResetFault, ScriptedEnv, ScriptedEpisode, ScriptedStep};
pub use traits::{EnvError, Environment, StepOutcome};
