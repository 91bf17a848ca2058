//! Agent module: the recurrent policy contract and the action set.
//!
//! The collector only needs [`Agent::act`]; concrete models live outside this
//! crate. [`RandomAgent`] is a seeded baseline and [`ScriptedAgent`] replays a
//! fixed action sequence for deterministic tests.

pub mod action;
pub mod policy;
pub mod random;

pub use action::{Action, ActionSpace, ACTION_NAMES};
pub use policy::{Agent, AgentOutput, ScriptedAgent};
pub use random::RandomAgent;
