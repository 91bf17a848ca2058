//! Core environment trait and shared types.
//!
//! Every environment implements [`Environment`] so the trajectory collector can
//! drive it uniformly. Screen capture, input injection and any polling or
//! backoff live behind this trait.

use thiserror::Error;

use crate::agent::Action;

/// The result of executing one action.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome<O> {
    /// The next observation. `None` only when `done` is set and no further
    /// frame could be captured.
    pub observation: Option<O>,
    /// The scalar reward for this transition.
    pub reward: f64,
    /// Whether the episode has terminated.
    pub done: bool,
    /// Arbitrary extra information from the environment.
    pub info: serde_json::Value,
}

/// Environment failures, split by whether retrying the same call can help.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// The environment cannot observe or act right now.
    #[error("transient environment failure: {0}")]
    Transient(String),

    /// The environment is unusable.
    #[error("fatal environment failure: {0}")]
    Fatal(String),
}

impl EnvError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// The core environment trait.
pub trait Environment {
    type Observation: Clone;

    /// Bring the environment to the start of a new episode.
    ///
    /// `Ok(None)` means no startable state was reached this time; the caller
    /// retries.
    fn reset(&mut self) -> Result<Option<Self::Observation>, EnvError>;

    /// Execute an action and report what happened.
    fn step(&mut self, action: Action) -> Result<StepOutcome<Self::Observation>, EnvError>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type Observation = E::Observation;

    fn reset(&mut self) -> Result<Option<Self::Observation>, EnvError> {
        (**self).reset()
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome<Self::Observation>, EnvError> {
        (**self).step(action)
    }
}
