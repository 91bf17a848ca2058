//! Failure taxonomy for the production sequence.
//!
//! Transient environment faults never surface here directly: the collector
//! retries them and only reports [`CollectorError::StepRetriesExhausted`] or
//! [`CollectorError::ResetExhausted`] once the configured budget is spent.
//! Every variant is fatal to the sequence that produced it.

use thiserror::Error;

use crate::env::EnvError;

#[derive(Debug, Error)]
pub enum CollectorError {
    /// The configuration cannot drive a collector.
    #[error("Invalid collector configuration: {0}")]
    InvalidConfig(String),

    /// The agent picked an action outside the declared action set.
    #[error("Agent returned action {action} outside the action set of size {num_actions}")]
    InvalidAction { action: usize, num_actions: usize },

    /// `step` reported `done = false` without a next observation.
    #[error("Environment returned no observation for non-terminal step {step}")]
    MissingObservation { step: u64 },

    /// The agent returned a recurrent state of the wrong dimensionality.
    #[error("Agent returned recurrent state of dimension ({hidden}, {cell}), expected {expected}")]
    RecurrentShape {
        hidden: usize,
        cell: usize,
        expected: usize,
    },

    /// `reset` failed on every attempt of the retry budget.
    #[error("Environment reset failed {attempts} times in a row")]
    ResetExhausted { attempts: usize },

    /// A single `step` kept failing transiently.
    #[error("Environment step failed {attempts} times in a row: {source}")]
    StepRetriesExhausted {
        attempts: usize,
        #[source]
        source: EnvError,
    },

    /// The environment reported an unrecoverable fault.
    #[error("Environment failure: {0}")]
    Environment(#[source] EnvError),

    /// The agent failed to produce an action.
    #[error("Agent failure: {0}")]
    Agent(#[source] anyhow::Error),
}

impl CollectorError {
    /// Whether the error stems from a broken collaborator contract rather than
    /// from I/O exhaustion.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAction { .. }
                | Self::MissingObservation { .. }
                | Self::RecurrentShape { .. }
        )
    }
}
