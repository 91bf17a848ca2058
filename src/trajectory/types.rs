//! Core data types flowing through the collector.
//!
//! A [`Transition`] is produced once per environment step and never mutated
//! afterwards. A [`Window`] is an owned, ordered run of transitions handed to
//! the training loop; the window buffer keeps nothing that aliases it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::Action;

// ---------------------------------------------------------------------------
// Recurrent state
// ---------------------------------------------------------------------------

/// The (hidden, cell) vector pair carried between steps of a memory-augmented
/// policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentState {
    pub hidden: Vec<f32>,
    pub cell: Vec<f32>,
}

impl RecurrentState {
    /// A zero-valued state of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            hidden: vec![0.0; dim],
            cell: vec![0.0; dim],
        }
    }

    /// Build a state from explicit vectors.
    pub fn new(hidden: Vec<f32>, cell: Vec<f32>) -> Self {
        Self { hidden, cell }
    }

    /// Whether both vectors are entirely zero.
    pub fn is_zero(&self) -> bool {
        self.hidden.iter().chain(self.cell.iter()).all(|v| *v == 0.0)
    }

    /// Whether both vectors have dimension `dim`.
    pub fn has_dim(&self, dim: usize) -> bool {
        self.hidden.len() == dim && self.cell.len() == dim
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// One completed environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<O> {
    /// Episode this transition belongs to (UUID v4, fresh per episode).
    pub episode_id: Uuid,
    /// Zero-based index of the step within its episode.
    pub step: u64,
    /// The observation the agent acted on.
    pub state: O,
    /// The action the agent chose.
    pub action: Action,
    /// The reward recorded for this step (after terminal/survival overrides).
    pub reward: f64,
    /// Whether this step ended the episode.
    pub done: bool,
    /// The recurrent state the agent returned for this step.
    pub recurrent_state: RecurrentState,
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// An ordered run of transitions from a single episode, oldest first.
///
/// Full windows hold exactly `n + 1` transitions; the windows flushed at an
/// episode boundary shrink down to a single transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Window<O> {
    transitions: Vec<Transition<O>>,
}

impl<O> Window<O> {
    pub(crate) fn new(transitions: Vec<Transition<O>>) -> Self {
        Self { transitions }
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self) -> &[Transition<O>] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<Transition<O>> {
        self.transitions
    }

    /// The oldest transition.
    pub fn first(&self) -> Option<&Transition<O>> {
        self.transitions.first()
    }

    /// The most recent transition.
    pub fn last(&self) -> Option<&Transition<O>> {
        self.transitions.last()
    }

    /// Episode the window was cut from.
    pub fn episode_id(&self) -> Option<Uuid> {
        self.first().map(|t| t.episode_id)
    }

    /// Step indices of the contained transitions, oldest first.
    pub fn steps(&self) -> Vec<u64> {
        self.transitions.iter().map(|t| t.step).collect()
    }

    /// Undiscounted sum of rewards over the window.
    pub fn total_reward(&self) -> f64 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    /// Whether the window ends on the episode's terminal step.
    pub fn is_terminal(&self) -> bool {
        self.last().is_some_and(|t| t.done)
    }
}

impl<O> IntoIterator for Window<O> {
    type Item = Transition<O>;
    type IntoIter = std::vec::IntoIter<Transition<O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.transitions.into_iter()
    }
}
