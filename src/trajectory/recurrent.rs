use crate::trajectory::error::CollectorError;
use crate::trajectory::types::RecurrentState;

/// Threads the agent's recurrent state from step to step and zeroes it at
/// every episode start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrentStateCarrier {
    dim: usize,
}

impl RecurrentStateCarrier {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// The zero state handed to the agent on the first step of an episode.
    pub fn initial(&self) -> RecurrentState {
        RecurrentState::zeros(self.dim)
    }

    /// The state for the next agent call: [`initial`](Self::initial) if the
    /// step that just completed ended the episode, otherwise the agent's own
    /// output, untouched.
    pub fn advance(&self, done: bool, agent_output: RecurrentState) -> RecurrentState {
        if done {
            self.initial()
        } else {
            agent_output
        }
    }

    /// Reject agent output of the wrong dimensionality.
    pub fn check(&self, state: &RecurrentState) -> Result<(), CollectorError> {
        if state.has_dim(self.dim) {
            Ok(())
        } else {
            Err(CollectorError::RecurrentShape {
                hidden: state.hidden.len(),
                cell: state.cell.len(),
                expected: self.dim,
            })
        }
    }
}
