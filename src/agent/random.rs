use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::action::ActionSpace;
use super::policy::{Agent, AgentOutput};
use crate::trajectory::types::RecurrentState;

/// A baseline agent that samples actions uniformly.
///
/// Its recurrent state is a running summary of what it has seen: the hidden
/// vector decays towards the mean of each observation and the cell vector
/// towards its maximum. It carries no learned parameters.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    actions: ActionSpace,
    rng: StdRng,
    decay: f32,
}

impl RandomAgent {
    pub fn new(actions: ActionSpace, seed: u64) -> Self {
        Self {
            actions,
            rng: StdRng::seed_from_u64(seed),
            decay: 0.9,
        }
    }

    pub fn from_entropy(actions: ActionSpace) -> Self {
        Self {
            actions,
            rng: StdRng::from_entropy(),
            decay: 0.9,
        }
    }
}

impl Agent for RandomAgent {
    type Observation = Vec<f32>;

    fn act(
        &mut self,
        observation: &Vec<f32>,
        recurrent_state: &RecurrentState,
    ) -> Result<AgentOutput> {
        let action = self.actions.sample(&mut self.rng);

        let mean = if observation.is_empty() {
            0.0
        } else {
            observation.iter().sum::<f32>() / observation.len() as f32
        };
        let max = observation.iter().copied().fold(0.0_f32, f32::max);
        let decay = self.decay;
        let blend = |v: &[f32], target: f32| {
            v.iter()
                .map(|x| decay * x + (1.0 - decay) * target)
                .collect::<Vec<_>>()
        };

        Ok(AgentOutput {
            action: action.index(),
            recurrent_state: RecurrentState::new(
                blend(&recurrent_state.hidden[..], mean),
                blend(&recurrent_state.cell[..], max),
            ),
        })
    }
}
