//! The agent contract the collector drives, plus a scripted agent for tests.

use std::collections::VecDeque;
use std::marker::PhantomData;

use anyhow::Result;

use crate::trajectory::types::RecurrentState;

/// What the agent hands back for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    /// Raw action value; the collector validates it against the action set.
    pub action: usize,
    /// The recurrent state to carry into the next step.
    pub recurrent_state: RecurrentState,
}

/// A recurrent policy: maps an observation and the carried recurrent state to
/// an action and a new recurrent state.
///
/// The collector owns the recurrent state and threads it through every call;
/// implementations must not keep their own copy of it between calls.
pub trait Agent {
    type Observation;

    fn act(
        &mut self,
        observation: &Self::Observation,
        recurrent_state: &RecurrentState,
    ) -> Result<AgentOutput>;
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    type Observation = A::Observation;

    fn act(
        &mut self,
        observation: &Self::Observation,
        recurrent_state: &RecurrentState,
    ) -> Result<AgentOutput> {
        (**self).act(observation, recurrent_state)
    }
}

// ---------------------------------------------------------------------------
// Scripted agent
// ---------------------------------------------------------------------------

/// Replays a fixed action sequence (cycling when exhausted) and records every
/// recurrent state it is handed.
///
/// Its output state is the input state with every element incremented by one,
/// so consecutive outputs are always distinct.
#[derive(Debug, Clone)]
pub struct ScriptedAgent<O> {
    actions: VecDeque<usize>,
    seen: Vec<RecurrentState>,
    emitted: Vec<RecurrentState>,
    _observation: PhantomData<fn(&O)>,
}

impl<O> ScriptedAgent<O> {
    pub fn new(actions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            seen: Vec::new(),
            emitted: Vec::new(),
            _observation: PhantomData,
        }
    }

    /// An agent that always picks action 0.
    pub fn idle() -> Self {
        Self::new([0])
    }

    /// Recurrent states received, in call order.
    pub fn seen(&self) -> &[RecurrentState] {
        &self.seen
    }

    /// Recurrent states returned, in call order.
    pub fn emitted(&self) -> &[RecurrentState] {
        &self.emitted
    }

    pub fn calls(&self) -> usize {
        self.seen.len()
    }
}

impl<O> Agent for ScriptedAgent<O> {
    type Observation = O;

    fn act(&mut self, _observation: &O, recurrent_state: &RecurrentState) -> Result<AgentOutput> {
        let action = match self.actions.pop_front() {
            Some(a) => {
                self.actions.push_back(a);
                a
            }
            None => anyhow::bail!("scripted agent has no actions"),
        };

        let bump = |v: &[f32]| v.iter().map(|x| x + 1.0).collect::<Vec<_>>();
        let next = RecurrentState::new(
            bump(&recurrent_state.hidden[..]),
            bump(&recurrent_state.cell[..]),
        );

        self.seen.push(recurrent_state.clone());
        self.emitted.push(next.clone());

        Ok(AgentOutput {
            action,
            recurrent_state: next,
        })
    }
}
