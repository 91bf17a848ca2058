//! A scripted environment that replays canned episodes.
//!
//! Useful for deterministic tests of the collector without a live game:
//! resets can be made to fail, steps can be made to fail transiently, and
//! every call is counted.

use std::collections::VecDeque;

use super::traits::{EnvError, Environment, StepOutcome};
use crate::agent::Action;

/// One canned step: what `step` returns when it is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedStep {
    pub observation: Option<Vec<f32>>,
    pub reward: f64,
    pub done: bool,
}

/// One canned episode.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedEpisode {
    /// Returned by `reset`.
    pub initial: Vec<f32>,
    pub steps: Vec<ScriptedStep>,
}

impl ScriptedEpisode {
    /// An episode of `len` steps where every non-terminal step earns +2, the
    /// last step terminates with -10 and no frame, and the observation after
    /// step `i` is `[episode, i + 1]`.
    pub fn survival(episode: usize, len: usize) -> Self {
        let steps = (0..len)
            .map(|i| {
                if i + 1 == len {
                    ScriptedStep {
                        observation: None,
                        reward: -10.0,
                        done: true,
                    }
                } else {
                    ScriptedStep {
                        observation: Some(vec![episode as f32, (i + 1) as f32]),
                        reward: 2.0,
                        done: false,
                    }
                }
            })
            .collect();
        Self {
            initial: vec![episode as f32, 0.0],
            steps,
        }
    }
}

/// How a queued reset fault manifests.
#[derive(Debug, Clone, PartialEq)]
pub enum ResetFault {
    /// `reset` returns `Ok(None)`.
    NoObservation,
    /// `reset` returns a transient error.
    Transient,
    /// `reset` returns a fatal error.
    Fatal,
}

/// Replays a pool of [`ScriptedEpisode`]s, cycling through them.
#[derive(Debug, Clone)]
pub struct ScriptedEnv {
    episodes: Vec<ScriptedEpisode>,
    episode_index: usize,
    step_index: usize,
    started: bool,
    reset_faults: VecDeque<ResetFault>,
    step_faults: VecDeque<EnvError>,
    reset_calls: usize,
    step_calls: usize,
    actions: Vec<Action>,
}

impl ScriptedEnv {
    pub fn new(episodes: Vec<ScriptedEpisode>) -> Self {
        Self {
            episodes,
            episode_index: 0,
            step_index: 0,
            started: false,
            reset_faults: VecDeque::new(),
            step_faults: VecDeque::new(),
            reset_calls: 0,
            step_calls: 0,
            actions: Vec::new(),
        }
    }

    /// Survival episodes of the given lengths (see [`ScriptedEpisode::survival`]).
    pub fn with_episode_lengths(lengths: &[usize]) -> Self {
        Self::new(
            lengths
                .iter()
                .enumerate()
                .map(|(i, len)| ScriptedEpisode::survival(i, *len))
                .collect(),
        )
    }

    /// Queue faults consumed by the next `reset` calls, in order.
    pub fn with_reset_faults(mut self, faults: impl IntoIterator<Item = ResetFault>) -> Self {
        self.reset_faults.extend(faults);
        self
    }

    /// Queue errors returned by the next `step` calls, in order.
    pub fn with_step_faults(mut self, faults: impl IntoIterator<Item = EnvError>) -> Self {
        self.step_faults.extend(faults);
        self
    }

    pub fn reset_calls(&self) -> usize {
        self.reset_calls
    }

    pub fn step_calls(&self) -> usize {
        self.step_calls
    }

    /// Actions received by successful `step` calls.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    fn current(&self) -> Result<&ScriptedEpisode, EnvError> {
        if self.episodes.is_empty() {
            return Err(EnvError::Fatal("no scripted episodes".into()));
        }
        Ok(&self.episodes[self.episode_index % self.episodes.len()])
    }
}

impl Environment for ScriptedEnv {
    type Observation = Vec<f32>;

    fn reset(&mut self) -> Result<Option<Vec<f32>>, EnvError> {
        self.reset_calls += 1;
        match self.reset_faults.pop_front() {
            Some(ResetFault::NoObservation) => return Ok(None),
            Some(ResetFault::Transient) => {
                return Err(EnvError::Transient("play button not found".into()))
            }
            Some(ResetFault::Fatal) => return Err(EnvError::Fatal("window lost".into())),
            None => {}
        }

        if self.started {
            self.episode_index += 1;
        }
        self.started = true;
        self.step_index = 0;
        Ok(Some(self.current()?.initial.clone()))
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome<Vec<f32>>, EnvError> {
        self.step_calls += 1;
        if let Some(err) = self.step_faults.pop_front() {
            return Err(err);
        }

        let step = self
            .current()?
            .steps
            .get(self.step_index)
            .cloned()
            .ok_or_else(|| EnvError::Fatal("stepped past the end of the script".into()))?;
        self.step_index += 1;
        self.actions.push(action);

        Ok(StepOutcome {
            observation: step.observation,
            reward: step.reward,
            done: step.done,
            info: serde_json::json!({ "step": self.step_index }),
        })
    }
}
