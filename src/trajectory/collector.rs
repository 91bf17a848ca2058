//! Trajectory collection: turning a live agent-environment loop into n-step
//! windows.
//!
//! The [`TrajectoryCollector`] is a lazy, never-ending iterator. Each pull
//! advances a small state machine until at least one window is ready:
//!   1. reset the environment (retrying failed resets up to a budget),
//!   2. ask the agent for an action using the carried recurrent state,
//!   3. step the environment,
//!   4. record the transition, its reward, and cut a window when the history
//!      is full,
//!   5. at an episode boundary, flush every remaining suffix of the history,
//!      close the episode's reward total and start over from 1.
//!
//! Nothing runs between pulls; a consumer that stops pulling simply drops the
//! collector.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::agent::{Action, ActionSpace, Agent};
use crate::config::CollectorConfig;
use crate::env::{Environment, StepOutcome};
use crate::trajectory::error::CollectorError;
use crate::trajectory::recurrent::RecurrentStateCarrier;
use crate::trajectory::rewards::RewardAccumulator;
use crate::trajectory::types::{RecurrentState, Transition, Window};
use crate::trajectory::window::WindowBuffer;

/// Result type yielded by the collector.
pub type CollectResult<O> = Result<Window<O>, CollectorError>;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Phase<O> {
    /// Needs a fresh start observation from `reset`.
    AwaitingObservation,
    /// Mid-episode; `state` is the observation the agent acts on next.
    Stepping { state: O },
    /// The last step ended the episode; the history still has to be flushed.
    EpisodeBoundary,
    /// A fatal error was reported; nothing more is produced.
    Halted,
}

// ---------------------------------------------------------------------------
// Trajectory collector
// ---------------------------------------------------------------------------

/// Drives an [`Agent`] inside an [`Environment`] and yields n-step windows.
pub struct TrajectoryCollector<E: Environment, A> {
    config: CollectorConfig,
    env: E,
    agent: A,
    actions: ActionSpace,
    carrier: RecurrentStateCarrier,
    /// Recurrent state handed to the next agent call.
    recurrent: RecurrentState,
    history: WindowBuffer<E::Observation>,
    /// Step indices of the most recent (state, action) pairs of the episode.
    end_buffer: VecDeque<u64>,
    rewards: RewardAccumulator,
    ready: VecDeque<Window<E::Observation>>,
    phase: Phase<E::Observation>,
    episode_id: Uuid,
    step: u64,
}

impl<E, A> TrajectoryCollector<E, A>
where
    E: Environment,
    A: Agent<Observation = E::Observation>,
{
    /// Create a collector. No environment call happens until the first pull.
    pub fn new(config: CollectorConfig, env: E, agent: A) -> Result<Self, CollectorError> {
        config.validate()?;
        let carrier = RecurrentStateCarrier::new(config.hidden_dim);
        let lookback = config.contamination_lookback.min(config.n_step + 2);
        Ok(Self {
            actions: ActionSpace::new(config.num_actions),
            recurrent: carrier.initial(),
            carrier,
            history: WindowBuffer::new(config.n_step),
            end_buffer: VecDeque::with_capacity(lookback),
            rewards: RewardAccumulator::new(),
            ready: VecDeque::new(),
            phase: Phase::AwaitingObservation,
            episode_id: Uuid::new_v4(),
            step: 0,
            config,
            env,
            agent,
        })
    }

    /// The endless window stream. Episode boundaries are crossed internally,
    /// so the same stream keeps producing windows from later episodes.
    pub fn produce(&mut self) -> impl Iterator<Item = CollectResult<E::Observation>> + '_ {
        self.by_ref()
    }

    /// Take the totals of every episode closed since the previous drain.
    pub fn drain_episode_rewards(&mut self) -> Vec<f64> {
        self.rewards.drain()
    }

    pub fn episodes_completed(&self) -> u64 {
        self.rewards.episodes_closed()
    }

    /// Whether a fatal error ended production.
    pub fn is_halted(&self) -> bool {
        matches!(self.phase, Phase::Halted)
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    // -- internal helpers ---------------------------------------------------

    /// Run one state-machine transition, queueing any windows it completes.
    fn advance(&mut self) -> Result<(), CollectorError> {
        // Left as `Halted` if anything below fails.
        let phase = std::mem::replace(&mut self.phase, Phase::Halted);
        self.phase = match phase {
            Phase::AwaitingObservation => {
                let state = self.reset_env()?;
                self.begin_episode();
                Phase::Stepping { state }
            }
            Phase::Stepping { state } => self.step_once(state)?,
            Phase::EpisodeBoundary => {
                self.finish_episode();
                Phase::AwaitingObservation
            }
            Phase::Halted => Phase::Halted,
        };
        Ok(())
    }

    fn reset_env(&mut self) -> Result<E::Observation, CollectorError> {
        let budget = self.config.max_reset_attempts;
        for attempt in 1..=budget {
            match self.env.reset() {
                Ok(Some(state)) => {
                    if attempt > 1 {
                        info!(attempt, "environment reset succeeded after retries");
                    }
                    return Ok(state);
                }
                Ok(None) => {
                    warn!(attempt, budget, "environment reset produced no observation");
                }
                Err(err) if err.is_transient() => {
                    warn!(attempt, budget, error = %err, "environment reset failed");
                }
                Err(err) => return Err(CollectorError::Environment(err)),
            }
        }
        Err(CollectorError::ResetExhausted { attempts: budget })
    }

    fn begin_episode(&mut self) {
        self.episode_id = Uuid::new_v4();
        self.step = 0;
        self.end_buffer.clear();
        self.history.clear();
        debug!(episode = %self.episode_id, "episode started");
    }

    fn step_once(
        &mut self,
        state: E::Observation,
    ) -> Result<Phase<E::Observation>, CollectorError> {
        let output = self
            .agent
            .act(&state, &self.recurrent)
            .map_err(CollectorError::Agent)?;
        let action = self.actions.validate(output.action)?;
        self.carrier.check(&output.recurrent_state)?;
        trace!(step = self.step, action = %action, "agent acted");

        self.remember_pair();
        let outcome = self.step_env(action)?;
        let done = outcome.done;
        if !done && outcome.observation.is_none() {
            return Err(CollectorError::MissingObservation { step: self.step });
        }

        let mut keep = true;
        let reward = if done {
            keep = self.discard_contaminated();
            self.config.terminal_penalty.unwrap_or(outcome.reward)
        } else {
            self.config.survival_reward.unwrap_or(outcome.reward)
        };
        self.rewards.accumulate(reward);

        let transition = Transition {
            episode_id: self.episode_id,
            step: self.step,
            state,
            action,
            reward,
            done,
            recurrent_state: output.recurrent_state.clone(),
        };
        self.recurrent = self.carrier.advance(done, output.recurrent_state);

        if keep {
            self.history.push(transition);
            if let Some(window) = self.history.snapshot() {
                self.ready.push_back(window);
            }
        }
        self.step += 1;

        match outcome.observation {
            Some(next) if !done => Ok(Phase::Stepping { state: next }),
            _ => Ok(Phase::EpisodeBoundary),
        }
    }

    /// Record the current step in the look-back of recent (state, action)
    /// pairs.
    fn remember_pair(&mut self) {
        let lookback = self.config.contamination_lookback;
        if lookback == 0 {
            return;
        }
        self.end_buffer.push_back(self.step);
        while self.end_buffer.len() > lookback {
            self.end_buffer.pop_front();
        }
    }

    /// Drop the transition recorded `contamination_lookback` pairs before the
    /// end, counting the terminal step itself as the first. Returns `false`
    /// when that transition is the terminal one, which must then not be
    /// buffered at all.
    fn discard_contaminated(&mut self) -> bool {
        let lookback = self.config.contamination_lookback;
        if lookback == 0 || self.end_buffer.len() < lookback {
            return true;
        }
        let target = self.end_buffer[self.end_buffer.len() - lookback];
        if target == self.step {
            debug!(step = target, "dropping contaminated terminal transition");
            return false;
        }
        let discarded = self.history.discard_step(target).is_some();
        debug!(
            episode = %self.episode_id,
            step = target,
            discarded,
            "terminal contamination look-back applied"
        );
        true
    }

    fn step_env(&mut self, action: Action) -> Result<StepOutcome<E::Observation>, CollectorError> {
        let mut failures = 0;
        loop {
            match self.env.step(action) {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_transient() => {
                    failures += 1;
                    if failures > self.config.max_step_retries {
                        return Err(CollectorError::StepRetriesExhausted {
                            attempts: failures,
                            source: err,
                        });
                    }
                    warn!(
                        step = self.step,
                        attempt = failures,
                        error = %err,
                        "retrying environment step"
                    );
                }
                Err(err) => return Err(CollectorError::Environment(err)),
            }
        }
    }

    fn finish_episode(&mut self) {
        let flushed = self.history.flush_all();
        debug!(episode = %self.episode_id, windows = flushed.len(), "flushed episode tail");
        self.ready.extend(flushed);

        let total = self.rewards.close_episode();
        info!(
            episode = %self.episode_id,
            steps = self.step,
            reward = total,
            "episode closed"
        );
        self.end_buffer.clear();
    }
}

impl<E, A> Iterator for TrajectoryCollector<E, A>
where
    E: Environment,
    A: Agent<Observation = E::Observation>,
{
    type Item = CollectResult<E::Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(window) = self.ready.pop_front() {
                return Some(Ok(window));
            }
            if self.is_halted() {
                return None;
            }
            if let Err(err) = self.advance() {
                warn!(error = %err, "trajectory collection halted");
                self.phase = Phase::Halted;
                return Some(Err(err));
            }
        }
    }
}

impl<E, A> FusedIterator for TrajectoryCollector<E, A>
where
    E: Environment,
    A: Agent<Observation = E::Observation>,
{
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentOutput, RandomAgent, ScriptedAgent};
    use crate::env::{
        EnvError, ResetFault, RunnerConfig, RunnerEnv, ScriptedEnv, ScriptedEpisode, ScriptedStep,
    };

    type Scripted = TrajectoryCollector<ScriptedEnv, ScriptedAgent<Vec<f32>>>;

    fn config(n_step: usize) -> CollectorConfig {
        CollectorConfig {
            n_step,
            hidden_dim: 2,
            ..CollectorConfig::default()
        }
    }

    fn collector(config: CollectorConfig, env: ScriptedEnv) -> Scripted {
        TrajectoryCollector::new(config, env, ScriptedAgent::idle()).unwrap()
    }

    fn take_ok(c: &mut Scripted, n: usize) -> Vec<Window<Vec<f32>>> {
        (0..n).map(|_| c.next().unwrap().unwrap()).collect()
    }

    /// Pull windows until `episodes` episodes have been closed.
    fn run_episodes(c: &mut Scripted, episodes: u64) -> Vec<Window<Vec<f32>>> {
        let mut windows = Vec::new();
        while c.episodes_completed() < episodes {
            windows.push(c.next().unwrap().unwrap());
        }
        // Drain the rest of the final flush.
        while let Some(w) = c.ready.pop_front() {
            windows.push(w);
        }
        windows
    }

    #[test]
    fn five_step_episode_with_horizon_two() {
        let mut c = collector(config(2), ScriptedEnv::with_episode_lengths(&[5, 5]));
        let windows = take_ok(&mut c, 6);

        let steps: Vec<Vec<u64>> = windows.iter().map(|w| w.steps()).collect();
        assert_eq!(
            steps,
            vec![
                vec![0, 1, 2],
                vec![1, 2, 3],
                // Step 2 is three pairs back from the terminal step 4.
                vec![1, 3, 4],
                vec![1, 3, 4],
                vec![3, 4],
                vec![4],
            ]
        );

        assert_eq!(c.drain_episode_rewards(), vec![-2.0]);
        assert!(c.drain_episode_rewards().is_empty());
        assert_eq!(c.episodes_completed(), 1);
    }

    #[test]
    fn contaminated_transition_absent_from_terminal_windows() {
        let mut c = collector(config(3), ScriptedEnv::with_episode_lengths(&[9]));
        let windows = run_episodes(&mut c, 1);

        // Terminal step is 8; the look-back of three lands on step 6.
        for w in windows.iter().filter(|w| w.last().is_some_and(|t| t.step == 8)) {
            assert!(!w.steps().contains(&6), "window {:?}", w.steps());
        }
    }

    #[test]
    fn flush_sizes_shrink_to_one() {
        let mut c = collector(config(3), ScriptedEnv::with_episode_lengths(&[10]));
        let windows = run_episodes(&mut c, 1);
        let tail: Vec<usize> = windows.iter().rev().take(4).map(|w| w.len()).collect();
        assert_eq!(tail, vec![1, 2, 3, 4]);
        assert!(c.history.is_empty());
        assert!(windows.last().unwrap().is_terminal());
    }

    #[test]
    fn short_episode_discards_nothing() {
        let mut c = collector(config(3), ScriptedEnv::with_episode_lengths(&[2]));
        let windows = run_episodes(&mut c, 1);
        let steps: Vec<Vec<u64>> = windows.iter().map(|w| w.steps()).collect();
        assert_eq!(steps, vec![vec![0, 1], vec![1]]);
    }

    #[test]
    fn lookback_of_one_drops_the_terminal_step() {
        let cfg = CollectorConfig {
            contamination_lookback: 1,
            ..config(1)
        };
        let mut c = collector(cfg, ScriptedEnv::with_episode_lengths(&[4]));
        let windows = run_episodes(&mut c, 1);
        assert!(windows.iter().all(|w| !w.steps().contains(&3)));
        let steps: Vec<Vec<u64>> = windows.iter().map(|w| w.steps()).collect();
        assert_eq!(steps, vec![vec![0, 1], vec![1, 2], vec![1, 2], vec![2]]);
        // The dropped step still counts towards the episode total.
        assert_eq!(c.drain_episode_rewards(), vec![2.0 * 3.0 - 10.0]);
    }

    #[test]
    fn zero_lookback_keeps_every_step() {
        let cfg = CollectorConfig {
            contamination_lookback: 0,
            ..config(2)
        };
        let mut c = collector(cfg, ScriptedEnv::with_episode_lengths(&[5]));
        let windows = run_episodes(&mut c, 1);
        assert_eq!(windows[2].steps(), vec![2, 3, 4]);
    }

    #[test]
    fn failed_resets_are_retried() {
        let env = ScriptedEnv::with_episode_lengths(&[5])
            .with_reset_faults([ResetFault::NoObservation, ResetFault::NoObservation]);
        let mut c = collector(config(1), env);

        let first = c.next().unwrap().unwrap();
        assert_eq!(first.steps(), vec![0, 1]);
        assert_eq!(c.env().reset_calls(), 3);
        assert_eq!(c.env().step_calls(), 2);
    }

    #[test]
    fn transient_reset_errors_count_against_the_budget() {
        let env = ScriptedEnv::with_episode_lengths(&[3])
            .with_reset_faults([ResetFault::Transient, ResetFault::NoObservation]);
        let mut c = collector(config(1), env);
        assert!(c.next().unwrap().is_ok());
        assert_eq!(c.env().reset_calls(), 3);
    }

    #[test]
    fn reset_exhaustion_is_fatal() {
        let cfg = CollectorConfig {
            max_reset_attempts: 3,
            ..config(1)
        };
        let env = ScriptedEnv::with_episode_lengths(&[3])
            .with_reset_faults(vec![ResetFault::NoObservation; 3]);
        let mut c = collector(cfg, env);

        let err = c.next().unwrap().unwrap_err();
        assert!(matches!(err, CollectorError::ResetExhausted { attempts: 3 }));
        assert!(c.next().is_none());
        assert!(c.is_halted());
        assert_eq!(c.env().reset_calls(), 3);
    }

    #[test]
    fn fatal_reset_is_not_retried() {
        let env = ScriptedEnv::with_episode_lengths(&[3]).with_reset_faults([ResetFault::Fatal]);
        let mut c = collector(config(1), env);
        assert!(matches!(
            c.next().unwrap().unwrap_err(),
            CollectorError::Environment(EnvError::Fatal(_))
        ));
        assert_eq!(c.env().reset_calls(), 1);
    }

    #[test]
    fn out_of_set_action_halts_production() {
        let env = ScriptedEnv::with_episode_lengths(&[10]);
        let agent = ScriptedAgent::new([1, 1, 7]);
        let mut c = TrajectoryCollector::new(config(1), env, agent).unwrap();

        assert_eq!(c.next().unwrap().unwrap().steps(), vec![0, 1]);
        let err = c.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            CollectorError::InvalidAction {
                action: 7,
                num_actions: 5
            }
        ));
        assert!(err.is_contract_violation());
        assert!(c.next().is_none());
        assert!(c.next().is_none());
        // The invalid action never reached the environment.
        assert_eq!(c.env().step_calls(), 2);
    }

    #[test]
    fn missing_observation_on_running_step_is_fatal() {
        let episode = ScriptedEpisode {
            initial: vec![0.0, 0.0],
            steps: vec![ScriptedStep {
                observation: None,
                reward: 2.0,
                done: false,
            }],
        };
        let mut c = collector(config(1), ScriptedEnv::new(vec![episode]));
        let err = c.next().unwrap().unwrap_err();
        assert!(matches!(err, CollectorError::MissingObservation { step: 0 }));
        assert!(c.next().is_none());
    }

    #[test]
    fn recurrent_state_resets_only_at_episode_start() {
        let mut c = collector(config(1), ScriptedEnv::with_episode_lengths(&[3, 4]));
        let windows = run_episodes(&mut c, 2);

        let agent = c.agent();
        assert_eq!(agent.calls(), 7);
        for (i, seen) in agent.seen().iter().enumerate() {
            if i == 0 || i == 3 {
                assert!(seen.is_zero(), "call {i} should start from zeros");
            } else {
                assert_eq!(seen, &agent.emitted()[i - 1], "call {i} should see previous output");
            }
        }

        // Transitions carry the state the agent returned for them.
        let first = &windows[0].transitions()[0];
        assert_eq!(first.recurrent_state, agent.emitted()[0]);
    }

    #[test]
    fn wrong_recurrent_dimension_is_fatal() {
        struct Shrinking;
        impl Agent for Shrinking {
            type Observation = Vec<f32>;
            fn act(&mut self, _: &Vec<f32>, _: &RecurrentState) -> anyhow::Result<AgentOutput> {
                Ok(AgentOutput {
                    action: 0,
                    recurrent_state: RecurrentState::zeros(1),
                })
            }
        }

        let env = ScriptedEnv::with_episode_lengths(&[3]);
        let mut c = TrajectoryCollector::new(config(1), env, Shrinking).unwrap();
        assert!(matches!(
            c.next().unwrap().unwrap_err(),
            CollectorError::RecurrentShape { expected: 2, .. }
        ));
    }

    #[test]
    fn agent_failure_is_fatal() {
        let env = ScriptedEnv::with_episode_lengths(&[3]);
        let mut c = TrajectoryCollector::new(config(1), env, ScriptedAgent::new([])).unwrap();
        assert!(matches!(c.next().unwrap().unwrap_err(), CollectorError::Agent(_)));
    }

    #[test]
    fn transient_step_failures_are_retried() {
        let env = ScriptedEnv::with_episode_lengths(&[4]).with_step_faults(vec![
            EnvError::Transient("capture failed".into());
            2
        ]);
        let mut c = collector(config(1), env);
        assert_eq!(c.next().unwrap().unwrap().steps(), vec![0, 1]);
        assert_eq!(c.env().step_calls(), 4);
    }

    #[test]
    fn step_retry_exhaustion_is_fatal() {
        let cfg = CollectorConfig {
            max_step_retries: 2,
            ..config(1)
        };
        let env = ScriptedEnv::with_episode_lengths(&[4]).with_step_faults(vec![
            EnvError::Transient("capture failed".into());
            3
        ]);
        let mut c = collector(cfg, env);
        assert!(matches!(
            c.next().unwrap().unwrap_err(),
            CollectorError::StepRetriesExhausted { attempts: 3, .. }
        ));
    }

    #[test]
    fn production_continues_across_episodes() {
        let mut c = collector(config(2), ScriptedEnv::with_episode_lengths(&[4, 3, 6]));
        let windows = run_episodes(&mut c, 3);

        let mut episodes: Vec<Uuid> = Vec::new();
        for w in &windows {
            let id = w.episode_id().unwrap();
            assert!(w.transitions().iter().all(|t| t.episode_id == id));
            if episodes.last() != Some(&id) {
                assert!(!episodes.contains(&id), "episodes must not interleave");
                episodes.push(id);
            }
            if !w.is_terminal() {
                assert_eq!(w.len(), 3);
                let steps = w.steps();
                assert!(steps.windows(2).all(|p| p[1] == p[0] + 1));
            }
        }
        assert_eq!(episodes.len(), 3);
        assert_eq!(c.drain_episode_rewards(), vec![-4.0, -6.0, 0.0]);
        assert_eq!(c.env().reset_calls(), 3);
    }

    #[test]
    fn draining_mid_episode_does_not_disturb_windowing() {
        let mut c = collector(config(1), ScriptedEnv::with_episode_lengths(&[6]));
        assert_eq!(c.next().unwrap().unwrap().steps(), vec![0, 1]);
        assert!(c.drain_episode_rewards().is_empty());
        assert_eq!(c.next().unwrap().unwrap().steps(), vec![1, 2]);
    }

    #[test]
    fn reward_overrides() {
        let cfg = CollectorConfig {
            terminal_penalty: None,
            survival_reward: Some(1.0),
            ..config(1)
        };
        let mut episode = ScriptedEpisode::survival(0, 3);
        episode.steps[2].reward = -3.0;
        let mut c = collector(cfg, ScriptedEnv::new(vec![episode]));
        let windows = run_episodes(&mut c, 1);
        assert_eq!(c.drain_episode_rewards(), vec![1.0 + 1.0 - 3.0]);
        assert!(windows.iter().flat_map(|w| w.transitions()).all(|t| t.done || t.reward == 1.0));
    }

    #[test]
    fn full_windows_are_consecutive_for_every_horizon() {
        for n_step in 1..=5 {
            let cfg = CollectorConfig {
                n_step,
                hidden_dim: 8,
                ..CollectorConfig::default()
            };
            let env = RunnerEnv::new(RunnerConfig::default(), n_step as u64);
            let agent = RandomAgent::new(ActionSpace::default(), 100 + n_step as u64);
            let mut c = TrajectoryCollector::new(cfg, env, agent).unwrap();

            for window in c.produce().take(300) {
                let window = window.unwrap();
                assert!(window.len() <= n_step + 1);
                if !window.is_terminal() {
                    assert_eq!(window.len(), n_step + 1);
                    assert!(window.steps().windows(2).all(|p| p[1] == p[0] + 1));
                }
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let env = ScriptedEnv::with_episode_lengths(&[3]);
        let result = TrajectoryCollector::new(config(0), env, ScriptedAgent::<Vec<f32>>::idle());
        assert!(matches!(result, Err(CollectorError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_lookback_is_rejected_before_any_io() {
        let cfg = CollectorConfig {
            contamination_lookback: usize::MAX,
            ..config(2)
        };
        let env = ScriptedEnv::with_episode_lengths(&[3]);
        let result = TrajectoryCollector::new(cfg, env, ScriptedAgent::<Vec<f32>>::idle());
        assert!(matches!(result, Err(CollectorError::InvalidConfig(_))));
    }
}
