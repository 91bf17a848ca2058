//! A synthetic three-lane endless runner.
//!
//! Obstacles spawn a few steps ahead of the player in a random lane. When one
//! arrives in the player's lane the action taken on that step decides the
//! outcome: barriers must be jumped, gates rolled under, and trains can only be
//! dodged by leaving the lane. A lane change takes effect before the obstacle
//! arrives, so moving on the arrival step itself is still in time. Every step
//! survived earns a flat reward; a crash ends the episode without a final
//! frame, matching what a screen-driven game environment reports.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::traits::{EnvError, Environment, StepOutcome};
use crate::agent::Action;

const LANES: usize = 3;

/// Length of every observation vector.
pub const OBSERVATION_LEN: usize = LANES * 2 + 3 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObstacleKind {
    Barrier,
    Gate,
    Train,
}

impl ObstacleKind {
    fn index(self) -> usize {
        match self {
            Self::Barrier => 0,
            Self::Gate => 1,
            Self::Train => 2,
        }
    }

    fn cleared_by(self, action: Action) -> bool {
        match self {
            Self::Barrier => action == Action::JUMP,
            Self::Gate => action == Action::ROLL,
            Self::Train => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Obstacle {
    lane: usize,
    kind: ObstacleKind,
    distance: u32,
}

/// Tunables for [`RunnerEnv`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Steps between an obstacle spawning and reaching the player.
    pub spawn_distance: u32,
    /// Reward for each step survived.
    pub survival_reward: f64,
    /// Reward for the crashing step.
    pub crash_penalty: f64,
    /// Probability that a reset finds no playable screen.
    pub reset_failure_rate: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            spawn_distance: 4,
            survival_reward: 2.0,
            crash_penalty: -10.0,
            reset_failure_rate: 0.0,
        }
    }
}

/// The runner simulation.
#[derive(Debug, Clone)]
pub struct RunnerEnv {
    config: RunnerConfig,
    rng: StdRng,
    lane: usize,
    obstacle: Option<Obstacle>,
    running: bool,
}

impl RunnerEnv {
    pub fn new(config: RunnerConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            lane: LANES / 2,
            obstacle: None,
            running: false,
        }
    }

    fn spawn(&mut self) -> Obstacle {
        let kind = match self.rng.gen_range(0..3) {
            0 => ObstacleKind::Barrier,
            1 => ObstacleKind::Gate,
            _ => ObstacleKind::Train,
        };
        Obstacle {
            lane: self.rng.gen_range(0..LANES),
            kind,
            distance: self.config.spawn_distance.max(1),
        }
    }

    fn observe(&self) -> Vec<f32> {
        let mut obs = vec![0.0; OBSERVATION_LEN];
        obs[self.lane] = 1.0;
        if let Some(o) = self.obstacle {
            obs[LANES + o.lane] = 1.0;
            obs[LANES * 2 + o.kind.index()] = 1.0;
            obs[OBSERVATION_LEN - 1] = o.distance as f32 / self.config.spawn_distance.max(1) as f32;
        }
        obs
    }
}

impl Environment for RunnerEnv {
    type Observation = Vec<f32>;

    fn reset(&mut self) -> Result<Option<Vec<f32>>, EnvError> {
        let failure_rate = self.config.reset_failure_rate.clamp(0.0, 1.0);
        if failure_rate > 0.0 && self.rng.gen_bool(failure_rate) {
            return Ok(None);
        }
        self.lane = LANES / 2;
        self.obstacle = Some(self.spawn());
        self.running = true;
        Ok(Some(self.observe()))
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome<Vec<f32>>, EnvError> {
        if !self.running {
            return Err(EnvError::Fatal("step called before reset".into()));
        }

        if action == Action::LEFT {
            self.lane = self.lane.saturating_sub(1);
        } else if action == Action::RIGHT {
            self.lane = (self.lane + 1).min(LANES - 1);
        }

        let mut crashed = false;
        if let Some(mut o) = self.obstacle.take() {
            o.distance -= 1;
            if o.distance == 0 {
                crashed = o.lane == self.lane && !o.kind.cleared_by(action);
            } else {
                self.obstacle = Some(o);
            }
        }

        if crashed {
            self.running = false;
            return Ok(StepOutcome {
                observation: None,
                reward: self.config.crash_penalty,
                done: true,
                info: serde_json::json!({ "lane": self.lane, "crashed": true }),
            });
        }

        if self.obstacle.is_none() {
            self.obstacle = Some(self.spawn());
        }

        Ok(StepOutcome {
            observation: Some(self.observe()),
            reward: self.config.survival_reward,
            done: false,
            info: serde_json::json!({
                "lane": self.lane,
                "obstacle_distance": self.obstacle.map(|o| o.distance),
            }),
        })
    }
}
