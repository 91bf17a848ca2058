use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::trajectory::error::CollectorError;

/// Complete configuration for the n-step trajectory collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Step horizon `n`; every full window holds `n + 1` transitions (default: 3).
    pub n_step: usize,
    /// Dimensionality of the hidden and cell vectors (default: 256).
    pub hidden_dim: usize,
    /// Size of the discrete action set `{0, .., num_actions - 1}` (default: 5).
    pub num_actions: usize,
    /// How far back from termination the contaminated transition sits
    /// (default: 3). Zero disables the discard.
    pub contamination_lookback: usize,
    /// Reward recorded for a `done` step in place of the environment's value
    /// (default: -10.0). `None` keeps the environment reward.
    pub terminal_penalty: Option<f64>,
    /// Reward recorded for non-terminal steps in place of the environment's
    /// value (default: None, the environment supplies its own +2).
    pub survival_reward: Option<f64>,
    /// Consecutive failed resets tolerated before giving up (default: 100).
    pub max_reset_attempts: usize,
    /// Transient failures tolerated for a single `step` call (default: 10).
    pub max_step_retries: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            n_step: 3,
            hidden_dim: 256,
            num_actions: 5,
            contamination_lookback: 3,
            terminal_penalty: Some(-10.0),
            survival_reward: None,
            max_reset_attempts: 100,
            max_step_retries: 10,
        }
    }
}

impl CollectorConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = serde_json::from_str::<Self>(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CollectorError> {
        let reject = |reason: &str| Err(CollectorError::InvalidConfig(reason.to_string()));
        if self.n_step == 0 {
            return reject("n_step must be at least 1");
        }
        if self.hidden_dim == 0 {
            return reject("hidden_dim must be at least 1");
        }
        if self.num_actions == 0 {
            return reject("num_actions must be at least 1");
        }
        if self.max_reset_attempts == 0 {
            return reject("max_reset_attempts must be at least 1");
        }
        // Further back than this the target has already left the history.
        if self.contamination_lookback > self.n_step + 2 {
            return Err(CollectorError::InvalidConfig(format!(
                "contamination_lookback {} exceeds n_step + 2 ({})",
                self.contamination_lookback,
                self.n_step + 2
            )));
        }
        Ok(())
    }
}
