//! Discrete actions and the action set they are drawn from.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::trajectory::error::CollectorError;

/// Labels of the default five-action layout, indexed by action value.
pub const ACTION_NAMES: [&str; 5] = ["noop", "left", "right", "jump", "roll"];

/// A validated discrete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(usize);

impl Action {
    pub const NOOP: Action = Action(0);
    pub const LEFT: Action = Action(1);
    pub const RIGHT: Action = Action(2);
    pub const JUMP: Action = Action(3);
    pub const ROLL: Action = Action(4);

    /// Wrap a raw action value without checking it against an action set.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Human-readable label, when the value falls in the default layout.
    pub fn name(self) -> Option<&'static str> {
        ACTION_NAMES.get(self.0).copied()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "action-{}", self.0),
        }
    }
}

/// The fixed action set `{0, .., size - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpace {
    size: usize,
}

impl ActionSpace {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, raw: usize) -> bool {
        raw < self.size
    }

    /// Turn a raw agent output into an [`Action`], rejecting anything outside
    /// the set.
    pub fn validate(&self, raw: usize) -> Result<Action, CollectorError> {
        if self.contains(raw) {
            Ok(Action(raw))
        } else {
            Err(CollectorError::InvalidAction {
                action: raw,
                num_actions: self.size,
            })
        }
    }

    /// A uniformly random member of the set.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        Action(rng.gen_range(0..self.size))
    }
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self::new(ACTION_NAMES.len())
    }
}
