/// Sums per-step rewards into episode totals and buffers the totals of closed
/// episodes until the training loop drains them.
#[derive(Debug, Clone, Default)]
pub struct RewardAccumulator {
    running: f64,
    closed: Vec<f64>,
    episodes_closed: u64,
}

impl RewardAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step reward to the current episode.
    pub fn accumulate(&mut self, reward: f64) {
        self.running += reward;
    }

    /// Total of the episode in progress.
    pub fn running_total(&self) -> f64 {
        self.running
    }

    /// Record the current episode's total, start a new episode at zero and
    /// return the recorded total.
    pub fn close_episode(&mut self) -> f64 {
        let total = std::mem::take(&mut self.running);
        self.closed.push(total);
        self.episodes_closed += 1;
        total
    }

    /// Take every buffered episode total, oldest first, leaving the log empty.
    pub fn drain(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.closed)
    }

    /// Episodes closed over the accumulator's lifetime.
    pub fn episodes_closed(&self) -> u64 {
        self.episodes_closed
    }
}
