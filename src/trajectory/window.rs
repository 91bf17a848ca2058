//! Sliding history of recent transitions, cut into n-step windows.

use std::collections::VecDeque;

use crate::trajectory::types::{Transition, Window};

/// Holds the last `n + 1` transitions of the current episode.
///
/// A push beyond capacity evicts from the front, so the buffer briefly holds
/// `n + 2` transitions and never more.
#[derive(Debug, Clone)]
pub struct WindowBuffer<O> {
    capacity: usize,
    history: VecDeque<Transition<O>>,
}

impl<O: Clone> WindowBuffer<O> {
    /// A buffer producing windows of `n_step + 1` transitions.
    pub fn new(n_step: usize) -> Self {
        let capacity = n_step + 1;
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.history.len() == self.capacity
    }

    /// Append a transition, evicting the oldest ones beyond capacity.
    pub fn push(&mut self, transition: Transition<O>) {
        self.history.push_back(transition);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// A copy of the current contents, when the buffer is full.
    pub fn snapshot(&self) -> Option<Window<O>> {
        if self.is_full() {
            Some(self.window())
        } else {
            None
        }
    }

    /// Emit the current contents, drop the oldest transition, and repeat until
    /// empty. Yields windows of strictly shrinking length, oldest first.
    pub fn flush_all(&mut self) -> Vec<Window<O>> {
        let mut windows = Vec::with_capacity(self.history.len());
        while !self.history.is_empty() {
            windows.push(self.window());
            self.history.pop_front();
        }
        windows
    }

    /// Remove the buffered transition recorded at `step`, if still present.
    pub fn discard_step(&mut self, step: u64) -> Option<Transition<O>> {
        let pos = self.history.iter().position(|t| t.step == step)?;
        self.history.remove(pos)
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition<O>> {
        self.history.iter()
    }

    fn window(&self) -> Window<O> {
        Window::new(self.history.iter().cloned().collect())
    }
}
