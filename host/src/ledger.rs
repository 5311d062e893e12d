//! Which windows this controller subclassed, and how many times.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SubclassLedger {
    counts: HashMap<isize, usize>,
}

impl SubclassLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful subclass; returns the new count.
    pub fn add(&mut self, window: isize) -> usize {
        let count = self.counts.entry(window).or_insert(0);
        *count += 1;
        *count
    }

    /// Record one successful unsubclass; `None` if the window was unknown.
    pub fn remove(&mut self, window: isize) -> Option<usize> {
        let count = self.counts.get_mut(&window)?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.counts.remove(&window);
        }
        Some(remaining)
    }

    pub fn count(&self, window: isize) -> usize {
        self.counts.get(&window).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Take every outstanding (window, count) pair.
    pub fn drain(&mut self) -> Vec<(isize, usize)> {
        self.counts.drain().collect()
    }
}
