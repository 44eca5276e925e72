//! Step runtime state: current step, visited set, highlight clock

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Navigation state of one session. Completion is never stored here; it is
/// derived from the value tree on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRuntimeState {
    current: usize,
    visited: Arc<BTreeSet<usize>>,
    highlight_since: Option<Instant>,
}

impl Default for StepRuntimeState {
    fn default() -> Self {
        Self {
            current: 0,
            visited: Arc::new(BTreeSet::from([0])),
            highlight_since: None,
        }
    }
}

impl StepRuntimeState {
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn visited(&self) -> &BTreeSet<usize> {
        &self.visited
    }

    pub fn is_visited(&self, index: usize) -> bool {
        self.visited.contains(&index)
    }

    /// Copy positioned at `index`, which joins the visited set
    pub fn at(&self, index: usize) -> Self {
        let visited = if self.visited.contains(&index) {
            Arc::clone(&self.visited)
        } else {
            let mut visited = (*self.visited).clone();
            visited.insert(index);
            Arc::new(visited)
        };
        Self {
            current: index,
            visited,
            highlight_since: self.highlight_since,
        }
    }

    /// Copy with the incomplete-step highlight restarted at `now`
    pub fn highlighted_at(&self, now: Instant) -> Self {
        Self {
            highlight_since: Some(now),
            ..self.clone()
        }
    }

    /// Fraction of the highlight window elapsed at `now`, `None` once expired
    pub fn highlight_progress(&self, now: Instant, window: Duration) -> Option<f32> {
        let since = self.highlight_since?;
        let elapsed = now.saturating_duration_since(since);
        if window.is_zero() || elapsed >= window {
            return None;
        }
        Some(elapsed.as_secs_f32() / window.as_secs_f32())
    }
}
