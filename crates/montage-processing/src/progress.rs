//! Merge progress reporting
//!
//! Progress is a percentage in `0.0..=100.0` split into three fixed bands:
//! loading and per-image transforms (0-30), resizing (30-60), compositing and
//! encoding (60-100). Reported values never decrease.

/// Pipeline phase, used for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Loading,
    Resizing,
    Compositing,
}

impl ProgressPhase {
    /// Percentage band covered by this phase
    pub fn range(self) -> (f32, f32) {
        match self {
            ProgressPhase::Loading => (0.0, 30.0),
            ProgressPhase::Resizing => (30.0, 60.0),
            ProgressPhase::Compositing => (60.0, 100.0),
        }
    }
}

/// Forwards monotonic percentages to a caller-supplied callback
pub struct ProgressTracker<F: FnMut(f32)> {
    callback: F,
    last: f32,
}

impl<F: FnMut(f32)> ProgressTracker<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    /// Report `done` of `total` units of `phase` as finished.
    pub fn report(&mut self, phase: ProgressPhase, done: usize, total: usize) {
        let (start, end) = phase.range();
        let fraction = if total == 0 {
            1.0
        } else {
            (done.min(total) as f32) / (total as f32)
        };
        let percent = (start + (end - start) * fraction).clamp(self.last, 100.0);
        self.last = percent;
        tracing::trace!(phase = ?phase, done, total, percent, "Merge progress");
        (self.callback)(percent);
    }

    pub fn last(&self) -> f32 {
        self.last
    }
}
