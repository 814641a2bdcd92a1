//! The global simulation step counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Monotonic step counter plus the run's start instant.
///
/// Only the supervisor advances the step; workers read it to stamp the
/// messages and events they produce.
#[derive(Debug)]
pub struct SimulationClock {
    step: AtomicU64,
    started_at: Instant,
}

impl SimulationClock {
    pub fn start() -> Self {
        Self {
            step: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn current_step(&self) -> u64 {
        self.step.load(Ordering::Acquire)
    }

    /// Increment the step and return the new value.
    pub(crate) fn advance(&self) -> u64 {
        self.step.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
