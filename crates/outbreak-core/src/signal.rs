//! Channel from workers and operators to the supervisor.
//!
//! Workers never stop the run themselves. They post a `SupervisorSignal`,
//! and the supervisor folds it into the lifecycle on its next tick.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use outbreak_contracts::outcome::{ExplosionDetail, TerminationReason};

/// Messages the supervisor accepts from outside its own loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorSignal {
    /// A tool call acted on the world catastrophically.
    Explosion(ExplosionDetail),
    /// An operator asked the run to end (`ManualStop` or `Completed`).
    Stop(TerminationReason),
}

/// Handle a tool executor uses to report an explosion.
#[derive(Debug, Clone)]
pub struct ExplosionReporter {
    tx: UnboundedSender<SupervisorSignal>,
}

impl ExplosionReporter {
    pub fn new(tx: UnboundedSender<SupervisorSignal>) -> Self {
        Self { tx }
    }

    pub fn report(&self, detail: ExplosionDetail) {
        if self.tx.send(SupervisorSignal::Explosion(detail)).is_err() {
            warn!("explosion reported after the supervisor stopped listening");
        }
    }
}

/// Handle for ending a run from outside (Ctrl-C, a harness, a test).
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: UnboundedSender<SupervisorSignal>,
}

impl StopHandle {
    pub(crate) fn new(tx: UnboundedSender<SupervisorSignal>) -> Self {
        Self { tx }
    }

    /// End the run with `TerminationReason::ManualStop`.
    pub fn stop(&self) {
        self.send(TerminationReason::ManualStop);
    }

    /// End the run with `TerminationReason::Completed`.
    pub fn complete(&self) {
        self.send(TerminationReason::Completed);
    }

    fn send(&self, reason: TerminationReason) {
        if self.tx.send(SupervisorSignal::Stop(reason)).is_err() {
            warn!(%reason, "stop requested after the run finished");
        }
    }
}
