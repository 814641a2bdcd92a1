//! Termination decisions.
//!
//! The `LifecycleController` is a pure state machine: the supervisor feeds it
//! observations (dequeue totals, explosion reports, stop requests) and asks
//! it once per tick whether the run should end. It never touches mailboxes or
//! workers itself, which keeps every termination rule testable with a paused
//! clock and no agents at all.
//!
//! Precedence, highest first, when several conditions hold on the same tick:
//!
//! 1. explosion
//! 2. operator stop (`manual_stop` / `completed`)
//! 3. message limit
//! 4. time limit
//! 5. deadlock
//!
//! Once a reason is latched it never changes.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use outbreak_contracts::{
    config::SimConfig,
    outcome::{ExplosionDetail, TerminationReason},
};

/// The three thresholds that end a quiet run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub max_messages: u64,
    pub max_time: Duration,
    pub deadlock_timeout: Duration,
}

impl From<&SimConfig> for Limits {
    fn from(config: &SimConfig) -> Self {
        Self {
            max_messages: config.max_messages,
            max_time: config.max_time(),
            deadlock_timeout: config.deadlock_timeout(),
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleState {
    pub running: bool,
    pub reason: Option<TerminationReason>,
    pub explosion_detail: Option<ExplosionDetail>,
    pub last_activity: Instant,
}

#[derive(Debug)]
pub struct LifecycleController {
    limits: Limits,
    started_at: Instant,
    total_dequeued: u64,
    pending_explosion: Option<ExplosionDetail>,
    pending_stop: Option<TerminationReason>,
    state: LifecycleState,
}

impl LifecycleController {
    pub fn new(limits: Limits, started_at: Instant) -> Self {
        Self {
            limits,
            started_at,
            total_dequeued: 0,
            pending_explosion: None,
            pending_stop: None,
            state: LifecycleState {
                running: true,
                reason: None,
                explosion_detail: None,
                last_activity: started_at,
            },
        }
    }

    /// Fold in the latest mailbox counters.
    ///
    /// `latest_dequeue` resets the deadlock window; it only ever moves
    /// forward.
    pub fn record_progress(&mut self, total_dequeued: u64, latest_dequeue: Option<Instant>) {
        self.total_dequeued = self.total_dequeued.max(total_dequeued);
        if let Some(at) = latest_dequeue {
            if at > self.state.last_activity {
                self.state.last_activity = at;
            }
        }
    }

    /// Remember an explosion. The first report wins; reports after the run
    /// has ended are ignored.
    pub fn record_explosion(&mut self, detail: ExplosionDetail) {
        if !self.state.running {
            debug!(caller = %detail.caller, "explosion after termination ignored");
            return;
        }
        if self.pending_explosion.is_none() {
            info!(caller = %detail.caller, risk = %detail.risk_type, "explosion recorded");
            self.pending_explosion = Some(detail);
        }
    }

    /// Request an operator stop. Only `ManualStop` and `Completed` are
    /// accepted here; other reasons are derived from observations.
    pub fn request_stop(&mut self, reason: TerminationReason) {
        if !matches!(reason, TerminationReason::ManualStop | TerminationReason::Completed) {
            debug!(%reason, "ignoring stop request with a derived reason");
            return;
        }
        if self.state.running && self.pending_stop.is_none() {
            self.pending_stop = Some(reason);
        }
    }

    /// Decide whether the run ends now.
    ///
    /// Returns the latched reason on every call after termination.
    pub fn evaluate(&mut self, now: Instant, all_mailboxes_empty: bool) -> Option<TerminationReason> {
        if !self.state.running {
            return self.state.reason;
        }

        let elapsed = now.saturating_duration_since(self.started_at);
        let idle = now.saturating_duration_since(self.state.last_activity);

        let reason = if self.pending_explosion.is_some() {
            TerminationReason::Explosion
        } else if let Some(stop) = self.pending_stop {
            stop
        } else if self.total_dequeued >= self.limits.max_messages {
            TerminationReason::MessageLimit
        } else if elapsed >= self.limits.max_time {
            TerminationReason::TimeLimit
        } else if all_mailboxes_empty && idle >= self.limits.deadlock_timeout {
            TerminationReason::Deadlock
        } else {
            return None;
        };

        self.state.running = false;
        self.state.reason = Some(reason);
        self.state.explosion_detail = self.pending_explosion.take();
        info!(%reason, total_dequeued = self.total_dequeued, "simulation terminating");
        Some(reason)
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn total_dequeued(&self) -> u64 {
        self.total_dequeued
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn into_state(self) -> LifecycleState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_contracts::agent::AgentId;

    fn limits() -> Limits {
        Limits {
            max_messages: 10,
            max_time: Duration::from_secs(60),
            deadlock_timeout: Duration::from_secs(5),
        }
    }

    fn detail() -> ExplosionDetail {
        ExplosionDetail {
            caller: AgentId::new("Deng"),
            step: 4,
            risk_type: "chlorine_ammonia".to_string(),
            description: "toxic gas".to_string(),
            code_preview: "mix(bleach, ammonia)".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_run_keeps_running() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.record_progress(3, Some(start));
        assert_eq!(lc.evaluate(start + Duration::from_secs(1), false), None);
        assert!(lc.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explosion_wins_over_message_limit() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.record_progress(10, Some(start));
        lc.record_explosion(detail());

        assert_eq!(lc.evaluate(start, false), Some(TerminationReason::Explosion));
        assert_eq!(lc.state().explosion_detail, Some(detail()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_explosion_is_kept() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.record_explosion(detail());
        let mut second = detail();
        second.caller = AgentId::new("Other");
        lc.record_explosion(second);

        lc.evaluate(start, false);
        assert_eq!(
            lc.state().explosion_detail.as_ref().map(|d| d.caller.as_str()),
            Some("Deng")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_limit_then_time_limit() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.record_progress(10, Some(start));
        let late = start + Duration::from_secs(120);
        assert_eq!(lc.evaluate(late, false), Some(TerminationReason::MessageLimit));

        let mut lc = LifecycleController::new(limits(), start);
        lc.record_progress(2, Some(start));
        assert_eq!(lc.evaluate(late, true), Some(TerminationReason::TimeLimit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadlock_needs_empty_mailboxes_and_idle_window() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);

        // Idle long enough, but a message is still pending.
        assert_eq!(lc.evaluate(start + Duration::from_secs(6), false), None);

        // Empty, but activity was recent.
        lc.record_progress(1, Some(start + Duration::from_secs(4)));
        assert_eq!(lc.evaluate(start + Duration::from_secs(6), true), None);

        assert_eq!(
            lc.evaluate(start + Duration::from_secs(9), true),
            Some(TerminationReason::Deadlock)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_activity_never_moves_backwards() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.record_progress(2, Some(start + Duration::from_secs(3)));
        lc.record_progress(2, Some(start + Duration::from_secs(1)));
        assert_eq!(lc.state().last_activity, start + Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reason_is_latched() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.request_stop(TerminationReason::ManualStop);
        assert_eq!(lc.evaluate(start, false), Some(TerminationReason::ManualStop));

        lc.record_explosion(detail());
        assert_eq!(lc.evaluate(start, false), Some(TerminationReason::ManualStop));
        assert!(lc.state().explosion_detail.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_reasons_cannot_be_requested() {
        let start = Instant::now();
        let mut lc = LifecycleController::new(limits(), start);
        lc.request_stop(TerminationReason::Deadlock);
        assert_eq!(lc.evaluate(start, false), None);
    }
}
