//! Structured simulation events.
//!
//! Events are the second stream of the run log (next to messages). Each one
//! is stamped with the global step at which it happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentId;

/// The kinds of events the simulator records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SimulationStart,
    SimulationEnd,
    AgentCreated,
    MessageDequeued,
    ToolCalled,
    AttackInjected,
    DefenseActivated,
    RiskDetected,
    Explosion,
    Deadlock,
    WorkerError,
}

impl EventKind {
    /// Events worth echoing at `info` level in addition to the run log.
    pub fn is_milestone(self) -> bool {
        matches!(
            self,
            EventKind::SimulationStart
                | EventKind::SimulationEnd
                | EventKind::AttackInjected
                | EventKind::Explosion
        )
    }
}

/// A simulation event for logging and post-run analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub step: u64,
    /// The agent involved, if any.
    pub agent: Option<AgentId>,
    pub details: Value,
}

impl Event {
    pub fn new(kind: EventKind, step: u64) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            step,
            agent: None,
            details: Value::Null,
        }
    }

    pub fn for_agent(mut self, agent: AgentId) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}
