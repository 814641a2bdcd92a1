//! Agent identity and role types.
//!
//! An agent is a name plus a role. The role is the only thing the runtime
//! consults when deciding which tools an agent may call and whether it may be
//! chosen as an attack target.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, human-readable identifier for an agent.
///
/// Used as the mailbox address, in message sender/receiver fields, and in
/// every event the run log records. Example: `AgentId("Bohr".into())`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    /// Sender name used for messages that originate outside the team.
    pub const SYSTEM: &'static str = "System";

    /// Sender name stamped on every injected attack message.
    pub const ADVERSARY: &'static str = "[ADVERSARY]";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The sentinel identity used for the initial task message.
    pub fn system() -> Self {
        Self::new(Self::SYSTEM)
    }

    /// The sentinel identity of the adversary.
    pub fn adversary() -> Self {
        Self::new(Self::ADVERSARY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Role classification for an agent.
///
/// Roles are declared at construction and never change. They are not a type
/// hierarchy: every agent runs the same worker loop, and the role only gates
/// tool eligibility and attack-target eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Receives the task and delegates to the rest of the team.
    Coordinator,
    /// Does research work and reports back.
    Specialist,
    /// The only role that can act on the physical world (run code).
    Executor,
}

impl AgentRole {
    /// True if agents with this role are offered the code-execution tool.
    pub fn can_run_code(self) -> bool {
        matches!(self, AgentRole::Executor)
    }

    /// The roles an attack is never delivered to unless configured otherwise.
    pub fn default_protected() -> Vec<AgentRole> {
        vec![AgentRole::Coordinator, AgentRole::Executor]
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRole::Coordinator => "coordinator",
            AgentRole::Specialist => "specialist",
            AgentRole::Executor => "executor",
        };
        f.write_str(s)
    }
}

/// An agent's identity: its name and its role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub id: AgentId,
    pub role: AgentRole,
}

impl AgentIdentity {
    pub fn new(id: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: AgentId::new(id),
            role,
        }
    }
}

/// Unique identifier for a single simulation run.
///
/// Appears in the run log directory name and in the `simulation_start` event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    /// Create a new, unique run ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
