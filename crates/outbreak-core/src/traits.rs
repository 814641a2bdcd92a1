//! Collaborator trait definitions for the Outbreak orchestration layer.
//!
//! These four traits are the complete boundary between the core and the
//! outside world:
//!
//! - `LanguageModel`: untrusted text generation (may call tools)
//! - `ToolExecutor`: acts on the world; the only source of explosions
//! - `DefenseProvider`: consulted once per agent, before the run starts
//! - `EventSink`: write-only run log (messages, events, outcome)
//!
//! The supervisor and workers are generic over all four, so a run can be
//! driven entirely by deterministic stubs.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use outbreak_contracts::{
    agent::AgentIdentity,
    defense::DefenseMode,
    error::OutbreakResult,
    event::Event,
    message::Message,
    outcome::Outcome,
    tool::{Completion, ToolInvocation, ToolOutput, ToolSpec},
};

use crate::signal::ExplosionReporter;

/// Everything the language model sees for one incoming message.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// The agent the completion is for.
    pub agent: &'a AgentIdentity,
    /// Role description plus any defense instruction.
    pub system_prompt: &'a str,
    /// The agent's memory, oldest first. Does not include `incoming`.
    pub history: &'a [Message],
    /// Tools this agent is allowed to call.
    pub tools: &'a [ToolSpec],
    /// The message being processed.
    pub incoming: &'a Message,
}

/// A language model that turns a conversation into text or tool calls.
///
/// Implementations may take arbitrarily long and may fail. A failure is
/// recovered inside the calling worker and never ends the run.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> OutbreakResult<Completion>;
}

/// Per-call context handed to a `ToolExecutor`.
#[derive(Clone)]
pub struct ToolContext {
    pub caller: AgentIdentity,
    pub step: u64,
    /// Report a catastrophic action. This is the only way a run can end in
    /// `TerminationReason::Explosion`.
    pub explosions: ExplosionReporter,
    /// Run log, for tool-level events such as `risk_detected`.
    pub events: std::sync::Arc<dyn EventSink>,
}

/// Executes every tool other than the built-in `send_message`.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, ctx: &ToolContext, call: &ToolInvocation) -> OutbreakResult<ToolOutput>;
}

/// Supplies defense measures for a defense mode.
///
/// Called once per agent while the supervisor builds workers. Never called on
/// the per-tick hot path.
pub trait DefenseProvider: Send + Sync {
    /// Text appended to the agent's system prompt, if the mode uses one.
    fn instruction(&self, mode: DefenseMode) -> OutbreakResult<Option<String>>;

    /// Example messages prepended to the agent's memory, oldest first.
    fn vaccine(&self, mode: DefenseMode) -> OutbreakResult<Vec<Message>>;
}

/// A provider that never applies any defense.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefense;

impl DefenseProvider for NoDefense {
    fn instruction(&self, _mode: DefenseMode) -> OutbreakResult<Option<String>> {
        Ok(None)
    }

    fn vaccine(&self, _mode: DefenseMode) -> OutbreakResult<Vec<Message>> {
        Ok(Vec::new())
    }
}

/// The write-only run log.
///
/// Records are appended in the order they are produced and never read back
/// while the run is live.
pub trait EventSink: Send + Sync {
    /// Append one delivered or produced message.
    fn record_message(&self, message: &Message) -> OutbreakResult<()>;

    /// Append one lifecycle, attack, or tool event.
    fn record_event(&self, event: &Event) -> OutbreakResult<()>;

    /// Persist the terminal outcome. Called exactly once, after shutdown.
    fn finalize(&self, outcome: &Outcome) -> OutbreakResult<()>;

    /// Record `event`, logging instead of failing if the write fails.
    fn emit_event(&self, event: &Event) {
        if event.kind.is_milestone() {
            info!(kind = ?event.kind, step = event.step, details = %event.details, "simulation event");
        }
        if let Err(e) = self.record_event(event) {
            warn!(kind = ?event.kind, error = %e, "failed to record event");
        }
    }

    /// Record `message`, logging instead of failing if the write fails.
    fn emit_message(&self, message: &Message) {
        debug!(
            sender = ?message.sender,
            receiver = ?message.receiver,
            preview = %message.preview(100),
            "message"
        );
        if let Err(e) = self.record_message(message) {
            warn!(error = %e, "failed to record message");
        }
    }
}
