//! Error types for the Outbreak simulator.
//!
//! Only two classes of error are fatal to a run: configuration errors and
//! injection-selection errors, both raised before any worker is spawned.
//! Collaborator failures are returned to the worker that made the call and
//! recovered there.

use thiserror::Error;

/// The unified error type for the Outbreak crates.
#[derive(Debug, Error)]
pub enum OutbreakError {
    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// No agent is eligible to receive the attack.
    #[error("no eligible attack target among {candidates} agent(s): {reason}")]
    NoEligibleTarget { candidates: usize, reason: String },

    /// The configured attack prompt id is not in the prompt table.
    #[error("attack prompt {prompt_id} not found in prompt table")]
    UnknownPrompt { prompt_id: u32 },

    /// A message was addressed to an agent that does not exist.
    #[error("unknown agent '{agent}'")]
    UnknownAgent { agent: String },

    /// The language model call failed.
    #[error("language model call failed for '{agent}': {reason}")]
    ModelFailed { agent: String, reason: String },

    /// A tool could not be executed.
    #[error("tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// The run log could not persist a record.
    #[error("run log write failed: {reason}")]
    LogWriteFailed { reason: String },
}

/// Convenience alias used throughout the Outbreak crates.
pub type OutbreakResult<T> = Result<T, OutbreakError>;
