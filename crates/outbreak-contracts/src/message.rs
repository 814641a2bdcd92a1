//! Messages exchanged between agents.
//!
//! A `Message` is created once and then moved: from the sender into the
//! receiver's mailbox, from the mailbox into the worker, and finally into the
//! worker's memory. Nothing mutates a message after construction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentId;

/// Metadata key set on every adversary message.
pub const META_IS_ATTACK: &str = "is_attack";
/// Metadata key carrying the id of the attack prompt that was injected.
pub const META_PROMPT_ID: &str = "prompt_id";
/// Metadata key naming the attack family (always `"jailbreak"` today).
pub const META_ATTACK_TYPE: &str = "attack_type";
/// Metadata key naming where a pre-seeded message came from (e.g. `"vaccine"`).
pub const META_SOURCE: &str = "source";

/// Conversation role of a message, as seen by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in agent communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub sender: Option<AgentId>,
    pub receiver: Option<AgentId>,
    pub timestamp: DateTime<Utc>,
    /// Global step at which the message was created. Approximate: the step
    /// counter advances on the supervisor's tick, not per message.
    pub step: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Message {
    /// Create a message stamped with the current time and no metadata.
    pub fn new(role: MessageRole, content: impl Into<String>, step: u64) -> Self {
        Self {
            role,
            content: content.into(),
            sender: None,
            receiver: None,
            timestamp: Utc::now(),
            step,
            metadata: BTreeMap::new(),
        }
    }

    pub fn from_sender(mut self, sender: AgentId) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn to_receiver(mut self, receiver: AgentId) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True if this message was injected by the adversary.
    pub fn is_attack(&self) -> bool {
        self.metadata
            .get(META_IS_ATTACK)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The attack prompt id, if this is an attack message.
    pub fn prompt_id(&self) -> Option<u32> {
        self.metadata
            .get(META_PROMPT_ID)
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
    }

    /// The `source` metadata tag, e.g. `"vaccine"` for pre-seeded examples.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(Value::as_str)
    }

    /// First `max_chars` characters of the content, for log previews.
    pub fn preview(&self, max_chars: usize) -> String {
        preview(&self.content, max_chars)
    }
}

/// Truncate `text` to at most `max_chars` characters on a char boundary.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
