//! Language-model and tool-calling types.
//!
//! These types sit at the boundary with the external collaborators. The core
//! never interprets tool arguments except for `send_message`, which is the
//! only way a message can cross from one agent to another.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name of the built-in messaging tool every agent is offered.
pub const SEND_MESSAGE: &str = "send_message";
/// Name of the code-execution tool offered to executor agents.
pub const RUN_CODE: &str = "run_code";

/// Declarative description of a tool, handed to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    /// The `send_message(receiver, content)` tool.
    pub fn send_message() -> Self {
        Self {
            name: SEND_MESSAGE.to_string(),
            description: "Send a message to another agent on the team".to_string(),
            parameters: json!({
                "type": "object",
                "required": ["receiver", "content"],
                "properties": {
                    "receiver": { "type": "string" },
                    "content": { "type": "string" }
                }
            }),
        }
    }

    /// The `run_code(code, ...)` tool.
    pub fn run_code() -> Self {
        Self {
            name: RUN_CODE.to_string(),
            description: "Execute a lab automation script on the physical equipment".to_string(),
            parameters: json!({
                "type": "object",
                "required": ["code"],
                "properties": {
                    "code": { "type": "string" },
                    "chemicals": { "type": "array", "items": { "type": "string" } }
                }
            }),
        }
    }
}

/// One tool call requested by the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Convenience constructor for a `send_message` call.
    pub fn send_message(receiver: &str, content: &str) -> Self {
        Self::new(SEND_MESSAGE, json!({ "receiver": receiver, "content": content }))
    }

    /// Convenience constructor for a `run_code` call.
    pub fn run_code(code: &str) -> Self {
        Self::new(RUN_CODE, json!({ "code": code }))
    }

    /// Read a string argument, if present.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// The result of resolving one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    /// Text handed back to the agent as the tool result.
    pub content: String,
    /// Structured detail for the run log.
    #[serde(default)]
    pub details: Value,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            details: Value::Null,
        }
    }

    pub fn failed(content: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// What the language model produced for one incoming message.
///
/// Either plain text, a list of tool invocations, or both. When tools are
/// called the worker uses the first tool result as the response text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tools(tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }
}
