//! Message types for one conversation thread.
//!
//! Messages are append-only: once pushed onto a [`ConversationState`] they are
//! never mutated in place.
//!
//! [`ConversationState`]: crate::state::ConversationState

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured request, embedded in an assistant message, to invoke an
/// external function by name with JSON arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back on the matching tool result.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// JSON arguments matching the tool's declared schema.
    pub arguments: Value,
}

impl ToolCall {
    /// Build a tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// End-user input.
    Human {
        /// Message text.
        content: String,
    },
    /// Assistant output, optionally requesting tool calls.
    Ai {
        /// Message text. May be empty when the model only requests tools.
        content: String,
        /// Tool calls requested by the model, in request order.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool invocation.
    Tool {
        /// Tool output (or an error description when the call failed).
        content: String,
        /// Id of the [`ToolCall`] this message answers.
        call_id: String,
    },
}

impl Message {
    /// Build a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: content.into(),
        }
    }

    /// Build a plain assistant message with no tool calls.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Build an assistant message that requests tool calls.
    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Ai {
            content: content.into(),
            tool_calls,
        }
    }

    /// Build a tool result message.
    pub fn tool(content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            call_id: call_id.into(),
        }
    }

    /// Text content of the message, regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Self::Human { content } | Self::Ai { content, .. } | Self::Tool { content, .. } => {
                content
            }
        }
    }

    /// Tool calls requested by this message. Empty for non-assistant roles.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Whether this is an assistant message.
    pub fn is_ai(&self) -> bool {
        matches!(self, Self::Ai { .. })
    }

    /// Whether this is a tool result message.
    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Tool { .. })
    }

    /// Whether this is a human message.
    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human { .. })
    }
}
