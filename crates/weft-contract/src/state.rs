//! Mutable per-turn conversation state.

use crate::thread::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The data record threaded through every node of one turn.
///
/// Owned exclusively by the orchestrator while the turn runs; never shared
/// across concurrent turns. Messages are append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Ordered message history, stored turns included.
    pub messages: Vec<Message>,
    /// Number of tool result messages appended during the current turn.
    pub tool_call_count: usize,
    /// Scratch variables written by node handlers (e.g. retrieved context).
    #[serde(default)]
    pub variables: HashMap<String, Value>,
}

impl ConversationState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state from stored history.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tool_call_count: 0,
            variables: HashMap::new(),
        }
    }

    /// Mark the start of a new turn: the tool-call counter resets, history
    /// and variables carry over.
    pub fn begin_turn(&mut self) {
        self.tool_call_count = 0;
    }

    /// Append a message.
    ///
    /// Tool result messages bump `tool_call_count`, keeping the invariant
    /// that the counter equals the number of tool results this turn.
    pub fn push(&mut self, message: Message) {
        if message.is_tool() {
            self.tool_call_count += 1;
        }
        self.messages.push(message);
    }

    /// Most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent human message, if any.
    pub fn last_human(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_human())
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}
