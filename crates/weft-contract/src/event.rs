//! Low-level raw execution events and the closed consumer-facing event set.

use crate::thread::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag of a raw execution event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventType {
    /// Incremental token delta from a streaming model call.
    ModelTokenDelta,
    /// A model call produced its final message.
    ModelCallEnd,
    /// A graph node started executing.
    NodeStart,
    /// A graph node finished executing.
    NodeEnd,
    /// A tool call was dispatched.
    ToolCallStart,
    /// A tool call returned.
    ToolCallEnd,
    /// The turn finished; `data` carries the final message set.
    TurnEnd,
}

impl RawEventType {
    /// Stable name for traces and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelTokenDelta => "model_token_delta",
            Self::ModelCallEnd => "model_call_end",
            Self::NodeStart => "node_start",
            Self::NodeEnd => "node_end",
            Self::ToolCallStart => "tool_call_start",
            Self::ToolCallEnd => "tool_call_end",
            Self::TurnEnd => "turn_end",
        }
    }
}

/// Heterogeneous low-level event emitted during streaming execution.
///
/// Raw events are an engine-internal currency; consumers should depend on
/// [`WorkflowEvent`] as produced by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event kind.
    pub event_type: RawEventType,
    /// Emitting entity: model name for model events, node id for node events,
    /// tool name for tool events.
    pub name: String,
    /// Event payload; shape depends on `event_type`.
    pub data: Value,
    /// Id of the run (turn) this event belongs to.
    pub run_id: String,
    /// Ids of enclosing scopes, outermost first.
    pub parent_ids: Vec<String>,
}

impl RawEvent {
    /// Build a raw event.
    pub fn new(
        event_type: RawEventType,
        name: impl Into<String>,
        data: Value,
        run_id: impl Into<String>,
        parent_ids: Vec<String>,
    ) -> Self {
        Self {
            event_type,
            name: name.into(),
            data,
            run_id: run_id.into(),
            parent_ids,
        }
    }
}

/// Phase of a node trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TracePhase {
    Start,
    End,
}

/// Metadata attached to a [`WorkflowEvent::Completion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMetadata {
    /// Model that produced the completion.
    pub model: String,
    /// Scope ids inherited from the raw event.
    pub parent_ids: Vec<String>,
}

/// Closed set of typed events a consumer of the engine observes.
///
/// Created only by the event-stream normalizer; never persisted by the
/// engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Incremental partial content from a streaming model call.
    TokenStream {
        content: String,
        model: String,
        run_id: String,
        parent_ids: Vec<String>,
    },
    /// Node boundary trace, emitted only in development/debug mode.
    NodeTrace {
        phase: TracePhase,
        node: String,
        run_id: String,
        parent_ids: Vec<String>,
        payload: Value,
    },
    /// A node produced a complete model result.
    Completion {
        messages: Vec<Message>,
        run_id: String,
        metadata: CompletionMetadata,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn workflow_event_serializes_with_type_tag() {
        let event = WorkflowEvent::TokenStream {
            content: "hel".to_string(),
            model: "mock-model".to_string(),
            run_id: "run-1".to_string(),
            parent_ids: vec![],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "token_stream");
        assert_eq!(value["content"], "hel");
    }

    #[test]
    fn node_trace_phase_uses_snake_case() {
        let event = WorkflowEvent::NodeTrace {
            phase: TracePhase::Start,
            node: "call_model".to_string(),
            run_id: "run-1".to_string(),
            parent_ids: vec!["turn-1".to_string()],
            payload: json!({"messages": 2}),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["phase"], "start");
    }
}
