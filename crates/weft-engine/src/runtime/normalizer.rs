//! Raw-to-consumer event normalization.
//!
//! Translates the heterogeneous low-level events emitted during streaming
//! execution into the small closed [`WorkflowEvent`] set. Stateless: each
//! event maps to zero or one output, independent of every other event.

use crate::contracts::event::CompletionMetadata;
use crate::contracts::{Message, RawEvent, RawEventType, TracePhase, TurnConfig, WorkflowEvent};
use serde_json::Value;

/// Normalizer switches.
///
/// Production mode (`enable_llm_streaming` only) yields end-user-visible
/// token deltas and completions; enabling `enable_node_tracing` adds the full
/// node-level trace for observability tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventStreamNormalizer {
    /// Pass through model token deltas.
    pub enable_llm_streaming: bool,
    /// Pass through node boundary traces.
    pub enable_node_tracing: bool,
}

impl EventStreamNormalizer {
    /// Normalizer driven by the per-turn configuration.
    pub fn from_config(config: &TurnConfig) -> Self {
        Self {
            enable_llm_streaming: config.enable_llm_streaming,
            enable_node_tracing: config.enable_node_tracing,
        }
    }

    /// Production mode: token deltas and completions only.
    pub fn production() -> Self {
        Self {
            enable_llm_streaming: true,
            enable_node_tracing: false,
        }
    }

    /// Development mode: full node trace in addition to streaming output.
    pub fn development() -> Self {
        Self {
            enable_llm_streaming: true,
            enable_node_tracing: true,
        }
    }

    /// Map one raw event to at most one consumer event.
    ///
    /// Rules are checked in order, first match wins:
    /// 1. streaming enabled + token delta with content → `TokenStream`;
    /// 2. model call end with a contentful output → `Completion` (emitted
    ///    regardless of tracing flags);
    /// 3. tracing enabled + node boundary → `NodeTrace`;
    /// 4. everything else is dropped.
    pub fn normalize(&self, event: &RawEvent) -> Option<WorkflowEvent> {
        if self.enable_llm_streaming && event.event_type == RawEventType::ModelTokenDelta {
            if let Some(content) = event.data.get("content").and_then(Value::as_str) {
                return Some(WorkflowEvent::TokenStream {
                    content: content.to_string(),
                    model: event.name.clone(),
                    run_id: event.run_id.clone(),
                    parent_ids: event.parent_ids.clone(),
                });
            }
        }

        if event.event_type == RawEventType::ModelCallEnd {
            if let Some(message) = contentful_output(&event.data) {
                return Some(WorkflowEvent::Completion {
                    messages: vec![message],
                    run_id: event.run_id.clone(),
                    metadata: CompletionMetadata {
                        model: event.name.clone(),
                        parent_ids: event.parent_ids.clone(),
                    },
                });
            }
        }

        if self.enable_node_tracing
            && matches!(
                event.event_type,
                RawEventType::NodeStart | RawEventType::NodeEnd
            )
        {
            let phase = if event.event_type == RawEventType::NodeStart {
                TracePhase::Start
            } else {
                TracePhase::End
            };
            return Some(WorkflowEvent::NodeTrace {
                phase,
                node: event.name.clone(),
                run_id: event.run_id.clone(),
                parent_ids: event.parent_ids.clone(),
                payload: event.data.clone(),
            });
        }

        None
    }
}

/// Decode `data.output` as a message, requiring non-empty content.
///
/// Tool-call-only assistant messages carry empty text; they are not a
/// consumer-facing completion.
fn contentful_output(data: &Value) -> Option<Message> {
    let message: Message = serde_json::from_value(data.get("output")?.clone()).ok()?;
    if message.content().is_empty() {
        return None;
    }
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ToolCall;
    use serde_json::json;

    fn raw(event_type: RawEventType, name: &str, data: Value) -> RawEvent {
        RawEvent::new(event_type, name, data, "run-1", vec!["turn-1".to_string()])
    }

    fn token_delta(content: &str) -> RawEvent {
        raw(
            RawEventType::ModelTokenDelta,
            "mock-model",
            json!({ "content": content }),
        )
    }

    fn model_call_end(message: &Message) -> RawEvent {
        raw(
            RawEventType::ModelCallEnd,
            "mock-model",
            json!({ "output": message }),
        )
    }

    #[test]
    fn production_mode_filters_mixed_sequence() {
        let normalizer = EventStreamNormalizer::production();
        let answer = Message::ai("final answer");
        let events = vec![
            raw(RawEventType::NodeStart, "call_model", json!({})),
            token_delta("fin"),
            token_delta("al "),
            token_delta("answer"),
            raw(RawEventType::NodeEnd, "call_model", json!({})),
            raw(RawEventType::NodeStart, "end", json!({})),
            model_call_end(&answer),
            raw(RawEventType::NodeEnd, "end", json!({})),
        ];

        let normalized: Vec<_> = events
            .iter()
            .filter_map(|e| normalizer.normalize(e))
            .collect();

        let tokens = normalized
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::TokenStream { .. }))
            .count();
        let completions = normalized
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::Completion { .. }))
            .count();
        assert_eq!(tokens, 3);
        assert_eq!(completions, 1);
        assert_eq!(normalized.len(), 4);
    }

    #[test]
    fn completion_is_emitted_even_without_any_flags() {
        let normalizer = EventStreamNormalizer::default();
        let event = model_call_end(&Message::ai("answer"));
        let out = normalizer.normalize(&event).unwrap();
        match out {
            WorkflowEvent::Completion {
                messages, metadata, ..
            } => {
                assert_eq!(messages[0].content(), "answer");
                assert_eq!(metadata.model, "mock-model");
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_only_output_is_not_a_completion() {
        let normalizer = EventStreamNormalizer::production();
        let message = Message::ai_with_tool_calls(
            "",
            vec![ToolCall::new("tc-1", "search", json!({}))],
        );
        assert!(normalizer.normalize(&model_call_end(&message)).is_none());
    }

    #[test]
    fn token_delta_without_content_is_dropped() {
        let normalizer = EventStreamNormalizer::production();
        let event = raw(RawEventType::ModelTokenDelta, "mock-model", json!({}));
        assert!(normalizer.normalize(&event).is_none());
    }

    #[test]
    fn streaming_disabled_drops_token_deltas() {
        let normalizer = EventStreamNormalizer {
            enable_llm_streaming: false,
            enable_node_tracing: false,
        };
        assert!(normalizer.normalize(&token_delta("x")).is_none());
    }

    #[test]
    fn development_mode_traces_node_boundaries() {
        let normalizer = EventStreamNormalizer::development();
        let start = raw(
            RawEventType::NodeStart,
            "retrieve",
            json!({"message_count": 1}),
        );
        match normalizer.normalize(&start).unwrap() {
            WorkflowEvent::NodeTrace { phase, node, payload, .. } => {
                assert_eq!(phase, TracePhase::Start);
                assert_eq!(node, "retrieve");
                assert_eq!(payload["message_count"], 1);
            }
            other => panic!("expected node trace, got {other:?}"),
        }
    }

    #[test]
    fn tool_and_turn_events_are_always_dropped() {
        let normalizer = EventStreamNormalizer::development();
        for event_type in [
            RawEventType::ToolCallStart,
            RawEventType::ToolCallEnd,
            RawEventType::TurnEnd,
        ] {
            let event = raw(event_type, "search", json!({}));
            assert!(normalizer.normalize(&event).is_none());
        }
    }
}
