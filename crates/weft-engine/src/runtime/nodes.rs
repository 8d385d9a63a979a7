//! Node handlers: the work units the orchestrator schedules.
//!
//! Handlers never pick their own successor; routing stays in
//! [`crate::engine::router`]. Each handler commits whole-node results only —
//! partial work is never observable in the conversation state.

use crate::contracts::{
    ConversationState, EngineError, Message, ModelClient, Retriever, ToolCall, ToolRegistry,
};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// State variable holding the formatted retrieval context for this turn.
pub const RETRIEVED_CONTEXT_KEY: &str = "retrieved_context";

/// Number of trailing tool results fed into the finalize prompt.
const FINALIZE_RESULT_COUNT: usize = 3;

/// Run the retrieve node: look up document context for the last user message.
///
/// Degrades to an empty context on any failure — retrieval must never block
/// the plain-chat fallback. Returns the number of chunks stored.
pub(crate) async fn run_retrieve(
    retriever: Option<&Arc<dyn Retriever>>,
    state: &mut ConversationState,
    k: usize,
) -> usize {
    let Some(retriever) = retriever else {
        tracing::debug!("retrieve node reached without a retriever, skipping");
        return 0;
    };
    let Some(query) = state.last_human().map(|m| m.content().to_string()) else {
        return 0;
    };

    match retriever.retrieve(&query, k).await {
        Ok(chunks) if !chunks.is_empty() => {
            let formatted = chunks
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let count = chunks.len();
            state
                .variables
                .insert(RETRIEVED_CONTEXT_KEY.to_string(), json!(formatted));
            count
        }
        Ok(_) => 0,
        Err(e) => {
            tracing::warn!(error = %e, "retrieval failed, continuing with empty context");
            0
        }
    }
}

/// Build the message sequence sent to the model.
///
/// When retrieval context exists, the last human message is augmented in the
/// request copy only; persisted history is never rewritten.
pub(crate) fn build_model_request(state: &ConversationState) -> Vec<Message> {
    let mut request = state.messages.clone();

    let context = state
        .variables
        .get(RETRIEVED_CONTEXT_KEY)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    if let Some(context) = context {
        if let Some(last_human) = request.iter().rposition(|m| m.is_human()) {
            let question = request[last_human].content();
            request[last_human] = Message::human(format!(
                "Context:\n{context}\n\nQuestion: {question}"
            ));
        }
    }

    request
}

/// Outcome of one tool call within an execute_tools step.
#[derive(Debug, Clone)]
pub(crate) struct ToolOutcome {
    pub call: ToolCall,
    pub content: String,
    pub is_error: bool,
    pub duration_ms: u64,
}

impl ToolOutcome {
    /// The tool result message this outcome appends.
    pub fn into_message(self) -> Message {
        Message::tool(self.content, self.call.id)
    }
}

/// Dispatch every tool call of one step concurrently.
///
/// Results come back in request order regardless of completion order, and a
/// failed call (unknown name included) becomes an error-bearing outcome
/// rather than aborting the step.
pub(crate) async fn run_tool_calls(
    registry: &Arc<dyn ToolRegistry>,
    calls: &[ToolCall],
) -> Vec<ToolOutcome> {
    let futures = calls.iter().map(|call| {
        let registry = Arc::clone(registry);
        let call = call.clone();
        async move {
            let started = Instant::now();
            let result = registry.invoke(&call.name, &call.arguments).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            match result {
                Ok(content) => ToolOutcome {
                    call,
                    content,
                    is_error: false,
                    duration_ms,
                },
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                    let content = format!("tool '{}' failed: {e}", call.name);
                    ToolOutcome {
                        call,
                        content,
                        is_error: true,
                        duration_ms,
                    }
                }
            }
        }
    });

    // join_all preserves input order in its output.
    join_all(futures).await
}

/// Run the finalize_response node: synthesize a non-empty closing message
/// from whatever tool evidence exists.
///
/// The model is invoked once, non-streaming; any failure or empty response
/// falls back to a deterministic template. The returned message is never
/// empty.
pub(crate) async fn run_finalize(
    model: &Arc<dyn ModelClient>,
    state: &ConversationState,
) -> Message {
    let question = state
        .last_human()
        .map(|m| m.content().to_string())
        .unwrap_or_default();
    let results: Vec<&str> = state
        .messages
        .iter()
        .filter(|m| m.is_tool())
        .map(Message::content)
        .collect();
    let results: Vec<&str> = results
        .iter()
        .rev()
        .take(FINALIZE_RESULT_COUNT)
        .rev()
        .copied()
        .collect();

    let prompt = format!(
        "Given results: {results}. Answer: {question}",
        results = results.join("; ")
    );
    let request = vec![Message::human(prompt)];

    match model.complete(&request, &[]).await {
        Ok(message) if !message.content().trim().is_empty() => Message::ai(message.content()),
        Ok(_) => {
            tracing::warn!("finalize model call returned empty content, using fallback");
            Message::ai(fallback_answer(&results))
        }
        Err(e) => {
            tracing::warn!(error = %e, "finalize model call failed, using fallback");
            Message::ai(fallback_answer(&results))
        }
    }
}

fn fallback_answer(results: &[&str]) -> String {
    if results.is_empty() {
        "I was unable to complete the requested tool workflow and no tool results \
         are available. Please try rephrasing your question."
            .to_string()
    } else {
        format!(
            "I could not fully complete the requested tool workflow. Based on the \
             partial results gathered so far: {}",
            results.join("; ")
        )
    }
}
