//! Streaming execution: the same node walk as the synchronous path, exposed
//! as a cancellable raw event generator.
//!
//! The generator suspends at every yield and resumes only when the consumer
//! pulls the next event. A consumer that stops pulling drops the stream,
//! which drops any in-flight model or tool future; an explicit cancellation
//! token aborts between and inside node boundaries.

use super::{elapsed_ms, retrieval_k, step_budget, Orchestrator, RawEventStream};
use crate::contracts::{
    ConversationState, EngineError, ModelEvent, NodeType, RawEvent, RawEventType, TraceKind,
    TurnConfig,
};
use crate::runtime::control::{await_or_cancel, is_cancelled, CancelAware, TurnCancellationToken};
use crate::runtime::nodes::{build_model_request, run_finalize, run_retrieve, run_tool_calls};
use async_stream::stream;
use futures::StreamExt;
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

/// Per-run event factory carrying the run id and node scope.
struct EventScope {
    run_id: String,
}

impl EventScope {
    fn new(run_id: String) -> Self {
        Self { run_id }
    }

    fn node_start(&self, node_id: &str, state: &ConversationState) -> RawEvent {
        self.make(
            RawEventType::NodeStart,
            node_id,
            json!({"message_count": state.messages.len()}),
            Vec::new(),
        )
    }

    fn node_end(&self, node_id: &str, data: serde_json::Value) -> RawEvent {
        self.make(RawEventType::NodeEnd, node_id, data, Vec::new())
    }

    fn make(
        &self,
        event_type: RawEventType,
        name: &str,
        data: serde_json::Value,
        parent_ids: Vec<String>,
    ) -> RawEvent {
        let event = RawEvent::new(event_type, name, data, self.run_id.clone(), parent_ids);
        tracing::trace!(
            run_id = %self.run_id,
            event_type = %event.event_type.as_str(),
            name = %event.name,
            "emit raw event"
        );
        event
    }
}

pub(super) fn run_stream(
    orchestrator: Orchestrator,
    mut state: ConversationState,
    config: TurnConfig,
    cancel: Option<TurnCancellationToken>,
) -> RawEventStream {
    Box::pin(stream! {
        let run_id = Uuid::new_v4().to_string();
        let scope = EventScope::new(run_id.clone());
        state.begin_turn();
        let router_config = orchestrator.router_config(&config);
        let budget = step_budget(config.max_tool_calls);
        let mut current = orchestrator.graph().entry_point.clone();

        for _ in 0..budget {
            if is_cancelled(cancel.as_ref()) {
                yield Err(EngineError::Cancelled);
                return;
            }

            let node = match orchestrator.node(&current) {
                Ok(node) => node,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let started = Instant::now();
            yield Ok(scope.node_start(&node.id, &state));

            match node.kind {
                NodeType::Start => {
                    yield Ok(scope.node_end(&node.id, json!({})));
                    match orchestrator.follow(&node.id, &state) {
                        Ok(next) => current = next,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                NodeType::End => {
                    yield Ok(scope.node_end(&node.id, json!({})));
                    yield Ok(scope.make(
                        RawEventType::TurnEnd,
                        "turn",
                        json!({"messages": state.messages}),
                        Vec::new(),
                    ));
                    return;
                }
                NodeType::Retrieve => {
                    let k = retrieval_k(&node, &config);
                    let chunks = match await_or_cancel(
                        cancel.as_ref(),
                        run_retrieve(orchestrator.retriever(), &mut state, k),
                    )
                    .await
                    {
                        CancelAware::Value(chunks) => chunks,
                        CancelAware::Cancelled => {
                            yield Err(EngineError::Cancelled);
                            return;
                        }
                    };
                    orchestrator
                        .record(TraceKind::Node, &node.id, &run_id, elapsed_ms(started), json!({"chunks": chunks}))
                        .await;
                    yield Ok(scope.node_end(&node.id, json!({"chunks": chunks})));
                    match orchestrator.follow(&node.id, &state) {
                        Ok(next) => current = next,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                NodeType::CallModel => {
                    let request = build_model_request(&state);
                    let tools = match orchestrator.tool_descriptors(&router_config).await {
                        Ok(tools) => tools,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    let model = orchestrator.model();
                    let model_name = model.model_name().to_string();
                    let parents = vec![node.id.clone()];

                    let message = if config.enable_llm_streaming {
                        let events = match await_or_cancel(
                            cancel.as_ref(),
                            model.stream(&request, &tools),
                        )
                        .await
                        {
                            CancelAware::Value(Ok(events)) => events,
                            CancelAware::Value(Err(e)) => {
                                yield Err(e);
                                return;
                            }
                            CancelAware::Cancelled => {
                                yield Err(EngineError::Cancelled);
                                return;
                            }
                        };
                        let mut events = events;
                        let mut completed = None;
                        loop {
                            match await_or_cancel(cancel.as_ref(), events.next()).await {
                                CancelAware::Cancelled => {
                                    yield Err(EngineError::Cancelled);
                                    return;
                                }
                                CancelAware::Value(None) => break,
                                CancelAware::Value(Some(Err(e))) => {
                                    yield Err(e);
                                    return;
                                }
                                CancelAware::Value(Some(Ok(ModelEvent::TokenDelta { content }))) => {
                                    yield Ok(scope.make(
                                        RawEventType::ModelTokenDelta,
                                        &model_name,
                                        json!({"content": content}),
                                        parents.clone(),
                                    ));
                                }
                                CancelAware::Value(Some(Ok(ModelEvent::Completed { message }))) => {
                                    completed = Some(message);
                                }
                            }
                        }
                        match completed {
                            Some(message) => message,
                            None => {
                                yield Err(EngineError::model(
                                    "model stream ended without a completion event",
                                ));
                                return;
                            }
                        }
                    } else {
                        match await_or_cancel(cancel.as_ref(), model.complete(&request, &tools))
                            .await
                        {
                            CancelAware::Value(Ok(message)) => message,
                            CancelAware::Value(Err(e)) => {
                                yield Err(e);
                                return;
                            }
                            CancelAware::Cancelled => {
                                yield Err(EngineError::Cancelled);
                                return;
                            }
                        }
                    };

                    orchestrator
                        .record(
                            TraceKind::Model,
                            &model_name,
                            &run_id,
                            elapsed_ms(started),
                            json!({"tool_calls": message.tool_calls().len()}),
                        )
                        .await;
                    yield Ok(scope.make(
                        RawEventType::ModelCallEnd,
                        &model_name,
                        json!({"output": message}),
                        parents,
                    ));

                    state.push(message);
                    yield Ok(scope.node_end(&node.id, json!({"message_count": state.messages.len()})));
                    match orchestrator.route_after_model(&node.id, &state, &router_config) {
                        Ok(next) => current = next,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                NodeType::ExecuteTools => {
                    let calls = state
                        .last_message()
                        .map(|m| m.tool_calls().to_vec())
                        .unwrap_or_default();
                    let registry = match orchestrator.registry() {
                        Ok(registry) => registry,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    let parents = vec![node.id.clone()];

                    for call in &calls {
                        yield Ok(scope.make(
                            RawEventType::ToolCallStart,
                            &call.name,
                            json!({"id": call.id, "arguments": call.arguments}),
                            parents.clone(),
                        ));
                    }

                    let outcomes = match await_or_cancel(
                        cancel.as_ref(),
                        run_tool_calls(&registry, &calls),
                    )
                    .await
                    {
                        CancelAware::Value(outcomes) => outcomes,
                        CancelAware::Cancelled => {
                            yield Err(EngineError::Cancelled);
                            return;
                        }
                    };

                    for outcome in outcomes {
                        orchestrator
                            .record(
                                TraceKind::Tool,
                                &outcome.call.name,
                                &run_id,
                                outcome.duration_ms,
                                json!({"error": outcome.is_error}),
                            )
                            .await;
                        yield Ok(scope.make(
                            RawEventType::ToolCallEnd,
                            &outcome.call.name,
                            json!({
                                "id": outcome.call.id,
                                "result": outcome.content,
                                "error": outcome.is_error,
                            }),
                            parents.clone(),
                        ));
                        state.push(outcome.into_message());
                    }

                    yield Ok(scope.node_end(&node.id, json!({"tool_calls": calls.len()})));
                    match orchestrator.follow(&node.id, &state) {
                        Ok(next) => current = next,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
                NodeType::FinalizeResponse => {
                    let message = match await_or_cancel(
                        cancel.as_ref(),
                        run_finalize(orchestrator.model(), &state),
                    )
                    .await
                    {
                        CancelAware::Value(message) => message,
                        CancelAware::Cancelled => {
                            yield Err(EngineError::Cancelled);
                            return;
                        }
                    };
                    orchestrator
                        .record(TraceKind::Node, &node.id, &run_id, elapsed_ms(started), json!({}))
                        .await;
                    yield Ok(scope.make(
                        RawEventType::ModelCallEnd,
                        orchestrator.model().model_name(),
                        json!({"output": message}),
                        vec![node.id.clone()],
                    ));
                    state.push(message);
                    yield Ok(scope.node_end(&node.id, json!({})));
                    match orchestrator.target_of_kind(&node.id, NodeType::End) {
                        Ok(next) => current = next,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        }

        yield Err(EngineError::configuration(
            "node visit budget exceeded; graph failed to terminate",
        ));
    })
}
