//! Graph execution over one conversation turn.
//!
//! The orchestrator walks a [`GraphDefinition`] one node at a time, calling
//! out to the retriever, model, and tool registry, and consulting the router
//! after each model response. `execute` drives the turn to completion;
//! `execute_streaming` exposes the same control flow as a cancellable raw
//! event stream, and `stream_turn` as the normalized consumer stream.

mod stream_runner;

use crate::contracts::{
    ConversationState, DebugRecorder, EngineError, GraphDefinition, ModelClient, Node, NodeType,
    RawEvent, Retriever, ToolDescriptor, ToolRegistry, TraceKind, TraceRecord, TurnConfig,
    WorkflowEvent,
};
use crate::engine::loop_guard::ToolLoopGuard;
use crate::engine::router::{should_continue, NextNode, RouterConfig};
use crate::runtime::catalog::ToolCatalog;
use crate::runtime::control::TurnCancellationToken;
use crate::runtime::nodes::{build_model_request, run_finalize, run_retrieve, run_tool_calls};
use crate::runtime::normalizer::EventStreamNormalizer;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Boxed raw event stream for one turn. Single-pass, tied to that turn.
pub type RawEventStream = Pin<Box<dyn Stream<Item = Result<RawEvent, EngineError>> + Send>>;

/// Boxed normalized event stream for one turn.
pub type WorkflowEventStream = Pin<Box<dyn Stream<Item = Result<WorkflowEvent, EngineError>> + Send>>;

/// Executes a [`GraphDefinition`] over a [`ConversationState`].
///
/// The graph and collaborators are shared, read-only resources; the state is
/// owned by the orchestrator for the duration of one turn.
#[derive(Clone)]
pub struct Orchestrator {
    graph: Arc<GraphDefinition>,
    model: Arc<dyn ModelClient>,
    retriever: Option<Arc<dyn Retriever>>,
    catalog: Option<ToolCatalog>,
    recorder: Option<Arc<dyn DebugRecorder>>,
    guard: ToolLoopGuard,
}

impl Orchestrator {
    /// Orchestrator over a graph and model; other collaborators are optional.
    pub fn new(graph: Arc<GraphDefinition>, model: Arc<dyn ModelClient>) -> Self {
        Self {
            graph,
            model,
            retriever: None,
            catalog: None,
            recorder: None,
            guard: ToolLoopGuard::default(),
        }
    }

    /// Attach a retriever for the retrieve node.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Attach a tool registry; descriptors are read through a shared cache.
    #[must_use]
    pub fn with_tools(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.catalog = Some(ToolCatalog::new(registry));
        self
    }

    /// Attach a pre-built descriptor cache (shared across orchestrators).
    #[must_use]
    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Attach an execution trace sink.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn DebugRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Override the loop guard (e.g. a different window).
    #[must_use]
    pub fn with_guard(mut self, guard: ToolLoopGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Drive the graph to completion and return the final state.
    ///
    /// The returned state always ends in a non-empty AI message; model and
    /// configuration failures surface as errors instead.
    pub async fn execute(
        &self,
        mut state: ConversationState,
        config: &TurnConfig,
    ) -> Result<ConversationState, EngineError> {
        let run_id = Uuid::new_v4().to_string();
        state.begin_turn();
        let router_config = self.router_config(config);
        let budget = step_budget(config.max_tool_calls);
        let mut current = self.graph.entry_point.clone();

        for _ in 0..budget {
            let node = self.node(&current)?;
            tracing::debug!(run_id = %run_id, node = %node.id, "entering node");
            let started = Instant::now();

            match node.kind {
                NodeType::Start => {
                    current = self.follow(&node.id, &state)?;
                }
                NodeType::End => {
                    tracing::debug!(run_id = %run_id, "turn complete");
                    return Ok(state);
                }
                NodeType::Retrieve => {
                    let k = retrieval_k(&node, config);
                    let chunks = run_retrieve(self.retriever.as_ref(), &mut state, k).await;
                    self.record(
                        TraceKind::Node,
                        &node.id,
                        &run_id,
                        elapsed_ms(started),
                        json!({"chunks": chunks}),
                    )
                    .await;
                    current = self.follow(&node.id, &state)?;
                }
                NodeType::CallModel => {
                    let message = self.call_model_once(&state, &router_config).await?;
                    self.record(
                        TraceKind::Model,
                        self.model.model_name(),
                        &run_id,
                        elapsed_ms(started),
                        json!({"tool_calls": message.tool_calls().len()}),
                    )
                    .await;
                    state.push(message);
                    current = self.route_after_model(&node.id, &state, &router_config)?;
                }
                NodeType::ExecuteTools => {
                    let calls = state
                        .last_message()
                        .map(|m| m.tool_calls().to_vec())
                        .unwrap_or_default();
                    let registry = self.registry()?;
                    let outcomes = run_tool_calls(&registry, &calls).await;
                    for outcome in outcomes {
                        self.record(
                            TraceKind::Tool,
                            &outcome.call.name,
                            &run_id,
                            outcome.duration_ms,
                            json!({"error": outcome.is_error}),
                        )
                        .await;
                        state.push(outcome.into_message());
                    }
                    current = self.follow(&node.id, &state)?;
                }
                NodeType::FinalizeResponse => {
                    let message = run_finalize(&self.model, &state).await;
                    self.record(TraceKind::Node, &node.id, &run_id, elapsed_ms(started), json!({}))
                        .await;
                    state.push(message);
                    current = self.target_of_kind(&node.id, NodeType::End)?;
                }
            }
        }

        Err(EngineError::configuration(
            "node visit budget exceeded; graph failed to terminate",
        ))
    }

    /// Identical control flow to [`execute`], exposed as a lazy raw event
    /// stream.
    ///
    /// The stream suspends at every yield point and resumes only when the
    /// consumer pulls; dropping it (or cancelling the token) releases any
    /// in-flight model or tool call.
    ///
    /// [`execute`]: Orchestrator::execute
    pub fn execute_streaming(
        &self,
        state: ConversationState,
        config: TurnConfig,
        cancel: Option<TurnCancellationToken>,
    ) -> RawEventStream {
        stream_runner::run_stream(self.clone(), state, config, cancel)
    }

    /// [`execute_streaming`] composed with the normalizer: the consumer-facing
    /// event stream contract.
    ///
    /// [`execute_streaming`]: Orchestrator::execute_streaming
    pub fn stream_turn(
        &self,
        state: ConversationState,
        config: TurnConfig,
        cancel: Option<TurnCancellationToken>,
    ) -> WorkflowEventStream {
        let normalizer = EventStreamNormalizer::from_config(&config);
        let raw = self.execute_streaming(state, config, cancel);
        Box::pin(raw.filter_map(move |item| async move {
            match item {
                Ok(event) => normalizer.normalize(&event).map(Ok),
                Err(e) => Some(Err(e)),
            }
        }))
    }

    // -- shared helpers (used by both execution paths) --

    pub(super) fn router_config(&self, config: &TurnConfig) -> RouterConfig {
        RouterConfig {
            // Tool dispatch needs a registry; without one the router must
            // treat tool calls as a clean stop.
            use_tools: config.use_tools && self.catalog.is_some(),
            max_tool_calls: config.max_tool_calls,
        }
    }

    pub(super) fn node(&self, id: &str) -> Result<Node, EngineError> {
        self.graph
            .node(id)
            .cloned()
            .ok_or_else(|| EngineError::configuration(format!("unknown node '{id}'")))
    }

    /// First matching outgoing edge target.
    pub(super) fn follow(&self, from: &str, state: &ConversationState) -> Result<String, EngineError> {
        self.graph
            .next_from(from, state)
            .map(|e| e.target.clone())
            .ok_or_else(|| {
                EngineError::configuration(format!("node '{from}' has no matching outgoing edge"))
            })
    }

    /// Outgoing edge whose target node has the given kind.
    pub(super) fn target_of_kind(
        &self,
        from: &str,
        kind: NodeType,
    ) -> Result<String, EngineError> {
        self.graph
            .outgoing(from)
            .find(|e| self.graph.node(&e.target).is_some_and(|n| n.kind == kind))
            .map(|e| e.target.clone())
            .ok_or_else(|| {
                EngineError::configuration(format!("node '{from}' has no edge to a {kind} node"))
            })
    }

    /// Apply the router after a model response and resolve the target node.
    pub(super) fn route_after_model(
        &self,
        from: &str,
        state: &ConversationState,
        router_config: &RouterConfig,
    ) -> Result<String, EngineError> {
        let next = should_continue(state, router_config, &self.guard);
        tracing::debug!(decision = ?next, tool_call_count = state.tool_call_count, "router decision");
        let kind = match next {
            NextNode::ExecuteTools => NodeType::ExecuteTools,
            NextNode::FinalizeResponse => NodeType::FinalizeResponse,
            NextNode::End => NodeType::End,
        };
        self.target_of_kind(from, kind)
    }

    pub(super) fn registry(&self) -> Result<Arc<dyn ToolRegistry>, EngineError> {
        self.catalog
            .as_ref()
            .map(|c| Arc::clone(c.registry()))
            .ok_or_else(|| {
                EngineError::configuration("execute_tools node reached without a tool registry")
            })
    }

    /// Descriptors exposed to the model for this turn.
    pub(super) async fn tool_descriptors(
        &self,
        router_config: &RouterConfig,
    ) -> Result<Vec<ToolDescriptor>, EngineError> {
        if !router_config.use_tools {
            return Ok(Vec::new());
        }
        match &self.catalog {
            Some(catalog) => Ok(catalog.descriptors().await?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    async fn call_model_once(
        &self,
        state: &ConversationState,
        router_config: &RouterConfig,
    ) -> Result<crate::contracts::Message, EngineError> {
        let request = build_model_request(state);
        let tools = self.tool_descriptors(router_config).await?;
        self.model.complete(&request, &tools).await
    }

    pub(super) async fn record(
        &self,
        kind: TraceKind,
        name: &str,
        run_id: &str,
        duration_ms: u64,
        payload: Value,
    ) {
        if let Some(recorder) = &self.recorder {
            recorder
                .record(TraceRecord {
                    kind,
                    name: name.to_string(),
                    run_id: run_id.to_string(),
                    duration_ms,
                    payload,
                })
                .await;
        }
    }

    pub(super) fn model(&self) -> &Arc<dyn ModelClient> {
        &self.model
    }

    pub(super) fn retriever(&self) -> Option<&Arc<dyn Retriever>> {
        self.retriever.as_ref()
    }

    pub(super) fn graph(&self) -> &Arc<GraphDefinition> {
        &self.graph
    }
}

/// Ceiling on node visits per turn.
///
/// Every execute_tools visit appends at least one tool result, so tool rounds
/// are bounded by `max_tool_calls`; the rest of the walk is a constant number
/// of nodes. Exceeding this budget means the graph shape is broken.
pub(super) fn step_budget(max_tool_calls: usize) -> usize {
    2 * max_tool_calls + 8
}

pub(super) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Retrieval depth: node config wins over the turn default.
pub(super) fn retrieval_k(node: &Node, config: &TurnConfig) -> usize {
    node.config
        .get("retrieval_k")
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(config.retrieval_k)
}
