//! Shared test fixtures for crates that depend on `weft-contract`.
//!
//! Gated behind the `test-support` cargo feature so production builds are
//! unaffected. Enable via
//! `[dev-dependencies] weft-contract = { ..., features = ["test-support"] }`.

use crate::error::EngineError;
use crate::model::{ModelClient, ModelEvent, ModelEventStream};
use crate::recorder::{DebugRecorder, TraceRecord};
use crate::retrieval::{DocumentChunk, Retriever};
use crate::thread::Message;
use crate::tool::{ToolDescriptor, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Model that replays a scripted sequence of responses.
///
/// `complete` and `stream` consume the same script; `stream` re-plays the
/// response content as fixed-size token deltas before the terminal event.
pub struct ScriptedModel {
    name: String,
    script: Mutex<VecDeque<Result<Message, EngineError>>>,
    prompts: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    /// Build a model that answers with the given responses, in order.
    pub fn new(responses: Vec<Result<Message, EngineError>>) -> Self {
        Self {
            name: "scripted-model".to_string(),
            script: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Model that always fails.
    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    /// Number of completed calls (streaming and non-streaming).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message sequences the model was called with, in call order.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_response(&self, messages: &[Message]) -> Result<Message, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::model("scripted model exhausted")))
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolDescriptor],
    ) -> Result<Message, EngineError> {
        self.next_response(messages)
    }

    async fn stream(
        &self,
        messages: &[Message],
        _tools: &[ToolDescriptor],
    ) -> Result<ModelEventStream, EngineError> {
        let message = self.next_response(messages)?;
        let mut events: Vec<Result<ModelEvent, EngineError>> = message
            .content()
            .as_bytes()
            .chunks(4)
            .map(|chunk| {
                Ok(ModelEvent::TokenDelta {
                    content: String::from_utf8_lossy(chunk).into_owned(),
                })
            })
            .collect();
        events.push(Ok(ModelEvent::Completed { message }));
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

type ToolHandler = Arc<dyn Fn(&Value) -> Result<String, EngineError> + Send + Sync>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
    latency: Duration,
}

/// In-memory tool registry backed by closures, with optional per-tool latency
/// for exercising completion-order inversions.
#[derive(Default)]
pub struct MockRegistry {
    tools: HashMap<String, RegisteredTool>,
    invocations: Mutex<Vec<String>>,
}

impl MockRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with a handler closure.
    #[must_use]
    pub fn with_tool(
        mut self,
        name: &str,
        description: &str,
        handler: impl Fn(&Value) -> Result<String, EngineError> + Send + Sync + 'static,
    ) -> Self {
        self.tools.insert(
            name.to_string(),
            RegisteredTool {
                descriptor: ToolDescriptor::new(
                    name,
                    description,
                    serde_json::json!({"type": "object"}),
                ),
                handler: Arc::new(handler),
                latency: Duration::ZERO,
            },
        );
        self
    }

    /// Add artificial latency to a registered tool.
    #[must_use]
    pub fn with_latency(mut self, name: &str, latency: Duration) -> Self {
        if let Some(tool) = self.tools.get_mut(name) {
            tool.latency = latency;
        }
        self
    }

    /// Tool names in invocation order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRegistry for MockRegistry {
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<String, EngineError> {
        self.invocations.lock().unwrap().push(name.to_string());
        let Some(tool) = self.tools.get(name) else {
            return Err(EngineError::tool(format!("unknown tool '{name}'")));
        };
        if !tool.latency.is_zero() {
            tokio::time::sleep(tool.latency).await;
        }
        (tool.handler)(arguments)
    }

    async fn descriptors(&self) -> Result<Vec<ToolDescriptor>, EngineError> {
        Ok(self.tools.values().map(|t| t.descriptor.clone()).collect())
    }
}

/// Retriever returning a fixed chunk list, or a scripted failure.
pub struct StaticRetriever {
    chunks: Result<Vec<DocumentChunk>, EngineError>,
    queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    /// Retriever that always returns the given chunks.
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        Self {
            chunks: Ok(chunks),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Retriever that always fails.
    pub fn failing(message: &str) -> Self {
        Self {
            chunks: Err(EngineError::retrieval(message)),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, EngineError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.chunks {
            Ok(chunks) => Ok(chunks.iter().take(k).cloned().collect()),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Recorder that captures trace records in memory.
#[derive(Default)]
pub struct RecordingRecorder {
    records: Mutex<Vec<TraceRecord>>,
}

impl RecordingRecorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured records, in emission order.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DebugRecorder for RecordingRecorder {
    async fn record(&self, record: TraceRecord) {
        self.records.lock().unwrap().push(record);
    }
}
