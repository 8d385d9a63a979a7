//! Optional execution-trace sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of traced work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Node,
    Model,
    Tool,
}

/// One execution trace entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// What kind of work was traced.
    pub kind: TraceKind,
    /// Node id, model name, or tool name.
    pub name: String,
    /// Run (turn) id the work belongs to.
    pub run_id: String,
    /// Wall-clock duration of the work in milliseconds.
    pub duration_ms: u64,
    /// Free-form payload (inputs, outputs, error text).
    pub payload: Value,
}

/// Sink for node/model/tool execution traces.
///
/// The engine calls this fire-and-forget; implementations own storage and
/// must not block the turn on slow writes.
#[async_trait]
pub trait DebugRecorder: Send + Sync {
    /// Record one trace entry.
    async fn record(&self, record: TraceRecord);
}
