//! Shared contracts for the weft turn engine: conversation data model,
//! workflow graph definitions, event types, collaborator traits, and the
//! per-turn configuration surface.

pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod model;
pub mod recorder;
pub mod retrieval;
pub mod state;
#[cfg(feature = "test-support")]
pub mod testing;
pub mod thread;
pub mod tool;

pub use config::{TurnConfig, WorkflowVariant, DEFAULT_MAX_TOOL_CALLS};
pub use error::EngineError;
pub use event::{RawEvent, RawEventType, TracePhase, WorkflowEvent};
pub use graph::{Edge, GraphDefinition, Node, NodeType};
pub use model::{ModelClient, ModelEvent, ModelEventStream};
pub use recorder::{DebugRecorder, TraceKind, TraceRecord};
pub use retrieval::{DocumentChunk, Retriever};
pub use state::ConversationState;
pub use thread::{Message, ToolCall};
pub use tool::{ToolDescriptor, ToolRegistry};
