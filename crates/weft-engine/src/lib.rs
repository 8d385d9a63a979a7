//! Workflow orchestration engine for one chat turn.
//!
//! The engine drives a [`GraphDefinition`] over a [`ConversationState`],
//! calling out to the retriever, model, and tool registry, and produces a
//! normalized event stream for real-time consumers:
//!
//! ```text
//! User Input → [retrieve?] → call_model → Tool Calls? → execute_tools → call_model → ...
//!                                   │
//!                                   └─ ceiling / loop guard → finalize_response → end
//! ```
//!
//! [`GraphDefinition`]: weft_contract::GraphDefinition
//! [`ConversationState`]: weft_contract::ConversationState

pub use weft_contract as contracts;

pub mod engine;
pub mod runtime;

pub use engine::graph::{build_graph, build_graph_named, GraphParams};
pub use engine::loop_guard::{GuardVerdict, ToolLoopGuard};
pub use engine::router::{should_continue, NextNode, RouterConfig};
pub use runtime::catalog::ToolCatalog;
pub use runtime::control::TurnCancellationToken;
pub use runtime::normalizer::EventStreamNormalizer;
pub use runtime::orchestrator::{Orchestrator, RawEventStream, WorkflowEventStream};
