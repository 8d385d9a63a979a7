//! Run one full-variant turn against scripted collaborators and print the
//! normalized event stream.
//!
//! ```sh
//! RUST_LOG=weft_engine=debug cargo run -p weft-engine --example scripted_turn
//! ```

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use weft_contract::testing::{MockRegistry, ScriptedModel, StaticRetriever};
use weft_contract::{
    ConversationState, DocumentChunk, Message, ToolCall, TurnConfig, WorkflowEvent,
    WorkflowVariant,
};
use weft_engine::{build_graph, GraphParams, Orchestrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let model = Arc::new(ScriptedModel::new(vec![
        Ok(Message::ai_with_tool_calls(
            "",
            vec![ToolCall::new("tc-1", "search", json!({"query": "weft"}))],
        )),
        Ok(Message::ai(
            "Weft is a turn-based workflow engine for conversational agents.",
        )),
    ]));
    let registry = Arc::new(MockRegistry::new().with_tool(
        "search",
        "full-text search over the docs",
        |_| Ok("weft: graph-driven chat turn orchestration".to_string()),
    ));
    let retriever = Arc::new(StaticRetriever::new(vec![DocumentChunk::new(
        "weft executes one conversation turn as a walk over a small node graph",
    )]));

    let graph = Arc::new(build_graph(WorkflowVariant::Full, &GraphParams::default())?);
    let orchestrator = Orchestrator::new(graph, model)
        .with_tools(registry)
        .with_retriever(retriever);

    let mut state = ConversationState::new();
    state.push(Message::human("what is weft?"));

    let config = TurnConfig::new(WorkflowVariant::Full).with_node_tracing(true);
    let mut events = orchestrator.stream_turn(state, config, None);

    while let Some(event) = events.next().await {
        match event? {
            WorkflowEvent::TokenStream { content, .. } => print!("{content}"),
            WorkflowEvent::Completion { messages, .. } => {
                println!();
                for message in &messages {
                    println!("[completion] {}", message.content());
                }
            }
            WorkflowEvent::NodeTrace { phase, node, .. } => {
                eprintln!("[trace] {node} {phase:?}");
            }
        }
    }

    Ok(())
}
