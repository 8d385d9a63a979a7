//! Declarative workflow graph definitions.
//!
//! A [`GraphDefinition`] is built once per workflow variant, validated, and
//! then treated as read-only; it is safe to share across concurrent turns
//! behind an `Arc`.

use crate::error::EngineError;
use crate::state::ConversationState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Closed set of node kinds. Dispatch over this enum is exhaustive by
/// construction; there is no default handler to fall through to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Start,
    Retrieve,
    CallModel,
    ExecuteTools,
    FinalizeResponse,
    End,
}

impl NodeType {
    /// Stable name used in node ids, traces, and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Retrieve => "retrieve",
            Self::CallModel => "call_model",
            Self::ExecuteTools => "execute_tools",
            Self::FinalizeResponse => "finalize_response",
            Self::End => "end",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work in the workflow graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique node id within the graph.
    pub id: String,
    /// Node kind.
    pub kind: NodeType,
    /// Per-node configuration (e.g. retrieval depth).
    pub config: HashMap<String, Value>,
}

impl Node {
    /// Build a node whose id is the kind's stable name.
    pub fn of(kind: NodeType) -> Self {
        Self {
            id: kind.as_str().to_string(),
            kind,
            config: HashMap::new(),
        }
    }

    /// Attach a config entry.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Predicate over conversation state gating a conditional edge.
pub type EdgeCondition = Arc<dyn Fn(&ConversationState) -> bool + Send + Sync>;

/// Directed edge between two nodes.
#[derive(Clone)]
pub struct Edge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Optional predicate; an unconditional edge always matches.
    pub condition: Option<EdgeCondition>,
}

impl Edge {
    /// Unconditional edge.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    /// Conditional edge.
    pub fn when(
        source: impl Into<String>,
        target: impl Into<String>,
        condition: EdgeCondition,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: Some(condition),
        }
    }

    /// Whether this edge applies to the given state.
    pub fn matches(&self, state: &ConversationState) -> bool {
        match &self.condition {
            Some(cond) => cond(state),
            None => true,
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("conditional", &self.condition.is_some())
            .finish()
    }
}

/// Declarative node/edge topology for one workflow variant.
#[derive(Debug, Clone)]
pub struct GraphDefinition {
    /// All nodes, keyed lookup via [`GraphDefinition::node`].
    pub nodes: Vec<Node>,
    /// All edges.
    pub edges: Vec<Edge>,
    /// Id of the node execution starts from.
    pub entry_point: String,
}

impl GraphDefinition {
    /// Build and validate a graph.
    pub fn new(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        entry_point: impl Into<String>,
    ) -> Result<Self, EngineError> {
        let graph = Self {
            nodes,
            edges,
            entry_point: entry_point.into(),
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing edges of a node, in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// First outgoing edge of `id` whose condition matches `state`.
    pub fn next_from(&self, id: &str, state: &ConversationState) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source == id && e.matches(state))
    }

    /// Check structural invariants:
    /// - the entry point exists and is the single `start` node,
    /// - every edge endpoint names an existing node,
    /// - every non-`end` node has at least one outgoing edge.
    pub fn validate(&self) -> Result<(), EngineError> {
        let starts: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeType::Start)
            .collect();
        if starts.len() != 1 {
            return Err(EngineError::configuration(format!(
                "graph must have exactly one start node, found {}",
                starts.len()
            )));
        }
        if starts[0].id != self.entry_point {
            return Err(EngineError::configuration(format!(
                "entry point '{}' is not the start node '{}'",
                self.entry_point, starts[0].id
            )));
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if self.node(endpoint).is_none() {
                    return Err(EngineError::configuration(format!(
                        "edge references unknown node '{endpoint}'"
                    )));
                }
            }
        }

        for node in &self.nodes {
            if node.kind != NodeType::End && self.outgoing(&node.id).next().is_none() {
                return Err(EngineError::configuration(format!(
                    "node '{}' has no outgoing edge",
                    node.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_graph() -> GraphDefinition {
        GraphDefinition::new(
            vec![
                Node::of(NodeType::Start),
                Node::of(NodeType::CallModel),
                Node::of(NodeType::End),
            ],
            vec![
                Edge::new("start", "call_model"),
                Edge::new("call_model", "end"),
            ],
            "start",
        )
        .unwrap()
    }

    #[test]
    fn valid_linear_graph_passes_validation() {
        let graph = linear_graph();
        assert_eq!(graph.node("call_model").unwrap().kind, NodeType::CallModel);
    }

    #[test]
    fn missing_start_node_is_rejected() {
        let err = GraphDefinition::new(
            vec![Node::of(NodeType::CallModel), Node::of(NodeType::End)],
            vec![Edge::new("call_model", "end")],
            "call_model",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn dangling_edge_is_rejected() {
        let err = GraphDefinition::new(
            vec![Node::of(NodeType::Start), Node::of(NodeType::End)],
            vec![Edge::new("start", "nowhere")],
            "start",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn dead_end_non_end_node_is_rejected() {
        let err = GraphDefinition::new(
            vec![
                Node::of(NodeType::Start),
                Node::of(NodeType::CallModel),
                Node::of(NodeType::End),
            ],
            vec![Edge::new("start", "call_model")],
            "start",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn conditional_edge_selected_by_state() {
        let state = ConversationState::new();
        let never: EdgeCondition = Arc::new(|_| false);
        let graph = GraphDefinition::new(
            vec![
                Node::of(NodeType::Start),
                Node::of(NodeType::CallModel),
                Node::of(NodeType::End),
            ],
            vec![
                Edge::when("start", "end", never),
                Edge::new("start", "call_model"),
                Edge::new("call_model", "end"),
            ],
            "start",
        )
        .unwrap();
        assert_eq!(graph.next_from("start", &state).unwrap().target, "call_model");
    }
}
