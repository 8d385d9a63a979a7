//! Variant-to-graph construction.
//!
//! All four workflow topologies come out of one parameterized constructor;
//! there are no hand-written per-variant graphs.

use crate::contracts::{Edge, EngineError, GraphDefinition, Node, NodeType, WorkflowVariant};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Parameters applied to individual nodes during graph construction.
#[derive(Debug, Clone)]
pub struct GraphParams {
    /// Number of chunks the retrieve node requests.
    pub retrieval_k: usize,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            retrieval_k: crate::contracts::config::DEFAULT_RETRIEVAL_K,
        }
    }
}

impl GraphParams {
    /// Read parameters out of a string-keyed mapping; unknown keys are
    /// ignored, missing keys keep their defaults.
    pub fn from_mapping(params: &HashMap<String, Value>) -> Self {
        let mut out = Self::default();
        if let Some(k) = params.get("retrieval_k").and_then(Value::as_u64) {
            out.retrieval_k = k as usize;
        }
        out
    }
}

/// Build the graph for a workflow variant.
///
/// Deterministic and side-effect-free; the returned graph is validated.
pub fn build_graph(
    variant: WorkflowVariant,
    params: &GraphParams,
) -> Result<GraphDefinition, EngineError> {
    let mut nodes = vec![Node::of(NodeType::Start)];
    let mut edges = Vec::new();

    if variant.has_retrieval() {
        nodes.push(
            Node::of(NodeType::Retrieve).with_config("retrieval_k", json!(params.retrieval_k)),
        );
        edges.push(Edge::new("start", "retrieve"));
        edges.push(Edge::new("retrieve", "call_model"));
    } else {
        edges.push(Edge::new("start", "call_model"));
    }

    nodes.push(Node::of(NodeType::CallModel));
    nodes.push(Node::of(NodeType::End));
    edges.push(Edge::new("call_model", "end"));

    if variant.has_tools() {
        nodes.push(Node::of(NodeType::ExecuteTools));
        nodes.push(Node::of(NodeType::FinalizeResponse));
        edges.push(Edge::new("call_model", "execute_tools"));
        edges.push(Edge::new("call_model", "finalize_response"));
        edges.push(Edge::new("execute_tools", "call_model"));
        edges.push(Edge::new("finalize_response", "end"));
    }

    GraphDefinition::new(nodes, edges, "start")
}

/// Build a graph from a variant name and parameter mapping.
///
/// An unrecognized variant name fails with a configuration error.
pub fn build_graph_named(
    name: &str,
    params: &HashMap<String, Value>,
) -> Result<GraphDefinition, EngineError> {
    let variant: WorkflowVariant = name.parse()?;
    build_graph(variant, &GraphParams::from_mapping(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_ids(graph: &GraphDefinition) -> Vec<&str> {
        graph.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn plain_variant_is_a_three_node_line() {
        let graph = build_graph(WorkflowVariant::Plain, &GraphParams::default()).unwrap();
        assert_eq!(node_ids(&graph), vec!["start", "call_model", "end"]);
        assert_eq!(graph.outgoing("start").next().unwrap().target, "call_model");
    }

    #[test]
    fn rag_variant_routes_through_retrieve() {
        let graph = build_graph(WorkflowVariant::Rag, &GraphParams::default()).unwrap();
        assert_eq!(graph.outgoing("start").next().unwrap().target, "retrieve");
        assert_eq!(
            graph.outgoing("retrieve").next().unwrap().target,
            "call_model"
        );
    }

    #[test]
    fn tools_variant_has_loop_and_finalize_edges() {
        let graph = build_graph(WorkflowVariant::Tools, &GraphParams::default()).unwrap();
        let call_model_targets: Vec<_> =
            graph.outgoing("call_model").map(|e| e.target.as_str()).collect();
        assert!(call_model_targets.contains(&"execute_tools"));
        assert!(call_model_targets.contains(&"finalize_response"));
        assert!(call_model_targets.contains(&"end"));
        assert_eq!(
            graph.outgoing("execute_tools").next().unwrap().target,
            "call_model"
        );
        assert_eq!(
            graph.outgoing("finalize_response").next().unwrap().target,
            "end"
        );
    }

    #[test]
    fn full_variant_has_both_segments() {
        let graph = build_graph(WorkflowVariant::Full, &GraphParams::default()).unwrap();
        assert!(graph.node("retrieve").is_some());
        assert!(graph.node("execute_tools").is_some());
    }

    #[test]
    fn retrieval_k_lands_in_node_config() {
        let params = HashMap::from([("retrieval_k".to_string(), json!(9))]);
        let graph = build_graph_named("rag", &params).unwrap();
        let retrieve = graph.node("retrieve").unwrap();
        assert_eq!(retrieve.config["retrieval_k"], json!(9));
    }

    #[test]
    fn unknown_variant_name_fails() {
        let err = build_graph_named("supervised", &HashMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn construction_is_deterministic() {
        let a = build_graph(WorkflowVariant::Full, &GraphParams::default()).unwrap();
        let b = build_graph(WorkflowVariant::Full, &GraphParams::default()).unwrap();
        assert_eq!(node_ids(&a), node_ids(&b));
        assert_eq!(a.edges.len(), b.edges.len());
    }
}
