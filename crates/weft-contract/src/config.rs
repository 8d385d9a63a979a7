//! Per-turn configuration surface.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default hard ceiling on tool calls per turn.
pub const DEFAULT_MAX_TOOL_CALLS: usize = 10;

/// Default number of chunks requested from the retriever.
pub const DEFAULT_RETRIEVAL_K: usize = 4;

/// The four canonical workflow topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowVariant {
    /// start → call_model → end
    Plain,
    /// start → retrieve → call_model → end
    Rag,
    /// start → call_model → (execute_tools ⇄ call_model)* → end
    Tools,
    /// start → retrieve → call_model → (execute_tools ⇄ call_model)* → end
    Full,
}

impl WorkflowVariant {
    /// Whether this variant includes the retrieve node.
    pub fn has_retrieval(self) -> bool {
        matches!(self, Self::Rag | Self::Full)
    }

    /// Whether this variant includes the tool loop.
    pub fn has_tools(self) -> bool {
        matches!(self, Self::Tools | Self::Full)
    }

    /// Stable variant name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Rag => "rag",
            Self::Tools => "tools",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowVariant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "rag" => Ok(Self::Rag),
            "tools" => Ok(Self::Tools),
            "full" => Ok(Self::Full),
            other => Err(EngineError::configuration(format!(
                "unknown workflow variant '{other}'"
            ))),
        }
    }
}

/// Configuration consumed per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Workflow topology to run.
    pub variant: WorkflowVariant,
    /// Whether the router may dispatch tool calls at all.
    pub use_tools: bool,
    /// Hard ceiling on tool calls per turn; reaching it forces finalization.
    pub max_tool_calls: usize,
    /// Stream model token deltas instead of waiting for whole messages.
    pub enable_llm_streaming: bool,
    /// Emit node-boundary trace events (development/debug mode).
    pub enable_node_tracing: bool,
    /// Number of chunks requested from the retriever.
    pub retrieval_k: usize,
}

impl TurnConfig {
    /// Create a config for a variant with defaults matching production mode:
    /// streaming on, node tracing off, tool use following the variant.
    pub fn new(variant: WorkflowVariant) -> Self {
        Self {
            variant,
            use_tools: variant.has_tools(),
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            enable_llm_streaming: true,
            enable_node_tracing: false,
            retrieval_k: DEFAULT_RETRIEVAL_K,
        }
    }

    /// Set the tool-call ceiling.
    #[must_use]
    pub fn with_max_tool_calls(mut self, max_tool_calls: usize) -> Self {
        self.max_tool_calls = max_tool_calls;
        self
    }

    /// Enable or disable tool dispatch.
    #[must_use]
    pub fn with_tools(mut self, use_tools: bool) -> Self {
        self.use_tools = use_tools;
        self
    }

    /// Enable or disable token-delta streaming.
    #[must_use]
    pub fn with_llm_streaming(mut self, enabled: bool) -> Self {
        self.enable_llm_streaming = enabled;
        self
    }

    /// Enable or disable node-boundary tracing.
    #[must_use]
    pub fn with_node_tracing(mut self, enabled: bool) -> Self {
        self.enable_node_tracing = enabled;
        self
    }

    /// Set the retrieval depth.
    #[must_use]
    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self::new(WorkflowVariant::Plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_known_names() {
        assert_eq!("plain".parse::<WorkflowVariant>().unwrap(), WorkflowVariant::Plain);
        assert_eq!("rag".parse::<WorkflowVariant>().unwrap(), WorkflowVariant::Rag);
        assert_eq!("tools".parse::<WorkflowVariant>().unwrap(), WorkflowVariant::Tools);
        assert_eq!("full".parse::<WorkflowVariant>().unwrap(), WorkflowVariant::Full);
    }

    #[test]
    fn unknown_variant_is_a_configuration_error() {
        let err = "agentic".parse::<WorkflowVariant>().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn defaults_follow_the_variant() {
        let plain = TurnConfig::new(WorkflowVariant::Plain);
        assert!(!plain.use_tools);
        assert_eq!(plain.max_tool_calls, DEFAULT_MAX_TOOL_CALLS);

        let full = TurnConfig::new(WorkflowVariant::Full);
        assert!(full.use_tools);
        assert!(full.enable_llm_streaming);
        assert!(!full.enable_node_tracing);
    }
}
