//! Tool registry contract consumed by the orchestrator.

use crate::error::EngineError;
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of one registered tool, exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Registered tool name.
    pub name: String,
    /// Human-readable purpose, surfaced to the model.
    pub description: String,
    /// JSON schema of the argument object.
    pub parameters: Value,
}

impl ToolDescriptor {
    /// Build a descriptor with an explicit parameter schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Build a descriptor whose parameter schema is derived from `T`.
    pub fn from_schema<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let schema = schema_for!(T);
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::to_value(schema.schema).unwrap_or(Value::Null),
        }
    }
}

/// Name-to-callable tool registry.
///
/// Invocation failures (including unknown tool names) are reported as
/// [`EngineError::ToolInvocation`]; the engine converts them into
/// error-bearing tool messages instead of aborting the turn.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Invoke a tool by name with JSON arguments, returning its output text.
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<String, EngineError>;

    /// Descriptors of every registered tool.
    ///
    /// May be expensive for dynamic registries; the engine reads it through a
    /// per-orchestrator cache.
    async fn descriptors(&self) -> Result<Vec<ToolDescriptor>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct SearchArgs {
        /// Query string.
        query: String,
        /// Max results.
        limit: Option<u32>,
    }

    #[test]
    fn descriptor_from_schema_captures_properties() {
        let descriptor = ToolDescriptor::from_schema::<SearchArgs>("search", "search documents");
        assert_eq!(descriptor.name, "search");
        let props = &descriptor.parameters["properties"];
        assert!(props.get("query").is_some());
        assert!(props.get("limit").is_some());
    }
}
