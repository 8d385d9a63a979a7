//! Error taxonomy for the turn engine.

use thiserror::Error;

/// Errors surfaced by the engine and its collaborator traits.
///
/// Only `Configuration`, `ModelInvocation` (outside the finalize node) and
/// `Cancelled` abort a turn. `ToolInvocation` is converted into an
/// error-bearing tool message at the node boundary, and `Retrieval` degrades
/// to an empty context.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Bad workflow variant or malformed graph. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A tool call failed or named an unregistered tool.
    #[error("tool invocation failed: {0}")]
    ToolInvocation(String),

    /// The retriever failed to produce document context.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The model interface failed or produced an unusable response.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// The turn was cancelled by the consumer.
    #[error("turn cancelled")]
    Cancelled,
}

impl EngineError {
    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for a tool invocation error.
    pub fn tool(message: impl Into<String>) -> Self {
        Self::ToolInvocation(message.into())
    }

    /// Shorthand for a retrieval error.
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    /// Shorthand for a model invocation error.
    pub fn model(message: impl Into<String>) -> Self {
        Self::ModelInvocation(message.into())
    }
}
