//! Model-invocation contract consumed by the orchestrator.

use crate::error::EngineError;
use crate::thread::Message;
use crate::tool::ToolDescriptor;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// One item of a streaming model call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// Incremental partial content.
    TokenDelta {
        /// Text delta, possibly empty for keep-alive chunks.
        content: String,
    },
    /// Terminal event carrying the complete assistant message.
    Completed {
        /// Final message, including any requested tool calls.
        message: Message,
    },
}

/// Boxed stream of model events, terminated by [`ModelEvent::Completed`].
pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, EngineError>> + Send>>;

/// Provider-neutral model interface.
///
/// The engine calls this for both non-streaming ([`complete`]) and streaming
/// ([`stream`]) inference. Timeouts are the implementor's responsibility; the
/// engine treats a timeout like any other invocation error.
///
/// [`complete`]: ModelClient::complete
/// [`stream`]: ModelClient::stream
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one non-streaming completion over the message sequence.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<Message, EngineError>;

    /// Run one streaming completion. The returned stream yields token deltas
    /// and is terminated by a [`ModelEvent::Completed`] item.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelEventStream, EngineError>;

    /// Stable model label for events, traces, and logs.
    fn model_name(&self) -> &str {
        "model"
    }
}
