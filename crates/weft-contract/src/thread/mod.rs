//! Conversation thread model: messages and tool calls.

pub mod message;

pub use message::{Message, ToolCall};
