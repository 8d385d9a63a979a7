//! Document-context retrieval contract.

use crate::error::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One retrieved document fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Fragment text.
    pub content: String,
    /// Origin identifier (document id, path, URL).
    pub source: Option<String>,
    /// Relevance score assigned by the retriever, higher is better.
    pub score: Option<f64>,
}

impl DocumentChunk {
    /// Build a chunk with just content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
            score: None,
        }
    }
}

/// Document-context lookup consumed by the retrieve node.
///
/// Errors are caught at the node boundary and degrade to an empty context; a
/// retrieval failure never blocks the plain-chat fallback.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return the `k` most relevant chunks for `query`, best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>, EngineError>;
}
