//! Read-through cache for tool descriptors.
//!
//! Registries may back `descriptors()` with remote calls or dynamic plugin
//! scans; the orchestrator reads the list once per turn at most. The cache is
//! an explicitly passed, reference-counted object — never module state.

use crate::contracts::{EngineError, ToolDescriptor, ToolRegistry};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared read-through descriptor cache over one [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolCatalog {
    registry: Arc<dyn ToolRegistry>,
    cached: Arc<RwLock<Option<Arc<[ToolDescriptor]>>>>,
}

impl ToolCatalog {
    /// Wrap a registry.
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self {
            registry,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// The underlying registry, for invocation.
    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    /// Descriptors of every registered tool, fetched once and then served
    /// from cache.
    pub async fn descriptors(&self) -> Result<Arc<[ToolDescriptor]>, EngineError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut slot = self.cached.write().await;
        // A concurrent turn may have filled the slot while we waited.
        if let Some(cached) = slot.as_ref() {
            return Ok(Arc::clone(cached));
        }
        let fetched: Arc<[ToolDescriptor]> = self.registry.descriptors().await?.into();
        *slot = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Drop the cached list; the next read fetches fresh descriptors.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRegistry {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ToolRegistry for CountingRegistry {
        async fn invoke(&self, _name: &str, _arguments: &Value) -> Result<String, EngineError> {
            Err(EngineError::tool("not under test"))
        }

        async fn descriptors(&self) -> Result<Vec<ToolDescriptor>, EngineError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ToolDescriptor::new(
                "search",
                "search documents",
                serde_json::json!({"type": "object"}),
            )])
        }
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let registry = Arc::new(CountingRegistry {
            fetches: AtomicUsize::new(0),
        });
        let catalog = ToolCatalog::new(registry.clone());

        let first = catalog.descriptors().await.unwrap();
        let second = catalog.descriptors().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(registry.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_fetch() {
        let registry = Arc::new(CountingRegistry {
            fetches: AtomicUsize::new(0),
        });
        let catalog = ToolCatalog::new(registry.clone());

        catalog.descriptors().await.unwrap();
        catalog.invalidate().await;
        catalog.descriptors().await.unwrap();
        assert_eq!(registry.fetches.load(Ordering::SeqCst), 2);
    }
}
