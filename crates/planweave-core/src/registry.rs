use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{EngineError, Result};
use crate::traits::LlmHandler;
use crate::types::ValueMap;

/// An arbitrary async function of a node's resolved inputs.
pub type ToolFn =
    Arc<dyn Fn(ValueMap) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;

/// Registry of language-model handlers, keyed by provider name.
///
/// Constructed explicitly and passed into the scheduler at startup; there
/// is no ambient global registry.
#[derive(Default)]
pub struct ProviderRegistry {
    handlers: HashMap<String, Arc<dyn LlmHandler>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a provider name.
    pub fn register(&mut self, name: impl Into<String>, handler: impl LlmHandler) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Look up a handler by provider name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn LlmHandler>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::ProviderNotFound(name.to_string()))
    }

    /// List registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }
}

/// Named tool map consumed by the plan compiler.
///
/// Plan steps of type `tool` carry a tool-name key; compilation resolves
/// the key here into the node's executable action.
#[derive(Default, Clone)]
pub struct ToolSet {
    tools: HashMap<String, ToolFn>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool function under a name.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(ValueMap) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let wrapped: ToolFn = Arc::new(move |inputs| Box::pin(f(inputs)));
        self.tools.insert(name.into(), wrapped);
    }

    /// Resolve a tool-name key into its function.
    pub fn get(&self, name: &str) -> Result<ToolFn> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::ToolNotFound(name.to_string()))
    }

    /// List registered tool names.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}
