use std::fmt;
use std::sync::Arc;

use planweave_core::error::{EngineError, Result};
use planweave_core::memory::MemoryStore;
use planweave_core::registry::{ProviderRegistry, ToolFn};
use planweave_core::types::ValueMap;

/// Estimated latency for a node, used to model timing — not to measure
/// real elapsed time.
#[derive(Clone)]
pub enum LatencyEstimate {
    /// Fixed estimate in milliseconds.
    Fixed(u64),
    /// Model computed from the node's token cost and metadata.
    Modeled(Arc<dyn Fn(u64, &ValueMap) -> u64 + Send + Sync>),
}

impl LatencyEstimate {
    pub fn estimate_ms(&self, token_cost: u64, metadata: &ValueMap) -> u64 {
        match self {
            LatencyEstimate::Fixed(ms) => *ms,
            LatencyEstimate::Modeled(f) => f(token_cost, metadata),
        }
    }
}

impl Default for LatencyEstimate {
    fn default() -> Self {
        LatencyEstimate::Fixed(0)
    }
}

impl fmt::Debug for LatencyEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyEstimate::Fixed(ms) => write!(f, "Fixed({}ms)", ms),
            LatencyEstimate::Modeled(_) => write!(f, "Modeled(..)"),
        }
    }
}

/// The executable behavior of a node. A closed set of variants behind one
/// `run` surface; each variant owns its own invocation logic.
#[derive(Clone)]
pub enum NodeKind {
    /// Arbitrary async function of the node's resolved inputs.
    Tool { action: ToolFn },
    /// Prompt template rendered against inputs, dispatched to a
    /// registered language-model handler by provider name.
    Llm { template: String, provider: String },
    /// Stateful key/value store operations: `{"op": "set"|"get"|"delete",
    /// "key": ..., "value": ...}`.
    Memory { store: MemoryStore },
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Tool { .. } => write!(f, "Tool"),
            NodeKind::Llm { provider, .. } => write!(f, "Llm({})", provider),
            NodeKind::Memory { .. } => write!(f, "Memory"),
        }
    }
}

/// A named unit of work with declared dependencies, an estimated resource
/// cost, and an executable action.
#[derive(Debug, Clone)]
pub struct Node {
    /// Identity, unique within a graph.
    pub name: String,
    /// Names of nodes whose outputs this node requires. Deduplicated,
    /// insertion order kept for diagnostics; execution order is decided
    /// by the graph, not by this list.
    dependencies: Vec<String>,
    /// Non-negative estimated consumption, used for budget admission.
    pub token_cost: u64,
    /// Modeled latency, injected as an artificial delay by the scheduler.
    pub latency: LatencyEstimate,
    /// Open map carrying provider hints, tags, criticality flags, etc.
    pub metadata: ValueMap,
    kind: NodeKind,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            token_cost: 0,
            latency: LatencyEstimate::default(),
            metadata: ValueMap::new(),
            kind,
        }
    }

    /// Create a tool node from an executable action.
    pub fn tool(name: impl Into<String>, action: ToolFn) -> Self {
        Self::new(name, NodeKind::Tool { action })
    }

    /// Create a tool node from a plain async closure.
    pub fn tool_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ValueMap) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let action: ToolFn = Arc::new(move |inputs| Box::pin(f(inputs)));
        Self::new(name, NodeKind::Tool { action })
    }

    /// Create an LLM node with a `{key}` prompt template, dispatched to
    /// the `default` provider unless overridden.
    pub fn llm(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(
            name,
            NodeKind::Llm {
                template: template.into(),
                provider: "default".to_string(),
            },
        )
    }

    /// Create a memory node bound to a shared store.
    pub fn memory(name: impl Into<String>, store: MemoryStore) -> Self {
        Self::new(name, NodeKind::Memory { store })
    }

    /// Set the provider name for an LLM node. No effect on other kinds.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        if let NodeKind::Llm { provider: p, .. } = &mut self.kind {
            *p = provider.into();
        }
        self
    }

    /// Declare dependencies (deduplicated).
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        for dep in deps {
            self.add_dependency(dep);
        }
        self
    }

    /// Set the estimated token cost.
    pub fn with_token_cost(mut self, cost: u64) -> Self {
        self.token_cost = cost;
        self
    }

    /// Set a fixed latency estimate in milliseconds.
    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency = LatencyEstimate::Fixed(ms);
        self
    }

    /// Set a latency model computed from token cost and metadata.
    pub fn with_latency_model<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &ValueMap) -> u64 + Send + Sync + 'static,
    {
        self.latency = LatencyEstimate::Modeled(Arc::new(f));
        self
    }

    /// Set a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Record a dependency, ignoring duplicates.
    pub(crate) fn add_dependency(&mut self, dep: impl Into<String>) {
        let dep = dep.into();
        if !self.dependencies.contains(&dep) {
            self.dependencies.push(dep);
        }
    }

    /// Drop a dependency reference, if present.
    pub(crate) fn remove_dependency(&mut self, dep: &str) {
        self.dependencies.retain(|d| d != dep);
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Modeled latency for this node in milliseconds.
    pub fn latency_ms(&self) -> u64 {
        self.latency.estimate_ms(self.token_cost, &self.metadata)
    }

    /// Execute this node's action against its resolved inputs.
    pub async fn run(
        &self,
        inputs: ValueMap,
        registry: &ProviderRegistry,
    ) -> Result<serde_json::Value> {
        match &self.kind {
            NodeKind::Tool { action } => action(inputs).await,
            NodeKind::Llm { template, provider } => {
                let prompt = render_template(template, &inputs);
                let handler = registry.get(provider)?;
                handler.complete(&prompt, &self.metadata, &inputs).await
            }
            NodeKind::Memory { store } => self.run_memory_op(store, &inputs),
        }
    }

    fn run_memory_op(&self, store: &MemoryStore, inputs: &ValueMap) -> Result<serde_json::Value> {
        let op = inputs.get("op").and_then(|v| v.as_str()).unwrap_or("get");
        let key = inputs
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EngineError::NodeFailed {
                node: self.name.clone(),
                message: "memory node requires a string 'key' input".to_string(),
            })?;

        match op {
            "set" => {
                let value = inputs.get("value").cloned().unwrap_or(serde_json::Value::Null);
                store.set(key, value.clone());
                Ok(value)
            }
            "get" => Ok(store.get(key).unwrap_or(serde_json::Value::Null)),
            "delete" => Ok(serde_json::json!(store.delete(key))),
            other => Err(EngineError::NodeFailed {
                node: self.name.clone(),
                message: format!("unknown memory op: {}", other),
            }),
        }
    }
}

/// Render a `{key}` prompt template against an input map.
///
/// String values are substituted verbatim; other values as compact JSON.
/// Placeholders with no matching input key are left untouched.
pub fn render_template(template: &str, inputs: &ValueMap) -> String {
    let mut rendered = template.to_string();
    for (key, value) in inputs {
        let placeholder = format!("{{{}}}", key);
        if rendered.contains(&placeholder) {
            let display = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &display);
        }
    }
    rendered
}
