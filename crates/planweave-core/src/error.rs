use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    // Structural graph errors — detected before any node runs
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Dependency cycle detected at node: {0}")]
    Cycle(String),

    // Budget/rate errors
    #[error("Token budget exceeded at node {node}: {spent} spent + {cost} cost > {budget} budget")]
    BudgetExceeded {
        node: String,
        cost: u64,
        spent: u64,
        budget: u64,
        /// Outputs of nodes that completed before the budget was breached.
        partial: HashMap<String, serde_json::Value>,
    },

    // Node execution errors
    #[error("Node {node} timed out after {timeout_ms}ms")]
    NodeTimeout { node: String, timeout_ms: u64 },

    #[error("Node {node} failed: {message}")]
    NodeFailed { node: String, message: String },

    // Registry errors
    #[error("LLM provider not registered: {0}")]
    ProviderNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // Adaptive execution errors
    #[error("Rewrite transform failed: {rule}: {message}")]
    TransformFailed {
        rule: String,
        message: String,
        /// Accumulated state as of the last successful round.
        partial: HashMap<String, serde_json::Value>,
    },

    // Prompt template errors
    #[error("Template error: {0}")]
    Template(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
