use serde::{Deserialize, Serialize};

use planweave_core::types::ValueMap;

/// A plan: named steps with declared dependencies, prior to compilation
/// into an executable graph. This is the wire format produced by plan
/// generators and framework adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanObject {
    pub steps: Vec<PlanStep>,
}

/// Step kind: a tool invocation or a prompt-templated model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Tool,
    Llm,
}

/// One step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique step/node name.
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// For tool steps, a tool-name key into the external tool map; for
    /// LLM steps, the prompt template.
    pub action: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: ValueMap,
    #[serde(default)]
    pub token_cost: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_estimate: Option<u64>,
    #[serde(default)]
    pub critical: bool,
}

impl PlanStep {
    pub fn tool(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type: StepType::Tool,
            action: tool_name.into(),
            dependencies: Vec::new(),
            metadata: ValueMap::new(),
            token_cost: 0,
            latency_estimate: None,
            critical: false,
        }
    }

    pub fn llm(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type: StepType::Llm,
            action: template.into(),
            dependencies: Vec::new(),
            metadata: ValueMap::new(),
            token_cost: 0,
            latency_estimate: None,
            critical: false,
        }
    }

    pub fn after(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn costing(mut self, tokens: u64) -> Self {
        self.token_cost = tokens;
        self
    }
}
