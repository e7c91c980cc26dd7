use planweave_core::error::Result;
use planweave_core::registry::ToolSet;

use crate::graph::Graph;
use crate::node::Node;
use crate::plan::{PlanObject, StepType};

/// Compile a plan into an executable graph.
///
/// One node per step: tool steps resolve their action through the tool
/// map; LLM steps use their action as the prompt template, dispatched to
/// the provider named in step metadata (falling back to `default`).
/// Declared dependencies become edges. `critical: true` is recorded in
/// node metadata for priority-aware schedulers.
pub fn compile(plan: &PlanObject, tools: &ToolSet) -> Result<Graph> {
    let mut graph = Graph::new("plan");

    for step in &plan.steps {
        let mut node = match step.step_type {
            StepType::Tool => Node::tool(&step.id, tools.get(&step.action)?),
            StepType::Llm => {
                let provider = step
                    .metadata
                    .get("provider")
                    .and_then(|v| v.as_str())
                    .unwrap_or("default");
                Node::llm(&step.id, &step.action).with_provider(provider)
            }
        };

        node.token_cost = step.token_cost;
        node.metadata = step.metadata.clone();
        if let Some(ms) = step.latency_estimate {
            node = node.with_latency_ms(ms);
        }
        if step.critical {
            node.metadata
                .insert("critical".to_string(), serde_json::json!(true));
        }
        graph.add_node(node)?;
    }

    for step in &plan.steps {
        for dep in &step.dependencies {
            graph.add_edge(dep, &step.id, None)?;
        }
    }

    Ok(graph)
}

/// Compile a plain-text outline into a linear-chain graph.
///
/// One node per non-empty line; a line of the form `tool: name` becomes a
/// tool node resolved from the tool map, any other line becomes an LLM
/// node whose template is the line text. Consecutive lines are joined by
/// dependency edges.
pub fn compile_outline(text: &str, tools: &ToolSet) -> Result<Graph> {
    let mut graph = Graph::new("outline");
    let mut prev: Option<String> = None;

    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    for (i, line) in lines.enumerate() {
        let id = format!("step_{}", i + 1);
        let node = if let Some(tool_name) = line.strip_prefix("tool:") {
            Node::tool(&id, tools.get(tool_name.trim())?)
        } else {
            Node::llm(&id, line)
        };
        graph.add_node(node)?;

        if let Some(prev_id) = prev {
            graph.add_edge(&prev_id, &id, None)?;
        }
        prev = Some(id);
    }

    Ok(graph)
}
