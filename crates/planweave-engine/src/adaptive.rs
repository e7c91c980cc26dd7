use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use planweave_core::error::{EngineError, Result};
use planweave_core::types::ValueMap;

use crate::graph::Graph;
use crate::scheduler::Scheduler;

/// State key under which a failed pass's error text is exposed to
/// rewrite-rule triggers. Cleared again once a pass succeeds.
pub const LAST_ERROR_KEY: &str = "last_error";

type TriggerFn = Arc<dyn Fn(&ValueMap) -> Result<bool> + Send + Sync>;
type TransformFn = Arc<dyn Fn(&Graph, &ValueMap) -> Result<Graph> + Send + Sync>;

/// A (trigger, transform) pair evaluated between execution passes.
///
/// The trigger inspects the accumulated output state; when it returns
/// `Ok(true)` the transform is applied to produce the next graph. A
/// trigger error is swallowed (the rule did not fire); a transform error
/// is fatal to the adaptive run.
#[derive(Clone)]
pub struct RewriteRule {
    name: String,
    trigger: TriggerFn,
    transform: TransformFn,
}

impl RewriteRule {
    pub fn new<T, F>(name: impl Into<String>, trigger: T, transform: F) -> Self
    where
        T: Fn(&ValueMap) -> Result<bool> + Send + Sync + 'static,
        F: Fn(&Graph, &ValueMap) -> Result<Graph> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            trigger: Arc::new(trigger),
            transform: Arc::new(transform),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One applied rewrite: which rule fired, in which round, and a snapshot
/// of the state that triggered it.
#[derive(Debug, Clone, Serialize)]
pub struct ModificationRecord {
    pub rule: String,
    pub round: usize,
    pub at: DateTime<Utc>,
    pub state_snapshot: ValueMap,
}

/// Result of an adaptive run.
#[derive(Debug, Clone)]
pub struct AdaptiveReport {
    /// Accumulated outputs across all execution passes.
    pub outputs: ValueMap,
    /// Applied rewrites, in order.
    pub modification_history: Vec<ModificationRecord>,
    /// The graph shape after the last rewrite.
    pub final_graph: Graph,
    pub total_modifications: usize,
}

/// Wraps a scheduler and a base graph; re-executes with a rewritten graph
/// whenever a rule's trigger matches the accumulated state, up to a
/// bounded number of rewrite rounds.
///
/// Rules are evaluated in configuration order and only the first
/// triggered rule applies per round.
pub struct AdaptiveExecutor {
    scheduler: Scheduler,
    rules: Vec<RewriteRule>,
    max_modifications: usize,
    parallel: bool,
}

impl AdaptiveExecutor {
    pub fn new(scheduler: Scheduler, max_modifications: usize) -> Self {
        Self {
            scheduler,
            rules: Vec::new(),
            max_modifications,
            parallel: false,
        }
    }

    /// Append a rewrite rule. Order is the tie-break: earlier rules win.
    pub fn with_rule(mut self, rule: RewriteRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Use the scheduler's parallel mode for each pass.
    pub fn with_parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Run the adaptive loop. The base graph is copied fresh for every
    /// call, so repeated calls never accumulate rewrites.
    pub async fn execute(&self, inputs: ValueMap) -> Result<AdaptiveReport> {
        let mut graph = self.scheduler.graph().copy();
        let mut state = inputs;
        let mut history: Vec<ModificationRecord> = Vec::new();
        let mut modifications = 0usize;

        loop {
            let mut last_error: Option<EngineError> = None;

            let pass = if self.parallel {
                self.scheduler.execute_parallel_on(&graph, state.clone()).await
            } else {
                self.scheduler.execute_on(&graph, state.clone()).await
            };

            match pass {
                Ok(report) => {
                    for (k, v) in report.outputs {
                        state.insert(k, v);
                    }
                    // A clean pass clears any stale failure signal.
                    state.remove(LAST_ERROR_KEY);
                    if report.stopped_early {
                        debug!(graph = %graph.name, "pass ended in controlled stop");
                    }
                }
                Err(e) => {
                    // Failure becomes ordinary rule input; it only
                    // propagates if no rule reacts to it.
                    if let EngineError::BudgetExceeded { partial, .. } = &e {
                        for (k, v) in partial {
                            state.insert(k.clone(), v.clone());
                        }
                    }
                    warn!(graph = %graph.name, error = %e, "execution pass failed");
                    state.insert(
                        LAST_ERROR_KEY.to_string(),
                        serde_json::json!(e.to_string()),
                    );
                    last_error = Some(e);
                }
            }

            if modifications >= self.max_modifications {
                return self.finish(state, history, graph, modifications, last_error);
            }

            let fired = self.rules.iter().find(|rule| {
                match (rule.trigger)(&state) {
                    Ok(hit) => hit,
                    Err(e) => {
                        warn!(
                            rule = %rule.name,
                            error = %e,
                            "rewrite trigger failed; treating as not triggered"
                        );
                        false
                    }
                }
            });

            let Some(rule) = fired else {
                return self.finish(state, history, graph, modifications, last_error);
            };

            let next_graph =
                (rule.transform)(&graph, &state).map_err(|e| EngineError::TransformFailed {
                    rule: rule.name.clone(),
                    message: e.to_string(),
                    partial: state.clone(),
                })?;

            modifications += 1;
            info!(
                rule = %rule.name,
                round = modifications,
                "rewrite rule applied; re-executing graph"
            );
            history.push(ModificationRecord {
                rule: rule.name.clone(),
                round: modifications,
                at: Utc::now(),
                state_snapshot: state.clone(),
            });
            graph = next_graph;
        }
    }

    fn finish(
        &self,
        state: ValueMap,
        history: Vec<ModificationRecord>,
        graph: Graph,
        modifications: usize,
        last_error: Option<EngineError>,
    ) -> Result<AdaptiveReport> {
        if let Some(e) = last_error {
            return Err(e);
        }
        Ok(AdaptiveReport {
            outputs: state,
            modification_history: history,
            final_graph: graph,
            total_modifications: modifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::scheduler::SchedulerConfig;
    use planweave_core::registry::ProviderRegistry;

    fn ok_node(name: &str, value: &str) -> Node {
        let value = serde_json::json!(value);
        Node::tool_fn(name, move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    fn base_scheduler(graph: Graph) -> Scheduler {
        Scheduler::new(
            graph,
            SchedulerConfig::default(),
            Arc::new(ProviderRegistry::new()),
        )
    }

    #[tokio::test]
    async fn no_rules_behaves_like_plain_run() {
        let mut g = Graph::new("g");
        g.add_node(ok_node("a", "done")).unwrap();

        let executor = AdaptiveExecutor::new(base_scheduler(g), 3);
        let report = executor.execute(ValueMap::new()).await.unwrap();

        assert_eq!(report.outputs.get("a"), Some(&serde_json::json!("done")));
        assert_eq!(report.total_modifications, 0);
        assert!(report.modification_history.is_empty());
    }

    #[tokio::test]
    async fn trigger_error_is_swallowed() {
        let mut g = Graph::new("g");
        g.add_node(ok_node("a", "done")).unwrap();

        let rule = RewriteRule::new(
            "faulty",
            |_state| {
                Err(EngineError::NodeFailed {
                    node: "trigger".into(),
                    message: "predicate blew up".into(),
                })
            },
            |graph, _state| Ok(graph.copy()),
        );

        let executor = AdaptiveExecutor::new(base_scheduler(g), 3).with_rule(rule);
        let report = executor.execute(ValueMap::new()).await.unwrap();
        assert_eq!(report.total_modifications, 0);
    }

    #[tokio::test]
    async fn repeated_calls_start_from_base_graph() {
        let mut g = Graph::new("g");
        g.add_node(ok_node("a", "done")).unwrap();

        let rule = RewriteRule::new(
            "add-bonus",
            |state| Ok(!state.contains_key("bonus")),
            |graph, _state| {
                let mut next = graph.copy();
                next.add_node(ok_node("bonus", "extra"))?;
                next.add_edge("a", "bonus", None)?;
                Ok(next)
            },
        );

        let executor = AdaptiveExecutor::new(base_scheduler(g), 3).with_rule(rule);

        for _ in 0..2 {
            let report = executor.execute(ValueMap::new()).await.unwrap();
            // One rewrite per call; the second call must not see the
            // first call's rewritten graph as its base.
            assert_eq!(report.total_modifications, 1);
            assert_eq!(
                report.outputs.get("bonus"),
                Some(&serde_json::json!("extra"))
            );
            assert_eq!(report.final_graph.len(), 2);
        }
    }

    #[tokio::test]
    async fn transform_failure_is_fatal() {
        let mut g = Graph::new("g");
        g.add_node(ok_node("a", "done")).unwrap();

        let rule = RewriteRule::new(
            "broken-transform",
            |_state| Ok(true),
            |_graph, _state| {
                Err(EngineError::NodeFailed {
                    node: "transform".into(),
                    message: "cannot build".into(),
                })
            },
        );

        let executor = AdaptiveExecutor::new(base_scheduler(g), 3).with_rule(rule);
        let err = executor.execute(ValueMap::new()).await.unwrap_err();
        match err {
            EngineError::TransformFailed { rule, partial, .. } => {
                assert_eq!(rule, "broken-transform");
                // The state of the last good round rides on the error.
                assert_eq!(partial.get("a"), Some(&serde_json::json!("done")));
            }
            other => panic!("expected transform failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_triggered_rule_wins() {
        let mut g = Graph::new("g");
        g.add_node(ok_node("a", "done")).unwrap();

        let first = RewriteRule::new(
            "first",
            |state| Ok(!state.contains_key("patched")),
            |graph, _state| {
                let mut next = graph.copy();
                next.add_node(ok_node("patched", "by-first"))?;
                Ok(next)
            },
        );
        let second = RewriteRule::new(
            "second",
            |_state| Ok(true),
            |graph, _state| Ok(graph.copy()),
        );

        let executor = AdaptiveExecutor::new(base_scheduler(g), 1)
            .with_rule(first)
            .with_rule(second);
        let report = executor.execute(ValueMap::new()).await.unwrap();

        assert_eq!(report.total_modifications, 1);
        assert_eq!(report.modification_history[0].rule, "first");
    }
}
