use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use planweave_core::error::{EngineError, Result};
use planweave_core::hooks::{ExecutionHook, HookVerdict};
use planweave_core::registry::ProviderRegistry;
use planweave_core::traits::Prefetcher;
use planweave_core::types::{RunReport, ValueMap};

use crate::audit::AuditSink;
use crate::graph::Graph;
use crate::node::Node;
use crate::prefetch;

/// Sliding window length for the request-rate limiter.
const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Scheduler configuration surface.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrency cap for `execute_parallel`. Values below 1 are
    /// treated as 1.
    pub max_parallel_nodes: usize,
    /// Per-node timeout in milliseconds; 0 disables the timeout race.
    pub max_execution_time_ms: u64,
    /// Names preferred for the next launch slot among ready nodes.
    pub priority_nodes: Vec<String>,
    /// Cumulative token ceiling for one run; `None` disables enforcement.
    pub token_budget: Option<u64>,
    /// Node-start rate cap over a sliding minute; `None` disables.
    pub requests_per_minute: Option<u32>,
    /// Per-node latency overrides in milliseconds, keyed by node name.
    pub latency_model: HashMap<String, u64>,
    /// Audit trail: one JSON file per node under this directory.
    pub audit_dir: Option<PathBuf>,
    /// Audit trail: one JSON record per line appended to this file.
    pub audit_file: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: 4,
            max_execution_time_ms: 0,
            priority_nodes: Vec::new(),
            token_budget: None,
            requests_per_minute: None,
            latency_model: HashMap::new(),
            audit_dir: None,
            audit_file: None,
        }
    }
}

/// Mutable per-run state, reset at the start of each execute call.
struct RunState {
    spent: u64,
    window: VecDeque<Instant>,
}

impl RunState {
    fn new() -> Self {
        Self {
            spent: 0,
            window: VecDeque::new(),
        }
    }
}

/// What one launched node task resolved to.
enum TaskOutcome {
    Done(serde_json::Value),
    /// A hook signalled a controlled stop. `started` is false when the
    /// before hook fired and the node's action never ran.
    Stop { started: bool },
}

/// Executes a graph under concurrency, rate, and token-budget constraints.
///
/// `execute` walks nodes strictly in dependency order; `execute_parallel`
/// is readiness-driven with a bounded in-flight set. Both produce the
/// same output map for the same graph and inputs.
pub struct Scheduler {
    graph: Graph,
    config: SchedulerConfig,
    registry: Arc<ProviderRegistry>,
    hooks: Vec<Arc<dyn ExecutionHook>>,
    prefetcher: Option<Arc<dyn Prefetcher>>,
}

impl Scheduler {
    pub fn new(graph: Graph, config: SchedulerConfig, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            graph,
            config,
            registry,
            hooks: Vec::new(),
            prefetcher: None,
        }
    }

    /// Attach a before/after execution hook.
    pub fn with_hook(mut self, hook: impl ExecutionHook) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Attach a resource prefetcher, invoked once before each run.
    pub fn with_prefetcher(mut self, prefetcher: impl Prefetcher) -> Self {
        self.prefetcher = Some(Arc::new(prefetcher));
        self
    }

    /// The scheduler's bound graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Execute the bound graph one node at a time, in dependency order.
    pub async fn execute(&self, inputs: ValueMap) -> Result<RunReport> {
        self.execute_on(&self.graph, inputs).await
    }

    /// Execute an explicit graph one node at a time, in dependency order.
    pub async fn execute_on(&self, graph: &Graph, inputs: ValueMap) -> Result<RunReport> {
        let order = self.priority_order(graph)?;
        let mut inputs = inputs;
        if let Some(prefetcher) = &self.prefetcher {
            prefetch::warm_inputs(prefetcher.as_ref(), graph, &mut inputs).await;
        }

        let audit = AuditSink::from_paths(
            self.config.audit_dir.clone(),
            self.config.audit_file.clone(),
        );
        let mut outputs = inputs.clone();
        let mut state = RunState::new();

        info!(graph = %graph.name, nodes = order.len(), "starting sequential run");

        for name in order {
            let node = graph
                .node(&name)
                .ok_or_else(|| EngineError::UnknownNode(name.clone()))?;
            let resolved = self.resolve_inputs(graph, &name, &outputs, &inputs)?;

            if self.run_before_hooks(&name, &resolved).await? == HookVerdict::Stop {
                info!(node = %name, "hook signalled controlled stop");
                return Ok(RunReport {
                    outputs,
                    stopped_early: true,
                    tokens_spent: state.spent,
                });
            }

            let delay = self.rate_delay(&mut state.window);
            if !delay.is_zero() {
                debug!(
                    node = %name,
                    wait_ms = delay.as_millis() as u64,
                    "rate limit reached; delaying node start"
                );
                tokio::time::sleep(delay).await;
            }
            self.reserve_budget(&name, node.token_cost, &mut state.spent, &outputs)?;

            debug!(node = %name, cost = node.token_cost, "executing node");
            let output = self.perform(node, resolved.clone()).await?;

            if self.run_after_hooks(&name, &output).await? == HookVerdict::Stop {
                info!(node = %name, "hook signalled controlled stop after node");
                return Ok(RunReport {
                    outputs,
                    stopped_early: true,
                    tokens_spent: state.spent,
                });
            }

            if let Some(sink) = &audit {
                if let Err(e) = sink.record(&name, &resolved, &output).await {
                    warn!(node = %name, error = %e, "audit record failed");
                }
            }
            outputs.insert(name, output);
        }

        Ok(RunReport {
            outputs,
            stopped_early: false,
            tokens_spent: state.spent,
        })
    }

    /// Execute the bound graph with readiness-driven parallelism.
    pub async fn execute_parallel(&self, inputs: ValueMap) -> Result<RunReport> {
        self.execute_parallel_on(&self.graph, inputs).await
    }

    /// Execute an explicit graph with readiness-driven parallelism.
    ///
    /// A node launches only once every dependency has completed and
    /// recorded output; at most `max_parallel_nodes` nodes are in flight;
    /// among simultaneously-ready nodes, priority-listed ones are
    /// preferred. Hooks and rate-limit delays run inside each node's own
    /// task so a slow hook or a long rate wait never stalls work already
    /// in flight. Outputs, dependency counters, the budget, and the rate
    /// window are only touched on this driver task.
    pub async fn execute_parallel_on<'a>(
        &'a self,
        graph: &'a Graph,
        inputs: ValueMap,
    ) -> Result<RunReport> {
        // Validates structure (cycles, unknown references) up front.
        let topo = graph.topological_order()?;
        let mut inputs = inputs;
        if let Some(prefetcher) = &self.prefetcher {
            prefetch::warm_inputs(prefetcher.as_ref(), graph, &mut inputs).await;
        }

        let audit = AuditSink::from_paths(
            self.config.audit_dir.clone(),
            self.config.audit_file.clone(),
        );
        let cap = self.config.max_parallel_nodes.max(1);

        let mut pending: HashMap<String, usize> = HashMap::with_capacity(topo.len());
        let mut ready: VecDeque<String> = VecDeque::new();
        for name in &topo {
            let deps = graph
                .node(name)
                .map(|n| n.dependencies().len())
                .unwrap_or(0);
            pending.insert(name.clone(), deps);
            if deps == 0 {
                ready.push_back(name.clone());
            }
        }

        let mut outputs = inputs.clone();
        let mut state = RunState::new();
        let mut stopped = false;

        type InFlight<'f> = BoxFuture<'f, (String, Result<TaskOutcome>, ValueMap)>;
        let mut in_flight: FuturesUnordered<InFlight<'a>> = FuturesUnordered::new();

        info!(
            graph = %graph.name,
            nodes = topo.len(),
            max_parallel = cap,
            "starting parallel run"
        );

        loop {
            // Launch phase: fill the in-flight set from the ready queue.
            // Nothing is awaited here, so in-flight tasks never wait on a
            // launch being gated.
            while !stopped && in_flight.len() < cap && !ready.is_empty() {
                let name = self.dequeue_preferred(&mut ready);
                let node = graph
                    .node(&name)
                    .ok_or_else(|| EngineError::UnknownNode(name.clone()))?;
                let resolved = self.resolve_inputs(graph, &name, &outputs, &inputs)?;

                self.reserve_budget(&name, node.token_cost, &mut state.spent, &outputs)?;
                let delay = self.rate_delay(&mut state.window);

                debug!(node = %name, in_flight = in_flight.len(), "launching node");
                let task_inputs = resolved.clone();
                in_flight.push(Box::pin(async move {
                    if !delay.is_zero() {
                        debug!(
                            node = %name,
                            wait_ms = delay.as_millis() as u64,
                            "rate limit reached; delaying node start"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    let outcome = async {
                        if self.run_before_hooks(&name, &resolved).await? == HookVerdict::Stop {
                            return Ok(TaskOutcome::Stop { started: false });
                        }
                        let output = self.perform(node, task_inputs).await?;
                        if self.run_after_hooks(&name, &output).await? == HookVerdict::Stop {
                            return Ok(TaskOutcome::Stop { started: true });
                        }
                        Ok(TaskOutcome::Done(output))
                    }
                    .await;
                    (name, outcome, resolved)
                }));
            }

            if stopped {
                // Drain what already launched; their outputs are kept.
                while let Some((name, outcome, resolved)) = in_flight.next().await {
                    match outcome {
                        Ok(TaskOutcome::Done(output)) => {
                            if let Some(sink) = &audit {
                                if let Err(e) = sink.record(&name, &resolved, &output).await {
                                    warn!(node = %name, error = %e, "audit record failed");
                                }
                            }
                            outputs.insert(name, output);
                        }
                        Ok(TaskOutcome::Stop { started: false }) => {
                            self.release_reservation(graph, &name, &mut state.spent);
                        }
                        _ => {}
                    }
                }
                return Ok(RunReport {
                    outputs,
                    stopped_early: true,
                    tokens_spent: state.spent,
                });
            }

            if in_flight.is_empty() {
                // Nothing running and nothing launchable: done.
                break;
            }

            // Completion phase: single-threaded continuation.
            if let Some((name, outcome, resolved)) = in_flight.next().await {
                match outcome? {
                    TaskOutcome::Stop { started } => {
                        info!(node = %name, "hook signalled controlled stop");
                        if !started {
                            self.release_reservation(graph, &name, &mut state.spent);
                        }
                        stopped = true;
                    }
                    TaskOutcome::Done(output) => {
                        if let Some(sink) = &audit {
                            if let Err(e) = sink.record(&name, &resolved, &output).await {
                                warn!(node = %name, error = %e, "audit record failed");
                            }
                        }

                        debug!(node = %name, "node complete");
                        outputs.insert(name.clone(), output);
                        for succ in graph.successors(&name) {
                            if let Some(count) = pending.get_mut(succ) {
                                *count = count.saturating_sub(1);
                                if *count == 0 {
                                    ready.push_back(succ.clone());
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(RunReport {
            outputs,
            stopped_early: false,
            tokens_spent: state.spent,
        })
    }

    /// Resolve a node's inputs and merge in any global inputs not already
    /// claimed by a dependency.
    fn resolve_inputs(
        &self,
        graph: &Graph,
        name: &str,
        results: &ValueMap,
        global: &ValueMap,
    ) -> Result<ValueMap> {
        let mut resolved = graph.node_inputs(name, results)?;
        for (k, v) in global {
            resolved.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Ok(resolved)
    }

    /// Run the node's action racing the configured timeout, then inject
    /// the modeled latency as an artificial delay.
    async fn perform(&self, node: &Node, resolved: ValueMap) -> Result<serde_json::Value> {
        let action = node.run(resolved, &self.registry);
        let timeout_ms = self.config.max_execution_time_ms;

        let result = if timeout_ms > 0 {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), action).await {
                Ok(r) => r,
                Err(_) => {
                    return Err(EngineError::NodeTimeout {
                        node: node.name.clone(),
                        timeout_ms,
                    })
                }
            }
        } else {
            action.await
        };

        let output = result.map_err(|e| match e {
            failed @ EngineError::NodeFailed { .. } => failed,
            other => EngineError::NodeFailed {
                node: node.name.clone(),
                message: other.to_string(),
            },
        })?;

        let delay = self.latency_for(node);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(output)
    }

    /// Modeled latency: config override first, then the node's estimate.
    fn latency_for(&self, node: &Node) -> u64 {
        self.config
            .latency_model
            .get(&node.name)
            .copied()
            .unwrap_or_else(|| node.latency_ms())
    }

    async fn run_before_hooks(&self, name: &str, inputs: &ValueMap) -> Result<HookVerdict> {
        for hook in &self.hooks {
            if hook.before_node(name, inputs).await? == HookVerdict::Stop {
                return Ok(HookVerdict::Stop);
            }
        }
        Ok(HookVerdict::Continue)
    }

    async fn run_after_hooks(
        &self,
        name: &str,
        output: &serde_json::Value,
    ) -> Result<HookVerdict> {
        for hook in &self.hooks {
            if hook.after_node(name, output).await? == HookVerdict::Stop {
                return Ok(HookVerdict::Stop);
            }
        }
        Ok(HookVerdict::Continue)
    }

    /// Check-then-reserve token admission. On breach, the error carries
    /// the outputs gathered so far.
    fn reserve_budget(
        &self,
        name: &str,
        cost: u64,
        spent: &mut u64,
        outputs: &ValueMap,
    ) -> Result<()> {
        let Some(budget) = self.config.token_budget else {
            return Ok(());
        };
        if *spent + cost > budget {
            return Err(EngineError::BudgetExceeded {
                node: name.to_string(),
                cost,
                spent: *spent,
                budget,
                partial: outputs.clone(),
            });
        }
        *spent += cost;
        Ok(())
    }

    /// Sliding-window rate limit on node starts. Prunes expired stamps,
    /// computes how long this start must wait, and records its scheduled
    /// start stamp. Window bookkeeping stays on the calling task; the
    /// returned delay is slept wherever it will not hold up other work.
    fn rate_delay(&self, window: &mut VecDeque<Instant>) -> Duration {
        let Some(rpm) = self.config.requests_per_minute else {
            return Duration::ZERO;
        };
        if rpm == 0 {
            return Duration::ZERO;
        }

        let now = Instant::now();
        prune_window(window, now);
        let wait = rate_wait(window, now, rpm).unwrap_or(Duration::ZERO);
        window.push_back(now + wait);
        wait
    }

    /// Return a node's token reservation after a before-hook stop; the
    /// node's action never ran, so its cost was not actually spent.
    fn release_reservation(&self, graph: &Graph, name: &str, spent: &mut u64) {
        if let Some(node) = graph.node(name) {
            *spent = spent.saturating_sub(node.token_cost);
        }
    }

    /// Topological order with priority nodes pulled earlier among the
    /// nodes currently eligible. Always a valid topological order: a
    /// priority node never hoists above its own dependency.
    fn priority_order(&self, graph: &Graph) -> Result<Vec<String>> {
        let topo = graph.topological_order()?;
        if self.config.priority_nodes.is_empty() {
            return Ok(topo);
        }

        let mut remaining = topo;
        let mut done: HashSet<String> = HashSet::new();
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let eligible = |name: &String| {
                graph
                    .node(name)
                    .map(|n| n.dependencies().iter().all(|d| done.contains(d)))
                    .unwrap_or(true)
            };
            let idx = remaining
                .iter()
                .position(|n| self.config.priority_nodes.contains(n) && eligible(n))
                .or_else(|| remaining.iter().position(eligible))
                .unwrap_or(0);
            let name = remaining.remove(idx);
            done.insert(name.clone());
            ordered.push(name);
        }
        Ok(ordered)
    }

    /// Prefer the first ready priority-listed node; otherwise FIFO.
    fn dequeue_preferred(&self, ready: &mut VecDeque<String>) -> String {
        if let Some(idx) = ready
            .iter()
            .position(|n| self.config.priority_nodes.contains(n))
        {
            // remove() on a found index cannot return None.
            if let Some(name) = ready.remove(idx) {
                return name;
            }
        }
        ready.pop_front().unwrap_or_default()
    }
}

fn prune_window(window: &mut VecDeque<Instant>, now: Instant) {
    while let Some(front) = window.front() {
        if now.duration_since(*front) >= RATE_WINDOW {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Time until enough start stamps age out for another start, if the
/// window is at capacity. Stamps may be scheduled starts lying in the
/// future; the blocking stamp is the one whose expiry frees a slot.
/// Assumes `window` has already been pruned.
fn rate_wait(window: &VecDeque<Instant>, now: Instant, rpm: u32) -> Option<Duration> {
    if (window.len() as u32) < rpm {
        return None;
    }
    let blocking = window[window.len() - rpm as usize];
    Some((blocking + RATE_WINDOW).duration_since(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn quick(name: &str) -> Node {
        let tag = name.to_string();
        Node::tool_fn(name, move |_| {
            let tag = tag.clone();
            async move { Ok(serde_json::json!(format!("out:{tag}"))) }
        })
    }

    fn chain_graph() -> Graph {
        let mut g = Graph::new("chain");
        g.add_node(quick("a")).unwrap();
        g.add_node(quick("b")).unwrap();
        g.add_node(quick("c")).unwrap();
        g.add_edge("a", "b", None).unwrap();
        g.add_edge("b", "c", None).unwrap();
        g
    }

    #[test]
    fn rate_wait_below_capacity() {
        let window = VecDeque::from([Instant::now()]);
        assert!(rate_wait(&window, Instant::now(), 2).is_none());
    }

    #[test]
    fn rate_wait_at_capacity() {
        let oldest = Instant::now();
        let window = VecDeque::from([oldest, Instant::now()]);
        let wait = rate_wait(&window, Instant::now(), 2).unwrap();
        // Must wait roughly until the oldest stamp ages out.
        assert!(wait <= RATE_WINDOW);
        assert!(wait > RATE_WINDOW - Duration::from_secs(1));
    }

    #[test]
    fn prune_drops_expired_stamps() {
        let now = Instant::now();
        let mut window = VecDeque::from([now - Duration::from_secs(61), now]);
        prune_window(&mut window, now);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn rate_wait_accounts_for_scheduled_stamps() {
        let now = Instant::now();
        // One start already scheduled a full window out; the next start
        // has to wait for that stamp to age out too.
        let window = VecDeque::from([now, now + RATE_WINDOW]);
        let wait = rate_wait(&window, now, 1).unwrap();
        assert_eq!(wait, RATE_WINDOW * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_delays_starts_past_the_cap() {
        let mut g = Graph::new("fan");
        for n in ["x", "y", "z"] {
            g.add_node(quick(n)).unwrap();
        }
        let config = SchedulerConfig {
            requests_per_minute: Some(2),
            ..Default::default()
        };
        let scheduler = Scheduler::new(g, config, Arc::new(ProviderRegistry::new()));

        let start = Instant::now();
        let report = scheduler.execute(ValueMap::new()).await.unwrap();
        let elapsed = start.elapsed();

        // Two starts are admitted immediately; the third waits out the
        // sliding window.
        assert_eq!(report.outputs.len(), 3);
        assert!(elapsed >= RATE_WINDOW, "elapsed {elapsed:?}");
        assert!(elapsed < RATE_WINDOW + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_rate_runs_immediately() {
        let scheduler = Scheduler::new(
            chain_graph(),
            SchedulerConfig::default(),
            Arc::new(ProviderRegistry::new()),
        );
        let start = Instant::now();
        scheduler.execute(ValueMap::new()).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn priority_order_never_violates_dependencies() {
        let g = chain_graph();
        let config = SchedulerConfig {
            // "c" depends transitively on everything; preferring it must
            // not hoist it above its dependencies.
            priority_nodes: vec!["c".to_string()],
            ..Default::default()
        };
        let scheduler = Scheduler::new(g, config, Arc::new(ProviderRegistry::new()));
        let order = scheduler.priority_order(scheduler.graph()).unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn priority_order_prefers_eligible_priority_nodes() {
        let mut g = Graph::new("fan");
        g.add_node(quick("x")).unwrap();
        g.add_node(quick("y")).unwrap();
        g.add_node(quick("z")).unwrap();

        let config = SchedulerConfig {
            priority_nodes: vec!["z".to_string()],
            ..Default::default()
        };
        let scheduler = Scheduler::new(g, config, Arc::new(ProviderRegistry::new()));
        let order = scheduler.priority_order(scheduler.graph()).unwrap();
        assert_eq!(order[0], "z");
    }

    #[tokio::test]
    async fn sequential_run_produces_all_outputs() {
        let scheduler = Scheduler::new(
            chain_graph(),
            SchedulerConfig::default(),
            Arc::new(ProviderRegistry::new()),
        );
        let report = scheduler.execute(ValueMap::new()).await.unwrap();
        assert_eq!(report.output_str("a"), Some("out:a"));
        assert_eq!(report.output_str("b"), Some("out:b"));
        assert_eq!(report.output_str("c"), Some("out:c"));
        assert!(!report.stopped_early);
    }

    #[tokio::test]
    async fn global_inputs_do_not_override_dependency_outputs() {
        let mut g = Graph::new("g");
        g.add_node(quick("upstream")).unwrap();
        g.add_node(Node::tool_fn("probe", |inputs: ValueMap| async move {
            Ok(inputs.get("upstream").cloned().unwrap_or_default())
        }))
        .unwrap();
        g.add_edge("upstream", "probe", None).unwrap();

        let scheduler = Scheduler::new(
            g,
            SchedulerConfig::default(),
            Arc::new(ProviderRegistry::new()),
        );

        let mut inputs = ValueMap::new();
        // Collides with the dependency's name; the dependency's real
        // output must win for the downstream node.
        inputs.insert("upstream".into(), serde_json::json!("stale"));
        let report = scheduler.execute(inputs).await.unwrap();
        assert_eq!(report.output_str("probe"), Some("out:upstream"));
    }

    #[tokio::test]
    async fn node_failure_aborts_run() {
        let mut g = Graph::new("g");
        g.add_node(Node::tool_fn("boom", |_| async {
            Err(EngineError::NodeFailed {
                node: "boom".into(),
                message: "exploded".into(),
            })
        }))
        .unwrap();
        g.add_node(quick("after")).unwrap();
        g.add_edge("boom", "after", None).unwrap();

        let scheduler = Scheduler::new(
            g,
            SchedulerConfig::default(),
            Arc::new(ProviderRegistry::new()),
        );
        let err = scheduler.execute(ValueMap::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::NodeFailed { node, .. } if node == "boom"));
    }

    #[tokio::test]
    async fn timeout_names_the_node() {
        let mut g = Graph::new("g");
        g.add_node(Node::tool_fn("slow", |_| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(serde_json::json!("late"))
        }))
        .unwrap();

        let config = SchedulerConfig {
            max_execution_time_ms: 40,
            ..Default::default()
        };
        let scheduler = Scheduler::new(g, config, Arc::new(ProviderRegistry::new()));
        let err = scheduler.execute(ValueMap::new()).await.unwrap_err();
        assert!(
            matches!(err, EngineError::NodeTimeout { node, timeout_ms } if node == "slow" && timeout_ms == 40)
        );
    }
}
