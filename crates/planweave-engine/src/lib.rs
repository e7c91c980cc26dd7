//! DAG execution engine.
//!
//! A plan is compiled into a [`Graph`] of named nodes with declared
//! dependencies. A [`Scheduler`] executes the graph either strictly in
//! dependency order or in parallel under a bounded worker pool, enforcing
//! a token budget, a request-rate limit, and per-node timeouts, with
//! optional audit records per completed node. An [`AdaptiveExecutor`]
//! wraps a scheduler and rewrites the graph mid-run when a rewrite rule's
//! trigger matches the accumulated output state.

pub mod adaptive;
pub mod audit;
pub mod compiler;
pub mod graph;
pub mod node;
pub mod plan;
pub mod prefetch;
pub mod scheduler;

pub use adaptive::{
    AdaptiveExecutor, AdaptiveReport, ModificationRecord, RewriteRule, LAST_ERROR_KEY,
};
pub use audit::AuditSink;
pub use compiler::{compile, compile_outline};
pub use graph::{EdgeMetadata, Graph};
pub use node::{LatencyEstimate, Node, NodeKind};
pub use plan::{PlanObject, PlanStep, StepType};
pub use scheduler::{Scheduler, SchedulerConfig};
