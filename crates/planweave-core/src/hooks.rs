use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::ValueMap;

/// Verdict returned by an execution hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    /// Carry on with the run.
    Continue,
    /// Controlled stop: end the run cleanly, keeping outputs gathered so
    /// far. Not an error.
    Stop,
}

/// Before/after hooks invoked around every node execution.
///
/// Returning `HookVerdict::Stop` from either hook terminates the run
/// early without failing it. A hook error propagates and aborts the run.
pub trait ExecutionHook: Send + Sync + 'static {
    /// Called with the node's resolved inputs before it runs.
    fn before_node(
        &self,
        node_name: &str,
        inputs: &ValueMap,
    ) -> BoxFuture<'_, Result<HookVerdict>> {
        let _ = (node_name, inputs);
        Box::pin(async { Ok(HookVerdict::Continue) })
    }

    /// Called with the node's output after it completes.
    fn after_node(
        &self,
        node_name: &str,
        output: &serde_json::Value,
    ) -> BoxFuture<'_, Result<HookVerdict>> {
        let _ = (node_name, output);
        Box::pin(async { Ok(HookVerdict::Continue) })
    }
}
