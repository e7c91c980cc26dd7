use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::ValueMap;

/// Language-model invocation handler, looked up by provider name.
///
/// The engine renders a node's prompt template against its inputs and
/// hands the result here; it never embeds a specific vendor's call logic.
pub trait LlmHandler: Send + Sync + 'static {
    /// Complete a rendered prompt. `metadata` is the node's open metadata
    /// map (provider hints, model names, tags); `inputs` are the node's
    /// resolved inputs for handlers that want structured access.
    fn complete(
        &self,
        prompt: &str,
        metadata: &ValueMap,
        inputs: &ValueMap,
    ) -> BoxFuture<'_, Result<serde_json::Value>>;
}

/// Resource prefetcher — warms inputs before a run.
///
/// Given the links gathered from node metadata, returns a map of
/// url -> fetched marker which the scheduler merges into the initial
/// inputs under the reserved `prefetched` key.
pub trait Prefetcher: Send + Sync + 'static {
    fn fetch(&self, links: Vec<String>) -> BoxFuture<'_, Result<ValueMap>>;
}
