use tracing::{debug, warn};

use planweave_core::traits::Prefetcher;
use planweave_core::types::{ValueMap, PREFETCHED_KEY};

use crate::graph::Graph;

/// Gather resource links declared in node metadata under the `links` key,
/// deduplicated, in node insertion order.
pub fn collect_links(graph: &Graph) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for name in graph.node_names() {
        let Some(node) = graph.node(name) else {
            continue;
        };
        let Some(declared) = node.metadata.get("links").and_then(|v| v.as_array()) else {
            continue;
        };
        for link in declared.iter().filter_map(|v| v.as_str()) {
            if !links.iter().any(|l| l == link) {
                links.push(link.to_string());
            }
        }
    }
    links
}

/// Warm the initial inputs by prefetching every declared link, merging the
/// url -> marker map under the reserved `prefetched` key.
///
/// Purely additive: a prefetch failure is logged and the run proceeds
/// without warmed inputs.
pub async fn warm_inputs(prefetcher: &dyn Prefetcher, graph: &Graph, inputs: &mut ValueMap) {
    let links = collect_links(graph);
    if links.is_empty() {
        return;
    }
    debug!(count = links.len(), "prefetching declared resource links");

    match prefetcher.fetch(links).await {
        Ok(fetched) => {
            let map: serde_json::Map<String, serde_json::Value> =
                fetched.into_iter().collect();
            inputs.insert(PREFETCHED_KEY.to_string(), serde_json::Value::Object(map));
        }
        Err(e) => {
            warn!(error = %e, "resource prefetch failed; continuing without warmed inputs");
        }
    }
}
