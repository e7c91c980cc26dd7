use std::collections::HashMap;

/// String-keyed JSON map used for node inputs, outputs, and metadata.
///
/// Values are JSON for maximum flexibility: a node's output may be a bare
/// string, a structured object, or anything serde_json can represent.
pub type ValueMap = HashMap<String, serde_json::Value>;

/// Reserved input key under which prefetched resources are merged.
pub const PREFETCHED_KEY: &str = "prefetched";

/// Result of one scheduler pass over a graph.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// The original inputs plus one entry per executed node, keyed by
    /// node name.
    pub outputs: ValueMap,
    /// True if a hook signalled a controlled stop before all nodes ran.
    pub stopped_early: bool,
    /// Cumulative token cost admitted during this run.
    pub tokens_spent: u64,
}

impl RunReport {
    /// Output of a single node, if it executed.
    pub fn output(&self, node: &str) -> Option<&serde_json::Value> {
        self.outputs.get(node)
    }

    /// Output of a single node as a string, if it executed and produced one.
    pub fn output_str(&self, node: &str) -> Option<&str> {
        self.outputs.get(node).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_accessors() {
        let mut report = RunReport::default();
        report
            .outputs
            .insert("fetch".into(), serde_json::json!("page body"));
        report
            .outputs
            .insert("score".into(), serde_json::json!(0.7));

        assert_eq!(report.output_str("fetch"), Some("page body"));
        assert_eq!(report.output("score"), Some(&serde_json::json!(0.7)));
        assert_eq!(report.output("missing"), None);
        assert_eq!(report.output_str("score"), None);
    }
}
