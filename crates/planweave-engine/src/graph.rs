use std::collections::HashMap;

use planweave_core::error::{EngineError, Result};
use planweave_core::types::ValueMap;

use crate::node::Node;

/// Per-edge annotation: output→input field-renaming directives.
///
/// When present and non-empty, only the mapped fields of the source
/// node's output are copied into the target's inputs, under their
/// renamed keys.
#[derive(Debug, Clone, Default)]
pub struct EdgeMetadata {
    pub field_map: HashMap<String, String>,
}

impl EdgeMetadata {
    /// A mapping that copies `source_field` into the target's inputs as
    /// `renamed`.
    pub fn rename(source_field: impl Into<String>, renamed: impl Into<String>) -> Self {
        let mut field_map = HashMap::new();
        field_map.insert(source_field.into(), renamed.into());
        Self { field_map }
    }

    pub fn and_rename(
        mut self,
        source_field: impl Into<String>,
        renamed: impl Into<String>,
    ) -> Self {
        self.field_map.insert(source_field.into(), renamed.into());
        self
    }
}

/// Directed acyclic graph of uniquely-named nodes.
///
/// Adjacency (edges) and reverse dependencies (each node's `dependencies`
/// list) are kept consistent: adding an edge updates both. Insertion
/// order of nodes is preserved for stable diagnostics and deterministic
/// tie-breaks.
#[derive(Debug, Clone)]
pub struct Graph {
    pub name: String,
    nodes: HashMap<String, Node>,
    /// Node names in insertion order.
    order: Vec<String>,
    /// Adjacency: source name -> target names one hop away, deduplicated.
    edges: HashMap<String, Vec<String>>,
    edge_metadata: HashMap<(String, String), EdgeMetadata>,
    /// Explicitly pre-set static inputs per node.
    static_inputs: HashMap<String, ValueMap>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            edge_metadata: HashMap::new(),
            static_inputs: HashMap::new(),
        }
    }

    /// Register a node under its name. Errors on a name collision; a
    /// rewrite that replaces a node must `remove_node` first or build a
    /// fresh graph via `copy`.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(EngineError::DuplicateNode(node.name.clone()));
        }
        self.order.push(node.name.clone());
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Remove a node along with its edges and any dependency references
    /// to it. Returns false if the node was not present.
    pub fn remove_node(&mut self, name: &str) -> bool {
        if self.nodes.remove(name).is_none() {
            return false;
        }
        self.order.retain(|n| n != name);
        self.edges.remove(name);
        for targets in self.edges.values_mut() {
            targets.retain(|t| t != name);
        }
        self.edge_metadata
            .retain(|(from, to), _| from != name && to != name);
        self.static_inputs.remove(name);
        for node in self.nodes.values_mut() {
            node.remove_dependency(name);
        }
        true
    }

    /// Add a directed edge. Both endpoints must already be registered.
    /// The target node's dependency list is updated to match.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        metadata: Option<EdgeMetadata>,
    ) -> Result<()> {
        if !self.nodes.contains_key(from) {
            return Err(EngineError::UnknownNode(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(EngineError::UnknownNode(to.to_string()));
        }

        let targets = self.edges.entry(from.to_string()).or_default();
        if !targets.contains(&to.to_string()) {
            targets.push(to.to_string());
        }

        if let Some(node) = self.nodes.get_mut(to) {
            node.add_dependency(from);
        }

        if let Some(md) = metadata {
            self.edge_metadata
                .insert((from.to_string(), to.to_string()), md);
        }
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Targets one hop away from `name`.
    pub fn successors(&self, name: &str) -> &[String] {
        self.edges.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn edge_metadata(&self, from: &str, to: &str) -> Option<&EdgeMetadata> {
        self.edge_metadata
            .get(&(from.to_string(), to.to_string()))
    }

    /// Pre-set a static input for a node, merged into its resolved inputs
    /// ahead of dependency outputs.
    pub fn set_static_input(
        &mut self,
        node: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        if !self.nodes.contains_key(node) {
            return Err(EngineError::UnknownNode(node.to_string()));
        }
        self.static_inputs
            .entry(node.to_string())
            .or_default()
            .insert(key.into(), value);
        Ok(())
    }

    /// Node names ordered so every node appears after all of its
    /// dependencies. Depth-first with three-color marking; an in-progress
    /// node reached again is a cycle and names that node. Ties among
    /// independent subgraphs break by node insertion order.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = self
            .order
            .iter()
            .map(|n| (n.as_str(), Mark::Unvisited))
            .collect();
        let mut post: Vec<String> = Vec::with_capacity(self.order.len());

        // Iterative DFS; a frame is revisited once its successors are done.
        for root in &self.order {
            if marks[root.as_str()] != Mark::Unvisited {
                continue;
            }
            let mut stack: Vec<(&str, bool)> = vec![(root.as_str(), false)];
            while let Some((name, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(name, Mark::Done);
                    post.push(name.to_string());
                    continue;
                }
                match marks[name] {
                    Mark::Done => continue,
                    Mark::InProgress => {
                        return Err(EngineError::Cycle(name.to_string()));
                    }
                    Mark::Unvisited => {}
                }
                marks.insert(name, Mark::InProgress);
                stack.push((name, true));
                for succ in self.successors(name).iter().rev() {
                    match marks[succ.as_str()] {
                        Mark::InProgress => {
                            return Err(EngineError::Cycle(succ.clone()));
                        }
                        Mark::Unvisited => stack.push((succ.as_str(), false)),
                        Mark::Done => {}
                    }
                }
            }
        }

        // Post-order visits a node after its successors; reversing puts
        // every node after its dependencies.
        post.reverse();
        Ok(post)
    }

    /// Roots (no dependencies) and leaves (no outgoing edges), both in
    /// insertion order. Used for stitching sequential plans together.
    pub fn roots_and_leaves(&self) -> (Vec<String>, Vec<String>) {
        let roots = self
            .order
            .iter()
            .filter(|n| {
                self.nodes
                    .get(*n)
                    .map(|node| node.dependencies().is_empty())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        let leaves = self
            .order
            .iter()
            .filter(|n| self.successors(n).is_empty())
            .cloned()
            .collect();
        (roots, leaves)
    }

    /// Resolve a node's inputs from its static inputs and the outputs of
    /// dependencies already present in `results`.
    ///
    /// For a dependency whose inbound edge carries a field mapping, only
    /// the mapped fields are copied under their renamed keys. Otherwise
    /// the dependency's whole output object is shallow-merged in, and the
    /// full payload is additionally available under the dependency's own
    /// name.
    pub fn node_inputs(&self, name: &str, results: &ValueMap) -> Result<ValueMap> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| EngineError::UnknownNode(name.to_string()))?;

        let mut inputs = self
            .static_inputs
            .get(name)
            .cloned()
            .unwrap_or_default();

        for dep in node.dependencies() {
            let Some(output) = results.get(dep) else {
                continue;
            };
            match self.edge_metadata(dep, name) {
                Some(md) if !md.field_map.is_empty() => {
                    if let Some(obj) = output.as_object() {
                        for (source_field, renamed) in &md.field_map {
                            if let Some(value) = obj.get(source_field) {
                                inputs.insert(renamed.clone(), value.clone());
                            }
                        }
                    }
                }
                _ => {
                    if let Some(obj) = output.as_object() {
                        for (k, v) in obj {
                            inputs.insert(k.clone(), v.clone());
                        }
                    }
                    inputs.insert(dep.clone(), output.clone());
                }
            }
        }

        Ok(inputs)
    }

    /// Longest modeled-latency path from each node to a leaf, in
    /// milliseconds: `self + max(critical_path(successor))`.
    pub fn critical_path(&self) -> Result<HashMap<String, u64>> {
        let order = self.topological_order()?;
        let mut path: HashMap<String, u64> = HashMap::with_capacity(order.len());

        for name in order.iter().rev() {
            let own = self
                .nodes
                .get(name)
                .map(|n| n.latency_ms())
                .unwrap_or(0);
            let downstream = self
                .successors(name)
                .iter()
                .filter_map(|s| path.get(s))
                .copied()
                .max()
                .unwrap_or(0);
            path.insert(name.clone(), own + downstream);
        }
        Ok(path)
    }

    /// Fully independent deep copy: cloned nodes, cloned edge maps. The
    /// two graphs share no mutable state afterward, so a rewrite rule can
    /// mutate the copy while the original is still being executed.
    pub fn copy(&self) -> Self {
        self.clone()
    }
}
