use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::types::ValueMap;

/// Shared in-memory key/value store backing memory-type nodes.
///
/// Cloning is cheap and shares the underlying map, so a store can be
/// handed to several nodes (or several graph copies) that need to see the
/// same state. The lock is only held for single get/set operations.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<ValueMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.get(key).cloned()
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.remove(key).is_some()
    }

    /// Snapshot of the current contents.
    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        data.clone()
    }
}
