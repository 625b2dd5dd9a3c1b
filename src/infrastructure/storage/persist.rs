//! Shared key-value scratch space modules can keep state in across reloads

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Default)]
pub struct PersistStore {
    kv: RwLock<HashMap<String, serde_json::Value>>,
}

impl PersistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.kv.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// Returns the previous value
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.kv
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.kv.write().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    pub fn len(&self) -> usize {
        self.kv.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
