//! Module collection - ordered storage for loaded module descriptors

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::plugins::ModuleDescriptor;

/// Ordered collection of loaded modules.
///
/// Iteration follows first-insertion order. Replacing an entry keeps its
/// slot, so reloads never reorder dispatch. Every mutation happens under one
/// short write lock; readers see either the old descriptor or the new one.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<Vec<Arc<ModuleDescriptor>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace in place, returning the replaced descriptor
    pub fn upsert(&self, descriptor: Arc<ModuleDescriptor>) -> Option<Arc<ModuleDescriptor>> {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        match modules.iter_mut().find(|m| m.name() == descriptor.name()) {
            Some(slot) => Some(std::mem::replace(slot, descriptor)),
            None => {
                modules.push(descriptor);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModuleDescriptor>> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<ModuleDescriptor>> {
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        let index = modules.iter().position(|m| m.name() == name)?;
        Some(modules.remove(index))
    }

    /// Point-in-time copy in insertion order
    pub fn snapshot(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.modules.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.modules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the collection, handing back what it held
    pub fn drain(&self) -> Vec<Arc<ModuleDescriptor>> {
        std::mem::take(&mut *self.modules.write().unwrap_or_else(PoisonError::into_inner))
    }
}

/// One mutex per key.
///
/// Operations on the same key are mutually exclusive; different keys never
/// wait on each other beyond the brief map lookup. An entry lives only while
/// someone holds or waits on it.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`
    pub fn with_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        // Clones are only taken under the map lock, so a count of one here
        // means nobody else holds or waits on this key
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
        result
    }

    /// Keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
