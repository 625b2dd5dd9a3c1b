//! In-process event bus backing a connection's listener registry

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{PoisonError, RwLock};

use crate::domain::entities::Message;
use crate::domain::traits::{EventSource, Listener, ListenerId};

/// Named-event listener registry
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for EventBus {
    fn add_listener(&self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        tracing::debug!(event, listener = %id, "Listener added");
        id
    }

    fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = listeners.get_mut(event) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(existing, _)| *existing != id);
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    fn has_listener(&self, event: &str, id: ListenerId) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(|l| l.iter().any(|(existing, _)| *existing == id))
            .unwrap_or(false)
    }

    fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn emit(&self, event: &str, message: &Message) -> usize {
        // Snapshot so listeners may add or remove listeners while running
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        for (id, listener) in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
                tracing::warn!(event, listener = %id, "Listener panicked");
            }
        }
        snapshot.len()
    }
}
