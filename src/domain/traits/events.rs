use std::fmt;
use std::sync::Arc;

use crate::domain::entities::Message;

/// Listener callback attached to a named event
pub type Listener = Arc<dyn Fn(&Message) + Send + Sync>;

/// Handle returned when a listener is attached; closures have no identity
/// of their own so removal goes through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(uuid::Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event source trait - where session events are published
pub trait EventSource: Send + Sync {
    fn add_listener(&self, event: &str, listener: Listener) -> ListenerId;

    /// Returns `false` if no such listener was registered
    fn remove_listener(&self, event: &str, id: ListenerId) -> bool;

    fn has_listener(&self, event: &str, id: ListenerId) -> bool;

    fn listener_count(&self, event: &str) -> usize;

    /// Deliver `message` to every listener of `event`, returning how many ran
    fn emit(&self, event: &str, message: &Message) -> usize;
}
