//! In-memory connection that records outbound traffic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::application::errors::BotError;
use crate::domain::traits::{Connection, ConnectionInfo, EventSource};
use crate::infrastructure::events::EventBus;

/// A message the bot sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub target: String,
    pub text: String,
}

#[derive(Default)]
pub struct MemoryConnection {
    sent: Mutex<Vec<SentMessage>>,
    events: Arc<EventBus>,
    quit_message: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Messages sent to one target
    pub fn sent_to(&self, target: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.target == target)
            .map(|m| m.text)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn quit_message(&self) -> Option<String> {
        self.quit_message.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.events.clone()
    }
}

impl Connection for MemoryConnection {
    fn send(&self, target: &str, text: &str) -> Result<(), BotError> {
        if self.is_closed() {
            return Err(BotError::Connection("connection closed".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                target: target.to_string(),
                text: text.to_string(),
            });
        Ok(())
    }

    fn quit(&self, message: Option<&str>) {
        self.closed.store(true, Ordering::SeqCst);
        *self.quit_message.lock().unwrap_or_else(PoisonError::into_inner) =
            message.map(str::to_string);
    }

    fn events(&self) -> Arc<dyn EventSource> {
        self.events.clone()
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            nick: "brunobot".to_string(),
            server: "memory".to_string(),
            channels: Vec::new(),
        }
    }
}
