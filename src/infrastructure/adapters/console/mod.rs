//! Console adapter for development/testing

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::traits::{Connection, ConnectionInfo, EventSource};
use crate::infrastructure::config::ConnectionConfig;
use crate::infrastructure::events::EventBus;

/// Console connection for local development; prints what would go on the wire
pub struct ConsoleConnection {
    info: ConnectionInfo,
    events: Arc<EventBus>,
    closed: AtomicBool,
}

impl ConsoleConnection {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            info: ConnectionInfo {
                nick: config.nick.clone(),
                server: "console".to_string(),
                channels: config.channels.clone(),
            },
            events: Arc::new(EventBus::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl Connection for ConsoleConnection {
    fn send(&self, target: &str, text: &str) -> Result<(), BotError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BotError::Connection("connection closed".to_string()));
        }
        println!("[{}] <{}> {}", target, self.info.nick, text);
        Ok(())
    }

    fn quit(&self, message: Option<&str>) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            println!("[quit] {}", message.unwrap_or("bye"));
            tracing::info!("Console connection closed");
        }
    }

    fn events(&self) -> Arc<dyn EventSource> {
        self.events.clone()
    }

    fn info(&self) -> ConnectionInfo {
        self.info.clone()
    }
}
