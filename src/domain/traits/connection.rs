use std::sync::Arc;

use super::EventSource;
use crate::application::errors::BotError;

/// Connection trait - abstraction over the chat session
///
/// The wire protocol lives behind this seam; the module core only needs to
/// send text, hang up, and reach the session's event source.
pub trait Connection: Send + Sync {
    /// Send a message to a channel or user
    fn send(&self, target: &str, text: &str) -> Result<(), BotError>;

    /// Terminate the session
    fn quit(&self, message: Option<&str>);

    /// Event source listeners attach to
    fn events(&self) -> Arc<dyn EventSource>;

    /// Session info
    fn info(&self) -> ConnectionInfo;
}

/// Connection information
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub nick: String,
    pub server: String,
    pub channels: Vec<String>,
}
