use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::traits::Connection;

/// Output sink: everything the bot says goes through here
pub struct Communication {
    connection: Arc<dyn Connection>,
}

impl Communication {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }

    pub fn say(&self, channel: &str, text: &str) -> Result<(), BotError> {
        tracing::debug!(channel, "-> {}", text);
        self.connection.send(channel, text)
    }

    /// Say several lines in order, stopping at the first failure
    pub fn say_lines<'a>(&self, channel: &str, lines: impl IntoIterator<Item = &'a str>) -> Result<(), BotError> {
        for line in lines {
            self.say(channel, line)?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}
