use super::Identity;
use chrono::{DateTime, Utc};

/// Message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Command { name: String, args: Vec<String> },
    Empty,
}

impl Content {
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Content::Command { .. })
    }

    /// Event keyword this content is announced under
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Content::Text(_) => Some(super::keywords::PRIVMSG),
            Content::Command { .. } => Some(super::keywords::CMD),
            Content::Empty => None,
        }
    }
}

/// An inbound chat message
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub channel: String,
    pub sender: Option<Identity>,
    pub content: Content,
    /// Raw text as received, before command parsing
    pub raw: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(channel: impl Into<String>, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.into(),
            sender: None,
            content,
            raw: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn from_text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(channel, Content::Text(text.clone())).with_raw(text)
    }

    pub fn from_command(channel: impl Into<String>, name: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(channel, Content::Command { name: name.into(), args })
    }

    pub fn with_sender(mut self, sender: Identity) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_sender_opt(mut self, sender: Option<Identity>) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }
}
