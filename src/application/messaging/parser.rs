//! Message parser - Parses raw lines into structured messages

use regex_lite::Regex;

use crate::domain::entities::{Content, Identity, Message};

/// Parses inbound lines into Message objects.
///
/// Accepted forms:
/// - `nick!ident@host #channel text`
/// - `text`, attributed to the fallback identity and channel
pub struct MessageParser {
    command_prefix: String,
    line_pattern: Regex,
    fallback_identity: Identity,
    fallback_channel: String,
}

impl MessageParser {
    pub fn new(
        prefix: impl Into<String>,
        fallback_identity: Identity,
        fallback_channel: impl Into<String>,
    ) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            command_prefix: prefix.into(),
            line_pattern: Regex::new(r"^(?P<mask>[^\s!]+![^\s@]+@\S+)\s+(?P<channel>[#&]\S+)\s*(?P<text>.*)$")?,
            fallback_identity,
            fallback_channel: fallback_channel.into(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Parse one raw inbound line
    pub fn parse_line(&self, line: &str) -> Message {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(caps) = self.line_pattern.captures(line) {
            let sender = caps.name("mask").and_then(|m| Identity::parse(m.as_str()));
            let channel = caps.name("channel").map(|m| m.as_str()).unwrap_or_default();
            let text = caps.name("text").map(|m| m.as_str()).unwrap_or_default();
            if sender.is_some() {
                return self.parse(channel, text, sender);
            }
        }

        self.parse(
            self.fallback_channel.clone(),
            line,
            Some(self.fallback_identity.clone()),
        )
    }

    /// Parse a text message
    pub fn parse(&self, channel: impl Into<String>, text: impl Into<String>, sender: Option<Identity>) -> Message {
        let text = text.into();
        let channel = channel.into();

        if text.trim().is_empty() {
            return Message::new(channel, Content::Empty).with_sender_opt(sender);
        }

        // Check if it's a command
        if text.starts_with(&self.command_prefix) {
            return self.parse_command(channel, text, sender);
        }

        Message::from_text(channel, text).with_sender_opt(sender)
    }

    /// Parse a command message
    fn parse_command(&self, channel: String, text: String, sender: Option<Identity>) -> Message {
        let cmd_text = &text[self.command_prefix.len()..];

        // Split command and arguments
        let mut parts = cmd_text.split_whitespace();
        let Some(name) = parts.next() else {
            return Message::from_text(channel, text).with_sender_opt(sender);
        };
        let args = parts.map(str::to_string).collect();

        Message::from_command(channel, name.to_lowercase(), args)
            .with_sender_opt(sender)
            .with_raw(text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MessageParser {
        MessageParser::new("!", Identity::new("console", "local", "localhost"), "#home").unwrap()
    }

    #[test]
    fn test_parse_full_line() {
        let msg = parser().parse_line("bruno!veiset@example.org #chat hello there");
        assert_eq!(msg.channel, "#chat");
        assert_eq!(msg.sender, Some(Identity::new("bruno", "veiset", "example.org")));
        assert_eq!(msg.content, Content::Text("hello there".to_string()));
        assert_eq!(msg.raw, "hello there");
    }

    #[test]
    fn test_parse_command_line() {
        let msg = parser().parse_line("bruno!veiset@example.org #chat !Reload typofixer");
        assert_eq!(
            msg.content,
            Content::Command {
                name: "reload".to_string(),
                args: vec!["typofixer".to_string()]
            }
        );
        assert_eq!(msg.raw, "!Reload typofixer");
    }

    #[test]
    fn test_bare_text_uses_fallback() {
        let msg = parser().parse_line("just talking");
        assert_eq!(msg.channel, "#home");
        assert_eq!(msg.sender.unwrap().nick, "console");
        assert_eq!(msg.content.text(), Some("just talking"));
    }

    #[test]
    fn test_prefix_alone_is_text() {
        let msg = parser().parse_line("!");
        assert_eq!(msg.content, Content::Text("!".to_string()));
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parser().parse_line("   ").content, Content::Empty);
    }
}
