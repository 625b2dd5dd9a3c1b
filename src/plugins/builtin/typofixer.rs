//! `s/old/new/` corrections of a user's previous message

use regex_lite::Regex;
use serde_json::{json, Value};

use crate::application::errors::{ApiError, CommandError};
use crate::domain::entities::{keywords, Message};
use crate::plugins::api::{FunctionDescriptor, ModuleApi};
use crate::plugins::manager::core_keys;
use crate::plugins::{ExtensionModule, ModuleManager};

pub const NAME: &str = "typofixer";

/// Substitution syntax understood in channel text
pub const PATTERN: &str = r"^s/([^/]+)/([^/]*)/?$";

pub struct TypoFixer {
    pattern: Regex,
}

impl TypoFixer {
    pub fn new() -> Result<Self, regex_lite::Error> {
        Ok(Self {
            pattern: Regex::new(PATTERN)?,
        })
    }

    /// Split `s/old/new/` into its parts
    fn substitution<'a>(&self, text: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.pattern.captures(text)?;
        Some((caps.get(1)?.as_str(), caps.get(2).map(|m| m.as_str()).unwrap_or("")))
    }
}

/// Replace the first occurrence of `from`
pub fn fix(text: &str, from: &str, to: &str) -> String {
    text.replacen(from, to, 1)
}

fn string_arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str, ApiError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Call(format!("{} must be a string", name)))
}

impl ExtensionModule for TypoFixer {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Corrects typos with s/old/new/"
    }

    fn listen(&self) -> Vec<String> {
        vec![keywords::PRIVMSG.to_string()]
    }

    fn require(&self) -> Vec<String> {
        vec![core_keys::RECENTDATA.to_string(), core_keys::COMMUNICATION.to_string()]
    }

    fn expose(&self, api: &mut ModuleApi) -> Result<(), ApiError> {
        api.exports()
            .function(
                FunctionDescriptor::new("fix", &["text", "from", "to"], |args| {
                    let text = string_arg(args, 0, "text")?;
                    let from = string_arg(args, 1, "from")?;
                    let to = string_arg(args, 2, "to")?;
                    Ok(json!(fix(text, from, to)))
                })
                .with_doc("Replace the first occurrence of `from` in `text` with `to`."),
            )?
            .constant("pattern", PATTERN)?;
        Ok(())
    }

    fn on_event(&self, modules: &ModuleManager, keyword: &str, message: &Message) -> Result<(), CommandError> {
        if keyword != keywords::PRIVMSG {
            return Ok(());
        }
        let (Some(text), Some(sender)) = (message.content.text(), message.sender.as_ref()) else {
            return Ok(());
        };
        let Some((from, to)) = self.substitution(text.trim()) else {
            return Ok(());
        };

        let recent = modules
            .recent_data()
            .ok_or_else(|| CommandError::ExecutionFailed("recentdata unavailable".to_string()))?;
        let Ok(user) = recent.user_identity(sender) else {
            return Ok(());
        };

        // The substitution itself is the newest entry; look behind it
        let previous = user
            .entries()
            .iter()
            .rev()
            .skip(1)
            .find(|e| e.channel == message.channel && !self.pattern.is_match(e.message.trim()));
        let Some(previous) = previous else {
            return Ok(());
        };
        if !previous.message.contains(from) {
            return Ok(());
        }

        let fixed = fix(&previous.message, from, to);
        modules.say(&message.channel, &format!("{} meant: {}", sender.nick, fixed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_parts() {
        let fixer = TypoFixer::new().unwrap();
        assert_eq!(fixer.substitution("s/helo/hello/"), Some(("helo", "hello")));
        assert_eq!(fixer.substitution("s/helo/hello"), Some(("helo", "hello")));
        assert_eq!(fixer.substitution("s/cruft//"), Some(("cruft", "")));
        assert_eq!(fixer.substitution("so/what"), None);
    }

    #[test]
    fn test_fix_replaces_first_only() {
        assert_eq!(fix("teh cat and teh dog", "teh", "the"), "the cat and teh dog");
    }
}
