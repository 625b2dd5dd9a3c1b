//! `seen` - report the last thing an identity said

use crate::application::errors::{CommandError, RecentDataError};
use crate::domain::entities::{keywords, CommandData, CommandEntry, Identity};
use crate::plugins::manager::core_keys;
use crate::plugins::{ExtensionModule, ModuleManager};

pub const NAME: &str = "seen";

const USAGE: &str = "seen <nick!ident@host>";

pub struct Seen;

impl ExtensionModule for Seen {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Reports when a user last spoke"
    }

    fn listen(&self) -> Vec<String> {
        vec![keywords::CMD.to_string()]
    }

    fn require(&self) -> Vec<String> {
        vec![core_keys::RECENTDATA.to_string(), core_keys::COMMUNICATION.to_string()]
    }

    fn commands(&self) -> Vec<CommandEntry> {
        vec![CommandEntry::new("seen", seen)
            .with_usage(USAGE)
            .with_description("Shows the last message of a user.")]
    }
}

fn seen(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let mask = data
        .argv
        .first()
        .ok_or_else(|| CommandError::InvalidArgs(USAGE.to_string()))?;
    let identity = Identity::parse(mask).ok_or_else(|| CommandError::InvalidArgs(USAGE.to_string()))?;

    let recent = modules
        .recent_data()
        .ok_or_else(|| CommandError::ExecutionFailed("recentdata unavailable".to_string()))?;

    let last = recent.user_identity(&identity).and_then(|user| {
        let entry = user.last_msg()?.clone();
        Ok(entry)
    });
    let reply = match last {
        Ok(entry) => format!(
            "{} was last seen in {} at {} saying: {}",
            identity.nick,
            entry.channel,
            entry.time.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.message
        ),
        Err(RecentDataError::NotFound(_)) | Err(RecentDataError::EmptyHistory(_)) => {
            format!("I have not seen {}.", identity.nick)
        }
    };
    modules.say(&data.channel, &reply)
}
