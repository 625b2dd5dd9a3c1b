//! `remind` - delayed messages run on the task manager

use std::time::Duration;

use crate::application::errors::CommandError;
use crate::domain::entities::{keywords, CommandData, CommandEntry};
use crate::plugins::manager::core_keys;
use crate::plugins::{ExtensionModule, ModuleManager};

pub const NAME: &str = "remind";

const USAGE: &str = "remind <seconds> <text>";

/// One week
const MAX_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

pub struct Remind;

impl ExtensionModule for Remind {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Schedules reminders"
    }

    fn listen(&self) -> Vec<String> {
        vec![keywords::CMD.to_string()]
    }

    fn require(&self) -> Vec<String> {
        vec![core_keys::THREADMANAGER.to_string(), core_keys::COMMUNICATION.to_string()]
    }

    fn commands(&self) -> Vec<CommandEntry> {
        vec![CommandEntry::new("remind", remind)
            .with_usage(USAGE)
            .with_description("Repeats <text> in this channel after <seconds>.")]
    }
}

fn remind(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let usage = || CommandError::InvalidArgs(USAGE.to_string());

    let secs: u64 = data.argv.first().and_then(|s| s.parse().ok()).ok_or_else(usage)?;
    if secs > MAX_DELAY_SECS {
        return Err(CommandError::InvalidArgs(format!("{} (at most {} seconds)", USAGE, MAX_DELAY_SECS)));
    }
    let text = data.argv.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    if text.is_empty() {
        return Err(usage());
    }

    let tasks = modules
        .task_manager()
        .ok_or_else(|| CommandError::ExecutionFailed("threadmanager unavailable".to_string()))?;
    let communication = modules
        .communication()
        .ok_or_else(|| CommandError::ExecutionFailed("communication unavailable".to_string()))?;

    let channel = data.channel.clone();
    tasks
        .spawn(format!("remind:{}", channel), async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            if let Err(e) = communication.say(&channel, &format!("reminder: {}", text)) {
                tracing::warn!(channel = %channel, "Reminder not delivered: {}", e);
            }
        })
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;

    modules.say(&data.channel, &format!("okay, reminding in {}s.", secs))
}
