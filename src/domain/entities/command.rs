use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Identity;
use crate::application::errors::CommandError;
use crate::plugins::ModuleManager;

/// Command handler function type: `main(modules, data)`
pub type CommandHandler =
    Arc<dyn Fn(&ModuleManager, &CommandData) -> Result<(), CommandError> + Send + Sync>;

/// Arguments handed to a command handler
#[derive(Debug, Clone, Default)]
pub struct CommandData {
    /// Tokens after the keyword
    pub argv: Vec<String>,
    /// Where replies go
    pub channel: String,
    pub sender: Option<Identity>,
}

impl CommandData {
    pub fn new(channel: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            argv,
            channel: channel.into(),
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: Option<Identity>) -> Self {
        self.sender = sender;
        self
    }
}

/// Represents one dispatchable command
#[derive(Clone)]
pub struct CommandEntry {
    pub cmd: String,
    pub usage: String,
    pub description: String,
    pub handler: CommandHandler,
    /// Module that registered this entry; `None` for core commands
    pub owner: Option<String>,
}

impl CommandEntry {
    pub fn new<F>(cmd: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ModuleManager, &CommandData) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        let cmd = cmd.into();
        Self {
            usage: cmd.clone(),
            cmd,
            description: String::new(),
            handler: Arc::new(handler),
            owner: None,
        }
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// The same handler under another keyword
    pub fn alias(&self, cmd: impl Into<String>) -> Self {
        let mut entry = self.clone();
        entry.cmd = cmd.into();
        entry
    }

    pub fn run(&self, modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
        (self.handler)(modules, data)
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("cmd", &self.cmd)
            .field("usage", &self.usage)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// Command table keyed by keyword.
///
/// Registration is last-writer-wins: a second entry under the same keyword
/// replaces the first and the replaced entry is handed back to the caller.
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) -> Option<CommandEntry> {
        self.commands.insert(entry.cmd.to_lowercase(), entry)
    }

    pub fn get(&self, cmd: &str) -> Option<&CommandEntry> {
        self.commands.get(&cmd.to_lowercase())
    }

    /// Drop every entry registered by `owner`, returning how many went
    pub fn remove_owned_by(&mut self, owner: &str) -> usize {
        let before = self.commands.len();
        self.commands
            .retain(|_, entry| entry.owner.as_deref() != Some(owner));
        before - self.commands.len()
    }

    /// All entries sorted by keyword
    pub fn all(&self) -> Vec<&CommandEntry> {
        let mut entries: Vec<&CommandEntry> = self.commands.values().collect();
        entries.sort_by(|a, b| a.cmd.cmp(&b.cmd));
        entries
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
