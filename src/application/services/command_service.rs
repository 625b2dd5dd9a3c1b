use crate::application::errors::CommandError;
use crate::domain::entities::{CommandData, CommandEntry};
use crate::plugins::ModuleManager;

/// Core commands (`corecmd`): module administration and help
pub struct CommandService {
    prefix: String,
}

impl CommandService {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn core_commands(&self) -> Vec<CommandEntry> {
        vec![
            CommandEntry::new("help", help)
                .with_usage("help [command]")
                .with_description("Lists commands, or shows usage for one."),
            CommandEntry::new("modules", list_modules)
                .with_usage("modules")
                .with_description("Lists loaded modules."),
            CommandEntry::new("load", load)
                .with_usage("load <module>")
                .with_description("Loads a module."),
            CommandEntry::new("unload", unload)
                .with_usage("unload <module>")
                .with_description("Unloads a module."),
            CommandEntry::new("reload", reload)
                .with_usage("reload <module>")
                .with_description("Reloads a module."),
            CommandEntry::new("quit", quit)
                .with_usage("quit [message]")
                .with_description("Disconnects and stops the bot."),
        ]
    }

    pub fn get_help(&self, modules: &ModuleManager, command: Option<&str>) -> String {
        if let Some(name) = command {
            let name = name.trim_start_matches(self.prefix.as_str());
            return match modules.command(name) {
                Some(cmd) if cmd.description.is_empty() => format!("{}{}", self.prefix, cmd.usage),
                Some(cmd) => format!("{}{} - {}", self.prefix, cmd.usage, cmd.description),
                None => format!("Command {}{} not found", self.prefix, name),
            };
        }

        let names: Vec<String> = modules
            .commands()
            .iter()
            .map(|cmd| format!("{}{}", self.prefix, cmd.cmd))
            .collect();
        format!("Available commands: {}", names.join(" "))
    }
}

fn module_arg<'a>(data: &'a CommandData, usage: &str) -> Result<&'a str, CommandError> {
    data.argv
        .first()
        .map(String::as_str)
        .ok_or_else(|| CommandError::InvalidArgs(usage.to_string()))
}

fn help(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let service = modules
        .command_service()
        .ok_or_else(|| CommandError::ExecutionFailed("corecmd unavailable".to_string()))?;
    let text = service.get_help(modules, data.argv.first().map(String::as_str));
    modules.say(&data.channel, &text)
}

fn list_modules(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let loaded: Vec<String> = modules
        .modules()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    let text = if loaded.is_empty() {
        "No modules loaded.".to_string()
    } else {
        format!("Loaded modules ({}): {}", loaded.len(), loaded.join(", "))
    };
    modules.say(&data.channel, &text)
}

fn load(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let name = module_arg(data, "load <module>")?;
    modules
        .load_module(name)
        .map_err(|e| CommandError::ExecutionFailed(format!("load of {} failed: {}", name, e)))?;
    modules.say(&data.channel, "loaded.")
}

fn unload(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let name = module_arg(data, "unload <module>")?;
    modules
        .unload_module(name)
        .map_err(|e| CommandError::ExecutionFailed(format!("unload of {} failed: {}", name, e)))?;
    modules.say(&data.channel, "unloaded.")
}

/// Acknowledges success with exactly one `reloaded.`; failures come back as
/// an error for the dispatcher to report once.
fn reload(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let name = module_arg(data, "reload <module>")?;
    modules
        .reload(name)
        .map_err(|e| CommandError::ExecutionFailed(format!("reload of {} failed: {}", name, e)))?;
    modules.say(&data.channel, "reloaded.")
}

fn quit(modules: &ModuleManager, data: &CommandData) -> Result<(), CommandError> {
    let auth = modules
        .auth()
        .ok_or_else(|| CommandError::ExecutionFailed("auth unavailable".to_string()))?;
    if !auth.is_owner(data.sender.as_ref()) {
        return Err(CommandError::PermissionDenied);
    }

    let message = (!data.argv.is_empty()).then(|| data.argv.join(" "));
    modules
        .shutdown(message.as_deref())
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))
}
