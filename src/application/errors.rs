//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Startup failed: {0}")]
    Startup(#[from] StartupError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Extension module load and lookup errors
#[derive(Error, Debug)]
pub enum ModuleError {
    /// The loader has no code for this name
    #[error("Module not found: {0}")]
    NotFound(String),

    /// The registry holds no entry under this name
    #[error("Module not loaded: {0}")]
    NotLoaded(String),

    #[error("Failed to load module '{name}': {reason}")]
    LoadFailed { name: String, reason: String },

    #[error("Module '{name}' requires missing core component '{requirement}'")]
    MissingRequirement { name: String, requirement: String },

    #[error("Module API error: {0}")]
    Api(#[from] ApiError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ModuleError {
    pub fn load_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ModuleError::LoadFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while declaring or consuming a module API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Duplicate API name: {0}")]
    DuplicateName(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability '{0}' is a constant, not a function")]
    NotAFunction(String),

    #[error("'{name}' takes {expected} argument(s), got {got}")]
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Call failed: {0}")]
    Call(String),
}

/// Recent-activity lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecentDataError {
    #[error("No recent data for {0}")]
    NotFound(String),

    #[error("No messages stored for {0}")]
    EmptyHistory(String),
}

/// Fatal errors while constructing the core components
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Core component '{component}' failed: {reason}")]
    Component { component: String, reason: String },
}

impl StartupError {
    pub fn component(component: impl Into<String>, reason: impl Into<String>) -> Self {
        StartupError::Component {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid lifecycle transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
