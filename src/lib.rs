//! brunobot - chat bot core with hot-reloadable extension modules

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, ModuleError, StartupError};
pub use infrastructure::config::Config;
pub use plugins::{ExtensionModule, ModuleManager};
