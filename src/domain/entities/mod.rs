//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;

pub use user::{fingerprint, Identity};
pub use message::{Content, Message};
pub use command::{CommandData, CommandEntry, CommandHandler, CommandTable};

/// Capability keywords modules listen to
pub mod keywords {
    /// Command dispatch
    pub const CMD: &str = "cmd";
    /// Plain channel text
    pub const PRIVMSG: &str = "privmsg";
}
