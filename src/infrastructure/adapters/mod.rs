//! Connection adapters

pub mod console;
pub mod memory;

pub use console::ConsoleConnection;
pub use memory::{MemoryConnection, SentMessage};
