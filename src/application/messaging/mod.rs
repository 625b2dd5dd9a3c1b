//! Message handling - Inbound parsing and dispatch

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use parser::MessageParser;
