//! Domain layer - Core business objects and seams
//!
//! This layer contains:
//! - Entities: Identity, Message, CommandEntry
//! - Traits: Abstractions for infrastructure (Connection, EventSource)

pub mod entities;
pub mod traits;
