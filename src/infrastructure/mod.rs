//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Recent-activity and persist stores
//! - Adapters: Connection implementations (console, in-memory)
//! - Events: Listener registry behind a connection
//! - Plugins: Module loaders and the module collection

pub mod config;
pub mod storage;
pub mod adapters;
pub mod events;
pub mod plugins;
