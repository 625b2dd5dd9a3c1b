//! Application layer - Core services and message handling
//!
//! This layer contains:
//! - Services: Communication, auth, task manager, core commands
//! - Errors: Domain-specific errors
//! - Messaging: Line parsing and dispatch

pub mod errors;
pub mod services;
pub mod messaging;
