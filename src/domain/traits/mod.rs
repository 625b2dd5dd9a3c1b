//! Domain traits - Abstractions for infrastructure implementations

pub mod connection;
pub mod events;

pub use connection::{Connection, ConnectionInfo};
pub use events::{EventSource, Listener, ListenerId};
