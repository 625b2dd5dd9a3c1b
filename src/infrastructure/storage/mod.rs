//! In-memory stores shared through the core component table

pub mod persist;
pub mod recent;

pub use persist::PersistStore;
pub use recent::{RecentData, RecentEntry, UserData};
