//! Module core for brunobot
//!
//! The [`ModuleManager`] owns the core components, the loaded extension
//! modules and the command table. Modules declare what they listen to and
//! require, and may export an API other modules consume by name.

pub mod api;
pub mod builtin;
pub mod dispatch;
pub mod manager;
pub mod trait_def;

pub use api::{ApiBuilder, ApiDescriptor, Capability, CapabilityTable, FunctionDescriptor, ModuleApi};
pub use dispatch::ModuleRef;
pub use manager::{core_keys, CoreComponent, Lifecycle, ModuleManager};
pub use trait_def::{ExtensionModule, ModuleDescriptor};
