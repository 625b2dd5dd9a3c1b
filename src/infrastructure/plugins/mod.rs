//! Module loading plumbing
//!
//! Extension modules are either compiled in (builtin catalog) or shared
//! libraries described by a `module.yaml` next to the library.

pub mod loader;
pub mod manifest;
pub mod registry;

pub use loader::{
    BuiltinLoader, LoadedModule, LoaderChain, ModuleFactory, ModuleInitFn, ModuleLoader,
    ModuleSource, NativeLoader, MODULE_INIT_SYMBOL,
};
pub use manifest::ModuleManifest;
pub use registry::{KeyedLocks, ModuleRegistry};
