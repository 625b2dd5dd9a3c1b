//! Extension module trait and the descriptor the registry keeps per module

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::api::{ApiDescriptor, ModuleApi};
use super::manager::{CoreComponent, ModuleManager};
use crate::application::errors::{ApiError, CommandError};
use crate::domain::entities::{CommandEntry, Message};
use crate::infrastructure::plugins::ModuleSource;

/// Trait every extension module implements
pub trait ExtensionModule: Send + Sync {
    /// Identifier the module reports for itself
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Keywords this module reacts to (`cmd`, `privmsg`, ...)
    fn listen(&self) -> Vec<String> {
        Vec::new()
    }

    /// Core components this module depends on, by core key
    fn require(&self) -> Vec<String> {
        Vec::new()
    }

    /// Commands to add to the command table; only used when listening to `cmd`
    fn commands(&self) -> Vec<CommandEntry> {
        Vec::new()
    }

    /// Declare exported functions, constants and event listeners
    fn expose(&self, _api: &mut ModuleApi) -> Result<(), ApiError> {
        Ok(())
    }

    /// Called for every event whose keyword this module listens to
    fn on_event(&self, _modules: &ModuleManager, _keyword: &str, _message: &Message) -> Result<(), CommandError> {
        Ok(())
    }

    /// Called once when the module is replaced or unloaded
    fn shutdown(&self) {}
}

/// Everything the registry knows about one loaded module.
///
/// Built once at load time and never mutated afterwards, except that
/// [`ModuleDescriptor::unload`] empties the API when the module is retired.
pub struct ModuleDescriptor {
    name: String,
    listen: BTreeSet<String>,
    require: BTreeSet<String>,
    api: Mutex<ModuleApi>,
    registry: Weak<ModuleManager>,
    loaded_at: DateTime<Utc>,
    module: Arc<dyn ExtensionModule>,
    // Declared last so a native library outlives everything built from it
    source: ModuleSource,
}

impl ModuleDescriptor {
    pub fn new(
        name: impl Into<String>,
        module: Arc<dyn ExtensionModule>,
        source: ModuleSource,
        api: ModuleApi,
        registry: Weak<ModuleManager>,
    ) -> Self {
        Self {
            name: name.into(),
            listen: module.listen().into_iter().collect(),
            require: module.require().into_iter().collect(),
            api: Mutex::new(api),
            registry,
            loaded_at: Utc::now(),
            module,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &Arc<dyn ExtensionModule> {
        &self.module
    }

    pub fn source(&self) -> &ModuleSource {
        &self.source
    }

    pub fn listen(&self) -> &BTreeSet<String> {
        &self.listen
    }

    pub fn require(&self) -> &BTreeSet<String> {
        &self.require
    }

    pub fn listens_to(&self, keyword: &str) -> bool {
        self.listen.contains(keyword)
    }

    pub fn requires(&self, keyword: &str) -> bool {
        self.require.contains(keyword)
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Exported API, or `None` when the module exports nothing
    pub fn api(&self) -> Option<ApiDescriptor> {
        let api = self.api.lock().unwrap_or_else(PoisonError::into_inner).descriptor();
        (!api.is_empty()).then_some(api)
    }

    /// Listeners this module currently has attached
    pub fn listener_count(&self) -> usize {
        self.api.lock().unwrap_or_else(PoisonError::into_inner).listeners().len()
    }

    /// The registry this module is loaded into, if it is still alive
    pub fn registry(&self) -> Option<Arc<ModuleManager>> {
        self.registry.upgrade()
    }

    pub fn core(&self, key: &str) -> Option<CoreComponent> {
        self.registry()?.core(key)
    }

    /// Detach listeners, drop exports and tell the module it is done
    pub fn unload(&self) {
        self.api.lock().unwrap_or_else(PoisonError::into_inner).unload();
        self.module.shutdown();
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("listen", &self.listen)
            .field("require", &self.require)
            .field("source", &self.source)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}
