//! Module manager - owns the core components and extension module lifecycle

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::api::{CapabilityTable, ModuleApi};
use super::trait_def::ModuleDescriptor;
use crate::application::errors::{CommandError, LifecycleError, ModuleError, StartupError};
use crate::application::messaging::{MessageDispatcher, MessageParser};
use crate::application::services::{Auth, CommandService, Communication, TaskManager};
use crate::domain::entities::{keywords, CommandEntry, CommandTable, Identity};
use crate::domain::traits::Connection;
use crate::infrastructure::config::Config;
use crate::infrastructure::plugins::{KeyedLocks, LoadedModule, ModuleLoader, ModuleRegistry};
use crate::infrastructure::storage::{PersistStore, RecentData};

/// Keys of the core component table
pub mod core_keys {
    pub const CONNECTION: &str = "connection";
    pub const AUTH: &str = "auth";
    pub const COMMUNICATION: &str = "communication";
    pub const RECENTDATA: &str = "recentdata";
    pub const THREADMANAGER: &str = "threadmanager";
    pub const PARSER: &str = "parser";
    pub const CORECMD: &str = "corecmd";
    pub const CFG: &str = "cfg";
    pub const PRESIST: &str = "presist";
}

/// A fixed, always-loaded component
#[derive(Clone)]
pub enum CoreComponent {
    Config(Arc<Config>),
    Connection(Arc<dyn Connection>),
    Auth(Arc<Auth>),
    Communication(Arc<Communication>),
    RecentData(Arc<RecentData>),
    ThreadManager(Arc<TaskManager>),
    Parser(Arc<MessageDispatcher>),
    CoreCmd(Arc<CommandService>),
    Persist(Arc<PersistStore>),
}

impl CoreComponent {
    pub fn key(&self) -> &'static str {
        match self {
            CoreComponent::Config(_) => core_keys::CFG,
            CoreComponent::Connection(_) => core_keys::CONNECTION,
            CoreComponent::Auth(_) => core_keys::AUTH,
            CoreComponent::Communication(_) => core_keys::COMMUNICATION,
            CoreComponent::RecentData(_) => core_keys::RECENTDATA,
            CoreComponent::ThreadManager(_) => core_keys::THREADMANAGER,
            CoreComponent::Parser(_) => core_keys::PARSER,
            CoreComponent::CoreCmd(_) => core_keys::CORECMD,
            CoreComponent::Persist(_) => core_keys::PRESIST,
        }
    }
}

impl fmt::Debug for CoreComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoreComponent({})", self.key())
    }
}

/// Lifecycle phases; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Starting => "starting",
            Lifecycle::Running => "running",
            Lifecycle::ShuttingDown => "shutting down",
            Lifecycle::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Registry of core components, extension modules and the command table.
///
/// Mutations of the same module name are serialized through a per-name
/// lock; loads of different names run in parallel.
pub struct ModuleManager {
    this: Weak<ModuleManager>,
    core: HashMap<&'static str, CoreComponent>,
    extra: ModuleRegistry,
    plugins: ModuleRegistry,
    commands: RwLock<CommandTable>,
    loader: Arc<dyn ModuleLoader>,
    load_locks: KeyedLocks,
    phase: Mutex<Lifecycle>,
}

impl ModuleManager {
    /// Build every core component in dependency order.
    ///
    /// Must run inside a tokio runtime (the task manager binds to it). Any
    /// failure here is fatal: nothing is returned to load modules into.
    pub fn initialize(
        config: Config,
        connection: Arc<dyn Connection>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Result<Arc<Self>, StartupError> {
        config.validate()?;
        let config = Arc::new(config);

        let mut core: HashMap<&'static str, CoreComponent> = HashMap::new();
        let mut add = |component: CoreComponent| {
            core.insert(component.key(), component);
        };

        add(CoreComponent::Config(config.clone()));
        add(CoreComponent::Connection(connection.clone()));

        let auth = Auth::from_config(&config.auth)
            .map_err(|e| StartupError::component(core_keys::AUTH, e.to_string()))?;
        add(CoreComponent::Auth(Arc::new(auth)));

        add(CoreComponent::Communication(Arc::new(Communication::new(connection.clone()))));
        add(CoreComponent::RecentData(Arc::new(RecentData::new())));
        add(CoreComponent::ThreadManager(Arc::new(TaskManager::try_current()?)));

        let console_identity = Identity::new(
            config.connection.nick.clone(),
            config.connection.ident.clone(),
            config.connection.host.clone(),
        );
        let default_channel = config
            .connection
            .channels
            .first()
            .cloned()
            .unwrap_or_else(|| "console".to_string());
        let parser = MessageParser::new(&config.bot.prefix, console_identity, default_channel)
            .map_err(|e| StartupError::component(core_keys::PARSER, e.to_string()))?;
        add(CoreComponent::Parser(Arc::new(MessageDispatcher::new(parser))));

        let corecmd = Arc::new(CommandService::new(&config.bot.prefix));
        let mut commands = CommandTable::new();
        for entry in corecmd.core_commands() {
            commands.register(entry);
        }
        add(CoreComponent::CoreCmd(corecmd));
        add(CoreComponent::Persist(Arc::new(PersistStore::new())));

        let manager = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            core,
            extra: ModuleRegistry::new(),
            plugins: ModuleRegistry::new(),
            commands: RwLock::new(commands),
            loader,
            load_locks: KeyedLocks::new(),
            phase: Mutex::new(Lifecycle::Starting),
        });

        let mut keys: Vec<&str> = manager.core.keys().copied().collect();
        keys.sort_unstable();
        info!("Core modules loaded: {}", keys.join(", "));

        manager
            .transition(Lifecycle::Starting, Lifecycle::Running)
            .map_err(|e| StartupError::component("lifecycle", e.to_string()))?;
        Ok(manager)
    }

    fn transition(&self, from: Lifecycle, to: Lifecycle) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != from {
            return Err(LifecycleError::InvalidTransition {
                from: phase.to_string(),
                to: to.to_string(),
            });
        }
        *phase = to;
        Ok(())
    }

    pub fn phase(&self) -> Lifecycle {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// False once shutdown has begun
    pub fn enabled(&self) -> bool {
        matches!(self.phase(), Lifecycle::Starting | Lifecycle::Running)
    }

    // ---- core components ----

    /// Core component by key; `None` when absent
    pub fn core(&self, name: &str) -> Option<CoreComponent> {
        self.core.get(name).cloned()
    }

    pub fn config(&self) -> Option<Arc<Config>> {
        match self.core(core_keys::CFG)? {
            CoreComponent::Config(c) => Some(c),
            _ => None,
        }
    }

    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        match self.core(core_keys::CONNECTION)? {
            CoreComponent::Connection(c) => Some(c),
            _ => None,
        }
    }

    pub fn auth(&self) -> Option<Arc<Auth>> {
        match self.core(core_keys::AUTH)? {
            CoreComponent::Auth(a) => Some(a),
            _ => None,
        }
    }

    pub fn communication(&self) -> Option<Arc<Communication>> {
        match self.core(core_keys::COMMUNICATION)? {
            CoreComponent::Communication(c) => Some(c),
            _ => None,
        }
    }

    pub fn recent_data(&self) -> Option<Arc<RecentData>> {
        match self.core(core_keys::RECENTDATA)? {
            CoreComponent::RecentData(r) => Some(r),
            _ => None,
        }
    }

    pub fn task_manager(&self) -> Option<Arc<TaskManager>> {
        match self.core(core_keys::THREADMANAGER)? {
            CoreComponent::ThreadManager(t) => Some(t),
            _ => None,
        }
    }

    pub fn parser(&self) -> Option<Arc<MessageDispatcher>> {
        match self.core(core_keys::PARSER)? {
            CoreComponent::Parser(p) => Some(p),
            _ => None,
        }
    }

    pub fn command_service(&self) -> Option<Arc<CommandService>> {
        match self.core(core_keys::CORECMD)? {
            CoreComponent::CoreCmd(c) => Some(c),
            _ => None,
        }
    }

    pub fn persist(&self) -> Option<Arc<PersistStore>> {
        match self.core(core_keys::PRESIST)? {
            CoreComponent::Persist(p) => Some(p),
            _ => None,
        }
    }

    /// Say something through the communication component
    pub fn say(&self, channel: &str, text: &str) -> Result<(), CommandError> {
        let communication = self
            .communication()
            .ok_or_else(|| CommandError::ExecutionFailed("communication unavailable".to_string()))?;
        communication
            .say(channel, text)
            .map_err(|e| CommandError::ExecutionFailed(e.to_string()))
    }

    // ---- extension modules ----

    /// Loaded extension module by name
    pub fn extra(&self, name: &str) -> Option<Arc<ModuleDescriptor>> {
        self.extra.get(name)
    }

    /// Loaded extension modules in insertion order
    pub fn modules(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.extra.snapshot()
    }

    /// Reserved plugin collection
    pub fn plugins(&self) -> Vec<Arc<ModuleDescriptor>> {
        self.plugins.snapshot()
    }

    /// Consumer view of a module's exported API
    pub fn capabilities(&self, name: &str) -> Option<CapabilityTable> {
        let descriptor = self.extra(name)?;
        Some(
            descriptor
                .api()
                .map(|api| CapabilityTable::from_descriptor(&api))
                .unwrap_or_default(),
        )
    }

    /// Load (or replace) a module through the loader
    pub fn load_module(&self, name: &str) -> Result<(), ModuleError> {
        self.load_locks.with_lock(name, || {
            if !self.enabled() {
                return Err(shutting_down());
            }

            let result = self
                .loader
                .load(name)
                .and_then(|loaded| self.install(name, loaded));
            if let Err(e) = &result {
                error!(module = name, "Load failed: {}", e);
            }
            result
        })
    }

    /// Reload an already-loaded module.
    ///
    /// On any failure the current entry stays exactly as it was.
    pub fn reload(&self, name: &str) -> Result<(), ModuleError> {
        self.load_locks.with_lock(name, || {
            if !self.extra.is_loaded(name) {
                return Err(ModuleError::NotLoaded(name.to_string()));
            }

            let result = self
                .loader
                .reload(name)
                .and_then(|loaded| self.install(name, loaded));
            if let Err(e) = &result {
                warn!(module = name, "Reload failed, keeping previous version: {}", e);
            }
            result
        })
    }

    /// Remove a module with its commands and listeners
    pub fn unload_module(&self, name: &str) -> Result<(), ModuleError> {
        self.load_locks.with_lock(name, || {
            let (descriptor, removed) = {
                let mut table = self.commands.write().unwrap_or_else(PoisonError::into_inner);
                let descriptor = self
                    .extra
                    .remove(name)
                    .ok_or_else(|| ModuleError::NotLoaded(name.to_string()))?;
                (descriptor, table.remove_owned_by(name))
            };
            descriptor.unload();
            info!(module = name, commands = removed, "Unloaded module");
            Ok(())
        })
    }

    /// Start one concurrent load per autoload entry in the config
    pub fn load_configured(&self) -> Vec<JoinHandle<Result<(), ModuleError>>> {
        let (Some(manager), Some(config)) = (self.this.upgrade(), self.config()) else {
            return Vec::new();
        };

        config
            .modules
            .autoload
            .iter()
            .cloned()
            .map(|name| {
                let manager = manager.clone();
                tokio::task::spawn_blocking(move || manager.load_module(&name))
            })
            .collect()
    }

    /// Turn loader output into a registry entry. Caller holds the name lock.
    fn install(&self, name: &str, loaded: LoadedModule) -> Result<(), ModuleError> {
        let LoadedModule { module, source } = loaded;
        if module.name() != name {
            warn!(module = name, reports = module.name(), "Module reports a different name");
        }

        for requirement in module.require() {
            if self.core(&requirement).is_none() {
                return Err(ModuleError::MissingRequirement {
                    name: name.to_string(),
                    requirement,
                });
            }
        }

        let events = self
            .connection()
            .ok_or_else(|| ModuleError::Internal("no connection".to_string()))?
            .events();
        let mut api = ModuleApi::new(events);
        if let Err(e) = module.expose(&mut api) {
            api.unload();
            return Err(ModuleError::Api(e));
        }

        let kind = source.kind();
        let commands = if module.listen().iter().any(|k| k == keywords::CMD) {
            module.commands()
        } else {
            Vec::new()
        };

        // The phase lock keeps shutdown from draining between the check and
        // the insert; the table lock makes the entry and its commands change
        // together
        let previous = {
            let phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if !matches!(*phase, Lifecycle::Starting | Lifecycle::Running) {
                drop(phase);
                api.unload();
                module.shutdown();
                return Err(shutting_down());
            }

            let descriptor = Arc::new(ModuleDescriptor::new(
                name,
                module.clone(),
                source,
                api,
                self.this.clone(),
            ));
            let mut table = self.commands.write().unwrap_or_else(PoisonError::into_inner);
            let previous = self.extra.upsert(descriptor);
            swap_commands(&mut table, name, commands);
            previous
        };

        match previous {
            Some(old) => {
                old.unload();
                info!(module = name, source = kind, "Reloaded module");
            }
            None => {
                info!(module = name, source = kind, "Loaded module");
            }
        }
        Ok(())
    }

    // ---- command table ----

    pub fn command(&self, cmd: &str) -> Option<CommandEntry> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cmd)
            .cloned()
    }

    /// All commands sorted by keyword
    pub fn commands(&self) -> Vec<CommandEntry> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .all()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Add a command outside of any module; last writer wins
    pub fn register_command(&self, entry: CommandEntry) {
        let mut table = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = table.register(entry) {
            warn!(cmd = %previous.cmd, "Command keyword overwritten");
        }
    }

    // ---- shutdown ----

    /// Stop background work, hang up, stop the read loop and retire modules.
    ///
    /// Only valid once, from `Running`.
    pub fn shutdown(&self, message: Option<&str>) -> Result<(), LifecycleError> {
        self.transition(Lifecycle::Running, Lifecycle::ShuttingDown)?;
        info!("Shutting down");

        if let Some(tasks) = self.task_manager() {
            tasks.stop();
        }
        if let Some(connection) = self.connection() {
            connection.quit(message);
        }
        if let Some(parser) = self.parser() {
            parser.stop();
        }
        for descriptor in self.extra.drain().into_iter().chain(self.plugins.drain()) {
            descriptor.unload();
        }

        self.transition(Lifecycle::ShuttingDown, Lifecycle::Stopped)
    }
}

fn shutting_down() -> ModuleError {
    ModuleError::Internal("module manager is shutting down".to_string())
}

fn swap_commands(table: &mut CommandTable, owner: &str, entries: Vec<CommandEntry>) {
    table.remove_owned_by(owner);
    for entry in entries {
        let entry = entry.with_owner(owner);
        let cmd = entry.cmd.clone();
        if let Some(previous) = table.register(entry) {
            warn!(
                cmd = %cmd,
                previous = previous.owner.as_deref().unwrap_or("core"),
                owner,
                "Command keyword overwritten"
            );
        }
    }
}
