//! Module loaders - resolve a module name to live code

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use libloading::{Library, Symbol};

use super::manifest::ModuleManifest;
use crate::application::errors::ModuleError;
use crate::plugins::ExtensionModule;

/// Entry point a native module exports.
///
/// Returns a leaked `Box<Box<dyn ExtensionModule>>`; the loader takes it back
/// with `Box::from_raw`. Native modules must be built with the same
/// toolchain as the bot.
pub type ModuleInitFn = unsafe extern "C" fn() -> *mut Box<dyn ExtensionModule>;

/// Symbol name of [`ModuleInitFn`]
pub const MODULE_INIT_SYMBOL: &[u8] = b"brunobot_module_init";

/// Where a loaded module's code came from
pub enum ModuleSource {
    /// Compiled into the bot
    Builtin,
    /// Shared library; the handle stays open for as long as this value lives
    Native {
        path: PathBuf,
        version: String,
        library: Arc<Library>,
    },
}

impl ModuleSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ModuleSource::Builtin => "builtin",
            ModuleSource::Native { .. } => "native",
        }
    }
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Builtin => write!(f, "Builtin"),
            ModuleSource::Native { path, version, .. } => f
                .debug_struct("Native")
                .field("path", path)
                .field("version", version)
                .finish(),
        }
    }
}

/// What a loader hands back on success
pub struct LoadedModule {
    pub module: Arc<dyn ExtensionModule>,
    pub source: ModuleSource,
}

/// Module loader contract.
///
/// Loaders may be called concurrently for different names; the registry
/// guarantees at most one call in flight per name. Both calls may block.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<LoadedModule, ModuleError>;

    /// Load a fresh copy of a module that is already loaded
    fn reload(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        self.load(name)
    }
}

/// Constructor for a builtin module
pub type ModuleFactory =
    Arc<dyn Fn() -> Result<Arc<dyn ExtensionModule>, ModuleError> + Send + Sync>;

/// Loader backed by a catalog of in-process constructors
#[derive(Default)]
pub struct BuiltinLoader {
    factories: RwLock<HashMap<String, ModuleFactory>>,
}

impl BuiltinLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the modules shipped in `plugins::builtin`
    pub fn with_defaults() -> Self {
        let loader = Self::new();
        crate::plugins::builtin::register_all(&loader);
        loader
    }

    pub fn with_module<F>(self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ExtensionModule>, ModuleError> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn ExtensionModule>, ModuleError> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(factory));
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl ModuleLoader for BuiltinLoader {
    fn load(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        // Clone out so the factory runs without holding the catalog lock
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;

        let module = factory()?;
        tracing::debug!(module = name, "Constructed builtin module");
        Ok(LoadedModule {
            module,
            source: ModuleSource::Builtin,
        })
    }
}

/// Loader for shared-library modules, one directory per module:
/// `<module_dir>/<name>/module.yaml` plus the library it names
pub struct NativeLoader {
    module_dir: PathBuf,
}

impl NativeLoader {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
        }
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, ModuleError> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(ModuleError::load_failed(name, "invalid module name"));
        }
        let dir = self.module_dir.join(name);
        if !dir.is_dir() {
            return Err(ModuleError::NotFound(name.to_string()));
        }
        Ok(dir)
    }
}

impl ModuleLoader for NativeLoader {
    fn load(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        let dir = self.resolve(name)?;

        let manifest_path = dir.join("module.yaml");
        if !manifest_path.exists() {
            return Err(ModuleError::load_failed(
                name,
                format!("missing module.yaml in {}", dir.display()),
            ));
        }
        let manifest = ModuleManifest::from_file(&manifest_path)
            .map_err(|e| ModuleError::load_failed(name, e.to_string()))?;

        let library_path = manifest.library_path(&dir);
        if !library_path.exists() {
            return Err(ModuleError::load_failed(
                name,
                format!("library not found: {}", library_path.display()),
            ));
        }

        let library = unsafe {
            Library::new(&library_path)
                .map_err(|e| ModuleError::load_failed(name, format!("failed to open library: {}", e)))?
        };

        let module: Arc<dyn ExtensionModule> = {
            let init: Symbol<ModuleInitFn> = unsafe {
                library.get(MODULE_INIT_SYMBOL).map_err(|e| {
                    ModuleError::load_failed(name, format!("failed to find init function: {}", e))
                })?
            };
            let raw = unsafe { init() };
            if raw.is_null() {
                return Err(ModuleError::load_failed(name, "module init returned null"));
            }
            let boxed = unsafe { Box::from_raw(raw) };
            Arc::from(*boxed)
        };

        tracing::info!(module = name, version = %manifest.version, "Opened native module");

        Ok(LoadedModule {
            module,
            source: ModuleSource::Native {
                path: library_path,
                version: manifest.version,
                library: Arc::new(library),
            },
        })
    }
}

/// Tries each loader in order; a loader answering `NotFound` passes the
/// name on, any other outcome is final.
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<Arc<dyn ModuleLoader>>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    fn first_found(
        &self,
        name: &str,
        call: impl Fn(&dyn ModuleLoader) -> Result<LoadedModule, ModuleError>,
    ) -> Result<LoadedModule, ModuleError> {
        for loader in &self.loaders {
            match call(loader.as_ref()) {
                Err(ModuleError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(ModuleError::NotFound(name.to_string()))
    }
}

impl ModuleLoader for LoaderChain {
    fn load(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        self.first_found(name, |loader| loader.load(name))
    }

    fn reload(&self, name: &str) -> Result<LoadedModule, ModuleError> {
        self.first_found(name, |loader| loader.reload(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl ExtensionModule for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_builtin_loader_unknown_name() {
        let loader = BuiltinLoader::new();
        assert!(matches!(loader.load("ghost"), Err(ModuleError::NotFound(_))));
    }

    #[test]
    fn test_builtin_loader_constructs_fresh_instances() {
        let loader = BuiltinLoader::new()
            .with_module("a", || Ok(Arc::new(Named("a")) as Arc<dyn ExtensionModule>));

        let first = loader.load("a").unwrap();
        let second = loader.reload("a").unwrap();
        assert_eq!(first.module.name(), "a");
        assert!(!Arc::ptr_eq(&first.module, &second.module));
        assert_eq!(first.source.kind(), "builtin");
    }

    #[test]
    fn test_native_loader_rejects_path_names() {
        let loader = NativeLoader::new("/nonexistent");
        assert!(matches!(loader.load("../etc"), Err(ModuleError::LoadFailed { .. })));
        assert!(matches!(loader.load("weather"), Err(ModuleError::NotFound(_))));
    }

    #[test]
    fn test_chain_falls_through_not_found_only() {
        let failing = BuiltinLoader::new().with_module("b", || {
            Err(ModuleError::load_failed("b", "broken"))
        });
        let working = BuiltinLoader::new()
            .with_module("a", || Ok(Arc::new(Named("a")) as Arc<dyn ExtensionModule>))
            .with_module("b", || Ok(Arc::new(Named("b")) as Arc<dyn ExtensionModule>));

        let chain = LoaderChain::new()
            .with(Arc::new(failing))
            .with(Arc::new(working));

        assert!(chain.load("a").is_ok());
        assert!(matches!(chain.load("b"), Err(ModuleError::LoadFailed { .. })));
        assert!(matches!(chain.load("c"), Err(ModuleError::NotFound(_))));
    }
}
