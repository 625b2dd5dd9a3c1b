//! Extension modules compiled into the bot

pub mod remind;
pub mod seen;
pub mod typofixer;

use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::infrastructure::plugins::BuiltinLoader;
use crate::plugins::ExtensionModule;

/// Add every builtin module to the loader's catalog
pub fn register_all(loader: &BuiltinLoader) {
    loader.register(typofixer::NAME, || {
        let module = typofixer::TypoFixer::new()
            .map_err(|e| ModuleError::load_failed(typofixer::NAME, e.to_string()))?;
        Ok(Arc::new(module) as Arc<dyn ExtensionModule>)
    });
    loader.register(seen::NAME, || Ok(Arc::new(seen::Seen) as Arc<dyn ExtensionModule>));
    loader.register(remind::NAME, || Ok(Arc::new(remind::Remind) as Arc<dyn ExtensionModule>));
}
