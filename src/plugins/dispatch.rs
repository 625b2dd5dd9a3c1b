//! Capability queries over the loaded extension modules

use std::sync::Arc;

use super::manager::ModuleManager;
use super::trait_def::ModuleDescriptor;
use crate::domain::entities::keywords;

/// A module given either as a resolved descriptor or by name
#[derive(Debug, Clone, Copy)]
pub enum ModuleRef<'a> {
    Descriptor(&'a ModuleDescriptor),
    Name(&'a str),
}

impl<'a> From<&'a ModuleDescriptor> for ModuleRef<'a> {
    fn from(descriptor: &'a ModuleDescriptor) -> Self {
        ModuleRef::Descriptor(descriptor)
    }
}

impl<'a> From<&'a Arc<ModuleDescriptor>> for ModuleRef<'a> {
    fn from(descriptor: &'a Arc<ModuleDescriptor>) -> Self {
        ModuleRef::Descriptor(descriptor.as_ref())
    }
}

impl<'a> From<&'a str> for ModuleRef<'a> {
    fn from(name: &'a str) -> Self {
        ModuleRef::Name(name)
    }
}

impl ModuleManager {
    /// Does the module listen to `keyword`? Unknown names answer `false`.
    pub fn is_listening<'a>(&self, module: impl Into<ModuleRef<'a>>, keyword: &str) -> bool {
        match module.into() {
            ModuleRef::Descriptor(descriptor) => descriptor.listens_to(keyword),
            ModuleRef::Name(name) => self
                .extra(name)
                .map(|descriptor| descriptor.listens_to(keyword))
                .unwrap_or(false),
        }
    }

    /// Shorthand for listening to `cmd`
    pub fn is_cmd<'a>(&self, module: impl Into<ModuleRef<'a>>) -> bool {
        self.is_listening(module, keywords::CMD)
    }

    /// Does the module require `keyword`? Only resolved descriptors can
    /// answer; a bare name is `false`.
    pub fn requires<'a>(&self, module: impl Into<ModuleRef<'a>>, keyword: &str) -> bool {
        match module.into() {
            ModuleRef::Descriptor(descriptor) => descriptor.requires(keyword),
            ModuleRef::Name(_) => false,
        }
    }

    /// Every loaded module listening to `keyword`, in load order
    pub fn listening(&self, keyword: &str) -> Vec<Arc<ModuleDescriptor>> {
        self.modules()
            .into_iter()
            .filter(|descriptor| descriptor.listens_to(keyword))
            .collect()
    }
}
