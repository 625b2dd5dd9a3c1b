//! Module API exposure
//!
//! A module declares functions and constants on its [`ModuleApi`] while it
//! loads. Other modules consume them through a [`CapabilityTable`], a flat
//! name -> capability map, without knowing the exporting module's type.
//! Event listeners attached through [`ModuleApi`] are tracked so that
//! [`ModuleApi::unload`] removes exactly the ones it added.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::application::errors::ApiError;
use crate::domain::traits::{EventSource, Listener, ListenerId};

/// Callable behind an exported function
pub type ApiFn = Arc<dyn Fn(&[Value]) -> Result<Value, ApiError> + Send + Sync>;

/// An exported function with its documentation and formal parameter names
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<String>,
    func: ApiFn,
}

impl FunctionDescriptor {
    pub fn new<F>(name: impl Into<String>, params: &[&str], func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            params: params.iter().map(|p| p.to_string()).collect(),
            func: Arc::new(func),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Call with positional arguments; the count must match `params`
    pub fn call(&self, args: &[Value]) -> Result<Value, ApiError> {
        if args.len() != self.params.len() {
            return Err(ApiError::ArgumentCount {
                name: self.name.clone(),
                expected: self.params.len(),
                got: args.len(),
            });
        }
        (self.func)(args)
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDescriptor {
    pub name: String,
    pub value: Value,
}

/// Everything a module exports, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ApiDescriptor {
    pub functions: Vec<FunctionDescriptor>,
    pub constants: Vec<ConstantDescriptor>,
}

impl ApiDescriptor {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.constants.is_empty()
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn constant_names(&self) -> Vec<&str> {
        self.constants.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Accumulates exports. Names are unique across functions and constants;
/// a repeated name is rejected when declared.
#[derive(Debug, Clone, Default)]
pub struct ApiBuilder {
    api: ApiDescriptor,
}

impl ApiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.api.functions.iter().any(|f| f.name == name)
            || self.api.constants.iter().any(|c| c.name == name)
    }

    fn claim(&self, name: &str) -> Result<(), ApiError> {
        if self.contains(name) {
            return Err(ApiError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub fn function(&mut self, function: FunctionDescriptor) -> Result<&mut Self, ApiError> {
        self.claim(&function.name)?;
        self.api.functions.push(function);
        Ok(self)
    }

    /// Declares each in order; stops at the first duplicate
    pub fn functions(
        &mut self,
        functions: impl IntoIterator<Item = FunctionDescriptor>,
    ) -> Result<&mut Self, ApiError> {
        for function in functions {
            self.function(function)?;
        }
        Ok(self)
    }

    pub fn constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<&mut Self, ApiError> {
        let name = name.into();
        self.claim(&name)?;
        self.api.constants.push(ConstantDescriptor {
            name,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn constants<N, V>(&mut self, constants: impl IntoIterator<Item = (N, V)>) -> Result<&mut Self, ApiError>
    where
        N: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in constants {
            self.constant(name, value)?;
        }
        Ok(self)
    }

    pub fn descriptor(&self) -> &ApiDescriptor {
        &self.api
    }
}

/// A module's API handle: its exports plus the listeners it attached
pub struct ModuleApi {
    events: Arc<dyn EventSource>,
    exports: ApiBuilder,
    listeners: Vec<(String, ListenerId)>,
}

impl ModuleApi {
    pub fn new(events: Arc<dyn EventSource>) -> Self {
        Self {
            events,
            exports: ApiBuilder::new(),
            listeners: Vec::new(),
        }
    }

    pub fn exports(&mut self) -> &mut ApiBuilder {
        &mut self.exports
    }

    /// Attach `listener` to the event source and remember it
    pub fn add_listener(&mut self, event: impl Into<String>, listener: Listener) -> ListenerId {
        let event = event.into();
        let id = self.events.add_listener(&event, listener);
        self.listeners.push((event, id));
        id
    }

    /// Detach a listener this handle attached. Listeners added by anyone
    /// else are left alone and `false` is returned.
    pub fn remove_listener(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(index) = self
            .listeners
            .iter()
            .position(|(e, existing)| e == event && *existing == id)
        else {
            return false;
        };
        self.listeners.remove(index);
        self.events.remove_listener(event, id);
        true
    }

    pub fn listeners(&self) -> &[(String, ListenerId)] {
        &self.listeners
    }

    /// Snapshot of the exports
    pub fn descriptor(&self) -> ApiDescriptor {
        self.exports.descriptor().clone()
    }

    /// Remove every listener this handle attached, then drop all exports
    pub fn unload(&mut self) {
        for (event, id) in self.listeners.drain(..) {
            if !self.events.remove_listener(&event, id) {
                tracing::debug!(event = %event, listener = %id, "Listener already gone");
            }
        }
        self.exports = ApiBuilder::new();
    }
}

/// One entry of a [`CapabilityTable`]
#[derive(Debug, Clone)]
pub enum Capability {
    Function(FunctionDescriptor),
    Constant(Value),
}

/// Flat consumer-side view of another module's exports
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    entries: HashMap<String, Capability>,
}

impl CapabilityTable {
    pub fn from_descriptor(api: &ApiDescriptor) -> Self {
        let mut entries = HashMap::new();
        for function in &api.functions {
            entries.insert(function.name.clone(), Capability::Function(function.clone()));
        }
        for constant in &api.constants {
            entries.insert(constant.name.clone(), Capability::Constant(constant.value.clone()));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDescriptor> {
        match self.entries.get(name)? {
            Capability::Function(f) => Some(f),
            Capability::Constant(_) => None,
        }
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        match self.entries.get(name)? {
            Capability::Constant(v) => Some(v),
            Capability::Function(_) => None,
        }
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ApiError> {
        match self.entries.get(name) {
            Some(Capability::Function(f)) => f.call(args),
            Some(Capability::Constant(_)) => Err(ApiError::NotAFunction(name.to_string())),
            None => Err(ApiError::UnknownCapability(name.to_string())),
        }
    }

    /// Sorted names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
