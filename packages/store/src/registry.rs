//! Blueprint registry and module manifest.
//!
//! A `Registry` maps blueprint ids to factories. A `Manifest` is the ordered
//! list of module instances a store builds, each naming a blueprint either
//! explicitly (`proto` in its config) or implicitly (by its own name).
//!
//! Both are immutable once built and cheap to clone, so one manifest can be
//! shared by every store in the process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::module::{ModuleContext, StateModule};

/// Builds a module instance from its effective config.
pub type ModuleFactory =
    Arc<dyn Fn(&ModuleContext) -> Result<Box<dyn StateModule>> + Send + Sync>;

/// Blueprint id -> factory table.
#[derive(Clone, Default)]
pub struct Registry {
    blueprints: BTreeMap<String, ModuleFactory>,
    /// Ids in first-registration order.
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blueprint.
    ///
    /// Registering the same id twice replaces the earlier factory and keeps
    /// its original position.
    pub fn register<M, F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        M: StateModule,
        F: Fn(&ModuleContext) -> Result<M> + Send + Sync + 'static,
    {
        let factory: ModuleFactory =
            Arc::new(move |ctx| factory(ctx).map(|m| Box::new(m) as Box<dyn StateModule>));
        let id = id.into();
        if self.blueprints.insert(id.clone(), factory).is_none() {
            self.order.push(id);
        }
        self
    }

    /// Look up a blueprint by id.
    pub fn resolve(&self, id: &str) -> Option<&ModuleFactory> {
        self.blueprints.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blueprints.contains_key(id)
    }

    /// Registered blueprint ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}

/// One module instance in a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEntry {
    /// Instance name.
    pub name: String,

    /// Call-site config, merged over the store's per-module config.
    pub config: Value,
}

impl ModuleEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Value::Object(Map::new()),
        }
    }

    pub fn with_config(name: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// The fixed, ordered list of modules a store initializes.
///
/// Order matters: a module may rely on modules listed before it having
/// already been initialized.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    registry: Registry,
    entries: Vec<ModuleEntry>,
}

impl Manifest {
    /// An empty manifest over the given registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            entries: Vec::new(),
        }
    }

    /// One entry per blueprint, named after it, in registration order.
    pub fn from_registry(registry: Registry) -> Self {
        let entries = registry.ids().map(ModuleEntry::new).collect();
        Self { registry, entries }
    }

    /// Append an instance built from the blueprint of the same name (or the
    /// `proto` set for it in store config).
    pub fn with_module(mut self, name: impl Into<String>) -> Self {
        self.entries.push(ModuleEntry::new(name));
        self
    }

    /// Append an instance with call-site config.
    pub fn with_configured_module(mut self, name: impl Into<String>, config: Value) -> Self {
        self.entries.push(ModuleEntry::with_config(name, config));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }
}
