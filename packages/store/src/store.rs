//! The store: aggregate state tree, module instances and subscribers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BoxError, Result, StoreError};
use crate::merge;
use crate::module::{ModuleContext, StateModule};
use crate::registry::{Manifest, ModuleEntry, Registry};

/// Module name -> module state.
pub type StateTree = BTreeMap<String, Value>;

type Listener = Arc<dyn Fn(&Arc<StateTree>) -> std::result::Result<(), BoxError> + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

/// Store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Log every dispatch with the previous and next tree.
    #[serde(default)]
    pub log: bool,

    /// Per-module config, keyed by instance name.
    #[serde(default)]
    pub states: BTreeMap<String, Value>,
}

/// Registry + dispatcher owning the aggregate state tree.
///
/// Created once per render on the server, once per application on the
/// client. The tree is only ever replaced, never edited in place: every
/// `dispatch` commits a new `Arc<StateTree>` and then notifies subscribers
/// with exactly that value.
pub struct Store {
    config: StoreConfig,
    state: RwLock<Arc<StateTree>>,
    modules: RwLock<BTreeMap<String, Arc<dyn StateModule>>>,
    listeners: Arc<Listeners>,
    next_listener: AtomicU64,
}

impl Store {
    /// Create a store with an empty tree.
    pub fn new(config: StoreConfig) -> Arc<Self> {
        Self::with_state(config, StateTree::new())
    }

    /// Create a store resuming from an existing tree (e.g. hydration state).
    ///
    /// Modules whose key is already present keep that state on
    /// initialization instead of being reseeded.
    pub fn with_state(config: StoreConfig, state: StateTree) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: RwLock::new(Arc::new(state)),
            modules: RwLock::new(BTreeMap::new()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Build every module in the manifest, in manifest order.
    ///
    /// Stops at the first configuration error.
    pub fn initialize(&self, manifest: &Manifest) -> Result<()> {
        for entry in manifest.entries() {
            self.init_module(manifest.registry(), entry)?;
        }
        Ok(())
    }

    fn init_module(&self, registry: &Registry, entry: &ModuleEntry) -> Result<()> {
        if entry.name.is_empty() {
            return Err(StoreError::MissingModuleName);
        }
        let name = entry.name.as_str();

        let mut config = self
            .config
            .states
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        merge::merge(&mut config, entry.config.clone());
        merge::merge(&mut config, serde_json::json!({ "name": name }));

        if config.get("disabled").and_then(Value::as_bool) == Some(true) {
            debug!(module = name, "store module disabled");
            return Ok(());
        }

        let proto = config
            .get("proto")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();
        let factory = registry
            .resolve(&proto)
            .ok_or_else(|| StoreError::UnknownBlueprint {
                name: name.to_string(),
                proto: proto.clone(),
            })?;

        let ctx = ModuleContext {
            name: name.to_string(),
            proto,
            config,
        };
        let module: Arc<dyn StateModule> = Arc::from(factory(&ctx)?);

        {
            let mut state = write(&self.state);
            if !state.contains_key(name) {
                Arc::make_mut(&mut state).insert(name.to_string(), module.init_state());
            }
        }
        write(&self.modules).insert(name.to_string(), module);

        debug!(module = name, proto = %ctx.proto, "store module initialized");
        Ok(())
    }

    /// Replace the tree and notify subscribers.
    ///
    /// Subscribers are called in subscription order with the committed tree.
    /// The subscriber list is snapshotted first: subscribers added during the
    /// pass are not called, and unsubscribing mid-pass is safe. The first
    /// failing subscriber ends the pass and its error is returned.
    pub fn dispatch(&self, update: impl Into<Arc<StateTree>>, description: &str) -> Result<()> {
        let next = update.into();
        let prev = {
            let mut state = write(&self.state);
            std::mem::replace(&mut *state, Arc::clone(&next))
        };
        self.notify(&prev, &next, description)
    }

    /// Replace one module's entry with `f(current entry)` and dispatch.
    ///
    /// `f` runs without any store lock held, so it may read the store. If
    /// another dispatch commits first, `f` runs again against the newer
    /// tree; concurrent updates to different modules do not lose each other.
    pub fn update<F>(&self, name: &str, description: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Value,
    {
        loop {
            let base = self.get_state();
            let current = base.get(name).cloned().unwrap_or(Value::Null);
            let value = f(&current);

            let (prev, next) = {
                let mut state = write(&self.state);
                if !Arc::ptr_eq(&state, &base) {
                    continue;
                }
                let mut tree = StateTree::clone(&state);
                tree.insert(name.to_string(), value);
                let next = Arc::new(tree);
                let prev = std::mem::replace(&mut *state, Arc::clone(&next));
                (prev, next)
            };
            return self.notify(&prev, &next, description);
        }
    }

    fn notify(&self, prev: &Arc<StateTree>, next: &Arc<StateTree>, description: &str) -> Result<()> {
        if self.config.log {
            debug!(description, prev = ?prev, next = ?next, "store.dispatch");
        }

        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(next).map_err(StoreError::Subscriber)?;
        }
        Ok(())
    }

    /// Register a callback for tree changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<StateTree>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// The tree committed by the latest dispatch.
    pub fn get_state(&self) -> Arc<StateTree> {
        Arc::clone(&read(&self.state))
    }

    /// The tree as a JSON object, for serialization into a response.
    pub fn snapshot(&self) -> Value {
        let state = self.get_state();
        Value::Object(
            state
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// A live module instance.
    pub fn get(&self, name: &str) -> Result<Arc<dyn StateModule>> {
        read(&self.modules)
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::ModuleNotRegistered(name.to_string()))
    }

    /// A live module instance of a known concrete type.
    pub fn module<T: StateModule>(&self, name: &str) -> Result<Arc<T>> {
        self.get(name)?
            .into_any_arc()
            .downcast::<T>()
            .map_err(|_| StoreError::ModuleTypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Names of the initialized modules, sorted.
    pub fn module_names(&self) -> Vec<String> {
        read(&self.modules).keys().cloned().collect()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("modules", &self.module_names())
            .field("state", &self.get_state())
            .finish()
    }
}

/// Handle returned by `Store::subscribe`.
///
/// Dropping it keeps the subscription alive; call `unsubscribe` to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Remove the callback. A no-op if the store is gone.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

// A panicking subscriber must not wedge the store for the rest of the request.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
