//! Application state store.
//!
//! The store owns one aggregate state tree built from independently
//! initialized state modules:
//! - `StateModule`: a unit of state with an initializer
//! - `Registry`: blueprint id -> module factory
//! - `Manifest`: the ordered list of module instances to build
//! - `Store`: the tree, the module instances and the subscriber list
//!
//! The tree is replaced wholesale on every `dispatch`; each version is an
//! immutable `Arc<StateTree>`.
//!
//! # Example
//!
//! ```rust
//! use prerender_store::{Manifest, ModuleContext, Registry, StateModule, Store, StoreConfig};
//! use serde_json::{json, Value};
//!
//! struct Counter;
//!
//! impl StateModule for Counter {
//!     fn init_state(&self) -> Value {
//!         json!({"count": 0})
//!     }
//! }
//!
//! let registry = Registry::new().register("counter", |_ctx: &ModuleContext| Ok(Counter));
//! let manifest = Manifest::from_registry(registry);
//!
//! let store = Store::new(StoreConfig::default());
//! store.initialize(&manifest).unwrap();
//! assert_eq!(store.get_state()["counter"], json!({"count": 0}));
//! ```

mod error;
pub mod merge;
mod module;
mod registry;
mod store;

pub use error::{BoxError, Result, StoreError};
pub use module::{AsAny, ModuleContext, StateModule};
pub use registry::{Manifest, ModuleEntry, ModuleFactory, Registry};
pub use store::{StateTree, Store, StoreConfig, Subscription};
