//! The state module contract.

use std::any::Any;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Downcasting support for module instances.
///
/// Implemented for every `'static` type, so module authors never write it.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A unit of isolated application state.
///
/// Every enabled module contributes exactly one top-level key to the
/// aggregate tree, keyed by its instance name. Modules are free to expose
/// domain methods that dispatch through the `Store`.
pub trait StateModule: AsAny {
    /// The module's initial state. Must not have side effects.
    fn init_state(&self) -> Value;
}

/// What a blueprint factory receives when building a module instance.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Instance name; the key of this module in the state tree.
    pub name: String,

    /// Blueprint id the instance was built from.
    pub proto: String,

    /// Effective config: global per-module config merged with call-site
    /// overrides. Always carries `name`.
    pub config: Value,
}

impl ModuleContext {
    /// Deserialize the effective config into a typed settings struct.
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.config.clone()).map_err(|e| StoreError::InvalidConfig {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Limits {
        name: String,
        #[serde(default)]
        page_size: u32,
    }

    #[test]
    fn settings_deserialize_from_config() {
        let ctx = ModuleContext {
            name: "articles".to_string(),
            proto: "articles".to_string(),
            config: json!({"name": "articles", "page_size": 20}),
        };
        let limits: Limits = ctx.settings().unwrap();
        assert_eq!(
            limits,
            Limits {
                name: "articles".to_string(),
                page_size: 20
            }
        );
    }

    #[test]
    fn bad_settings_are_invalid_config() {
        let ctx = ModuleContext {
            name: "articles".to_string(),
            proto: "articles".to_string(),
            config: json!({"name": 5}),
        };
        let err = ctx.settings::<Limits>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig { ref name, .. } if name == "articles"));
    }

    #[test]
    fn as_any_downcasts_to_concrete_type() {
        struct Flag;
        impl StateModule for Flag {
            fn init_state(&self) -> Value {
                Value::Bool(false)
            }
        }

        let module: Arc<dyn StateModule> = Arc::new(Flag);
        assert!((*module).as_any().downcast_ref::<Flag>().is_some());
        assert!(module.into_any_arc().downcast::<Flag>().is_ok());
    }
}
