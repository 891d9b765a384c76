//! Error types for the store.

use thiserror::Error;

/// Boxed error returned by subscribers and module collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the store and its module registry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A manifest entry has an empty module name.
    #[error("undefined store module name")]
    MissingModuleName,

    /// No blueprint is registered under the resolved id.
    #[error("unknown blueprint \"{proto}\" for store module \"{name}\"")]
    UnknownBlueprint { name: String, proto: String },

    /// The module was never initialized (or is disabled).
    #[error("store module not registered: {0}")]
    ModuleNotRegistered(String),

    /// The module exists but is not of the requested type.
    #[error("store module \"{name}\" is not a {expected}")]
    ModuleTypeMismatch { name: String, expected: &'static str },

    /// The effective module config could not be interpreted.
    #[error("invalid config for store module \"{name}\": {message}")]
    InvalidConfig { name: String, message: String },

    /// A subscriber failed while being notified of a new tree.
    #[error("subscriber failed: {0}")]
    Subscriber(#[source] BoxError),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
