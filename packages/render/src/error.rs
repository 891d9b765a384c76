//! Error types for rendering.

use std::time::Duration;

use prerender_session::IdentityError;
use prerender_store::{BoxError, StoreError};
use thiserror::Error;

/// Configuration could not be loaded or merged.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config overrides must be a JSON object")]
    OverridesNotObject,
}

/// The document shell is unusable.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template anchor not found: {0}")]
    MissingAnchor(String),

    #[error("template anchor {0} appears out of order")]
    Misordered(String),

    #[error("template I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The asset manifest could not be loaded.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset manifest I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that can fail a render.
///
/// Every variant ends up as a 500 envelope; none escapes the worker.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("api client error: {0}")]
    Api(#[from] IdentityError),

    #[error("invalid location {url:?}: {source}")]
    Location {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("render failed: {0}")]
    App(#[source] BoxError),

    #[error("prepare \"{key}\" failed: {source}")]
    Prepare {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("prepare phase did not settle after {0} render passes")]
    Unsettled(usize),

    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("render worker panicked: {0}")]
    Panicked(String),

    #[error("render worker unavailable")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, RenderError>;
