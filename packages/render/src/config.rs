//! Render configuration.
//!
//! Loaded once at process start and shared read-only by every worker. Each
//! worker derives its own copy with the request's overrides merged in, so no
//! request can affect another's configuration.
//!
//! ```json
//! {
//!   "store": {"log": false, "states": {"session": {"token_key": "token"}}},
//!   "navigation": {"basename": "/"},
//!   "api": {"base_url": "http://localhost:8010/api/v1/", "timeout_ms": 30000},
//!   "render": {"mount_marker": "<div id=\"app\">", "hydration": "key", "max_passes": 8}
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use prerender_store::{merge, StoreConfig};

use crate::error::ConfigError;
use crate::request::RenderRequest;
use crate::template::DEFAULT_MOUNT_MARKER;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub navigation: NavigationConfig,
    pub api: ApiConfig,
    pub render: RenderSettings,

    /// Request parameters, echoed in by the worker for the app to read.
    pub ssr: Value,
}

impl Config {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// A copy with `overrides` deep-merged over this config.
    pub fn with_overrides(&self, overrides: Value) -> Result<Self, ConfigError> {
        if !overrides.is_object() {
            return Err(ConfigError::OverridesNotObject);
        }
        let mut value = serde_json::to_value(self)?;
        merge::merge(&mut value, overrides);
        Ok(serde_json::from_value(value)?)
    }

    /// The config one render request runs with.
    ///
    /// Request overrides apply first; then navigation is pointed at the
    /// request URL and the request itself is recorded under `ssr`.
    pub fn for_request(&self, request: &RenderRequest) -> Result<Self, ConfigError> {
        if !request.overrides.is_object() {
            return Err(ConfigError::OverridesNotObject);
        }
        let mut overrides = request.overrides.clone();
        merge::merge(
            &mut overrides,
            json!({
                "navigation": {"initial_entries": [request.url]},
                "ssr": serde_json::to_value(request)?,
            }),
        );
        self.with_overrides(overrides)
    }
}

/// Navigation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Path prefix the application is mounted under.
    pub basename: String,

    /// History entries; the last one is the current location.
    pub initial_entries: Vec<String>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            basename: "/".to_string(),
            initial_entries: vec!["/".to_string()],
        }
    }
}

/// API client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8010/api/v1/".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// How the hydration state reaches the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationMode {
    /// Emit only a state key; the host serves the state separately.
    #[default]
    Key,
    /// Embed the serialized state in the document.
    Inline,
}

/// Worker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Opening tag of the element the app mounts into. The shared template
    /// is re-parsed around it when it differs from the one it was parsed with.
    pub mount_marker: String,
    pub hydration: HydrationMode,

    /// Render passes allowed before the prepare phase counts as unsettled.
    pub max_passes: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mount_marker: DEFAULT_MOUNT_MARKER.to_string(),
            hydration: HydrationMode::default(),
            max_passes: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_object_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.render.max_passes, 8);
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"store": {"log": true, "states": {"modals": {"disabled": true}}},
                "render": {"hydration": "inline"}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.store.log);
        assert_eq!(config.store.states["modals"], json!({"disabled": true}));
        assert_eq!(config.render.hydration, HydrationMode::Inline);
        assert_eq!(config.navigation.basename, "/");
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/prerender.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn overrides_merge_deeply() {
        let mut base = Config::default();
        base.store
            .states
            .insert("session".to_string(), json!({"token_key": "token"}));

        let config = base
            .with_overrides(json!({"store": {"states": {"session": {"disabled": true}}}}))
            .unwrap();
        assert_eq!(
            config.store.states["session"],
            json!({"token_key": "token", "disabled": true})
        );
        // The shared base is untouched.
        assert_eq!(base.store.states["session"], json!({"token_key": "token"}));
    }

    #[test]
    fn overrides_must_be_an_object() {
        assert!(matches!(
            Config::default().with_overrides(json!([1, 2])),
            Err(ConfigError::OverridesNotObject)
        ));
    }

    #[test]
    fn for_request_points_navigation_at_url() {
        let request = RenderRequest::new("/news?page=2");
        let config = Config::default().for_request(&request).unwrap();
        assert_eq!(config.navigation.initial_entries, vec!["/news?page=2"]);
        assert_eq!(config.ssr["url"], json!("/news?page=2"));
    }

    #[test]
    fn for_request_rejects_non_object_overrides() {
        let request = RenderRequest::new("/").with_overrides(json!([1, 2]));
        assert!(matches!(
            Config::default().for_request(&request),
            Err(ConfigError::OverridesNotObject)
        ));
    }
}
