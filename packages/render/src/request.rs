//! What a host hands a worker, and what it gets back.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RenderError;

/// Input to one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Location to render, e.g. `/news/42?tab=comments`.
    pub url: String,

    /// JSON object deep-merged over the configuration for this render only.
    #[serde(default = "empty_object")]
    pub overrides: Value,

    /// Key the host will serve the hydration state under. Generated when
    /// absent.
    #[serde(default, rename = "stateKey", skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            overrides: empty_object(),
            state_key: None,
        }
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = Some(key.into());
        self
    }
}

/// Output of one render.
///
/// On success `out` is the full document and `state`, `keys` and `html` are
/// set. On failure `out` is a short `ERROR: ...` description, status is 500,
/// and nothing else is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEnvelope {
    pub out: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,

    /// Prepare operations that ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,

    pub status: u16,

    /// The app markup alone, without the document shell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(default, rename = "stateKey", skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

impl RenderEnvelope {
    pub fn success(document: String, output: RenderOutput) -> Self {
        Self {
            out: document,
            state: Some(output.state),
            keys: Some(output.keys),
            status: StatusCode::OK.as_u16(),
            html: Some(output.markup),
            state_key: Some(output.state_key),
        }
    }

    pub fn failure(error: &RenderError) -> Self {
        Self {
            out: format!("ERROR: {}", error),
            state: None,
            keys: None,
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            html: None,
            state_key: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_success(&self) -> bool {
        self.status_code().is_success()
    }
}

/// What a finished render pass produced, before composition.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub markup: String,
    pub keys: Vec<String>,
    pub state: Value,
    pub state_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_from_host_json() {
        let request: RenderRequest =
            serde_json::from_value(json!({"url": "/about", "stateKey": "k1"})).unwrap();
        assert_eq!(request.url, "/about");
        assert_eq!(request.overrides, json!({}));
        assert_eq!(request.state_key.as_deref(), Some("k1"));
    }

    #[test]
    fn failure_envelope_has_no_success_fields() {
        let envelope = RenderEnvelope::failure(&RenderError::Unsettled(8));
        assert_eq!(envelope.status, 500);
        assert!(!envelope.is_success());
        assert!(envelope.out.starts_with("ERROR: "));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "out": "ERROR: prepare phase did not settle after 8 render passes",
                "status": 500
            })
        );
    }

    #[test]
    fn success_envelope_uses_host_field_names() {
        let envelope = RenderEnvelope::success(
            "<html></html>".to_string(),
            RenderOutput {
                markup: "<p>hi</p>".to_string(),
                keys: vec!["articles".to_string()],
                state: json!({"session": {}}),
                state_key: "k1".to_string(),
            },
        );
        assert!(envelope.is_success());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "out": "<html></html>",
                "state": {"session": {}},
                "keys": ["articles"],
                "status": 200,
                "html": "<p>hi</p>",
                "stateKey": "k1"
            })
        );
    }
}
