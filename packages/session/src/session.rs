//! The session store module.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use prerender_store::{merge, ModuleContext, StateModule, Store};

use crate::api::ApiClient;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::identity::IdentityService;

/// Collaborators a session operation needs.
///
/// Supplied by whoever owns the execution context; a server render builds
/// one bundle per request.
pub trait SessionContext: Send + Sync {
    fn store(&self) -> &Store;
    fn identity(&self) -> &dyn IdentityService;
    fn api(&self) -> &ApiClient;

    /// Credential persistence. `None` outside interactive contexts.
    fn credentials(&self) -> Option<&dyn CredentialStore>;
}

/// The session entry of the state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub exists: bool,
}

impl Session {
    /// State before restoration has run.
    pub fn unknown() -> Self {
        Self {
            user: Value::Object(Map::new()),
            token: None,
            wait: true,
            exists: false,
        }
    }

    /// State after the session has been cleared.
    pub fn anonymous() -> Self {
        Self {
            wait: false,
            ..Self::unknown()
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "user": self.user,
            "token": self.token,
            "wait": self.wait,
            "exists": self.exists,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.wait, self.exists, self.token.is_some()) {
            (false, true, true) if has_user(&self.user) => SessionPhase::Authenticated,
            (true, false, true) => SessionPhase::Restoring,
            (true, false, false) => SessionPhase::Unknown,
            (false, false, false) => SessionPhase::Anonymous,
            _ => SessionPhase::Inconsistent,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unknown()
    }
}

fn has_user(user: &Value) -> bool {
    match user {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Where a session is in its restoration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Restoration has not run yet.
    Unknown,
    /// A credential was found and is being checked.
    Restoring,
    /// The credential is valid and the user is known.
    Authenticated,
    /// No valid credential.
    Anonymous,
    /// A combination of flags no transition produces.
    Inconsistent,
}

/// What `save` records: a credential plus any state fields to set with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub token: String,
    pub user: Option<Value>,
    pub wait: Option<bool>,
    pub exists: Option<bool>,
}

impl SessionPatch {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn with_exists(mut self, exists: bool) -> Self {
        self.exists = Some(exists);
        self
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("token".to_string(), Value::String(self.token.clone()));
        if let Some(user) = &self.user {
            map.insert("user".to_string(), user.clone());
        }
        if let Some(wait) = self.wait {
            map.insert("wait".to_string(), Value::Bool(wait));
        }
        if let Some(exists) = self.exists {
            map.insert("exists".to_string(), Value::Bool(exists));
        }
        Value::Object(map)
    }
}

/// Session module settings, read from the module's effective config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSettings {
    pub name: String,

    /// Key the credential is persisted under.
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

fn default_token_key() -> String {
    "token".to_string()
}

/// The session state module.
#[derive(Debug, Clone)]
pub struct SessionState {
    settings: SessionSettings,
}

impl SessionState {
    /// Blueprint factory.
    pub fn build(ctx: &ModuleContext) -> prerender_store::Result<Self> {
        Ok(Self {
            settings: ctx.settings()?,
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// This module's entry of the current tree.
    pub fn current(&self, store: &Store) -> Session {
        store
            .get_state()
            .get(self.name())
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Restore the session from a persisted credential.
    ///
    /// With a credential: record it (`Restoring`), then ask the identity
    /// service who it belongs to. On success the session is `Authenticated`.
    /// On failure the session is cleared without a logout call, since the
    /// credential was already invalid, and the original error is returned.
    ///
    /// Without a credential (or without credential persistence) the session
    /// is cleared, again without a logout call.
    pub async fn remind(&self, cx: &dyn SessionContext) -> Result<()> {
        let token = match cx.credentials() {
            Some(credentials) => credentials.get(&self.settings.token_key)?,
            None => None,
        };

        let Some(token) = token else {
            debug!(module = self.name(), "no persisted credential");
            return self.clear(cx, false).await;
        };

        self.save(
            cx,
            SessionPatch::new(token.clone())
                .with_wait(true)
                .with_exists(false),
        )
        .await?;

        match cx.identity().current().await {
            Ok(user) => {
                self.save(
                    cx,
                    SessionPatch::new(token)
                        .with_user(user)
                        .with_wait(false)
                        .with_exists(true),
                )
                .await?;
                info!(module = self.name(), "session restored");
                Ok(())
            }
            Err(error) => {
                warn!(module = self.name(), %error, "session restoration failed");
                if let Err(clear_error) = self.clear(cx, false).await {
                    warn!(module = self.name(), error = %clear_error, "clearing rejected session failed");
                }
                Err(error.into())
            }
        }
    }

    /// Drop the session.
    ///
    /// With `logout_request`, the identity service is told first. That call
    /// is best-effort: its failure is logged and the local state is cleared
    /// regardless.
    pub async fn clear(&self, cx: &dyn SessionContext, logout_request: bool) -> Result<()> {
        if logout_request {
            if let Err(error) = cx.identity().logout().await {
                warn!(module = self.name(), %error, "logout request failed");
            }
        }
        if let Some(credentials) = cx.credentials() {
            credentials.remove(&self.settings.token_key)?;
        }
        cx.store().update(self.name(), "session.clear", |_| {
            Session::anonymous().to_value()
        })?;
        cx.api().set_token(None);
        Ok(())
    }

    /// Record a credential and the state that goes with it.
    ///
    /// The patch is applied over `{exists: true}` and the current entry.
    pub async fn save(&self, cx: &dyn SessionContext, patch: SessionPatch) -> Result<()> {
        if let Some(credentials) = cx.credentials() {
            credentials.set(&self.settings.token_key, &patch.token)?;
        }
        let update = merge::update(&json!({ "exists": true }), patch.to_value());
        cx.store()
            .update(self.name(), "session.save", |prev| merge::update(prev, update.clone()))?;
        cx.api().set_token(Some(patch.token));
        Ok(())
    }

    /// Sign in with login and password, then save the returned credential.
    pub async fn login(&self, cx: &dyn SessionContext, login: &str, password: &str) -> Result<()> {
        let signed = cx.identity().sign_in(login, password).await?;
        self.save(
            cx,
            SessionPatch::new(signed.token)
                .with_user(signed.user)
                .with_wait(false)
                .with_exists(true),
        )
        .await?;
        info!(module = self.name(), "signed in");
        Ok(())
    }
}

impl StateModule for SessionState {
    fn init_state(&self) -> Value {
        Session::unknown().to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases() {
        assert_eq!(Session::unknown().phase(), SessionPhase::Unknown);
        assert_eq!(Session::anonymous().phase(), SessionPhase::Anonymous);

        let restoring = Session {
            token: Some("t".to_string()),
            ..Session::unknown()
        };
        assert_eq!(restoring.phase(), SessionPhase::Restoring);

        let authenticated = Session {
            user: json!({"_id": "u1"}),
            token: Some("t".to_string()),
            wait: false,
            exists: true,
        };
        assert_eq!(authenticated.phase(), SessionPhase::Authenticated);

        let no_user = Session {
            user: json!({}),
            ..authenticated
        };
        assert_eq!(no_user.phase(), SessionPhase::Inconsistent);
    }

    #[test]
    fn init_state_is_unknown() {
        let ctx = ModuleContext {
            name: "session".to_string(),
            proto: "session".to_string(),
            config: json!({"name": "session"}),
        };
        let module = SessionState::build(&ctx).unwrap();
        assert_eq!(module.settings().token_key, "token");
        assert_eq!(
            module.init_state(),
            json!({"user": {}, "token": null, "wait": true, "exists": false})
        );
    }

    #[test]
    fn token_key_from_config() {
        let ctx = ModuleContext {
            name: "admin".to_string(),
            proto: "session".to_string(),
            config: json!({"name": "admin", "token_key": "admin-token"}),
        };
        let module = SessionState::build(&ctx).unwrap();
        assert_eq!(module.name(), "admin");
        assert_eq!(module.settings().token_key, "admin-token");
    }

    #[test]
    fn patch_only_sets_given_fields() {
        let patch = SessionPatch::new("t").with_wait(true);
        assert_eq!(patch.to_value(), json!({"token": "t", "wait": true}));
    }
}
