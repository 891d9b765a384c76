use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use prerender_session::{
    ApiClient, CredentialStore, IdentityError, IdentityService, MemoryCredentials, Session,
    SessionContext, SessionError, SessionPatch, SessionPhase, SessionState, SignIn,
};
use prerender_store::{Manifest, ModuleContext, Registry, Store, StoreConfig};

/// Identity service with scripted answers and call counters.
#[derive(Default)]
struct ScriptedIdentity {
    user: Option<Value>,
    logout_fails: bool,
    current_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl ScriptedIdentity {
    fn accepting(user: Value) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    fn rejecting() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityService for ScriptedIdentity {
    async fn current(&self) -> Result<Value, IdentityError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.user.clone().ok_or(IdentityError::Status {
            status: 403,
            message: "token expired".to_string(),
        })
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails {
            Err(IdentityError::Rejected("service unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    async fn sign_in(&self, login: &str, password: &str) -> Result<SignIn, IdentityError> {
        if password == "secret" {
            Ok(SignIn {
                token: format!("token-{}", login),
                user: json!({"login": login}),
            })
        } else {
            Err(IdentityError::Rejected("wrong password".to_string()))
        }
    }
}

struct TestContext {
    store: Arc<Store>,
    identity: ScriptedIdentity,
    api: ApiClient,
    credentials: Option<MemoryCredentials>,
}

impl SessionContext for TestContext {
    fn store(&self) -> &Store {
        &self.store
    }

    fn identity(&self) -> &dyn IdentityService {
        &self.identity
    }

    fn api(&self) -> &ApiClient {
        &self.api
    }

    fn credentials(&self) -> Option<&dyn CredentialStore> {
        self.credentials
            .as_ref()
            .map(|c| c as &dyn CredentialStore)
    }
}

fn context(identity: ScriptedIdentity, credentials: Option<MemoryCredentials>) -> TestContext {
    let registry = Registry::new().register("session", SessionState::build);
    let store = Store::new(StoreConfig::default());
    store.initialize(&Manifest::from_registry(registry)).unwrap();

    TestContext {
        store,
        identity,
        api: ApiClient::with_default_timeout("http://127.0.0.1:9/api/v1/").unwrap(),
        credentials,
    }
}

fn session(cx: &TestContext) -> (Arc<SessionState>, Session) {
    let module = cx.store.module::<SessionState>("session").unwrap();
    let current = module.current(&cx.store);
    (module, current)
}

#[tokio::test]
async fn remind_without_credential_is_anonymous() {
    let cx = context(ScriptedIdentity::accepting(json!({"_id": "u1"})), Some(MemoryCredentials::new()));
    let (module, before) = session(&cx);
    assert_eq!(before.phase(), SessionPhase::Unknown);

    module.remind(&cx).await.unwrap();

    let after = module.current(&cx.store);
    assert_eq!(after, Session::anonymous());
    assert!(!after.exists);
    assert!(!after.wait);
    assert_eq!(after.token, None);
    assert_eq!(cx.identity.logout_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cx.identity.current_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remind_in_server_context_skips_persistence() {
    let cx = context(ScriptedIdentity::accepting(json!({"_id": "u1"})), None);
    let (module, _) = session(&cx);

    module.remind(&cx).await.unwrap();

    assert_eq!(module.current(&cx.store).phase(), SessionPhase::Anonymous);
    assert_eq!(cx.identity.current_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cx.identity.logout_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remind_with_accepted_credential_authenticates() {
    let user = json!({"_id": "u1", "email": "a@example.com"});
    let cx = context(
        ScriptedIdentity::accepting(user.clone()),
        Some(MemoryCredentials::with_entry("token", "abc")),
    );
    let (module, _) = session(&cx);

    module.remind(&cx).await.unwrap();

    let after = module.current(&cx.store);
    assert_eq!(after.phase(), SessionPhase::Authenticated);
    assert_eq!(after.user, user);
    assert_eq!(after.token.as_deref(), Some("abc"));
    assert!(!after.wait);
    assert!(after.exists);
    assert_eq!(cx.api.token().as_deref(), Some("abc"));
}

#[tokio::test]
async fn remind_passes_through_restoring() {
    let cx = context(
        ScriptedIdentity::accepting(json!({"_id": "u1"})),
        Some(MemoryCredentials::with_entry("token", "abc")),
    );
    let (module, _) = session(&cx);

    let phases = Arc::new(Mutex::new(Vec::new()));
    {
        let phases = Arc::clone(&phases);
        let _ = cx.store.subscribe(move |tree| {
            let session: Session = serde_json::from_value(tree["session"].clone())?;
            phases.lock().unwrap().push(session.phase());
            Ok(())
        });
    }

    module.remind(&cx).await.unwrap();

    assert_eq!(
        *phases.lock().unwrap(),
        vec![SessionPhase::Restoring, SessionPhase::Authenticated]
    );
}

#[tokio::test]
async fn remind_with_rejected_credential_clears_and_reraises() {
    let cx = context(
        ScriptedIdentity::rejecting(),
        Some(MemoryCredentials::with_entry("token", "stale")),
    );
    let (module, _) = session(&cx);

    let err = module.remind(&cx).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Identity(IdentityError::Status { status: 403, .. })
    ));

    let after = module.current(&cx.store);
    assert_eq!(after.phase(), SessionPhase::Anonymous);
    assert_eq!(after.token, None);
    assert_eq!(cx.identity.logout_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cx.api.token(), None);
    let credentials = cx.credentials.as_ref().unwrap();
    assert_eq!(credentials.get("token").unwrap(), None);
}

#[tokio::test]
async fn clear_with_logout_request_notifies_service() {
    let cx = context(
        ScriptedIdentity::accepting(json!({"_id": "u1"})),
        Some(MemoryCredentials::with_entry("token", "abc")),
    );
    let (module, _) = session(&cx);
    module.remind(&cx).await.unwrap();

    module.clear(&cx, true).await.unwrap();

    assert_eq!(cx.identity.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(module.current(&cx.store), Session::anonymous());
    assert_eq!(cx.api.token(), None);
}

#[tokio::test]
async fn failed_logout_still_clears_locally() {
    let identity = ScriptedIdentity {
        user: Some(json!({"_id": "u1"})),
        logout_fails: true,
        ..ScriptedIdentity::default()
    };
    let cx = context(identity, Some(MemoryCredentials::with_entry("token", "abc")));
    let (module, _) = session(&cx);
    module.remind(&cx).await.unwrap();

    module.clear(&cx, true).await.unwrap();

    assert_eq!(cx.identity.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(module.current(&cx.store).phase(), SessionPhase::Anonymous);
    assert_eq!(cx.credentials.as_ref().unwrap().get("token").unwrap(), None);
}

#[tokio::test]
async fn save_persists_and_sets_api_token() {
    let cx = context(ScriptedIdentity::rejecting(), Some(MemoryCredentials::new()));
    let (module, _) = session(&cx);

    module
        .save(&cx, SessionPatch::new("fresh").with_user(json!({"_id": "u2"})).with_wait(false))
        .await
        .unwrap();

    let after = module.current(&cx.store);
    assert!(after.exists);
    assert_eq!(after.token.as_deref(), Some("fresh"));
    assert_eq!(after.user, json!({"_id": "u2"}));
    assert_eq!(cx.api.token().as_deref(), Some("fresh"));
    assert_eq!(
        cx.credentials.as_ref().unwrap().get("token").unwrap().as_deref(),
        Some("fresh")
    );
}

#[tokio::test]
async fn login_saves_returned_credential() {
    let cx = context(ScriptedIdentity::rejecting(), Some(MemoryCredentials::new()));
    let (module, _) = session(&cx);

    assert!(module.login(&cx, "alice", "wrong").await.is_err());
    assert_eq!(module.current(&cx.store).phase(), SessionPhase::Unknown);

    module.login(&cx, "alice", "secret").await.unwrap();
    let after = module.current(&cx.store);
    assert_eq!(after.phase(), SessionPhase::Authenticated);
    assert_eq!(after.token.as_deref(), Some("token-alice"));
}

#[tokio::test]
async fn named_instance_uses_its_own_key() {
    let registry = Registry::new().register("session", SessionState::build);
    let config = StoreConfig {
        states: [(
            "admin".to_string(),
            json!({"proto": "session", "token_key": "admin-token"}),
        )]
        .into_iter()
        .collect(),
        ..StoreConfig::default()
    };
    let store = Store::new(config);
    store
        .initialize(&Manifest::new(registry).with_module("session").with_module("admin"))
        .unwrap();

    let cx = TestContext {
        store,
        identity: ScriptedIdentity::accepting(json!({"_id": "root"})),
        api: ApiClient::with_default_timeout("http://127.0.0.1:9/").unwrap(),
        credentials: Some(MemoryCredentials::with_entry("admin-token", "root-token")),
    };

    let admin = cx.store.module::<SessionState>("admin").unwrap();
    admin.remind(&cx).await.unwrap();

    let state = cx.store.get_state();
    assert_eq!(state["admin"]["token"], json!("root-token"));
    assert_eq!(state["session"]["wait"], json!(true));
}

#[test]
fn factory_signature_matches_registry() {
    // SessionState::build is usable directly as a blueprint factory.
    let ctx = ModuleContext {
        name: "session".to_string(),
        proto: "session".to_string(),
        config: json!({"name": "session"}),
    };
    assert!(SessionState::build(&ctx).is_ok());
}
