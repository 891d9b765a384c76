//! The per-request service bundle.

use std::sync::Arc;

use prerender_session::{ApiClient, CredentialStore, IdentityService, SessionContext};
use prerender_store::{Manifest, Store};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::navigation::Navigation;

/// Builds the identity service a worker talks to, given its API client.
pub type IdentityFactory = Arc<dyn Fn(&ApiClient) -> Arc<dyn IdentityService> + Send + Sync>;

/// Everything one render needs, created fresh for each request.
///
/// Nothing in here is shared with another request: the store, the API
/// credential and the identity service are all new instances.
pub struct Services {
    config: Config,
    navigation: Navigation,
    api: ApiClient,
    identity: Arc<dyn IdentityService>,
    store: Arc<Store>,
}

impl Services {
    /// Build the bundle from an already request-specific `config`.
    ///
    /// Fails on the first module configuration error.
    pub fn build(config: Config, manifest: &Manifest, identity: &IdentityFactory) -> Result<Self> {
        let navigation = Navigation::new(&config.navigation)?;
        let api = ApiClient::new(&config.api.base_url, config.api.timeout())?;
        let identity = identity(&api);

        let store = Store::new(config.store.clone());
        store.initialize(manifest)?;
        debug!(modules = ?store.module_names(), "store initialized");

        Ok(Self {
            config,
            navigation,
            api,
            identity,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn store_handle(&self) -> &Arc<Store> {
        &self.store
    }
}

impl SessionContext for Services {
    fn store(&self) -> &Store {
        &self.store
    }

    fn identity(&self) -> &dyn IdentityService {
        self.identity.as_ref()
    }

    fn api(&self) -> &ApiClient {
        &self.api
    }

    // No persisted credential exists on the server.
    fn credentials(&self) -> Option<&dyn CredentialStore> {
        None
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("navigation", &self.navigation)
            .field("api", &self.api.base_url().as_str())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
