//! The identity service: the remote side of a session.

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::ApiClient;
use crate::error::IdentityError;

/// A successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignIn {
    pub token: String,
    pub user: Value,
}

/// Remote identity operations.
///
/// Implementations authenticate with whatever credential their API client
/// currently carries.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// The user the current credential belongs to.
    async fn current(&self) -> Result<Value, IdentityError>;

    /// End the remote session for the current credential.
    async fn logout(&self) -> Result<(), IdentityError>;

    /// Exchange login and password for a credential.
    async fn sign_in(&self, login: &str, password: &str) -> Result<SignIn, IdentityError>;
}

/// `{ "result": ... }` response envelope used by the users API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Identity service backed by the users HTTP API.
///
/// Endpoints, relative to the client's base URL:
/// - `GET users/self` -> current user
/// - `DELETE users/sign` -> logout
/// - `POST users/sign` -> sign in
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    api: ApiClient,
}

impl HttpIdentityService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn checked(response: Response) -> Result<Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(IdentityError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn result<T: DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
        let envelope: Envelope<T> = Self::checked(response).await?.json().await?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn current(&self) -> Result<Value, IdentityError> {
        debug!("requesting current user");
        let response = self
            .api
            .request(Method::GET, "users/self")?
            .query(&[("fields", "*")])
            .send()
            .await?;
        Self::result(response).await
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        debug!("requesting logout");
        let response = self.api.request(Method::DELETE, "users/sign")?.send().await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn sign_in(&self, login: &str, password: &str) -> Result<SignIn, IdentityError> {
        debug!(login, "requesting sign in");
        let response = self
            .api
            .request(Method::POST, "users/sign")?
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await?;
        Self::result(response).await
    }
}
