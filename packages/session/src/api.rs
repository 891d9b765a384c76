//! HTTP client for outgoing API calls.
//!
//! One `ApiClient` exists per execution context (one per render on the
//! server). Clones share the credential, so `set_token` on any clone is seen
//! by every request built afterwards.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use url::Url;

use crate::error::IdentityError;

/// Header carrying the credential.
pub const TOKEN_HEADER: &str = "X-Token";

/// API client with a base URL and a swappable credential.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a client for the given base URL.
    ///
    /// A base URL without a trailing slash is treated as a directory, so
    /// `http://host/api/v1` and `http://host/api/v1/` are equivalent.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout(base_url: &str) -> Result<Self, IdentityError> {
        Self::new(base_url, Duration::from_secs(30))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credential attached to outgoing requests, if any.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace (or with `None`, drop) the credential.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Start a request to `path`, relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, IdentityError> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.token() {
            builder = builder.header(TOKEN_HEADER, token);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = ApiClient::with_default_timeout("http://example.com/api/v1").unwrap();
        assert_eq!(api.base_url().as_str(), "http://example.com/api/v1/");
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(
            ApiClient::with_default_timeout("not a url"),
            Err(IdentityError::UrlParse(_))
        ));
    }

    #[test]
    fn clones_share_the_token() {
        let api = ApiClient::with_default_timeout("http://example.com/").unwrap();
        let other = api.clone();
        assert_eq!(other.token(), None);

        api.set_token(Some("abc".to_string()));
        assert_eq!(other.token(), Some("abc".to_string()));

        other.set_token(None);
        assert_eq!(api.token(), None);
    }

    #[test]
    fn request_attaches_token_and_joins_path() {
        let api = ApiClient::with_default_timeout("http://example.com/api/v1").unwrap();
        api.set_token(Some("secret".to_string()));

        let request = api
            .request(Method::GET, "/users/self")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://example.com/api/v1/users/self");
        assert_eq!(request.headers()[TOKEN_HEADER], "secret");
    }

    #[test]
    fn request_without_token_has_no_header() {
        let api = ApiClient::with_default_timeout("http://example.com/").unwrap();
        let request = api.request(Method::DELETE, "users/sign").unwrap().build().unwrap();
        assert!(request.headers().get(TOKEN_HEADER).is_none());
    }
}
