use prerender_store::StoreError;

/// Failures talking to the identity service.
#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("identity service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("identity service rejected the request: {0}")]
    Rejected(String),
}

/// Failures reading or writing the persisted credential.
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by session operations.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_error_is_transparent() {
        let e = SessionError::from(IdentityError::Status {
            status: 401,
            message: "token expired".to_string(),
        });
        assert_eq!(e.to_string(), "identity service returned 401: token expired");
    }

    #[test]
    fn store_error_is_wrapped() {
        let e = SessionError::from(StoreError::ModuleNotRegistered("session".to_string()));
        assert!(e.to_string().starts_with("store error:"));
    }
}
