//! # prerender-session
//!
//! The session state module: who the current user is, and the credential
//! that proves it.
//!
//! ## Pieces
//!
//! - `ApiClient`: the HTTP client outgoing API calls go through. It carries
//!   the current credential and attaches it to every request.
//! - `IdentityService`: the remote side of a session (`current`, `logout`,
//!   `sign_in`). `HttpIdentityService` talks to a users API over `ApiClient`.
//! - `CredentialStore`: where the credential is persisted between visits.
//!   Only interactive contexts have one; a server render does not.
//! - `SessionState`: the store module. `remind` restores a session from a
//!   persisted credential, `save` records one, `clear` drops it.
//!
//! ## Restoration
//!
//! ```text
//! Unknown --remind, credential--> Restoring --current ok--> Authenticated
//!    |                                |
//!    |                                +--current failed--> Anonymous (error re-raised)
//!    +--remind, no credential---------------------------> Anonymous
//! ```
//!
//! Collaborators are passed explicitly through `SessionContext`; the module
//! holds no references to them.

pub mod api;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod session;

pub use api::ApiClient;
pub use credentials::{CredentialStore, FileCredentials, MemoryCredentials};
pub use error::{CredentialError, IdentityError, Result, SessionError};
pub use identity::{HttpIdentityService, IdentityService, SignIn};
pub use session::{Session, SessionContext, SessionPatch, SessionPhase, SessionSettings, SessionState};
