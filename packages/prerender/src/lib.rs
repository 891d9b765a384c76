//! prerender: render a page-view application to HTML on behalf of a request.
//!
//! Each request gets its own state store, built from a shared module
//! manifest. The app renders, registers the data it needs as prepare
//! effects, and is rendered again once they settle; the result is a document
//! plus the state the client resumes from.
//!
//! This crate re-exports the layers:
//! - [`store`]: state modules, the blueprint registry and the store
//! - [`session`]: the session module and its collaborators
//! - [`render`]: workers, templates and the host-facing [`Renderer`]

pub use prerender_render as render;
pub use prerender_session as session;
pub use prerender_store as store;

pub use prerender_render::{
    App, Config, RenderContext, RenderEnvelope, RenderRequest, RenderShared, Renderer,
    RendererConfig, Template,
};
pub use prerender_session::SessionState;
pub use prerender_store::{Manifest, Registry, StateModule, Store};

/// A registry with the modules this workspace ships: `session`.
pub fn builtin_registry() -> Registry {
    Registry::new().register("session", SessionState::build)
}
