//! Server-side render workers for prerender.
//!
//! A [`Renderer`] owns the inputs every request shares (configuration,
//! module manifest, document template, asset manifest, the [`App`]) and runs
//! each [`RenderRequest`] on its own task. A worker builds a fresh
//! [`Services`] bundle and store, renders the app repeatedly until its
//! prepare effects settle, then composes the document.
//!
//! ```ignore
//! use prerender_render::{
//!     Config, RenderContext, RenderRequest, RenderShared, Renderer, RendererConfig, Template,
//! };
//! use prerender_store::{BoxError, Manifest, Registry};
//!
//! let shared = RenderShared::new(
//!     Config::load("prerender.json")?,
//!     Manifest::from_registry(Registry::new()),
//!     Template::parse(std::fs::read_to_string("index.html")?)?,
//!     |cx: &mut RenderContext| -> Result<String, BoxError> {
//!         Ok(format!("<h1>{}</h1>", cx.location().pathname))
//!     },
//! );
//! let renderer = Renderer::new(shared, RendererConfig::default());
//! let envelope = renderer.render(RenderRequest::new("/about")).await;
//! ```
//!
//! Every failure inside a worker, including a panic, comes back as an
//! envelope with status 500; `render` never returns an error.

pub mod app;
pub mod assets;
pub mod config;
pub mod context;
pub mod error;
pub mod head;
pub mod navigation;
pub mod prepare;
pub mod request;
pub mod runtime;
pub mod services;
pub mod template;
pub mod worker;

pub use app::App;
pub use assets::{AssetManifest, LoadableStats, NoAssets};
pub use config::{ApiConfig, Config, HydrationMode, NavigationConfig, RenderSettings};
pub use context::RenderContext;
pub use error::{AssetError, ConfigError, RenderError, Result, TemplateError};
pub use head::{base_tag, escape_attr, escape_text, Head};
pub use navigation::{Location, Navigation};
pub use prepare::{PrepareEffect, PrepareQueue};
pub use request::{RenderEnvelope, RenderOutput, RenderRequest};
pub use runtime::{Renderer, RendererConfig, WorkerHandle, WorkerId, WorkerState};
pub use services::{IdentityFactory, Services};
pub use template::{Fragments, Template, DEFAULT_MOUNT_MARKER};
pub use worker::{hydration_script, RenderShared, RenderWorker};
