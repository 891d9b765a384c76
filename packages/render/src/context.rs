//! What the app sees while it renders.

use std::future::Future;
use std::sync::Arc;

use prerender_store::{BoxError, Store};

use crate::config::Config;
use crate::head::Head;
use crate::navigation::{Location, Navigation};
use crate::prepare::PrepareQueue;
use crate::services::Services;

/// Per-request render context.
///
/// Head metadata and used chunks are reset at the start of every pass, so
/// only the final pass decides what ends up in the document. Prepare keys
/// persist across passes.
#[derive(Debug)]
pub struct RenderContext {
    services: Arc<Services>,
    queue: PrepareQueue,
    head: Head,
    chunks: Vec<String>,
}

impl RenderContext {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            queue: PrepareQueue::new(),
            head: Head::new(),
            chunks: Vec::new(),
        }
    }

    /// The request's services, for moving into prepare effects.
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn store(&self) -> &Arc<Store> {
        self.services.store_handle()
    }

    pub fn config(&self) -> &Config {
        self.services.config()
    }

    pub fn navigation(&self) -> &Navigation {
        self.services.navigation()
    }

    pub fn location(&self) -> &Location {
        self.services.navigation().location()
    }

    /// Register a data-loading effect to run before the next pass.
    ///
    /// Returns `false` if `key` already ran or is queued in this render.
    pub fn prepare<F>(&self, key: impl Into<String>, effect: F) -> bool
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.queue.register(key, effect)
    }

    pub fn is_prepared(&self, key: &str) -> bool {
        self.queue.is_registered(key)
    }

    /// The queue itself, for effects that register dependents.
    pub fn prepare_queue(&self) -> &PrepareQueue {
        &self.queue
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut Head {
        &mut self.head
    }

    /// Mark a code chunk as needed by this page.
    pub fn use_chunk(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.chunks.contains(&name) {
            self.chunks.push(name);
        }
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub(crate) fn begin_pass(&mut self) {
        self.head.clear();
        self.chunks.clear();
    }
}
