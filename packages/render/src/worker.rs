//! One render, from request to envelope.

use std::sync::Arc;

use prerender_session::{ApiClient, HttpIdentityService, IdentityService};
use prerender_store::Manifest;
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::App;
use crate::assets::{AssetManifest, NoAssets};
use crate::config::{Config, HydrationMode};
use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::head::base_tag;
use crate::request::{RenderEnvelope, RenderOutput, RenderRequest};
use crate::services::{IdentityFactory, Services};
use crate::template::{Fragments, Template};

/// Immutable inputs shared by every worker.
pub struct RenderShared {
    config: Config,
    manifest: Manifest,
    template: Template,
    assets: Arc<dyn AssetManifest>,
    identity: IdentityFactory,
    app: Arc<dyn App>,
}

impl RenderShared {
    /// Shared inputs with no asset manifest and the HTTP identity service.
    pub fn new(config: Config, manifest: Manifest, template: Template, app: impl App) -> Self {
        Self {
            config,
            manifest,
            template,
            assets: Arc::new(NoAssets),
            identity: Arc::new(|api: &ApiClient| {
                Arc::new(HttpIdentityService::new(api.clone())) as Arc<dyn IdentityService>
            }),
            app: Arc::new(app),
        }
    }

    pub fn with_assets(mut self, assets: impl AssetManifest + 'static) -> Self {
        self.assets = Arc::new(assets);
        self
    }

    pub fn with_identity<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ApiClient) -> Arc<dyn IdentityService> + Send + Sync + 'static,
    {
        self.identity = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

impl std::fmt::Debug for RenderShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderShared")
            .field("config", &self.config)
            .field("manifest", &self.manifest)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Runs one request against the shared inputs.
#[derive(Debug)]
pub struct RenderWorker {
    shared: Arc<RenderShared>,
    request: RenderRequest,
}

impl RenderWorker {
    pub fn new(shared: Arc<RenderShared>, request: RenderRequest) -> Self {
        Self { shared, request }
    }

    /// Render, turning any failure into a 500 envelope.
    pub async fn run(self) -> RenderEnvelope {
        match self.render().await {
            Ok(envelope) => {
                info!(url = %self.request.url, status = envelope.status, "render complete");
                envelope
            }
            Err(e) => {
                error!(url = %self.request.url, error = %e, "render failed");
                RenderEnvelope::failure(&e)
            }
        }
    }

    /// Render, returning the first failure.
    pub async fn render(&self) -> Result<RenderEnvelope> {
        let shared = &self.shared;
        let config = shared.config.for_request(&self.request)?;
        let max_passes = config.render.max_passes;
        let hydration = config.render.hydration;
        let template = shared.template.remount(&config.render.mount_marker)?;

        let services = Arc::new(Services::build(
            config,
            &shared.manifest,
            &shared.identity,
        )?);
        let mut cx = RenderContext::new(services.clone());

        let markup = self.render_passes(&mut cx, max_passes).await?;

        let state = services.store_handle().snapshot();
        let state_key = self
            .request
            .state_key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let chunks = cx.chunks();
        let head = cx.head();
        let basename = services.navigation().basename();
        let fragments = Fragments {
            base: if basename == "/" {
                String::new()
            } else {
                base_tag(basename)
            },
            title: head.title_tag(),
            meta: head.meta_tags(),
            links: head.link_tags() + &shared.assets.link_tags(chunks),
            styles: shared.assets.style_tags(chunks),
            app: markup.clone(),
            state_script: hydration_script(hydration, &state, &state_key)?,
            scripts: shared.assets.script_tags(chunks),
        };
        let document = template.compose(&fragments);

        Ok(RenderEnvelope::success(
            document,
            RenderOutput {
                markup,
                keys: cx.prepare_queue().keys(),
                state,
                state_key,
            },
        ))
    }

    /// Render until a pass runs no prepare effect.
    async fn render_passes(&self, cx: &mut RenderContext, max_passes: usize) -> Result<String> {
        for pass in 1..=max_passes {
            cx.begin_pass();
            let markup = self.shared.app.render(cx).map_err(RenderError::App)?;
            let ran = cx.prepare_queue().drain().await?;
            debug!(pass, effects = ran, "render pass finished");
            if ran == 0 {
                return Ok(markup);
            }
        }
        Err(RenderError::Unsettled(max_passes))
    }
}

/// The `<script>` that hands the state (or its key) to the client.
pub fn hydration_script(mode: HydrationMode, state: &Value, state_key: &str) -> Result<String> {
    let (name, json) = match mode {
        HydrationMode::Key => ("stateKey", serde_json::to_string(state_key)?),
        HydrationMode::Inline => ("initialState", serde_json::to_string(state)?),
    };
    Ok(format!(
        "<script>window.{}={};</script>",
        name,
        json.replace('<', "\\u003c")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_hydration() {
        let script = hydration_script(HydrationMode::Key, &json!({"a": 1}), "k-1").unwrap();
        assert_eq!(script, r#"<script>window.stateKey="k-1";</script>"#);
    }

    #[test]
    fn inline_hydration_escapes_closing_tags() {
        let state = json!({"news": {"title": "</script><script>alert(1)"}});
        let script = hydration_script(HydrationMode::Inline, &state, "k").unwrap();
        assert_eq!(
            script,
            r#"<script>window.initialState={"news":{"title":"\u003c/script>\u003cscript>alert(1)"}};</script>"#
        );
        assert_eq!(script.matches("</script>").count(), 1);
    }
}
