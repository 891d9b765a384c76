//! The application tree seam.

use prerender_store::BoxError;

use crate::context::RenderContext;

/// Renders the application to markup.
///
/// Called once per pass. A pass that needs data registers prepare effects
/// through the context and renders whatever it can; it is rendered again
/// once the effects have settled.
pub trait App: Send + Sync + 'static {
    fn render(&self, cx: &mut RenderContext) -> Result<String, BoxError>;
}

impl<F> App for F
where
    F: Fn(&mut RenderContext) -> Result<String, BoxError> + Send + Sync + 'static,
{
    fn render(&self, cx: &mut RenderContext) -> Result<String, BoxError> {
        self(cx)
    }
}
