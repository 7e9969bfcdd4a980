//! Compile-on-first-access rendering through the template cache.

use std::fmt;
use std::sync::Arc;

use super::cache::TemplateCache;
use super::provider::StoreViewProvider;
use crate::services::ServiceLocator;
use crate::template::{
    Object, RenderError, RenderFrame, Template, TemplateOptions, TemplateParser, Value, globals,
};

pub struct ViewRenderer {
    provider: Arc<StoreViewProvider>,
    cache: Arc<TemplateCache>,
    parser: Arc<TemplateParser>,
    options: TemplateOptions,
}

impl ViewRenderer {
    pub fn new(
        provider: Arc<StoreViewProvider>,
        cache: Arc<TemplateCache>,
        parser: Arc<TemplateParser>,
        options: TemplateOptions,
    ) -> Self {
        Self {
            provider,
            cache,
            parser,
            options,
        }
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Cached template for `path`, compiling it from a fresh read on a miss.
    ///
    /// Concurrent misses may each compile; the last publish wins.
    pub async fn compiled(&self, path: &str) -> Result<Arc<Template>, RenderError> {
        if let Some(template) = self.cache.get(path) {
            return Ok(template);
        }

        let file = self.provider.resolve(path).await?;
        if !file.exists {
            return Err(RenderError::NotFound(path.to_owned()));
        }
        let source =
            String::from_utf8(file.bytes).map_err(|_| RenderError::InvalidUtf8(path.to_owned()))?;
        let template = Arc::new(self.parser.parse(&source)?);

        if let Some(token) = &file.token {
            self.cache.publish(path, Arc::clone(&template), token);
        }
        Ok(template)
    }

    /// Render `path` against `model`, writing to `sink` only on success.
    ///
    /// `ambient` is visible to the template as `ViewData`.
    pub async fn render(
        &self,
        path: &str,
        model: Value,
        ambient: Object,
        services: Option<Arc<ServiceLocator>>,
        sink: &mut (dyn fmt::Write + Send),
    ) -> Result<(), RenderError> {
        let template = self.compiled(path).await?;
        let globals = globals(model, ambient);
        let frame = RenderFrame::new(Arc::clone(&self.parser), services, &self.options);

        // Execution is synchronous and blocks on widget lookups
        let html =
            tokio::task::spawn_blocking(move || frame.render(&template, &globals)).await??;
        sink.write_str(&html)?;
        Ok(())
    }

    /// [`render`](Self::render) into a new string.
    pub async fn render_to_string(
        &self,
        path: &str,
        model: Value,
        services: Option<Arc<ServiceLocator>>,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render(path, model, Object::new(), services, &mut out).await?;
        Ok(out)
    }
}
