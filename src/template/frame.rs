//! Per-render state visible to extension tags.
//!
//! Liquid tags only see the engine's runtime, so the host state a render
//! needs (services, the parser for nested templates, widget depth) travels
//! in a task-local [`RenderFrame`] installed for the duration of the render.
//!
//! Rendering is synchronous. It runs on a blocking thread, where tags drive
//! store lookups with [`block_on`].

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use super::{Object, RenderError, Template, TemplateOptions, TemplateParser};
use crate::services::ServiceLocator;

tokio::task_local! {
    static FRAME: RenderFrame;
}

#[derive(Clone)]
pub struct RenderFrame {
    parser: Arc<TemplateParser>,
    services: Option<Arc<ServiceLocator>>,
    max_depth: usize,
    depth: usize,
    /// Typed cause of the failure, shared by every nested frame.
    fault: Arc<Mutex<Option<RenderError>>>,
}

impl RenderFrame {
    pub fn new(
        parser: Arc<TemplateParser>,
        services: Option<Arc<ServiceLocator>>,
        options: &TemplateOptions,
    ) -> Self {
        Self {
            parser,
            services,
            max_depth: options.max_widget_depth,
            depth: 0,
            fault: Arc::default(),
        }
    }

    /// Frame of the render running on this thread, if any.
    pub fn current() -> Option<Self> {
        FRAME.try_with(Self::clone).ok()
    }

    pub fn parser(&self) -> &TemplateParser {
        &self.parser
    }

    pub fn services(&self) -> Option<&Arc<ServiceLocator>> {
        self.services.as_ref()
    }

    /// Widget nesting depth; 0 for a top-level render.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Frame for a nested widget: same services, one level deeper.
    pub fn child(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// Execute `template` with this frame installed. The previous frame is
    /// restored when this returns, whether or not the render failed.
    pub fn run(&self, template: &Template, globals: &Object) -> Result<String, liquid::Error> {
        FRAME.sync_scope(self.clone(), || template.render(globals))
    }

    /// [`run`](Self::run), reporting the typed error a tag recorded.
    pub fn render(&self, template: &Template, globals: &Object) -> Result<String, RenderError> {
        self.run(template, globals)
            .map_err(|err| self.fault.lock().take().unwrap_or(RenderError::Liquid(err)))
    }

    /// Record `err` as the cause of the failing render, keeping the
    /// innermost one, and convert it for the engine.
    pub fn fail(&self, err: RenderError) -> liquid::Error {
        let converted = liquid::Error::with_msg(err.to_string());
        self.fault.lock().get_or_insert(err);
        converted
    }
}

/// Drive `future` to completion from synchronous template execution.
///
/// Must be called off the async workers, as renders are.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, RenderError> {
    let handle = Handle::try_current()
        .map_err(|_| RenderError::MissingContext("no async runtime for store lookups".into()))?;
    Ok(handle.block_on(future))
}
