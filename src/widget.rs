//! `{% render <widget>:<entity> %}`: render a stored widget inline.
//!
//! ```text
//! parent template ── render greet:user ──► WidgetService::content("greet")
//!                                            │
//!          child parse (cached per node, ◄───┘
//!          keyed by content fingerprint)
//!                    │
//!                    ▼
//!          isolated child render (no parent variables,
//!          same services, depth + 1)
//! ```
//!
//! The `<entity>` operand is kept verbatim, but rendering does not use it.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use liquid_core::error::ResultLiquidReplaceExt;
use liquid_core::{Language, ParseTag, Renderable, Runtime, TagReflection, TagTokenIter};
use parking_lot::Mutex;

use crate::log;
use crate::store::{Repository, Widget};
use crate::template::{Object, RenderError, RenderFrame, Template, TemplateParser, block_on};

/// Name of the widget directive.
pub const RENDER_TAG: &str = "render";

/// Source of widget template text, looked up by name.
#[async_trait]
pub trait WidgetService: Send + Sync {
    async fn content(&self, name: &str) -> Result<Option<String>, RenderError>;
}

/// Widget lookup against the widget repository. Only active widgets resolve.
pub struct StoreWidgetService {
    widgets: Arc<dyn Repository<Widget>>,
}

impl StoreWidgetService {
    pub fn new(widgets: Arc<dyn Repository<Widget>>) -> Self {
        Self { widgets }
    }
}

#[async_trait]
impl WidgetService for StoreWidgetService {
    async fn content(&self, name: &str) -> Result<Option<String>, RenderError> {
        let widget = self
            .widgets
            .get_async(&|w: &Widget| w.name == name && w.status.is_active())
            .await;
        Ok(widget.map(|w| w.content))
    }
}

/// Parser plugin for the `render` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderTag;

impl TagReflection for RenderTag {
    fn tag(&self) -> &'static str {
        RENDER_TAG
    }

    fn description(&self) -> &'static str {
        "Render a stored widget inline, in an isolated scope."
    }
}

impl ParseTag for RenderTag {
    fn parse(
        &self,
        arguments: TagTokenIter<'_>,
        _options: &Language,
    ) -> liquid_core::Result<Box<dyn Renderable>> {
        let arguments: Vec<String> = arguments.map(|token| token.as_str().to_owned()).collect();
        let (widget, entity) =
            split_arguments(&arguments.join(" ")).map_err(liquid_core::Error::with_msg)?;

        Ok(Box::new(RenderWidget {
            widget,
            entity,
            child: Mutex::new(None),
        }))
    }

    fn reflection(&self) -> &dyn TagReflection {
        self
    }
}

/// `greet:user` → (`greet`, `user`).
fn split_arguments(arguments: &str) -> Result<(String, String), String> {
    let arguments = arguments.trim();
    let name_len = arguments
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(arguments.len());
    let (name, rest) = arguments.split_at(name_len);
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        return Err("An identifier was expected after the 'render' tag".into());
    }

    let Some(entity) = rest.trim_start().strip_prefix(':') else {
        return Err("':' was expected after the identifier of 'render'".into());
    };
    let entity = entity.trim();
    if entity.is_empty() || entity.contains(char::is_whitespace) {
        return Err("An entity expression was expected after ':'".into());
    }
    Ok((name.to_owned(), entity.to_owned()))
}

/// Child parse remembered by one statement node.
struct ParsedChild {
    fingerprint: blake3::Hash,
    template: Arc<Template>,
}

pub struct RenderWidget {
    widget: String,
    entity: String,
    child: Mutex<Option<ParsedChild>>,
}

impl fmt::Debug for RenderWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderWidget")
            .field("widget", &self.widget)
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

impl RenderWidget {
    /// Parse of `content`, reused while the content is unchanged.
    fn child_template(
        &self,
        parser: &TemplateParser,
        content: &str,
    ) -> Result<Arc<Template>, RenderError> {
        let fingerprint = blake3::hash(content.as_bytes());
        let mut child = self.child.lock();
        if let Some(parsed) = child.as_ref()
            && parsed.fingerprint == fingerprint
        {
            return Ok(Arc::clone(&parsed.template));
        }

        let template = Arc::new(parser.parse(content)?);
        *child = Some(ParsedChild {
            fingerprint,
            template: Arc::clone(&template),
        });
        Ok(template)
    }

    fn render_widget(&self, frame: &RenderFrame) -> Result<String, RenderError> {
        let services = frame.services().ok_or_else(|| {
            RenderError::MissingContext("`render` needs a service locator".into())
        })?;
        let widgets = services
            .get::<Arc<dyn WidgetService>>()
            .cloned()
            .ok_or_else(|| RenderError::MissingContext("no widget service registered".into()))?;

        let limit = frame.max_depth();
        if frame.depth() >= limit {
            log!("render"; "widget `{}` exceeds the nesting limit of {}", self.widget, limit);
            return Err(RenderError::RecursionLimit {
                widget: self.widget.clone(),
                limit,
            });
        }

        let content =
            block_on(widgets.content(&self.widget))??.ok_or_else(|| RenderError::MissingEntity {
                kind: "widget",
                name: self.widget.clone(),
            })?;
        let template = self.child_template(frame.parser(), &content)?;

        // Fresh globals: nothing of the parent is visible, nothing leaks back
        Ok(frame.child().run(&template, &Object::new())?)
    }
}

impl Renderable for RenderWidget {
    fn render_to(&self, writer: &mut dyn Write, _runtime: &dyn Runtime) -> liquid_core::Result<()> {
        let Some(frame) = RenderFrame::current() else {
            return Err(liquid_core::Error::with_msg(
                "missing context: `render` used outside a view render",
            ));
        };
        let html = self.render_widget(&frame).map_err(|err| frame.fail(err))?;
        writer.write_all(html.as_bytes()).replace("Failed to render")?;
        Ok(())
    }
}
