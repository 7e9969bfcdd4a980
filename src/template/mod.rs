//! Liquid templates: parser construction, model conversion and the
//! per-render frame read by extension tags.
//!
//! # Module Structure
//!
//! - [`frame`] - services, nesting depth and recorded failures of one render
//! - [`error`] - `ParseError`, `RenderError`
//!
//! The language itself is `liquid`'s stdlib plus the `render` widget tag.
//! `{% include %}` names resolve through whatever partial source the parser
//! was built with.

pub mod error;
pub mod frame;

use liquid::ParserBuilder;
use liquid::partials::{OnDemandCompiler, PartialCompiler, PartialSource};
use serde::Serialize;

pub use error::{Diagnostic, ParseError, RenderError};
pub use frame::{RenderFrame, block_on};
pub use liquid::Object;
pub use liquid::model::Value;

use crate::widget::RenderTag;

/// A compiled template. Immutable once built.
pub type Template = liquid::Template;

/// Default nesting limit for `render` widget directives.
pub const DEFAULT_MAX_WIDGET_DEPTH: usize = 16;

/// Default item limit for literal `(a..b)` ranges.
pub const DEFAULT_MAX_RANGE: u64 = 10_000;

/// Settings shared by a render and all its widget children.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    pub max_widget_depth: usize,
    pub max_range: u64,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            max_widget_depth: DEFAULT_MAX_WIDGET_DEPTH,
            max_range: DEFAULT_MAX_RANGE,
        }
    }
}

/// Liquid stdlib plus `render`.
pub struct TemplateParser {
    parser: liquid::Parser,
    max_range: u64,
}

impl TemplateParser {
    /// A parser without partials: `{% include %}` always fails.
    pub fn new(options: &TemplateOptions) -> Result<Self, ParseError> {
        Self::build(stdlib(), options)
    }

    /// A parser resolving `{% include %}` names through `partials` on every render.
    pub fn with_partials<S>(partials: S, options: &TemplateOptions) -> Result<Self, ParseError>
    where
        S: PartialSource + Send + Sync + 'static,
    {
        Self::build(stdlib().partials(OnDemandCompiler::new(partials)), options)
    }

    fn build<P: PartialCompiler>(
        builder: ParserBuilder<P>,
        options: &TemplateOptions,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            parser: builder.build()?,
            max_range: options.max_range,
        })
    }

    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        if let Some((from, to)) = oversized_range(source, self.max_range) {
            return Err(ParseError::single(format!(
                "range ({from}..{to}) exceeds the limit of {} items",
                self.max_range
            )));
        }
        Ok(self.parser.parse(source)?)
    }
}

fn stdlib() -> ParserBuilder {
    ParserBuilder::with_stdlib().tag(RenderTag)
}

/// First literal `(from..to)` range in `source` spanning more than `limit` items.
///
/// The engine materializes ranges before iterating them.
fn oversized_range(source: &str, limit: u64) -> Option<(i64, i64)> {
    let mut rest = source;
    while let Some(open) = rest.find('(') {
        rest = &rest[open + 1..];
        let Some(close) = rest.find(')') else {
            break;
        };
        if let Some((from, to)) = rest[..close].split_once("..")
            && let (Ok(from), Ok(to)) = (from.trim().parse::<i64>(), to.trim().parse::<i64>())
            && i128::from(to) - i128::from(from) + 1 > i128::from(limit)
        {
            return Some((from, to));
        }
    }
    None
}

/// Serialize a view-model into a template value.
pub fn to_model<T: Serialize>(model: &T) -> Result<Value, RenderError> {
    Ok(liquid::model::to_value(model)?)
}

/// Root variables of a render.
///
/// The members of an object model are visible by name, the whole model as
/// `Model`, and the ambient values as `ViewData`.
pub fn globals(model: Value, ambient: Object) -> Object {
    let mut globals = match &model {
        Value::Object(members) => members.clone(),
        _ => Object::new(),
    };
    globals.insert("Model".into(), model);
    globals.insert("ViewData".into(), Value::Object(ambient));
    globals
}
