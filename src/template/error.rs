//! Template compile and render errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// One syntax problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-indexed `(line, column)`, when the message carries one.
    pub position: Option<(usize, usize)>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            position: position(&message),
            message,
        }
    }
}

/// `--> 3:14` as printed by the liquid grammar.
fn position(message: &str) -> Option<(usize, usize)> {
    let (_, rest) = message.split_once("--> ")?;
    let (line, column) = rest.split_whitespace().next()?.split_once(':')?;
    Some((line.parse().ok()?, column.parse().ok()?))
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some((line, column)) => write!(f, "{line}:{column}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Template text did not parse. Carries every diagnostic found.
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseError {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![Diagnostic::new(message)],
        }
    }
}

impl From<liquid::Error> for ParseError {
    fn from(err: liquid::Error) -> Self {
        Self::single(err.to_string())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template parse failed")?;
        for diagnostic in &self.diagnostics {
            write!(f, "\n  {diagnostic}")?;
        }
        Ok(())
    }
}

/// Anything that aborts a render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("view `{0}` not found")]
    NotFound(String),

    /// The evaluation context lacks a capability a directive needs.
    #[error("missing context: {0}")]
    MissingContext(String),

    #[error("{kind} `{name}` not found")]
    MissingEntity { kind: &'static str, name: String },

    #[error("widget `{widget}` exceeds the nesting limit of {limit}")]
    RecursionLimit { widget: String, limit: usize },

    #[error("template `{0}` is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure raised by the engine itself, e.g. an undefined variable.
    #[error(transparent)]
    Liquid(#[from] liquid::Error),

    #[error("render task failed")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to write render output")]
    Sink(#[from] fmt::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_lists_diagnostics() {
        let err = ParseError {
            diagnostics: vec![
                Diagnostic::new("unknown tag `foo`"),
                Diagnostic::new(" --> 3:1\n  |\n3 | {% if %}"),
            ],
        };
        let display = err.to_string();
        assert!(display.contains("unknown tag `foo`"));
        assert!(display.contains("3:1: "));
    }

    #[test]
    fn test_position_from_message() {
        assert_eq!(Diagnostic::new("liquid: --> 2:14\n").position, Some((2, 14)));
        assert_eq!(Diagnostic::new("no position").position, None);
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::MissingEntity {
            kind: "widget",
            name: "greet".into(),
        };
        assert_eq!(err.to_string(), "widget `greet` not found");
    }
}
