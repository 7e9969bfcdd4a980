//! Request-scoped projection of a template source.

use std::sync::Arc;

use async_trait::async_trait;

use crate::signal::ChangeToken;
use crate::template::RenderError;

/// A resolved (or absent) template source.
///
/// Built per resolution and dropped afterwards; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ViewFile {
    pub exists: bool,
    pub bytes: Vec<u8>,
    /// Unix seconds of the last edit, when known.
    pub last_modified: Option<i64>,
    /// Fires when the source changes.
    pub token: Option<Arc<ChangeToken>>,
}

impl ViewFile {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn found(bytes: Vec<u8>, last_modified: Option<i64>) -> Self {
        Self {
            exists: true,
            bytes,
            last_modified,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Arc<ChangeToken>) -> Self {
        self.token = Some(token);
        self
    }
}

/// A source of view files addressed by virtual path.
///
/// A miss is `exists: false`; errors are reserved for sources that could
/// not be read at all.
#[async_trait]
pub trait FileProvider: Send + Sync {
    async fn get_file(&self, path: &str) -> Result<ViewFile, RenderError>;

    async fn exists(&self, path: &str) -> Result<bool, RenderError> {
        Ok(self.get_file(path).await?.exists)
    }
}

/// Provider with no files, for hosts without a fallback directory.
pub struct NullProvider;

#[async_trait]
impl FileProvider for NullProvider {
    async fn get_file(&self, _path: &str) -> Result<ViewFile, RenderError> {
        Ok(ViewFile::missing())
    }
}
