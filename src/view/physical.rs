//! Fallback provider reading view files from a directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::file::{FileProvider, ViewFile};
use crate::template::RenderError;

/// Serves `root/<virtual path>` from disk.
#[derive(Debug, Clone)]
pub struct PhysicalProvider {
    root: PathBuf,
}

impl PhysicalProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Disk location for `path`, or `None` if it would escape the root.
    pub fn locate(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches(['~', '/']));
        relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| self.root.join(relative))
    }

    /// Inverse of [`locate`](Self::locate): the virtual path of a file under the root.
    pub fn virtual_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(format!("/{}", parts.join("/")))
    }
}

#[async_trait]
impl FileProvider for PhysicalProvider {
    async fn get_file(&self, path: &str) -> Result<ViewFile, RenderError> {
        let Some(location) = self.locate(path) else {
            return Ok(ViewFile::missing());
        };

        let bytes = match tokio::fs::read(&location).await {
            Ok(bytes) => bytes,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory
                ) =>
            {
                return Ok(ViewFile::missing());
            }
            Err(err) => {
                // A directory at the location is a miss, not a failure
                let is_dir = tokio::fs::metadata(&location)
                    .await
                    .is_ok_and(|meta| meta.is_dir());
                if is_dir {
                    return Ok(ViewFile::missing());
                }
                return Err(RenderError::Io(location, err));
            }
        };

        let last_modified = tokio::fs::metadata(&location)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(|time| chrono::DateTime::<chrono::Utc>::from(time).timestamp());

        Ok(ViewFile::found(bytes, last_modified))
    }
}
