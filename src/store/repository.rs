//! Repository collaborator shared by all storage backends.

use async_trait::async_trait;
use thiserror::Error;

use super::entity::Entity;

/// Row predicate passed to lookups.
pub type Predicate<'a, E> = &'a (dyn Fn(&E) -> bool + Send + Sync);

/// Storage failures. A lookup miss is never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate `{column}` = `{value}` in `{table}`")]
    Duplicate {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("no row with id {id} in `{table}`")]
    UnknownId { table: &'static str, id: String },

    #[error("seed file `{0}` is invalid")]
    Seed(std::path::PathBuf, #[source] toml::de::Error),

    #[error("IO error when reading `{0}`")]
    Io(std::path::PathBuf, #[source] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Query/insert/update surface over one entity table.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// First row matching `predicate`, in identity order.
    fn get(&self, predicate: Predicate<'_, E>) -> Option<E>;

    /// Asynchronous form of [`get`](Self::get).
    async fn get_async(&self, predicate: Predicate<'_, E>) -> Option<E>;

    /// Insert a new row, assigning its identity. Returns the stored row.
    fn insert(&self, entity: E) -> Result<E, StoreError>;

    /// Replace the row with the same identity.
    fn update(&self, entity: E) -> Result<(), StoreError>;

    /// Every row, in identity order.
    fn all(&self) -> Vec<E>;
}
