//! Entity storage for pages, layouts and widgets.
//!
//! # Module Structure
//!
//! - [`entity`] - `Page`, `Layout`, `Widget` and the `Entity`/`Identity` traits
//! - [`repository`] - the `Repository` collaborator and `StoreError`
//! - [`memory`] - concurrent in-memory backend (default)
//! - `persist` - embedded `redb` backend (feature `persist`)
//!
//! Seed files populate a fresh [`Stores`] bundle at startup:
//!
//! ```toml
//! [[pages]]
//! name = "about"
//! path = "/Home/Index"
//! body = "<h1>{{ Name }}</h1>"
//!
//! [[widgets]]
//! name = "greet"
//! content = "Hello"
//! ```

pub mod entity;
pub mod memory;
#[cfg(feature = "persist")]
pub mod persist;
pub mod repository;

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

pub use entity::{Entity, EntityStatus, Identity, Layout, Page, Widget};
pub use memory::MemoryRepository;
pub use repository::{Predicate, Repository, StoreError};

use crate::view::path::normalize;

/// Current time as unix seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// One repository per entity table.
#[derive(Clone)]
pub struct Stores {
    pub pages: Arc<dyn Repository<Page>>,
    pub layouts: Arc<dyn Repository<Layout>>,
    pub widgets: Arc<dyn Repository<Widget>>,
}

impl Stores {
    /// Empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            pages: Arc::new(MemoryRepository::<Page>::new()),
            layouts: Arc::new(MemoryRepository::<Layout>::new()),
            widgets: Arc::new(MemoryRepository::<Widget>::new()),
        }
    }

    /// Stores backed by a `redb` database file, created if missing.
    #[cfg(feature = "persist")]
    pub fn open_database(path: &Path) -> Result<Self, StoreError> {
        let db = ::redb::Database::create(path)
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let db = Arc::new(db);
        Ok(Self {
            pages: Arc::new(persist::RedbRepository::<Page>::open(Arc::clone(&db))?),
            layouts: Arc::new(persist::RedbRepository::<Layout>::open(Arc::clone(&db))?),
            widgets: Arc::new(persist::RedbRepository::<Widget>::open(db)?),
        })
    }

    /// Insert every row of a seed file. Returns the number of rows inserted.
    ///
    /// Rows whose unique key already exists are skipped, so seeding a
    /// persistent store twice is harmless.
    pub fn seed_from_path(&self, path: &Path, extension: &str) -> Result<usize, StoreError> {
        let content =
            std::fs::read_to_string(path).map_err(|err| StoreError::Io(path.to_path_buf(), err))?;
        let seed: SeedFile =
            toml::from_str(&content).map_err(|err| StoreError::Seed(path.to_path_buf(), err))?;
        self.seed(seed, extension)
    }

    pub fn seed(&self, seed: SeedFile, extension: &str) -> Result<usize, StoreError> {
        let stamp = now();
        let mut inserted = 0;

        for mut layout in seed.layouts {
            if layout.created_at == 0 {
                layout.created_at = stamp;
            }
            inserted += skip_duplicate(self.layouts.insert(layout))?;
        }
        for mut page in seed.pages {
            page.path = normalize(&page.path, extension);
            if page.created_at == 0 {
                page.created_at = stamp;
            }
            inserted += skip_duplicate(self.pages.insert(page))?;
        }
        for mut widget in seed.widgets {
            if widget.created_at == 0 {
                widget.created_at = stamp;
            }
            inserted += skip_duplicate(self.widgets.insert(widget))?;
        }

        Ok(inserted)
    }
}

fn skip_duplicate<E>(result: Result<E, StoreError>) -> Result<usize, StoreError> {
    match result {
        Ok(_) => Ok(1),
        Err(StoreError::Duplicate { .. }) => Ok(0),
        Err(err) => Err(err),
    }
}

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub layouts: Vec<Layout>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::path::VIEW_EXTENSION;
    use tempfile::TempDir;

    const SEED: &str = r#"
        [[pages]]
        name = "about"
        path = "/Home/Index.liquid"
        body = "<h1>{{ Name }}</h1>"

        [[layouts]]
        name = "main"
        content = "{{ content }}"

        [[widgets]]
        name = "greet"
        content = "Hello"
    "#;

    #[test]
    fn test_seed_normalizes_page_paths() {
        let stores = Stores::in_memory();
        let seed: SeedFile = toml::from_str(SEED).unwrap();
        assert_eq!(stores.seed(seed, VIEW_EXTENSION).unwrap(), 3);

        let page = stores.pages.get(&|p: &Page| p.name == "about").unwrap();
        assert_eq!(page.path, "/home/index");
        assert!(page.created_at > 0);
    }

    #[test]
    fn test_seed_twice_skips_duplicates() {
        let stores = Stores::in_memory();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed.toml");
        std::fs::write(&path, SEED).unwrap();

        assert_eq!(stores.seed_from_path(&path, VIEW_EXTENSION).unwrap(), 3);
        // Layouts carry no unique key, so only the layout is inserted again
        assert_eq!(stores.seed_from_path(&path, VIEW_EXTENSION).unwrap(), 1);
        assert_eq!(stores.widgets.all().len(), 1);
    }

    #[test]
    fn test_seed_rejects_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed.toml");
        std::fs::write(&path, "[[pages]]\nname = \"a\"\npath = \"/a\"\nbody = \"\"\ncolour = 1\n")
            .unwrap();

        let err = Stores::in_memory().seed_from_path(&path, VIEW_EXTENSION).unwrap_err();
        assert!(matches!(err, StoreError::Seed(..)));
    }

    #[test]
    fn test_seed_missing_file() {
        let err = Stores::in_memory()
            .seed_from_path(Path::new("/nonexistent/seed.toml"), VIEW_EXTENSION)
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(..)));
    }
}
