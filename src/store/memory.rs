//! Concurrent in-memory repository.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::entity::{Entity, Identity};
use super::repository::{Predicate, Repository, StoreError};

/// Rows kept in identity order behind a `RwLock`.
///
/// Unique keys are checked under the write lock, so two concurrent inserts
/// of the same key cannot both succeed.
pub struct MemoryRepository<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
    sequence: AtomicU64,
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Put back a row that already carries its identity.
    #[cfg_attr(not(feature = "persist"), allow(dead_code))]
    pub(super) fn restore(&self, entity: E) {
        let n = entity.id().to_sequence();
        self.sequence.fetch_max(n, Ordering::Relaxed);
        self.rows.write().insert(entity.id(), entity);
    }
}

/// Reject `entity` if any other row already holds one of its unique keys.
pub(super) fn check_unique<'a, E: Entity>(
    entity: &E,
    rows: impl Iterator<Item = &'a E>,
) -> Result<(), StoreError> {
    let keys = entity.unique_keys();
    if keys.is_empty() {
        return Ok(());
    }

    for row in rows.filter(|row| row.id() != entity.id()) {
        for ((column, value), (_, existing)) in keys.iter().zip(row.unique_keys()) {
            if *value == existing {
                return Err(StoreError::Duplicate {
                    table: E::TABLE,
                    column: *column,
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    fn get(&self, predicate: Predicate<'_, E>) -> Option<E> {
        self.rows.read().values().find(|row| predicate(row)).cloned()
    }

    async fn get_async(&self, predicate: Predicate<'_, E>) -> Option<E> {
        self.get(predicate)
    }

    fn insert(&self, mut entity: E) -> Result<E, StoreError> {
        let mut rows = self.rows.write();

        // Identity is assigned under the lock so a rejected insert burns no id
        let next = self.sequence.load(Ordering::Relaxed) + 1;
        entity.set_id(E::Id::from_sequence(next));
        check_unique(&entity, rows.values())?;

        self.sequence.store(next, Ordering::Relaxed);
        rows.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    fn update(&self, entity: E) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        if !rows.contains_key(&entity.id()) {
            return Err(StoreError::UnknownId {
                table: E::TABLE,
                id: entity.id().to_string(),
            });
        }
        check_unique(&entity, rows.values())?;
        rows.insert(entity.id(), entity);
        Ok(())
    }

    fn all(&self) -> Vec<E> {
        self.rows.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entity::{Page, Widget};

    fn page(name: &str, path: &str) -> Page {
        Page {
            name: name.into(),
            path: path.into(),
            body: format!("{name} body"),
            ..Page::default()
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let repo = MemoryRepository::new();
        let a = repo.insert(page("a", "/a")).unwrap();
        let b = repo.insert(page("b", "/b")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_get_by_predicate() {
        let repo = MemoryRepository::new();
        repo.insert(page("about", "/home/index")).unwrap();

        let hit = repo.get(&|p: &Page| p.path == "/home/index");
        assert_eq!(hit.map(|p| p.name), Some("about".to_string()));
        assert!(repo.get(&|p: &Page| p.path == "/missing").is_none());
    }

    #[tokio::test]
    async fn test_get_async() {
        let repo = MemoryRepository::new();
        repo.insert(Widget {
            name: "greet".into(),
            content: "Hello".into(),
            ..Widget::default()
        })
        .unwrap();

        let widget = repo.get_async(&|w: &Widget| w.name == "greet").await;
        assert_eq!(widget.unwrap().content, "Hello");
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let repo = MemoryRepository::new();
        repo.insert(page("a", "/same")).unwrap();

        let err = repo.insert(page("b", "/same")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { column: "path", .. }));

        // Rejected insert does not consume an identity
        let c = repo.insert(page("c", "/c")).unwrap();
        assert_eq!(c.id, 2);
    }

    #[test]
    fn test_update_replaces_row() {
        let repo = MemoryRepository::new();
        let mut a = repo.insert(page("a", "/a")).unwrap();
        a.body = "changed".into();
        repo.update(a).unwrap();

        assert_eq!(repo.get(&|p: &Page| p.name == "a").unwrap().body, "changed");
    }

    #[test]
    fn test_update_unknown_id() {
        let repo: MemoryRepository<Page> = MemoryRepository::new();
        let err = repo.update(Page { id: 9, ..page("x", "/x") }).unwrap_err();
        assert!(matches!(err, StoreError::UnknownId { .. }));
    }

    #[test]
    fn test_update_cannot_steal_unique_key() {
        let repo = MemoryRepository::new();
        repo.insert(page("a", "/a")).unwrap();
        let mut b = repo.insert(page("b", "/b")).unwrap();
        b.path = "/a".into();

        assert!(repo.update(b).is_err());
    }
}
