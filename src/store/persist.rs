//! Embedded `redb` backend (feature `persist`).
//!
//! Rows are stored as JSON under their identity sequence number, one table
//! per entity type. An in-memory mirror serves every read; writes go to the
//! mirror and then through to disk.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::entity::{Entity, Identity};
use super::memory::MemoryRepository;
use super::repository::{Predicate, Repository, StoreError};

fn backend(err: impl Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

const fn table<E: Entity>() -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(E::TABLE)
}

pub struct RedbRepository<E: Entity> {
    db: Arc<Database>,
    rows: MemoryRepository<E>,
}

impl<E> RedbRepository<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    /// Load every stored row of `E` into memory.
    pub fn open(db: Arc<Database>) -> Result<Self, StoreError> {
        let rows = MemoryRepository::new();

        let read = db.begin_read().map_err(backend)?;
        match read.open_table(table::<E>()) {
            Ok(stored) => {
                for entry in stored.iter().map_err(backend)? {
                    let (_, value) = entry.map_err(backend)?;
                    let entity: E = serde_json::from_slice(value.value()).map_err(backend)?;
                    rows.restore(entity);
                }
            }
            // Fresh database: the table appears on first write
            Err(TableError::TableDoesNotExist(_)) => {}
            Err(err) => return Err(backend(err)),
        }

        Ok(Self { db, rows })
    }

    fn persist(&self, entity: &E) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entity).map_err(backend)?;
        let txn = self.db.begin_write().map_err(backend)?;
        {
            let mut stored = txn.open_table(table::<E>()).map_err(backend)?;
            stored
                .insert(entity.id().to_sequence(), bytes.as_slice())
                .map_err(backend)?;
        }
        txn.commit().map_err(backend)
    }
}

#[async_trait]
impl<E> Repository<E> for RedbRepository<E>
where
    E: Entity + Serialize + DeserializeOwned,
{
    fn get(&self, predicate: Predicate<'_, E>) -> Option<E> {
        self.rows.get(predicate)
    }

    async fn get_async(&self, predicate: Predicate<'_, E>) -> Option<E> {
        self.rows.get(predicate)
    }

    fn insert(&self, entity: E) -> Result<E, StoreError> {
        let stored = self.rows.insert(entity)?;
        self.persist(&stored)?;
        Ok(stored)
    }

    fn update(&self, entity: E) -> Result<(), StoreError> {
        self.rows.update(entity.clone())?;
        self.persist(&entity)
    }

    fn all(&self) -> Vec<E> {
        self.rows.all()
    }
}
