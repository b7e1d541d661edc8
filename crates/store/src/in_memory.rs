use std::collections::HashMap;
use std::sync::RwLock;

use crate::collection::{Collection, Record, StoreError, StoreResult};

/// In-memory row collection.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryCollection<T: Record> {
    rows: RwLock<HashMap<T::Id, T>>,
}

impl<T: Record> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Record> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Collection<T> for InMemoryCollection<T> {
    fn insert(&self, row: T) -> StoreResult<T> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let id = row.id();
        if rows.contains_key(&id) {
            return Err(StoreError::DuplicateId(format!("{id:?}")));
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    fn get(&self, id: T::Id) -> StoreResult<Option<T>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(rows.get(&id).cloned())
    }

    fn replace(&self, row: T) -> StoreResult<T> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let id = row.id();
        if !rows.contains_key(&id) {
            return Err(StoreError::RowNotFound);
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    fn delete(&self, id: T::Id) -> StoreResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        if rows.remove(&id).is_none() {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    fn select(&self, filter: &dyn Fn(&T) -> bool) -> StoreResult<Vec<T>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(rows.values().filter(|r| filter(r)).cloned().collect())
    }

    fn count(&self, filter: &dyn Fn(&T) -> bool) -> StoreResult<usize> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(rows.values().filter(|r| filter(r)).count())
    }
}
