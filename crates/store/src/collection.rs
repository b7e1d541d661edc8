use std::sync::Arc;

use thiserror::Error;

use verdant_core::DomainError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Row store operation error.
///
/// These are **infrastructure errors** (storage, lock state) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No row with the given id exists in the collection.
    #[error("row not found")]
    RowNotFound,

    /// A row with the given id already exists (insert is not upsert).
    #[error("duplicate row id: {0}")]
    DuplicateId(String),

    /// The store's internal state is unusable (e.g. poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::RowNotFound => DomainError::NotFound,
            other => DomainError::storage(other.to_string()),
        }
    }
}

/// A row that can live in a [`Collection`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Strongly-typed row identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Returns the row identifier.
    fn id(&self) -> Self::Id;
}

/// One persistent collection of rows (e.g. `batches`, `movement_records`).
///
/// Five primitives per collection: insert, replace-by-id, delete-by-id,
/// select-with-filter, count-with-filter (plus point reads). Each call is
/// individually atomic; there is **no** way to group calls into a
/// transaction. Callers that need multi-row workflows layer their own
/// partial-failure semantics on top.
pub trait Collection<T: Record>: Send + Sync {
    /// Insert a new row. Fails if a row with the same id already exists.
    fn insert(&self, row: T) -> StoreResult<T>;

    /// Point read by id, including rows a caller may consider inactive.
    fn get(&self, id: T::Id) -> StoreResult<Option<T>>;

    /// Replace the row with the same id. Fails if it does not exist.
    fn replace(&self, row: T) -> StoreResult<T>;

    /// Delete the row by id. Fails if it does not exist.
    fn delete(&self, id: T::Id) -> StoreResult<()>;

    /// All rows matching the predicate, in unspecified order.
    fn select(&self, filter: &dyn Fn(&T) -> bool) -> StoreResult<Vec<T>>;

    /// Number of rows matching the predicate.
    fn count(&self, filter: &dyn Fn(&T) -> bool) -> StoreResult<usize>;
}

impl<T, S> Collection<T> for Arc<S>
where
    T: Record,
    S: Collection<T> + ?Sized,
{
    fn insert(&self, row: T) -> StoreResult<T> {
        (**self).insert(row)
    }

    fn get(&self, id: T::Id) -> StoreResult<Option<T>> {
        (**self).get(id)
    }

    fn replace(&self, row: T) -> StoreResult<T> {
        (**self).replace(row)
    }

    fn delete(&self, id: T::Id) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn select(&self, filter: &dyn Fn(&T) -> bool) -> StoreResult<Vec<T>> {
        (**self).select(filter)
    }

    fn count(&self, filter: &dyn Fn(&T) -> bool) -> StoreResult<usize> {
        (**self).count(filter)
    }
}
