//! Random-access entity buffer.
//!
//! The filter stage persists every entity it receives, keyed by kind and id,
//! because completeness policies may need to look an entity up after the
//! spatial pass has rejected it. Iteration by kind replays entities in their
//! original arrival order.

use thiserror::Error;

use crate::{Entity, EntityKind};

mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryEntityStore;
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteEntityStore;

/// Lazy, fallible sequence of buffered entities of one kind.
pub type EntityIter<'a> = Box<dyn Iterator<Item = Result<Entity, StoreError>> + 'a>;

/// Key-value capability backing the filter stage.
///
/// Putting an entity whose `(kind, id)` is already buffered replaces the
/// record but keeps its original arrival position.
///
/// # Examples
///
/// ```rust
/// use areafilter_core::{Entity, EntityKind, EntityStore, MemoryEntityStore, Point};
///
/// # fn main() -> Result<(), areafilter_core::StoreError> {
/// let mut store = MemoryEntityStore::default();
/// store.put(Point::at(1, 0.0, 0.0).into())?;
/// assert!(store.get(EntityKind::Point, 1)?.is_some());
/// assert!(store.get(EntityKind::Way, 1)?.is_none());
/// # Ok(())
/// # }
/// ```
pub trait EntityStore {
    /// Buffer an entity under its kind and id.
    fn put(&mut self, entity: Entity) -> Result<(), StoreError>;

    /// Look up a buffered entity.
    fn get(&self, kind: EntityKind, id: u64) -> Result<Option<Entity>, StoreError>;

    /// Replay every buffered entity of `kind` in arrival order.
    fn iterate(&self, kind: EntityKind) -> EntityIter<'_>;

    /// Number of distinct entities of `kind` buffered.
    fn len(&self, kind: EntityKind) -> Result<u64, StoreError>;

    /// Whether nothing of any kind is buffered.
    fn is_empty(&self) -> Result<bool, StoreError> {
        for kind in EntityKind::ALL {
            if self.len(kind)? > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Drop every buffered entity and release backing storage.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Failures of the entity buffer's backing storage.
///
/// These are fatal to a filter run; the buffer is a correctness aid, so
/// nothing is retried.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An id cannot be represented by the backing store.
    #[error("{kind} id {id} exceeds the range supported by the entity store")]
    IdOutOfRange {
        /// Kind of the rejected entity.
        kind: EntityKind,
        /// Rejected id.
        id: u64,
    },
    /// The store holds more entities than it can address.
    #[error("entity store capacity exceeded after {count} {kind} records")]
    CapacityExceeded {
        /// Kind being written when the limit was hit.
        kind: EntityKind,
        /// Records already buffered.
        count: u64,
    },
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open entity store at {path}: {source}")]
    Open {
        /// Location of the SQLite database on disk.
        path: std::path::PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A SQLite statement failed.
    #[cfg(feature = "store-sqlite")]
    #[error("entity store failed to {operation}: {source}")]
    Sqlite {
        /// Operation being attempted.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A record could not be encoded for storage.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to encode {kind} {id}: {source}")]
    Encode {
        /// Kind of the record.
        kind: EntityKind,
        /// Id of the record.
        id: u64,
        /// Encoder failure from `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// A stored record could not be decoded.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to decode stored {kind} {id}: {source}")]
    Decode {
        /// Kind of the record.
        kind: EntityKind,
        /// Id of the record.
        id: u64,
        /// Decoder failure from `bincode`.
        #[source]
        source: bincode::Error,
    },
}
