//! SQLite-backed entity buffer that spills to disk.
//!
//! Records are `bincode` payloads in a single table keyed by `(kind, id)`.
//! A per-store sequence number preserves arrival order. Writes are grouped
//! into transactions of [`WRITE_BATCH`] records; the connection reads its
//! own uncommitted writes, so lookups never force a commit.

use std::{
    collections::VecDeque,
    fmt,
    path::{Path, PathBuf},
};

use rusqlite::{Connection, OptionalExtension, params};

use super::{EntityIter, EntityStore, StoreError};
use crate::{Entity, EntityKind, Point, Relation, Way};

/// Records written per transaction.
const WRITE_BATCH: u32 = 10_000;

/// Records fetched per page while iterating.
const READ_PAGE: i64 = 4_096;

const SCHEMA: &str = "
    PRAGMA synchronous = OFF;
    PRAGMA temp_store = MEMORY;
    CREATE TABLE IF NOT EXISTS entities (
        kind INTEGER NOT NULL,
        id INTEGER NOT NULL,
        seq INTEGER NOT NULL,
        payload BLOB NOT NULL,
        PRIMARY KEY (kind, id)
    );
    CREATE INDEX IF NOT EXISTS entities_arrival ON entities (kind, seq);
";

/// Entity buffer persisted in a SQLite database.
pub struct SqliteEntityStore {
    connection: Connection,
    path: Option<PathBuf>,
    next_seq: i64,
    pending_writes: u32,
}

impl fmt::Debug for SqliteEntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteEntityStore")
            .field("path", &self.path)
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

impl SqliteEntityStore {
    /// Open (or create) a buffer database at `path`.
    ///
    /// Existing rows are discarded; the buffer never outlives one run.
    pub fn open<P>(path: P) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut store = Self::initialise(connection, Some(path.to_path_buf()))?;
        store.clear()?;
        Ok(store)
    }

    /// Create a buffer held in SQLite's in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::initialise(connection, None)
    }

    /// Location of the backing database, if it lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialise(connection: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        connection
            .execute_batch(SCHEMA)
            .map_err(|source| StoreError::Sqlite {
                operation: "initialise schema",
                source,
            })?;
        Ok(Self {
            connection,
            path,
            next_seq: 0,
            pending_writes: 0,
        })
    }

    fn begin_if_idle(&mut self) -> Result<(), StoreError> {
        if self.pending_writes == 0 && self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN")
                .map_err(|source| StoreError::Sqlite {
                    operation: "begin write batch",
                    source,
                })?;
        }
        Ok(())
    }

    fn commit_pending(&mut self) -> Result<(), StoreError> {
        if !self.connection.is_autocommit() {
            self.connection
                .execute_batch("COMMIT")
                .map_err(|source| StoreError::Sqlite {
                    operation: "commit write batch",
                    source,
                })?;
        }
        self.pending_writes = 0;
        Ok(())
    }

    fn fetch_page(
        &self,
        kind: EntityKind,
        after: i64,
    ) -> Result<Vec<(i64, Entity)>, StoreError> {
        let mut statement = self
            .connection
            .prepare_cached(
                "SELECT seq, id, payload FROM entities
                 WHERE kind = ?1 AND seq > ?2
                 ORDER BY seq
                 LIMIT ?3",
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare arrival scan",
                source,
            })?;
        let rows = statement
            .query_map(params![kind_code(kind), after, READ_PAGE], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|source| StoreError::Sqlite {
                operation: "scan entities",
                source,
            })?;
        let mut page = Vec::new();
        for row in rows {
            let (seq, raw_id, payload) = row.map_err(|source| StoreError::Sqlite {
                operation: "read entity row",
                source,
            })?;
            page.push((seq, decode(kind, raw_id, &payload)?));
        }
        Ok(page)
    }
}

impl EntityStore for SqliteEntityStore {
    fn put(&mut self, entity: Entity) -> Result<(), StoreError> {
        let kind = entity.kind();
        let id = entity.id();
        let key = store_id(kind, id)?;
        let payload = encode(&entity)?;
        self.begin_if_idle()?;
        self.connection
            .prepare_cached(
                "INSERT INTO entities (kind, id, seq, payload) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (kind, id) DO UPDATE SET payload = excluded.payload",
            )
            .and_then(|mut statement| {
                statement.execute(params![kind_code(kind), key, self.next_seq, payload])
            })
            .map_err(|source| StoreError::Sqlite {
                operation: "insert entity",
                source,
            })?;
        self.next_seq = self
            .next_seq
            .checked_add(1)
            .ok_or(StoreError::CapacityExceeded {
                kind,
                count: u64::try_from(self.next_seq).unwrap_or(u64::MAX),
            })?;
        self.pending_writes += 1;
        if self.pending_writes >= WRITE_BATCH {
            self.commit_pending()?;
        }
        Ok(())
    }

    fn get(&self, kind: EntityKind, id: u64) -> Result<Option<Entity>, StoreError> {
        let key = store_id(kind, id)?;
        let payload = self
            .connection
            .prepare_cached("SELECT payload FROM entities WHERE kind = ?1 AND id = ?2")
            .and_then(|mut statement| {
                statement
                    .query_row(params![kind_code(kind), key], |row| row.get::<_, Vec<u8>>(0))
                    .optional()
            })
            .map_err(|source| StoreError::Sqlite {
                operation: "look up entity",
                source,
            })?;
        payload
            .map(|bytes| decode(kind, key, &bytes))
            .transpose()
    }

    fn iterate(&self, kind: EntityKind) -> EntityIter<'_> {
        Box::new(ArrivalScan {
            store: self,
            kind,
            after: -1,
            page: VecDeque::new(),
            exhausted: false,
        })
    }

    fn len(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM entities WHERE kind = ?1",
                params![kind_code(kind)],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::Sqlite {
                operation: "count entities",
                source,
            })?;
        u64::try_from(count).map_err(|_| StoreError::CapacityExceeded { kind, count: 0 })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.commit_pending()?;
        self.connection
            .execute("DELETE FROM entities", [])
            .map_err(|source| StoreError::Sqlite {
                operation: "clear entities",
                source,
            })?;
        self.connection
            .execute_batch("VACUUM")
            .map_err(|source| StoreError::Sqlite {
                operation: "reclaim buffer space",
                source,
            })?;
        self.next_seq = 0;
        Ok(())
    }
}

/// Lazy page-by-page replay of one kind in arrival order.
struct ArrivalScan<'a> {
    store: &'a SqliteEntityStore,
    kind: EntityKind,
    after: i64,
    page: VecDeque<Entity>,
    exhausted: bool,
}

impl Iterator for ArrivalScan<'_> {
    type Item = Result<Entity, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            match self.store.fetch_page(self.kind, self.after) {
                Ok(rows) => {
                    self.exhausted = i64::try_from(rows.len()).map_or(true, |n| n < READ_PAGE);
                    if let Some((seq, _)) = rows.last() {
                        self.after = *seq;
                    }
                    self.page.extend(rows.into_iter().map(|(_, entity)| entity));
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
        self.page.pop_front().map(Ok)
    }
}

const fn kind_code(kind: EntityKind) -> i64 {
    match kind {
        EntityKind::Point => 0,
        EntityKind::Way => 1,
        EntityKind::Relation => 2,
    }
}

fn store_id(kind: EntityKind, id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::IdOutOfRange { kind, id })
}

fn encode(entity: &Entity) -> Result<Vec<u8>, StoreError> {
    let encoded = match entity {
        Entity::Point(point) => bincode::serialize(point),
        Entity::Way(way) => bincode::serialize(way),
        Entity::Relation(relation) => bincode::serialize(relation),
    };
    encoded.map_err(|source| StoreError::Encode {
        kind: entity.kind(),
        id: entity.id(),
        source,
    })
}

fn decode(kind: EntityKind, raw_id: i64, payload: &[u8]) -> Result<Entity, StoreError> {
    let decoded = match kind {
        EntityKind::Point => bincode::deserialize::<Point>(payload).map(Entity::Point),
        EntityKind::Way => bincode::deserialize::<Way>(payload).map(Entity::Way),
        EntityKind::Relation => bincode::deserialize::<Relation>(payload).map(Entity::Relation),
    };
    decoded.map_err(|source| StoreError::Decode {
        kind,
        id: raw_id.unsigned_abs(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Member, Metadata, Tags};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    fn ids(store: &SqliteEntityStore, kind: EntityKind) -> Vec<u64> {
        store
            .iterate(kind)
            .map(|entity| entity.expect("decode entity").id())
            .collect()
    }

    #[fixture]
    fn temp_db() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("buffer.sqlite");
        (dir, path)
    }

    #[rstest]
    fn round_trips_every_kind_with_attributes() {
        let mut store = SqliteEntityStore::in_memory().expect("open store");
        let point = Point::at(1, 51.5, -0.1)
            .with_tags(Tags::from([("name".to_owned(), "Bank".to_owned())]))
            .with_metadata(Metadata {
                version: Some(3),
                user: Some("mapper".into()),
                ..Metadata::default()
            });
        let way = Way::new(1, vec![1, 2, 1]);
        let relation = Relation::new(9, vec![Member::new(EntityKind::Way, 1, "outer")]);
        for entity in [
            Entity::from(point.clone()),
            way.clone().into(),
            relation.clone().into(),
        ] {
            store.put(entity).expect("put entity");
        }

        assert_eq!(
            store.get(EntityKind::Point, 1).expect("get"),
            Some(point.into())
        );
        assert_eq!(store.get(EntityKind::Way, 1).expect("get"), Some(way.into()));
        assert_eq!(
            store.get(EntityKind::Relation, 9).expect("get"),
            Some(relation.into())
        );
        assert_eq!(store.get(EntityKind::Relation, 1).expect("get"), None);
    }

    #[rstest]
    fn iteration_spans_pages_in_arrival_order() {
        let mut store = SqliteEntityStore::in_memory().expect("open store");
        let total = u64::try_from(READ_PAGE).expect("page size fits") * 2 + 3;
        for id in (0..total).rev() {
            store.put(Point::at(id, 0.0, 0.0).into()).expect("put point");
        }
        let expected: Vec<u64> = (0..total).rev().collect();
        assert_eq!(ids(&store, EntityKind::Point), expected);
        assert_eq!(store.len(EntityKind::Point).expect("len"), total);
        assert!(ids(&store, EntityKind::Way).is_empty());
    }

    #[rstest]
    fn replacing_keeps_arrival_position() {
        let mut store = SqliteEntityStore::in_memory().expect("open store");
        store.put(Way::new(7, vec![1]).into()).expect("put");
        store.put(Way::new(3, vec![1]).into()).expect("put");
        store.put(Way::new(7, vec![1, 2]).into()).expect("put");
        assert_eq!(ids(&store, EntityKind::Way), vec![7, 3]);
        assert_eq!(
            store.get(EntityKind::Way, 7).expect("get"),
            Some(Way::new(7, vec![1, 2]).into())
        );
    }

    #[rstest]
    fn rejects_ids_beyond_sqlite_range() {
        let mut store = SqliteEntityStore::in_memory().expect("open store");
        let err = store
            .put(Point::at(u64::MAX, 0.0, 0.0).into())
            .expect_err("id too large");
        assert!(matches!(err, StoreError::IdOutOfRange { id: u64::MAX, .. }));
    }

    #[rstest]
    fn file_store_discards_previous_contents(
        #[from(temp_db)] (_dir, path): (TempDir, PathBuf),
    ) {
        {
            let mut store = SqliteEntityStore::open(&path).expect("open store");
            store.put(Point::at(1, 0.0, 0.0).into()).expect("put");
            store.clear().expect("commit via clear");
            store.put(Point::at(2, 0.0, 0.0).into()).expect("put");
            assert_eq!(store.path(), Some(path.as_path()));
        }
        let reopened = SqliteEntityStore::open(&path).expect("reopen store");
        assert!(reopened.is_empty().expect("is_empty"));
    }

    #[rstest]
    fn clearing_returns_the_file_to_its_empty_size(
        #[from(temp_db)] (_dir, path): (TempDir, PathBuf),
    ) {
        let file_size = |path: &Path| std::fs::metadata(path).expect("stat buffer").len();
        let mut store = SqliteEntityStore::open(&path).expect("open store");
        let empty = file_size(&path);
        let tags = Tags::from([("note".to_owned(), "x".repeat(512))]);
        for id in 0..2_000 {
            store
                .put(Point::at(id, 0.0, 0.0).with_tags(tags.clone()).into())
                .expect("put point");
        }
        store.clear().expect("clear");
        store.put(Point::at(1, 0.0, 0.0).into()).expect("put");
        store.clear().expect("clear again");
        let filled_then_cleared = file_size(&path);
        assert!(
            filled_then_cleared <= empty.max(64 * 1024),
            "buffer kept {filled_then_cleared} bytes after clearing (empty was {empty})"
        );
        assert!(store.is_empty().expect("is_empty"));
    }

    #[rstest]
    fn open_reports_unreachable_paths() {
        let err = SqliteEntityStore::open("/non-existent/dir/buffer.sqlite")
            .expect_err("missing directory");
        assert!(matches!(err, StoreError::Open { .. }));
    }
}
