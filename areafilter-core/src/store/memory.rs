//! In-memory entity buffer.

use std::collections::HashMap;

use super::{EntityIter, EntityStore, StoreError};
use crate::{Entity, EntityKind};

/// Per-kind arrival-ordered records plus an id-to-slot map.
#[derive(Debug, Default)]
struct KindTable {
    records: Vec<Entity>,
    slots: HashMap<u64, usize>,
}

impl KindTable {
    fn put(&mut self, entity: Entity) {
        if let Some(record) = self
            .slots
            .get(&entity.id())
            .and_then(|slot| self.records.get_mut(*slot))
        {
            *record = entity;
            return;
        }
        self.slots.insert(entity.id(), self.records.len());
        self.records.push(entity);
    }

    fn get(&self, id: u64) -> Option<&Entity> {
        self.slots.get(&id).and_then(|slot| self.records.get(*slot))
    }
}

/// Entity buffer held entirely in memory.
///
/// Suitable for extracts; planet-scale input should use a spilling store.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    points: KindTable,
    ways: KindTable,
    relations: KindTable,
}

impl MemoryEntityStore {
    /// Create a store pre-populated with `entities`, in order.
    pub fn with_entities<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut store = Self::default();
        for entity in entities {
            store.table_mut(entity.kind()).put(entity);
        }
        store
    }

    const fn table(&self, kind: EntityKind) -> &KindTable {
        match kind {
            EntityKind::Point => &self.points,
            EntityKind::Way => &self.ways,
            EntityKind::Relation => &self.relations,
        }
    }

    const fn table_mut(&mut self, kind: EntityKind) -> &mut KindTable {
        match kind {
            EntityKind::Point => &mut self.points,
            EntityKind::Way => &mut self.ways,
            EntityKind::Relation => &mut self.relations,
        }
    }
}

impl EntityStore for MemoryEntityStore {
    fn put(&mut self, entity: Entity) -> Result<(), StoreError> {
        self.table_mut(entity.kind()).put(entity);
        Ok(())
    }

    fn get(&self, kind: EntityKind, id: u64) -> Result<Option<Entity>, StoreError> {
        Ok(self.table(kind).get(id).cloned())
    }

    fn iterate(&self, kind: EntityKind) -> EntityIter<'_> {
        Box::new(self.table(kind).records.iter().cloned().map(Ok))
    }

    fn len(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let count = self.table(kind).records.len();
        u64::try_from(count).map_err(|_| StoreError::CapacityExceeded {
            kind,
            count: u64::MAX,
        })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        *self = Self::default();
        Ok(())
    }
}
