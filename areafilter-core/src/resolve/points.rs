//! Point inclusion index.

use std::collections::HashSet;

use crate::{BoundingBox, Entity, EntityKind, EntityStore, StoreError};

/// Ids of buffered points, and the subset inside the box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointIndex {
    included: HashSet<u64>,
    known: HashSet<u64>,
}

impl PointIndex {
    /// Scan every buffered point once, testing it against `bbox`.
    pub fn build<S>(store: &S, bbox: &BoundingBox) -> Result<Self, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        let mut index = Self::default();
        for entity in store.iterate(EntityKind::Point) {
            let Entity::Point(point) = entity? else {
                continue;
            };
            index.known.insert(point.id);
            if bbox.contains_point(&point) {
                index.included.insert(point.id);
            }
        }
        Ok(index)
    }

    /// Whether the point lies inside the box.
    #[must_use]
    pub fn is_included(&self, id: u64) -> bool {
        self.included.contains(&id)
    }

    /// Whether the point was present in the input at all.
    #[must_use]
    pub fn is_known(&self, id: u64) -> bool {
        self.known.contains(&id)
    }

    /// Ids of points inside the box.
    #[must_use]
    pub const fn included(&self) -> &HashSet<u64> {
        &self.included
    }

    /// Number of points inside the box.
    #[must_use]
    pub fn included_count(&self) -> usize {
        self.included.len()
    }

    /// Number of distinct buffered points.
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.known.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryEntityStore, Point, Way};
    use rstest::rstest;

    #[rstest]
    fn selects_points_inside_the_box() {
        let store = MemoryEntityStore::with_entities([
            Point::at(1, 0.0, 0.0).into(),
            Point::at(2, 20.0, 20.0).into(),
            Point::at(3, 10.0, -10.0).into(),
            Way::new(1, vec![1, 2]).into(),
        ]);
        let bbox = BoundingBox::new(-10.0, 10.0, -10.0, 10.0).expect("valid box");
        let index = PointIndex::build(&store, &bbox).expect("memory store never fails");

        assert!(index.is_included(1));
        assert!(!index.is_included(2));
        assert!(index.is_included(3));
        assert!(index.is_known(2));
        assert!(!index.is_known(4));
        assert_eq!(index.included_count(), 2);
        assert_eq!(index.known_count(), 3);
    }
}
