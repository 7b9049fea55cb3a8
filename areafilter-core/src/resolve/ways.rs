//! Way candidacy and point promotion.

use std::collections::HashSet;

use log::debug;

use super::PointIndex;
use crate::{Entity, EntityKind, EntityStore, ReferencePolicy, StoreError, Way};

/// Outcome of the way pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WayDecisions {
    candidates: HashSet<u64>,
    known: HashSet<u64>,
    point_promotions: HashSet<u64>,
    dangling_refs: u64,
}

impl WayDecisions {
    /// Whether at least one of the way's points lies inside the box.
    #[must_use]
    pub fn is_candidate(&self, id: u64) -> bool {
        self.candidates.contains(&id)
    }

    /// Whether the way was present in the input at all.
    #[must_use]
    pub fn is_known(&self, id: u64) -> bool {
        self.known.contains(&id)
    }

    /// Candidate way ids.
    #[must_use]
    pub const fn candidates(&self) -> &HashSet<u64> {
        &self.candidates
    }

    /// Points pulled in by way completion.
    #[must_use]
    pub const fn point_promotions(&self) -> &HashSet<u64> {
        &self.point_promotions
    }

    /// Point references that name no buffered point.
    #[must_use]
    pub const fn dangling_refs(&self) -> u64 {
        self.dangling_refs
    }
}

/// Decides way inclusion from way-to-point references.
///
/// A way is a candidate iff at least one referenced point is inside the box.
/// Under [`ReferencePolicy::Complete`] every point a candidate references is
/// promoted, whatever its location.
#[derive(Debug, Clone, Copy)]
pub struct WayResolver<'a> {
    points: &'a PointIndex,
    policy: ReferencePolicy,
}

impl<'a> WayResolver<'a> {
    /// Resolve against the given point index.
    #[must_use]
    pub const fn new(points: &'a PointIndex, policy: ReferencePolicy) -> Self {
        Self { points, policy }
    }

    /// Scan every buffered way once.
    pub fn resolve<S>(&self, store: &S) -> Result<WayDecisions, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        let mut decisions = WayDecisions::default();
        for entity in store.iterate(EntityKind::Way) {
            let Entity::Way(way) = entity? else {
                continue;
            };
            self.visit(&way, &mut decisions);
        }
        debug!(
            "way pass: {} candidates of {} ways, {} points promoted",
            decisions.candidates.len(),
            decisions.known.len(),
            decisions.point_promotions.len()
        );
        Ok(decisions)
    }

    fn visit(&self, way: &Way, decisions: &mut WayDecisions) {
        decisions.known.insert(way.id);
        let mut candidate = false;
        for point_id in &way.point_ids {
            if !self.points.is_known(*point_id) {
                decisions.dangling_refs += 1;
            } else if self.points.is_included(*point_id) {
                candidate = true;
            }
        }
        if !candidate {
            return;
        }
        decisions.candidates.insert(way.id);
        if self.policy == ReferencePolicy::Complete {
            decisions.point_promotions.extend(
                way.point_ids
                    .iter()
                    .copied()
                    .filter(|point_id| self.points.is_known(*point_id)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundingBox, MemoryEntityStore, Point};
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryEntityStore {
        MemoryEntityStore::with_entities([
            Point::at(1, 0.0, 0.0).into(),
            Point::at(2, 20.0, 20.0).into(),
            Point::at(3, 30.0, 30.0).into(),
            Way::new(10, vec![1, 2]).into(),
            Way::new(11, vec![2, 3]).into(),
            Way::new(12, vec![1, 99]).into(),
        ])
    }

    #[fixture]
    fn points(store: MemoryEntityStore) -> PointIndex {
        let bbox = BoundingBox::new(-10.0, 10.0, -10.0, 10.0).expect("valid box");
        PointIndex::build(&store, &bbox).expect("memory store never fails")
    }

    #[rstest]
    fn trimming_marks_candidates_without_promotions(
        store: MemoryEntityStore,
        points: PointIndex,
    ) {
        let decisions = WayResolver::new(&points, ReferencePolicy::Trim)
            .resolve(&store)
            .expect("resolve ways");
        assert!(decisions.is_candidate(10));
        assert!(!decisions.is_candidate(11));
        assert!(decisions.is_candidate(12));
        assert!(decisions.is_known(11));
        assert!(decisions.point_promotions().is_empty());
    }

    #[rstest]
    fn completion_promotes_known_points_of_candidates(
        store: MemoryEntityStore,
        points: PointIndex,
    ) {
        let decisions = WayResolver::new(&points, ReferencePolicy::Complete)
            .resolve(&store)
            .expect("resolve ways");
        let promoted: HashSet<u64> = [1, 2].into();
        assert_eq!(decisions.point_promotions(), &promoted);
    }

    #[rstest]
    fn counts_dangling_point_references(store: MemoryEntityStore, points: PointIndex) {
        let decisions = WayResolver::new(&points, ReferencePolicy::Trim)
            .resolve(&store)
            .expect("resolve ways");
        assert_eq!(decisions.dangling_refs(), 1);
    }
}
