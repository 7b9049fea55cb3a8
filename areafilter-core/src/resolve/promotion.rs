//! Merging spatial inclusion with completion promotions.

use std::collections::HashSet;

use log::debug;

use super::{PointIndex, RelationDecisions, WayDecisions};
use crate::{Entity, EntityKind, EntityStore, ReferencePolicy, StoreError, Way};

/// How a selected way's point list is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WayForm {
    /// Every buffered point reference, in order.
    Full,
    /// Only references to points inside the box, in order.
    Trimmed,
}

/// Final per-entity output decisions.
///
/// A point is selected iff it is inside the box or promoted. A way is
/// selected in full iff it is a candidate under way completion or promoted
/// by a relation, and trimmed iff it is any other candidate. A relation is
/// selected iff it is included or promoted.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    points: PointIndex,
    promoted_points: HashSet<u64>,
    full_ways: HashSet<u64>,
    trimmed_ways: HashSet<u64>,
    relations: HashSet<u64>,
    promoted_relations: usize,
    promoted_ways: usize,
}

impl Selection {
    /// Merge every pass's output into a single decision.
    ///
    /// Ways promoted by relation completion need their points too, so the
    /// buffer is rescanned for their point lists when any exist.
    pub fn merge<S>(
        store: &S,
        way_policy: ReferencePolicy,
        points: PointIndex,
        ways: WayDecisions,
        relations: RelationDecisions,
    ) -> Result<Self, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        let mut full_ways = relations.way_promotions().clone();
        let promoted_ways = full_ways.difference(ways.candidates()).count();
        let trimmed_ways = match way_policy {
            ReferencePolicy::Complete => {
                full_ways.extend(ways.candidates().iter().copied());
                HashSet::new()
            }
            ReferencePolicy::Trim => ways
                .candidates()
                .difference(&full_ways)
                .copied()
                .collect(),
        };

        let mut promoted_points: HashSet<u64> = ways
            .point_promotions()
            .union(relations.point_promotions())
            .copied()
            .collect();
        if !relations.way_promotions().is_empty() {
            for entity in store.iterate(EntityKind::Way) {
                let Entity::Way(way) = entity? else {
                    continue;
                };
                if relations.way_promotions().contains(&way.id) {
                    promoted_points.extend(
                        way.point_ids
                            .iter()
                            .copied()
                            .filter(|id| points.is_known(*id)),
                    );
                }
            }
        }
        promoted_points.retain(|id| !points.is_included(*id));

        let promoted_relations = relations.relation_promotions().len();
        let selected_relations = relations
            .included()
            .union(relations.relation_promotions())
            .copied()
            .collect();

        debug!(
            "selection: {} points in box, {} promoted; {} full and {} trimmed ways; {} relations",
            points.included_count(),
            promoted_points.len(),
            full_ways.len(),
            trimmed_ways.len(),
            relations.included().len() + promoted_relations
        );

        Ok(Self {
            points,
            promoted_points,
            full_ways,
            trimmed_ways,
            relations: selected_relations,
            promoted_relations,
            promoted_ways,
        })
    }

    /// Whether the point is emitted.
    #[must_use]
    pub fn point_selected(&self, id: u64) -> bool {
        self.points.is_included(id) || self.promoted_points.contains(&id)
    }

    /// How the way is emitted, if at all.
    #[must_use]
    pub fn way_form(&self, id: u64) -> Option<WayForm> {
        if self.full_ways.contains(&id) {
            Some(WayForm::Full)
        } else if self.trimmed_ways.contains(&id) {
            Some(WayForm::Trimmed)
        } else {
            None
        }
    }

    /// Whether the relation is emitted.
    #[must_use]
    pub fn relation_selected(&self, id: u64) -> bool {
        self.relations.contains(&id)
    }

    /// The point list a selected way is emitted with.
    ///
    /// References to points missing from the input are always dropped.
    #[must_use]
    pub fn shape_way(&self, way: &Way, form: WayForm) -> Vec<u64> {
        way.point_ids
            .iter()
            .copied()
            .filter(|id| match form {
                WayForm::Full => self.points.is_known(*id),
                WayForm::Trimmed => self.points.is_included(*id),
            })
            .collect()
    }

    /// Points emitted only because of a completion policy.
    #[must_use]
    pub fn promoted_points(&self) -> usize {
        self.promoted_points.len()
    }

    /// Ways emitted in full only because a relation was completed.
    #[must_use]
    pub const fn promoted_ways(&self) -> usize {
        self.promoted_ways
    }

    /// Relations emitted only because a relation was completed.
    #[must_use]
    pub const fn promoted_relations(&self) -> usize {
        self.promoted_relations
    }
}
