//! Relation inclusion: base rule, cascade closure and completion.
//!
//! Relations are loaded into a compact graph whose relation-to-relation
//! edges are slot indices. Inclusion is a monotone flag per slot, computed
//! by repeated scans until a scan adds nothing, so cyclic graphs terminate
//! and deep graphs never recurse.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::{PointIndex, WayDecisions};
use crate::{Entity, EntityKind, EntityStore, ReferencePolicy, StoreError};

/// A member reference whose target is known to be buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Point(u64),
    Way(u64),
    Relation(usize),
}

/// Compact relation membership graph.
///
/// Dangling members are dropped while building and counted.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    ids: Vec<u64>,
    edges: Vec<Vec<Edge>>,
    dangling_members: u64,
}

impl RelationGraph {
    /// Load every buffered relation, resolving members against the point
    /// and way passes.
    pub fn build<S>(
        store: &S,
        points: &PointIndex,
        ways: &WayDecisions,
    ) -> Result<Self, StoreError>
    where
        S: EntityStore + ?Sized,
    {
        let mut ids = Vec::new();
        let mut slots = HashMap::new();
        let mut raw_members = Vec::new();
        for entity in store.iterate(EntityKind::Relation) {
            let Entity::Relation(relation) = entity? else {
                continue;
            };
            let members: Vec<(EntityKind, u64)> = relation
                .members
                .iter()
                .map(|member| (member.kind, member.id))
                .collect();
            // Re-buffered ids replace their earlier record in the store.
            if let Some(slot) = slots.get(&relation.id).copied() {
                if let Some(existing) = raw_members.get_mut(slot) {
                    *existing = members;
                }
                continue;
            }
            slots.insert(relation.id, ids.len());
            ids.push(relation.id);
            raw_members.push(members);
        }

        let mut dangling_members = 0_u64;
        let edges: Vec<Vec<Edge>> = raw_members
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|(kind, id)| {
                        let edge = match kind {
                            EntityKind::Point => points.is_known(id).then_some(Edge::Point(id)),
                            EntityKind::Way => ways.is_known(id).then_some(Edge::Way(id)),
                            EntityKind::Relation => slots.get(&id).copied().map(Edge::Relation),
                        };
                        if edge.is_none() {
                            dangling_members += 1;
                        }
                        edge
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(Self {
            ids,
            edges,
            dangling_members,
        })
    }

    /// Number of relations in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the graph holds no relations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Members that name no buffered entity.
    #[must_use]
    pub const fn dangling_members(&self) -> u64 {
        self.dangling_members
    }

    fn edges(&self, slot: usize) -> &[Edge] {
        self.edges.get(slot).map_or(&[], Vec::as_slice)
    }

    fn ids_where(&self, flags: &[bool]) -> HashSet<u64> {
        self.ids
            .iter()
            .zip(flags)
            .filter_map(|(id, flag)| flag.then_some(*id))
            .collect()
    }
}

/// Outcome of the relation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDecisions {
    included: HashSet<u64>,
    relation_promotions: HashSet<u64>,
    way_promotions: HashSet<u64>,
    point_promotions: HashSet<u64>,
    scans: u32,
}

impl RelationDecisions {
    /// Relations included by the base or cascade rule.
    #[must_use]
    pub const fn included(&self) -> &HashSet<u64> {
        &self.included
    }

    /// Relations pulled in by completion without being included themselves.
    #[must_use]
    pub const fn relation_promotions(&self) -> &HashSet<u64> {
        &self.relation_promotions
    }

    /// Ways pulled in by completion.
    #[must_use]
    pub const fn way_promotions(&self) -> &HashSet<u64> {
        &self.way_promotions
    }

    /// Points pulled in by completion.
    #[must_use]
    pub const fn point_promotions(&self) -> &HashSet<u64> {
        &self.point_promotions
    }

    /// Inclusion scans performed before reaching the fixed point.
    #[must_use]
    pub const fn scans(&self) -> u32 {
        self.scans
    }
}

/// Decides relation inclusion and member promotion.
///
/// A relation is included if any point or way member is included. With
/// cascading, a relation that references an included relation is included
/// too. Under [`ReferencePolicy::Complete`] every member of an included
/// relation is promoted, and promoted relations are completed in turn.
///
/// Cascading only starts from relations included by the base rule or by an
/// earlier cascade. A relation reached through completion is emitted, but its
/// parents are not cascaded in.
#[derive(Debug, Clone, Copy)]
pub struct RelationResolver<'a> {
    points: &'a PointIndex,
    ways: &'a WayDecisions,
    cascading: bool,
    policy: ReferencePolicy,
}

impl<'a> RelationResolver<'a> {
    /// Resolve against the point and way passes.
    #[must_use]
    pub const fn new(
        points: &'a PointIndex,
        ways: &'a WayDecisions,
        cascading: bool,
        policy: ReferencePolicy,
    ) -> Self {
        Self {
            points,
            ways,
            cascading,
            policy,
        }
    }

    /// Run the fixed-point closure and, if requested, completion.
    #[must_use]
    pub fn resolve(&self, graph: &RelationGraph) -> RelationDecisions {
        let (included, scans) = self.close(graph);
        let mut decisions = RelationDecisions {
            included: graph.ids_where(&included),
            scans,
            ..RelationDecisions::default()
        };
        if self.policy == ReferencePolicy::Complete {
            let reached = complete(graph, &included, &mut decisions);
            decisions.relation_promotions = graph
                .ids_where(&reached)
                .difference(&decisions.included)
                .copied()
                .collect();
        }
        debug!(
            "relation pass: {} of {} included after {} scans, {} promoted",
            decisions.included.len(),
            graph.len(),
            decisions.scans,
            decisions.relation_promotions.len()
        );
        decisions
    }

    fn close(&self, graph: &RelationGraph) -> (Vec<bool>, u32) {
        let mut included = vec![false; graph.len()];
        let mut scans = 0_u32;
        loop {
            scans += 1;
            let mut changed = false;
            for slot in 0..graph.len() {
                if included.get(slot).copied().unwrap_or(true) {
                    continue;
                }
                let hit = graph.edges(slot).iter().any(|edge| match *edge {
                    Edge::Point(id) => self.points.is_included(id),
                    Edge::Way(id) => self.ways.is_candidate(id),
                    Edge::Relation(target) => {
                        self.cascading && included.get(target).copied().unwrap_or(false)
                    }
                });
                if hit && let Some(flag) = included.get_mut(slot) {
                    *flag = true;
                    changed = true;
                }
            }
            // Without cascading, no inclusion depends on another relation.
            if !changed || !self.cascading {
                break;
            }
        }
        (included, scans)
    }
}

/// Walk from every included relation, promoting members. Returns the set of
/// relations reached (included ones among them).
fn complete(
    graph: &RelationGraph,
    included: &[bool],
    decisions: &mut RelationDecisions,
) -> Vec<bool> {
    let mut reached = included.to_vec();
    let mut work: Vec<usize> = (0..graph.len())
        .filter(|slot| included.get(*slot).copied().unwrap_or(false))
        .collect();
    while let Some(slot) = work.pop() {
        for edge in graph.edges(slot) {
            match *edge {
                Edge::Point(id) => {
                    decisions.point_promotions.insert(id);
                }
                Edge::Way(id) => {
                    decisions.way_promotions.insert(id);
                }
                Edge::Relation(target) => {
                    if let Some(flag) = reached.get_mut(target)
                        && !*flag
                    {
                        *flag = true;
                        work.push(target);
                    }
                }
            }
        }
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::WayResolver;
    use crate::{BoundingBox, Member, MemoryEntityStore, Point, Relation, Way};
    use rstest::{fixture, rstest};

    struct Passes {
        points: PointIndex,
        ways: WayDecisions,
        graph: RelationGraph,
    }

    fn passes(store: &MemoryEntityStore) -> Passes {
        let bbox = BoundingBox::new(-10.0, 10.0, -10.0, 10.0).expect("valid box");
        let points = PointIndex::build(store, &bbox).expect("points");
        let ways = WayResolver::new(&points, ReferencePolicy::Trim)
            .resolve(store)
            .expect("ways");
        let graph = RelationGraph::build(store, &points, &ways).expect("graph");
        Passes {
            points,
            ways,
            graph,
        }
    }

    /// R1 -> R2 -> W2 -> P3 (inside), plus an outside point and a cycle
    /// R3 <-> R4 hanging off R2.
    #[fixture]
    fn nested() -> MemoryEntityStore {
        MemoryEntityStore::with_entities([
            Point::at(3, 0.0, 0.0).into(),
            Point::at(4, 50.0, 50.0).into(),
            Way::new(2, vec![3]).into(),
            Relation::new(1, vec![Member::relation(2)]).into(),
            Relation::new(2, vec![Member::way(2)]).into(),
            Relation::new(3, vec![Member::relation(4), Member::point(4)]).into(),
            Relation::new(4, vec![Member::relation(3), Member::relation(2)]).into(),
        ])
    }

    fn resolve(
        store: &MemoryEntityStore,
        cascading: bool,
        policy: ReferencePolicy,
    ) -> RelationDecisions {
        let passes = passes(store);
        RelationResolver::new(&passes.points, &passes.ways, cascading, policy)
            .resolve(&passes.graph)
    }

    #[rstest]
    fn base_rule_ignores_relation_members(nested: MemoryEntityStore) {
        let decisions = resolve(&nested, false, ReferencePolicy::Trim);
        assert_eq!(decisions.included(), &HashSet::from([2]));
        assert_eq!(decisions.scans(), 1);
    }

    #[rstest]
    fn cascade_reaches_parents_through_cycles(nested: MemoryEntityStore) {
        let decisions = resolve(&nested, true, ReferencePolicy::Trim);
        assert_eq!(decisions.included(), &HashSet::from([1, 2, 3, 4]));
        assert!(decisions.scans() <= 5, "took {} scans", decisions.scans());
    }

    #[rstest]
    fn completion_promotes_members_of_included_relations(nested: MemoryEntityStore) {
        let decisions = resolve(&nested, true, ReferencePolicy::Complete);
        assert_eq!(decisions.point_promotions(), &HashSet::from([4]));
        assert_eq!(decisions.way_promotions(), &HashSet::from([2]));
        assert!(decisions.relation_promotions().is_empty());
    }

    #[rstest]
    fn completion_reaches_child_relations_without_cascade() {
        let store = MemoryEntityStore::with_entities([
            Point::at(1, 0.0, 0.0).into(),
            Point::at(2, 50.0, 50.0).into(),
            Relation::new(10, vec![Member::point(1), Member::relation(11)]).into(),
            Relation::new(11, vec![Member::point(2), Member::relation(10)]).into(),
        ]);
        let decisions = resolve(&store, false, ReferencePolicy::Complete);
        assert_eq!(decisions.included(), &HashSet::from([10]));
        assert_eq!(decisions.relation_promotions(), &HashSet::from([11]));
        assert_eq!(decisions.point_promotions(), &HashSet::from([1, 2]));
    }

    #[rstest]
    fn completed_relations_do_not_cascade_to_their_parents() {
        let store = MemoryEntityStore::with_entities([
            Point::at(1, 0.0, 0.0).into(),
            Point::at(2, 50.0, 50.0).into(),
            Way::new(5, vec![1]).into(),
            Relation::new(20, vec![Member::point(2)]).into(),
            Relation::new(22, vec![Member::relation(20)]).into(),
            Relation::new(23, vec![Member::relation(20), Member::way(5)]).into(),
        ]);
        let decisions = resolve(&store, true, ReferencePolicy::Complete);
        assert_eq!(decisions.included(), &HashSet::from([23]));
        assert_eq!(decisions.relation_promotions(), &HashSet::from([20]));
        assert_eq!(decisions.point_promotions(), &HashSet::from([2]));
        assert!(!decisions.included().contains(&22));
        assert!(!decisions.relation_promotions().contains(&22));
    }

    #[rstest]
    fn dangling_members_are_dropped_and_counted() {
        let store = MemoryEntityStore::with_entities([
            Point::at(1, 0.0, 0.0).into(),
            Relation::new(
                10,
                vec![
                    Member::point(1),
                    Member::point(77),
                    Member::way(78),
                    Member::relation(79),
                ],
            )
            .into(),
        ]);
        let passes = passes(&store);
        assert_eq!(passes.graph.dangling_members(), 3);
        let decisions =
            RelationResolver::new(&passes.points, &passes.ways, true, ReferencePolicy::Complete)
                .resolve(&passes.graph);
        assert_eq!(decisions.included(), &HashSet::from([10]));
        assert_eq!(decisions.point_promotions(), &HashSet::from([1]));
    }

    #[rstest]
    fn self_reference_terminates() {
        let store =
            MemoryEntityStore::with_entities([Relation::new(1, vec![Member::relation(1)]).into()]);
        let decisions = resolve(&store, true, ReferencePolicy::Complete);
        assert!(decisions.included().is_empty());
        assert!(decisions.relation_promotions().is_empty());
    }
}
