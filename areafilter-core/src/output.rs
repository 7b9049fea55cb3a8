//! Output assembly: replay the buffer through the final selection.

use std::collections::HashSet;

use crate::resolve::Selection;
use crate::{
    Entity, EntityKind, EntitySink, EntityStore, FilterError, KindCounts, Member, Relation, Way,
};

/// Replay every selected entity to `sink` exactly once, points first, then
/// ways, then relations, each in arrival order.
///
/// Relation member lists keep only members that are themselves emitted, so
/// the output never references an entity it does not contain.
pub fn assemble<S, K>(
    store: &S,
    selection: &Selection,
    sink: &mut K,
) -> Result<KindCounts, FilterError>
where
    S: EntityStore + ?Sized,
    K: EntitySink + ?Sized,
{
    let mut counts = KindCounts::default();
    let mut emitted_ways = HashSet::new();
    for kind in EntityKind::ALL {
        for entity in store.iterate(kind) {
            let shaped = match entity? {
                Entity::Point(point) => selection
                    .point_selected(point.id)
                    .then_some(Entity::Point(point)),
                Entity::Way(way) => shape_way(selection, way).map(Entity::Way),
                Entity::Relation(relation) => {
                    shape_relation(selection, &emitted_ways, relation).map(Entity::Relation)
                }
            };
            let Some(shaped) = shaped else {
                continue;
            };
            match shaped.kind() {
                EntityKind::Point => counts.points += 1,
                EntityKind::Way => {
                    emitted_ways.insert(shaped.id());
                    counts.ways += 1;
                }
                EntityKind::Relation => counts.relations += 1,
            }
            sink.process(shaped)
                .map_err(|source| FilterError::Sink(Box::new(source)))?;
        }
    }
    Ok(counts)
}

fn shape_way(selection: &Selection, mut way: Way) -> Option<Way> {
    let form = selection.way_form(way.id)?;
    way.point_ids = selection.shape_way(&way, form);
    // A way left with no points has nothing to draw.
    (!way.point_ids.is_empty()).then_some(way)
}

fn shape_relation(
    selection: &Selection,
    emitted_ways: &HashSet<u64>,
    mut relation: Relation,
) -> Option<Relation> {
    if !selection.relation_selected(relation.id) {
        return None;
    }
    relation
        .members
        .retain(|member| member_emitted(selection, emitted_ways, member));
    Some(relation)
}

fn member_emitted(selection: &Selection, emitted_ways: &HashSet<u64>, member: &Member) -> bool {
    match member.kind {
        EntityKind::Point => selection.point_selected(member.id),
        EntityKind::Way => emitted_ways.contains(&member.id),
        EntityKind::Relation => selection.relation_selected(member.id),
    }
}
