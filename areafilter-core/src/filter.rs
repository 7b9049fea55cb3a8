//! The area filter pipeline stage.
//!
//! Upstream entities are only buffered while the stream is open. The end of
//! stream triggers resolution over the buffer and the ordered replay to the
//! downstream sink, followed by the downstream end marker.

use log::debug;
use thiserror::Error;

use crate::output::assemble;
use crate::resolve::{PointIndex, RelationGraph, RelationResolver, Selection, WayResolver};
use crate::{
    Entity, EntityKind, EntitySink, EntityStore, FilterOptions, FilterReport, KindCounts,
    MemoryEntityStore, StoreError,
};

/// Errors aborting a filter run. No output written before the error should be
/// treated as usable.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The entity buffer failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The downstream sink rejected an entity or the end marker.
    #[error("downstream sink failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// An entity arrived after the end-of-stream marker.
    #[error("{kind} {id} arrived after the stream was completed")]
    StreamClosed {
        /// Kind of the late entity.
        kind: EntityKind,
        /// Id of the late entity.
        id: u64,
    },
    /// The end-of-stream marker arrived a second time.
    #[error("the stream was already completed")]
    AlreadyCompleted,
}

/// Streaming stage filtering entities down to a bounding box.
///
/// `AreaFilter` is itself an [`EntitySink`], so it slots between any
/// producer and consumer.
///
/// # Examples
/// ```
/// use areafilter_core::{
///     AreaFilter, Entity, EntitySink, FilterOptions, MemoryEntityStore, Point, Way,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = FilterOptions::from_assignments(["left=-10", "right=10", "bottom=-10", "top=10"])?;
/// let mut output: Vec<Entity> = Vec::new();
/// let mut filter = AreaFilter::new(options, MemoryEntityStore::default(), &mut output);
/// filter.process(Point::at(1, 0.0, 0.0).into())?;
/// filter.process(Point::at(2, 20.0, 20.0).into())?;
/// filter.process(Way::new(3, vec![1, 2]).into())?;
/// filter.complete()?;
/// drop(filter);
///
/// assert_eq!(
///     output,
///     vec![Point::at(1, 0.0, 0.0).into(), Way::new(3, vec![1]).into()]
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AreaFilter<S, K> {
    options: FilterOptions,
    store: S,
    sink: K,
    report: Option<FilterReport>,
}

impl<S, K> AreaFilter<S, K>
where
    S: EntityStore,
    K: EntitySink,
{
    /// Create a stage buffering into `store` and emitting into `sink`.
    pub const fn new(options: FilterOptions, store: S, sink: K) -> Self {
        Self {
            options,
            store,
            sink,
            report: None,
        }
    }

    /// The options this stage runs with.
    pub const fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Summary of the run, available once the stream has completed.
    pub const fn report(&self) -> Option<&FilterReport> {
        self.report.as_ref()
    }

    /// Give back the buffer and the downstream sink.
    pub fn into_parts(self) -> (S, K) {
        (self.store, self.sink)
    }

    fn run(&mut self) -> Result<FilterReport, FilterError> {
        let input = KindCounts {
            points: self.store.len(EntityKind::Point)?,
            ways: self.store.len(EntityKind::Way)?,
            relations: self.store.len(EntityKind::Relation)?,
        };
        debug!(
            "resolving {} points, {} ways, {} relations",
            input.points, input.ways, input.relations
        );

        let points = PointIndex::build(&self.store, &self.options.bbox)?;
        let ways = WayResolver::new(&points, self.options.way_policy()).resolve(&self.store)?;
        let graph = RelationGraph::build(&self.store, &points, &ways)?;
        let relations = RelationResolver::new(
            &points,
            &ways,
            self.options.cascading_relations,
            self.options.relation_policy(),
        )
        .resolve(&graph);

        let dangling_way_refs = ways.dangling_refs();
        let cascade_scans = relations.scans();
        let selection = Selection::merge(
            &self.store,
            self.options.way_policy(),
            points,
            ways,
            relations,
        )?;
        let emitted = assemble(&self.store, &selection, &mut self.sink)?;

        Ok(FilterReport {
            input,
            emitted,
            promoted: KindCounts {
                points: count(selection.promoted_points()),
                ways: count(selection.promoted_ways()),
                relations: count(selection.promoted_relations()),
            },
            dangling_way_refs,
            dangling_relation_members: graph.dangling_members(),
            cascade_scans,
        })
    }
}

impl<S, K> EntitySink for AreaFilter<S, K>
where
    S: EntityStore,
    K: EntitySink,
{
    type Error = FilterError;

    fn process(&mut self, entity: Entity) -> Result<(), Self::Error> {
        if self.report.is_some() {
            return Err(FilterError::StreamClosed {
                kind: entity.kind(),
                id: entity.id(),
            });
        }
        self.store.put(entity)?;
        Ok(())
    }

    fn complete(&mut self) -> Result<(), Self::Error> {
        if self.report.is_some() {
            return Err(FilterError::AlreadyCompleted);
        }
        let outcome = self.run();
        // The buffer never outlives the run, successful or not.
        let cleared = self.store.clear();
        let report = outcome?;
        cleared?;
        report.log();
        self.report = Some(report);
        self.sink
            .complete()
            .map_err(|source| FilterError::Sink(Box::new(source)))
    }
}

/// Filter an in-memory sequence, returning the output and the run summary.
///
/// # Examples
/// ```
/// use areafilter_core::{FilterOptions, Point, filter_entities};
///
/// # fn main() -> Result<(), areafilter_core::FilterError> {
/// let (output, report) = filter_entities(
///     FilterOptions::default(),
///     [Point::at(1, 45.0, 45.0).into()],
/// )?;
/// assert_eq!(output.len(), 1);
/// assert_eq!(report.emitted.points, 1);
/// # Ok(())
/// # }
/// ```
pub fn filter_entities<I>(
    options: FilterOptions,
    entities: I,
) -> Result<(Vec<Entity>, FilterReport), FilterError>
where
    I: IntoIterator<Item = Entity>,
{
    let mut output = Vec::new();
    let mut filter = AreaFilter::new(options, MemoryEntityStore::default(), &mut output);
    for entity in entities {
        filter.process(entity)?;
    }
    filter.complete()?;
    let report = filter.report().copied().unwrap_or_default();
    drop(filter);
    Ok((output, report))
}

fn count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundingBox, EntityIter, Member, Point, Relation, Way};
    use rstest::{fixture, rstest};

    #[fixture]
    fn complete_input() -> Vec<Entity> {
        vec![
            Relation::new(30, vec![Member::way(20), Member::relation(31)]).into(),
            Point::at(1, 10.0, 10.0).into(),
            Point::at(2, -45.0, 170.0).into(),
            Way::new(20, vec![1, 2, 1]).into(),
            Relation::new(31, vec![Member::point(2)]).into(),
        ]
    }

    #[rstest]
    fn whole_domain_box_reproduces_the_input_in_kind_order(complete_input: Vec<Entity>) {
        let (output, report) =
            filter_entities(FilterOptions::default(), complete_input.clone()).expect("run");
        let mut expected = complete_input;
        expected.sort_by_key(Entity::kind);
        assert_eq!(output, expected);
        assert_eq!(report.input, report.emitted);
        assert_eq!(report.dangling_total(), 0);
    }

    #[rstest]
    fn report_counts_promotions(complete_input: Vec<Entity>) {
        let options = FilterOptions {
            complete_ways: true,
            ..FilterOptions::with_bbox(BoundingBox::new(0.0, 20.0, 0.0, 20.0).expect("box"))
        };
        let (output, report) = filter_entities(options, complete_input).expect("run");
        assert_eq!(report.promoted.points, 1);
        assert_eq!(report.emitted.points, 2);
        assert_eq!(report.emitted.ways, 1);
        assert_eq!(report.emitted.relations, 1);
        assert_eq!(
            output.last(),
            Some(&Entity::from(Relation::new(30, vec![Member::way(20)])))
        );
    }

    #[rstest]
    fn entities_after_completion_are_rejected() {
        let mut output: Vec<Entity> = Vec::new();
        let mut filter = AreaFilter::new(
            FilterOptions::default(),
            MemoryEntityStore::default(),
            &mut output,
        );
        filter.complete().expect("empty run");
        let err = filter
            .process(Point::at(9, 0.0, 0.0).into())
            .expect_err("late entity");
        assert!(matches!(
            err,
            FilterError::StreamClosed {
                kind: EntityKind::Point,
                id: 9
            }
        ));
    }

    /// Sink counting end-of-stream markers.
    #[derive(Debug, Default)]
    struct MarkerCount {
        entities: usize,
        completions: usize,
    }

    impl EntitySink for MarkerCount {
        type Error = std::convert::Infallible;

        fn process(&mut self, _entity: Entity) -> Result<(), Self::Error> {
            self.entities += 1;
            Ok(())
        }

        fn complete(&mut self) -> Result<(), Self::Error> {
            self.completions += 1;
            Ok(())
        }
    }

    #[rstest]
    fn second_completion_is_rejected_without_rerunning() {
        let mut filter = AreaFilter::new(
            FilterOptions::default(),
            MemoryEntityStore::default(),
            MarkerCount::default(),
        );
        filter.process(Point::at(1, 0.0, 0.0).into()).expect("buffer");
        filter.complete().expect("first completion");
        let first = filter.report().copied();

        let err = filter.complete().expect_err("second completion");
        assert!(matches!(err, FilterError::AlreadyCompleted));
        assert_eq!(filter.report().copied(), first);
        let (_, sink) = filter.into_parts();
        assert_eq!(sink.entities, 1);
        assert_eq!(sink.completions, 1);
    }

    /// Buffer that accepts writes but fails every read.
    #[derive(Debug, Default)]
    struct BrokenStore {
        cleared: bool,
    }

    impl EntityStore for BrokenStore {
        fn put(&mut self, _entity: Entity) -> Result<(), StoreError> {
            Ok(())
        }

        fn get(&self, _kind: EntityKind, _id: u64) -> Result<Option<Entity>, StoreError> {
            Ok(None)
        }

        fn iterate(&self, kind: EntityKind) -> EntityIter<'_> {
            Box::new(std::iter::once(Err(StoreError::CapacityExceeded {
                kind,
                count: 0,
            })))
        }

        fn len(&self, _kind: EntityKind) -> Result<u64, StoreError> {
            Ok(1)
        }

        fn clear(&mut self) -> Result<(), StoreError> {
            self.cleared = true;
            Ok(())
        }
    }

    #[rstest]
    fn store_failures_abort_the_run_and_release_the_buffer() {
        let mut output: Vec<Entity> = Vec::new();
        let mut filter =
            AreaFilter::new(FilterOptions::default(), BrokenStore::default(), &mut output);
        filter.process(Point::at(1, 0.0, 0.0).into()).expect("buffer");
        let err = filter.complete().expect_err("store failure");
        assert!(matches!(err, FilterError::Store(StoreError::CapacityExceeded { .. })));
        assert!(filter.report().is_none());
        let (store, sink) = filter.into_parts();
        assert!(store.cleared);
        assert!(sink.is_empty());
    }
}
