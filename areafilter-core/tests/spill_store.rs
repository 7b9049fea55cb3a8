//! The filter gives identical results whichever buffer backs it.
#![cfg(feature = "store-sqlite")]

use areafilter_core::{
    AreaFilter, Entity, EntityKind, EntitySink, EntityStore, FilterOptions, Member,
    MemoryEntityStore, Point, Relation, SqliteEntityStore, Tags, Way,
};
use rstest::{fixture, rstest};

#[fixture]
fn input() -> Vec<Entity> {
    let mut tags = Tags::new();
    tags.insert("highway".into(), "residential".into());
    vec![
        Relation::new(
            30,
            vec![Member::way(20), Member::new(EntityKind::Relation, 31, "sub")],
        )
        .into(),
        Point::at(1, 0.5, 0.5).into(),
        Point::at(2, 5.0, 5.0).into(),
        Way::new(20, vec![1, 2, 3]).with_tags(tags).into(),
        Point::at(3, -0.5, 0.5).into(),
        Relation::new(31, vec![Member::point(3)]).into(),
        Way::new(21, vec![2]).into(),
    ]
}

fn run<S: EntityStore>(store: S, options: FilterOptions, input: &[Entity]) -> (Vec<Entity>, S) {
    let mut output = Vec::new();
    let mut filter = AreaFilter::new(options, store, &mut output);
    for entity in input {
        filter.process(entity.clone()).expect("buffer entity");
    }
    filter.complete().expect("complete run");
    let (store, _) = filter.into_parts();
    (output, store)
}

#[rstest]
#[case::trimmed("left=0,right=1,bottom=-1,top=1")]
#[case::complete_ways("left=0,right=1,bottom=-1,top=1,completeWays=yes")]
#[case::complete_relations("left=0,right=1,bottom=0,top=1,completeRelations=yes")]
#[case::cascading("left=0,right=1,bottom=-1,top=0,cascadingRelations=true")]
fn sqlite_buffer_matches_memory_buffer(input: Vec<Entity>, #[case] assignments: &str) {
    let options = FilterOptions::from_assignments(assignments.split(',')).expect("valid options");
    let dir = tempfile::tempdir().expect("temp dir");
    let sqlite = SqliteEntityStore::open(dir.path().join("spill.db")).expect("open store");

    let (expected, _) = run(MemoryEntityStore::default(), options, &input);
    let (actual, store) = run(sqlite, options, &input);

    assert_eq!(actual, expected);
    assert!(!expected.is_empty());
    assert!(store.is_empty().expect("count rows"), "buffer outlived the run");
}
