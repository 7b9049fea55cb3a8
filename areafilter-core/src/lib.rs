//! Area filtering for streams of map entities.
//!
//! The [`AreaFilter`] stage reduces a stream of points, ways and relations
//! to those intersecting a [`BoundingBox`], honouring the completeness
//! policies in [`FilterOptions`]. Input is buffered in an [`EntityStore`]
//! because way and relation decisions depend on entities that may arrive
//! later; output is emitted once, in canonical kind order, when the input
//! stream completes.
//!
//! Invariants:
//! - Every emitted entity appears exactly once.
//! - Emitted ways and relations only reference emitted entities.
//! - Buffered records are never modified; decisions live in id sets.
//! - No global mutable state; a run's storage is released when it completes.
#![forbid(unsafe_code)]

mod bbox;
mod entity;
mod filter;
mod options;
mod output;
mod report;
pub mod resolve;
pub mod store;
mod stream;

pub use bbox::{BoundingBox, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
pub use entity::{Entity, EntityKind, Member, Metadata, Point, Relation, Tags, Way};
pub use filter::{AreaFilter, FilterError, filter_entities};
pub use options::{
    ConfigError, FilterOptions, KEY_BOTTOM, KEY_CASCADING_RELATIONS, KEY_CLIP_INCOMPLETE_ENTITIES,
    KEY_COMPLETE_RELATIONS, KEY_COMPLETE_WAYS, KEY_LEFT, KEY_RIGHT, KEY_TOP, ReferencePolicy,
    parse_assignment,
};
pub use output::assemble;
pub use report::{FilterReport, KindCounts};
pub use store::{EntityIter, EntityStore, MemoryEntityStore, StoreError};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteEntityStore;
pub use stream::EntitySink;
