//! Facade crate for the area filter.
//!
//! This crate re-exports the filter stage, its options and the entity model,
//! and exposes the SQLite spill buffer behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use areafilter_core::{
    AreaFilter, BoundingBox, ConfigError, Entity, EntityKind, EntitySink, EntityStore,
    FilterError, FilterOptions, FilterReport, KindCounts, Member, MemoryEntityStore, Metadata,
    Point, ReferencePolicy, Relation, StoreError, Tags, Way, filter_entities,
};

#[cfg(feature = "store-sqlite")]
pub use areafilter_core::SqliteEntityStore;
