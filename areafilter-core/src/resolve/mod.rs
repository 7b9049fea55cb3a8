//! Inclusion resolution over the buffered entity graph.
//!
//! Each phase reads the buffer through [`EntityStore`](crate::EntityStore)
//! and produces plain id sets; no buffered record is ever modified.
//!
//! - [`PointIndex`]: points inside the box.
//! - [`WayResolver`]: candidate ways and completion promotions.
//! - [`RelationResolver`]: base, cascading and completion rules over a
//!   compact [`RelationGraph`].
//! - [`Selection`]: the merged decision the output assembler consumes.

mod points;
mod promotion;
mod relations;
mod ways;

pub use points::PointIndex;
pub use promotion::{Selection, WayForm};
pub use relations::{RelationDecisions, RelationGraph, RelationResolver};
pub use ways::{WayDecisions, WayResolver};
