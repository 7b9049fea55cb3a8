//! Typed map entities flowing through the filter stage.
//!
//! Points carry WGS84 coordinates (`x = longitude`, `y = latitude`). Ways and
//! relations only reference other entities by id; each kind has its own id
//! space, so a point and a way may share the same numeric id.

use std::collections::BTreeMap;
use std::fmt;

use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Free-form key/value tags, ordered by key so output is deterministic.
pub type Tags = BTreeMap<String, String>;

/// The three entity kinds, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum EntityKind {
    /// A located point (an OSM node).
    Point,
    /// An ordered list of point references.
    Way,
    /// An ordered list of typed members.
    Relation,
}

impl EntityKind {
    /// All kinds in canonical output order: points, ways, then relations.
    pub const ALL: [Self; 3] = [Self::Point, Self::Way, Self::Relation];

    /// Lower-case name used in logs and serialised output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editing metadata carried through the filter untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Metadata {
    /// Entity version.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: Option<u32>,
    /// Last modification time in milliseconds since the Unix epoch.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timestamp: Option<i64>,
    /// Changeset that last touched the entity.
    #[cfg_attr(feature = "serde", serde(default))]
    pub changeset: Option<i64>,
    /// Author's user id.
    #[cfg_attr(feature = "serde", serde(default))]
    pub uid: Option<i32>,
    /// Author's display name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub user: Option<String>,
}

/// A located point.
///
/// # Examples
/// ```
/// use areafilter_core::Point;
///
/// let point = Point::at(7, 51.5, -0.12);
/// assert_eq!(point.lat(), 51.5);
/// assert_eq!(point.lon(), -0.12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// Identifier within the point id space.
    pub id: u64,
    /// Position with `x = longitude` and `y = latitude`.
    pub location: Coord<f64>,
    /// Tags attached to the point.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Tags,
    /// Editing metadata.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: Metadata,
}

impl Point {
    /// Construct an untagged point at `location`.
    #[must_use]
    pub fn new(id: u64, location: Coord<f64>) -> Self {
        Self {
            id,
            location,
            tags: Tags::new(),
            metadata: Metadata::default(),
        }
    }

    /// Construct an untagged point from latitude and longitude in degrees.
    #[must_use]
    pub fn at(id: u64, lat: f64, lon: f64) -> Self {
        Self::new(id, Coord { x: lon, y: lat })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.location.x
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An ordered sequence of point references.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Way {
    /// Identifier within the way id space.
    pub id: u64,
    /// Referenced point ids, in order. Ids may repeat (closed ways).
    pub point_ids: Vec<u64>,
    /// Tags attached to the way.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Tags,
    /// Editing metadata.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: Metadata,
}

impl Way {
    /// Construct an untagged way over `point_ids`.
    #[must_use]
    pub fn new(id: u64, point_ids: Vec<u64>) -> Self {
        Self {
            id,
            point_ids,
            tags: Tags::new(),
            metadata: Metadata::default(),
        }
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A typed reference from a relation to another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Member {
    /// Kind of the referenced entity.
    pub kind: EntityKind,
    /// Id of the referenced entity within its kind's id space.
    pub id: u64,
    /// Free-form role, often empty.
    #[cfg_attr(feature = "serde", serde(default))]
    pub role: String,
}

impl Member {
    /// Construct a member reference.
    pub fn new(kind: EntityKind, id: u64, role: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            role: role.into(),
        }
    }

    /// Reference a point with an empty role.
    #[must_use]
    pub fn point(id: u64) -> Self {
        Self::new(EntityKind::Point, id, "")
    }

    /// Reference a way with an empty role.
    #[must_use]
    pub fn way(id: u64) -> Self {
        Self::new(EntityKind::Way, id, "")
    }

    /// Reference a relation with an empty role.
    #[must_use]
    pub fn relation(id: u64) -> Self {
        Self::new(EntityKind::Relation, id, "")
    }
}

/// An ordered list of typed members.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Relation {
    /// Identifier within the relation id space.
    pub id: u64,
    /// Members in their original order.
    pub members: Vec<Member>,
    /// Tags attached to the relation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Tags,
    /// Editing metadata.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: Metadata,
}

impl Relation {
    /// Construct an untagged relation over `members`.
    #[must_use]
    pub fn new(id: u64, members: Vec<Member>) -> Self {
        Self {
            id,
            members,
            tags: Tags::new(),
            metadata: Metadata::default(),
        }
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Any entity carried by the stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type", rename_all = "lowercase")
)]
pub enum Entity {
    /// A located point.
    Point(Point),
    /// A way over points.
    Way(Way),
    /// A relation over mixed members.
    Relation(Relation),
}

impl Entity {
    /// The entity's kind.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Point(_) => EntityKind::Point,
            Self::Way(_) => EntityKind::Way,
            Self::Relation(_) => EntityKind::Relation,
        }
    }

    /// The entity's id within its kind's id space.
    #[must_use]
    pub const fn id(&self) -> u64 {
        match self {
            Self::Point(point) => point.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
        }
    }

    /// The entity's tags.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Point(point) => &point.tags,
            Self::Way(way) => &way.tags,
            Self::Relation(relation) => &relation.tags,
        }
    }
}

impl From<Point> for Entity {
    fn from(point: Point) -> Self {
        Self::Point(point)
    }
}

impl From<Way> for Entity {
    fn from(way: Way) -> Self {
        Self::Way(way)
    }
}

impl From<Relation> for Entity {
    fn from(relation: Relation) -> Self {
        Self::Relation(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Point::at(3, 0.0, 0.0).into(), EntityKind::Point, 3)]
    #[case(Way::new(3, vec![1, 2]).into(), EntityKind::Way, 3)]
    #[case(Relation::new(3, vec![Member::way(1)]).into(), EntityKind::Relation, 3)]
    fn entity_reports_kind_and_id(
        #[case] entity: Entity,
        #[case] kind: EntityKind,
        #[case] id: u64,
    ) {
        assert_eq!(entity.kind(), kind);
        assert_eq!(entity.id(), id);
    }

    #[rstest]
    fn point_axes_follow_lon_lat_convention() {
        let point = Point::at(1, 10.0, 20.0);
        assert_eq!(point.location, Coord { x: 20.0, y: 10.0 });
    }

    #[rstest]
    fn kinds_sort_in_output_order() {
        let mut kinds = vec![EntityKind::Relation, EntityKind::Point, EntityKind::Way];
        kinds.sort();
        assert_eq!(kinds, EntityKind::ALL.to_vec());
    }
}
