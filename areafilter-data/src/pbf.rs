//! Sequential OSM PBF decoding into an entity stream.

use std::path::Path;

use areafilter_core::{Entity, EntityKind, EntitySink, Member, Metadata, Point, Relation, Tags, Way};
use geo::{Coord, Rect};
use log::{debug, warn};
use osmpbf::{BlobDecode, BlobReader, DenseNodeInfo, Element, Info, RelMemberType};

use crate::SourceError;
use crate::ids::entity_id;

/// Summary of the elements read from an OSM PBF file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OsmReadSummary {
    /// Number of points forwarded, including dense-node entries.
    pub points: u64,
    /// Number of ways forwarded.
    pub ways: u64,
    /// Number of relations forwarded.
    pub relations: u64,
    /// Elements skipped because of unsupported identifiers.
    pub skipped: u64,
    /// Bounding box covering all forwarded point coordinates, if any.
    /// Coordinates are WGS84 with `x = longitude`, `y = latitude`.
    pub bounds: Option<Rect<f64>>,
}

impl OsmReadSummary {
    fn include_coordinate(&mut self, location: Coord<f64>) {
        if !(location.x.is_finite() && location.y.is_finite()) {
            return;
        }
        self.bounds = Some(match self.bounds {
            Some(existing) => Rect::new(
                Coord {
                    x: existing.min().x.min(location.x),
                    y: existing.min().y.min(location.y),
                },
                Coord {
                    x: existing.max().x.max(location.x),
                    y: existing.max().y.max(location.y),
                },
            ),
            None => Rect::new(location, location),
        });
    }

    fn record(&mut self, entity: &Entity) {
        match entity {
            Entity::Point(point) => {
                self.points += 1;
                self.include_coordinate(point.location);
            }
            Entity::Way(_) => self.ways += 1,
            Entity::Relation(_) => self.relations += 1,
        }
    }
}

/// Decode an OSM PBF file in file order, forwarding every element to `sink`
/// and finishing with [`EntitySink::complete`].
///
/// Elements with negative identifiers are skipped with a warning, as are
/// way references and relation members pointing at them. Decoding stops at
/// the first sink failure; the rest of the file is not read.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use areafilter_core::Entity;
/// use areafilter_data::read_osm_pbf;
///
/// # fn main() -> Result<(), areafilter_data::SourceError> {
/// let mut entities: Vec<Entity> = Vec::new();
/// let summary = read_osm_pbf(Path::new("berlin.osm.pbf"), &mut entities)?;
/// println!("Read {} points", summary.points);
/// # Ok(())
/// # }
/// ```
pub fn read_osm_pbf<K>(path: &Path, mut sink: K) -> Result<OsmReadSummary, SourceError>
where
    K: EntitySink,
{
    let reader = BlobReader::from_path(path).map_err(|source| SourceError::Open {
        source,
        path: path.to_path_buf(),
    })?;
    let decode_error = |source| SourceError::Decode {
        source,
        path: path.to_path_buf(),
    };

    let mut summary = OsmReadSummary::default();
    for blob in reader {
        let blob = blob.map_err(decode_error)?;
        match blob.decode().map_err(decode_error)? {
            BlobDecode::OsmData(block) => forward(
                block.elements().map(|element| convert_element(&element)),
                &mut summary,
                &mut sink,
            )?,
            BlobDecode::OsmHeader(_) => {}
            BlobDecode::Unknown(kind) => debug!("ignoring {kind} blob in {}", path.display()),
        }
    }

    debug!(
        "read {} points, {} ways, {} relations from {}",
        summary.points,
        summary.ways,
        summary.relations,
        path.display()
    );
    if summary.skipped > 0 {
        warn!(
            "skipped {} elements with unsupported identifiers",
            summary.skipped
        );
    }
    sink.complete().map_err(SourceError::sink)?;
    Ok(summary)
}

/// Push converted elements into `sink`, stopping at the first rejection.
/// `None` marks an element that could not be converted.
fn forward<I, K>(
    entities: I,
    summary: &mut OsmReadSummary,
    sink: &mut K,
) -> Result<(), SourceError>
where
    I: IntoIterator<Item = Option<Entity>>,
    K: EntitySink,
{
    for entity in entities {
        let Some(entity) = entity else {
            summary.skipped += 1;
            continue;
        };
        summary.record(&entity);
        sink.process(entity).map_err(SourceError::sink)?;
    }
    Ok(())
}

fn convert_element(element: &Element<'_>) -> Option<Entity> {
    match element {
        Element::Node(node) => {
            let id = entity_id(EntityKind::Point, node.id())?;
            Some(
                Point::at(id, node.lat(), node.lon())
                    .with_tags(collect_tags(node.tags()))
                    .with_metadata(info_metadata(&node.info()))
                    .into(),
            )
        }
        Element::DenseNode(node) => {
            let id = entity_id(EntityKind::Point, node.id())?;
            let metadata = node.info().map(dense_metadata).unwrap_or_default();
            Some(
                Point::at(id, node.lat(), node.lon())
                    .with_tags(collect_tags(node.tags()))
                    .with_metadata(metadata)
                    .into(),
            )
        }
        Element::Way(way) => {
            let id = entity_id(EntityKind::Way, way.id())?;
            let point_ids = way
                .refs()
                .filter_map(|raw| entity_id(EntityKind::Point, raw))
                .collect();
            Some(
                Way::new(id, point_ids)
                    .with_tags(collect_tags(way.tags()))
                    .with_metadata(info_metadata(&way.info()))
                    .into(),
            )
        }
        Element::Relation(relation) => {
            let id = entity_id(EntityKind::Relation, relation.id())?;
            let members = relation
                .members()
                .filter_map(|member| {
                    let kind = match member.member_type {
                        RelMemberType::Node => EntityKind::Point,
                        RelMemberType::Way => EntityKind::Way,
                        RelMemberType::Relation => EntityKind::Relation,
                    };
                    let member_id = entity_id(kind, member.member_id)?;
                    let role = member.role().unwrap_or_default();
                    Some(Member::new(kind, member_id, role))
                })
                .collect();
            Some(
                Relation::new(id, members)
                    .with_tags(collect_tags(relation.tags()))
                    .with_metadata(info_metadata(&relation.info()))
                    .into(),
            )
        }
    }
}

fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn info_metadata(info: &Info<'_>) -> Metadata {
    Metadata {
        version: info.version().and_then(|version| u32::try_from(version).ok()),
        timestamp: info.milli_timestamp(),
        changeset: info.changeset(),
        uid: info.uid(),
        user: info
            .user()
            .and_then(Result::ok)
            .map(str::to_owned),
    }
}

fn dense_metadata(info: &DenseNodeInfo<'_>) -> Metadata {
    Metadata {
        version: u32::try_from(info.version()).ok(),
        timestamp: Some(info.milli_timestamp()),
        changeset: Some(info.changeset()),
        uid: Some(info.uid()),
        user: info.user().ok().map(str::to_owned),
    }
}
