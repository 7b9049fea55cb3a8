//! Rectangular spatial predicate.
//!
//! The box is axis-aligned in lon/lat space and does not model regions that
//! cross the antimeridian. Containment includes boundary points.

use geo::{Coord, Intersects, Rect};

use crate::{ConfigError, Point};

/// Smallest valid longitude.
pub const MIN_LON: f64 = -180.0;
/// Largest valid longitude.
pub const MAX_LON: f64 = 180.0;
/// Smallest valid latitude.
pub const MIN_LAT: f64 = -90.0;
/// Largest valid latitude.
pub const MAX_LAT: f64 = 90.0;

/// Validated, axis-aligned filter region.
///
/// # Examples
/// ```
/// use areafilter_core::BoundingBox;
///
/// # fn main() -> Result<(), areafilter_core::ConfigError> {
/// let bbox = BoundingBox::new(-10.0, 10.0, -10.0, 10.0)?;
/// assert!(bbox.contains(10.0, -10.0));
/// assert!(!bbox.contains(20.0, 20.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    rect: Rect<f64>,
}

impl BoundingBox {
    /// Validate and construct a box from its four edges in degrees.
    ///
    /// Edges must be finite, within the coordinate domain, and strictly
    /// ordered (`left < right`, `bottom < top`).
    pub fn new(left: f64, right: f64, bottom: f64, top: f64) -> Result<Self, ConfigError> {
        check_edge("left", left, MIN_LON, MAX_LON)?;
        check_edge("right", right, MIN_LON, MAX_LON)?;
        check_edge("bottom", bottom, MIN_LAT, MAX_LAT)?;
        check_edge("top", top, MIN_LAT, MAX_LAT)?;
        if left >= right {
            return Err(ConfigError::InvertedLongitudes { left, right });
        }
        if bottom >= top {
            return Err(ConfigError::InvertedLatitudes { bottom, top });
        }
        Ok(Self {
            rect: Rect::new(Coord { x: left, y: bottom }, Coord { x: right, y: top }),
        })
    }

    /// A box spanning the entire coordinate domain; filtering with it keeps
    /// every located point.
    #[must_use]
    pub fn world() -> Self {
        Self {
            rect: Rect::new(
                Coord {
                    x: MIN_LON,
                    y: MIN_LAT,
                },
                Coord {
                    x: MAX_LON,
                    y: MAX_LAT,
                },
            ),
        }
    }

    /// Western edge.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.rect.min().x
    }

    /// Eastern edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.rect.max().x
    }

    /// Southern edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.rect.min().y
    }

    /// Northern edge.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.rect.max().y
    }

    /// The underlying rectangle.
    #[must_use]
    pub const fn rect(&self) -> &Rect<f64> {
        &self.rect
    }

    /// Whether the box spans the whole coordinate domain.
    #[must_use]
    pub fn is_world(&self) -> bool {
        *self == Self::world()
    }

    /// True iff the coordinate lies inside the box, edges included.
    ///
    /// Non-finite coordinates are never contained.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat.is_finite() && lon.is_finite() && self.rect.intersects(&Coord { x: lon, y: lat })
    }

    /// True iff the point's location lies inside the box.
    #[must_use]
    pub fn contains_point(&self, point: &Point) -> bool {
        self.contains(point.lat(), point.lon())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::world()
    }
}

fn check_edge(key: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFiniteBound { key, value });
    }
    if !(min..=max).contains(&value) {
        return Err(ConfigError::BoundOutOfRange {
            key,
            value,
            min,
            max,
        });
    }
    Ok(())
}
