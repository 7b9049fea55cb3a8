//! Filter configuration and the string-keyed option parser.

use thiserror::Error;

use crate::BoundingBox;
use crate::bbox::{MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Option key for the western edge.
pub const KEY_LEFT: &str = "left";
/// Option key for the eastern edge.
pub const KEY_RIGHT: &str = "right";
/// Option key for the northern edge.
pub const KEY_TOP: &str = "top";
/// Option key for the southern edge.
pub const KEY_BOTTOM: &str = "bottom";
/// Option key enabling way completion.
pub const KEY_COMPLETE_WAYS: &str = "completeWays";
/// Option key enabling relation completion.
pub const KEY_COMPLETE_RELATIONS: &str = "completeRelations";
/// Option key enabling relation cascading.
pub const KEY_CASCADING_RELATIONS: &str = "cascadingRelations";
/// Option key enabling reference clipping.
pub const KEY_CLIP_INCOMPLETE_ENTITIES: &str = "clipIncompleteEntities";

/// Errors raised while validating filter configuration.
///
/// All of these are raised before any entity is consumed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A bound was NaN or infinite.
    #[error("{key} must be a finite number of degrees, got {value}")]
    NonFiniteBound {
        /// Offending option key.
        key: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// A bound fell outside the coordinate domain.
    #[error("{key}={value} is outside the valid range [{min}, {max}]")]
    BoundOutOfRange {
        /// Offending option key.
        key: &'static str,
        /// Supplied value.
        value: f64,
        /// Smallest accepted value.
        min: f64,
        /// Largest accepted value.
        max: f64,
    },
    /// `left` was not strictly smaller than `right`.
    #[error("left ({left}) must be less than right ({right})")]
    InvertedLongitudes {
        /// Western edge.
        left: f64,
        /// Eastern edge.
        right: f64,
    },
    /// `bottom` was not strictly smaller than `top`.
    #[error("bottom ({bottom}) must be less than top ({top})")]
    InvertedLatitudes {
        /// Southern edge.
        bottom: f64,
        /// Northern edge.
        top: f64,
    },
    /// The option key is not recognised.
    #[error("unknown option {key:?}")]
    UnknownOption {
        /// Supplied key.
        key: String,
    },
    /// A bound value could not be parsed as a number.
    #[error("{key} expects a number of degrees, got {value:?}")]
    InvalidNumber {
        /// Offending option key.
        key: &'static str,
        /// Supplied value.
        value: String,
    },
    /// A flag value was not one of `yes`, `no`, `true` or `false`.
    #[error("{key} expects yes/no/true/false, got {value:?}")]
    InvalidBoolean {
        /// Offending option key.
        key: &'static str,
        /// Supplied value.
        value: String,
    },
    /// An assignment was not of the form `key=value`.
    #[error("expected key=value, got {input:?}")]
    MalformedAssignment {
        /// Supplied text.
        input: String,
    },
}

/// How a referencing entity treats references to entities outside the
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Emit the full reference list and pull every referenced entity in.
    Complete,
    /// Emit only references to selected entities.
    Trim,
}

/// Validated configuration for one filter run.
///
/// # Examples
/// ```
/// use areafilter_core::{FilterOptions, ReferencePolicy};
///
/// # fn main() -> Result<(), areafilter_core::ConfigError> {
/// let options = FilterOptions::from_pairs([
///     ("left", "-10"),
///     ("right", "10"),
///     ("bottom", "-10"),
///     ("top", "10"),
///     ("completeWays", "yes"),
/// ])?;
/// assert_eq!(options.way_policy(), ReferencePolicy::Complete);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterOptions {
    /// Region the spatial predicate tests against.
    pub bbox: BoundingBox,
    /// Emit candidate ways in full and pull in all their points.
    pub complete_ways: bool,
    /// Pull in every member of an included relation.
    pub complete_relations: bool,
    /// Include relations that reference included relations.
    pub cascading_relations: bool,
    /// Trim references to unselected entities instead of completing them.
    pub clip_incomplete_entities: bool,
}

impl FilterOptions {
    /// Options with the given box and every flag off.
    #[must_use]
    pub fn with_bbox(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            ..Self::default()
        }
    }

    /// Build options from string-keyed pairs, validating everything up front.
    ///
    /// Missing bounds default to the whole coordinate domain and missing
    /// flags default to `false`. Later duplicates override earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut left = MIN_LON;
        let mut right = MAX_LON;
        let mut bottom = MIN_LAT;
        let mut top = MAX_LAT;
        let mut options = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                KEY_LEFT => left = parse_degrees(KEY_LEFT, value)?,
                KEY_RIGHT => right = parse_degrees(KEY_RIGHT, value)?,
                KEY_TOP => top = parse_degrees(KEY_TOP, value)?,
                KEY_BOTTOM => bottom = parse_degrees(KEY_BOTTOM, value)?,
                KEY_COMPLETE_WAYS => options.complete_ways = parse_flag(KEY_COMPLETE_WAYS, value)?,
                KEY_COMPLETE_RELATIONS => {
                    options.complete_relations = parse_flag(KEY_COMPLETE_RELATIONS, value)?;
                }
                KEY_CASCADING_RELATIONS => {
                    options.cascading_relations = parse_flag(KEY_CASCADING_RELATIONS, value)?;
                }
                KEY_CLIP_INCOMPLETE_ENTITIES => {
                    options.clip_incomplete_entities =
                        parse_flag(KEY_CLIP_INCOMPLETE_ENTITIES, value)?;
                }
                other => {
                    return Err(ConfigError::UnknownOption {
                        key: other.to_owned(),
                    });
                }
            }
        }
        options.bbox = BoundingBox::new(left, right, bottom, top)?;
        Ok(options)
    }

    /// Build options from `key=value` assignments such as `left=-10`.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = assignments
            .into_iter()
            .map(|assignment| {
                parse_assignment(assignment.as_ref())
                    .map(|(key, value)| (key.to_owned(), value.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs)
    }

    /// Policy applied to way point lists.
    ///
    /// Completion takes precedence over clipping when both are requested.
    #[must_use]
    pub const fn way_policy(&self) -> ReferencePolicy {
        if self.complete_ways {
            ReferencePolicy::Complete
        } else {
            ReferencePolicy::Trim
        }
    }

    /// Policy applied to relation member lists.
    ///
    /// Completion takes precedence over clipping when both are requested.
    #[must_use]
    pub const fn relation_policy(&self) -> ReferencePolicy {
        if self.complete_relations {
            ReferencePolicy::Complete
        } else {
            ReferencePolicy::Trim
        }
    }
}

/// Split `key=value`, trimming whitespace around the key.
pub fn parse_assignment(input: &str) -> Result<(&str, &str), ConfigError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(ConfigError::MalformedAssignment {
            input: input.to_owned(),
        }),
    }
}

fn parse_degrees(key: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_owned(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key,
            value: value.to_owned(),
        }),
    }
}
