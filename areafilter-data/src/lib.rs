//! Entity sources and sinks for the area filter.
//!
//! Responsibilities:
//! - Decode OSM PBF extracts into an [`EntitySink`](areafilter_core::EntitySink).
//! - Read and write newline-delimited JSON entity streams.
//!
//! Boundaries:
//! - Do not encode filtering rules (live in `areafilter-core`).
//!
//! Invariants:
//! - Sources preserve file order and call `complete` exactly once on success.
//! - No global mutable state.

mod ids;
mod json;
mod pbf;

use std::path::PathBuf;

use thiserror::Error;

pub use json::{JsonLinesSink, SinkError, read_json_lines};
pub use pbf::{OsmReadSummary, read_osm_pbf};

/// Errors raised while feeding a source into a sink.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input file could not be opened.
    #[error("failed to open OSM PBF file at {path:?}")]
    Open {
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
        /// Path that failed to open.
        path: PathBuf,
    },
    /// The input file is not valid PBF.
    #[error("failed to decode OSM PBF data at {path:?}")]
    Decode {
        /// Underlying decoder error.
        #[source]
        source: osmpbf::Error,
        /// Path being decoded.
        path: PathBuf,
    },
    /// Reading a JSON line failed.
    #[error("failed to read line {line}")]
    Read {
        /// One-based line number.
        line: u64,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A JSON line does not describe an entity.
    #[error("line {line} is not a valid entity")]
    Parse {
        /// One-based line number.
        line: u64,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The downstream sink rejected an entity or the end marker.
    #[error("downstream sink failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SourceError {
    fn sink<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Sink(Box::new(source))
    }
}
