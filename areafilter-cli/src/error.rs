//! Error types emitted by the area filter CLI.

use std::sync::Arc;

use areafilter_core::{ConfigError, StoreError};
use areafilter_data::SourceError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the area filter CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The log level is not one of off, error, warn, info, debug or trace.
    #[error("unknown log level {level:?}")]
    InvalidLogLevel { level: String },
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A filter option was rejected before any input was read.
    #[error("invalid filter option: {0}")]
    InvalidOption(#[from] ConfigError),
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the JSON lines input failed.
    #[error("failed to open input at {path:?}: {source}")]
    OpenInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Creating the output file failed.
    #[error("failed to create output at {path:?}: {source}")]
    CreateOutput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The spill database could not be opened.
    #[error("failed to open spill database: {0}")]
    OpenSpillStore(#[source] StoreError),
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        feature: &'static str,
        action: &'static str,
    },
    /// Reading, filtering or writing the entity stream failed.
    #[error("filter run failed: {0}")]
    Filter(#[from] SourceError),
}
