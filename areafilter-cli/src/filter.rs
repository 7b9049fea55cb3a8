//! Filter command implementation for the area filter CLI.

use std::io::{self, BufReader, BufWriter, Write};

use areafilter_core::{AreaFilter, EntityStore, FilterOptions, MemoryEntityStore};
use areafilter_data::{JsonLinesSink, read_json_lines, read_osm_pbf};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::fs::{create_utf8_file, file_is_file, open_utf8_file};
use crate::{ARG_INPUT, ARG_OPTION, ARG_OUTPUT, ARG_SPILL_DB, CliError, ENV_INPUT};

/// CLI arguments for the `filter` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Keep the points inside a bounding box together with the ways \
                 and relations that reach them. Options use the key=value form, \
                 e.g. --option left=-0.5 --option completeWays=yes.",
    about = "Filter an entity stream to a bounding box"
)]
#[ortho_config(prefix = "AREAFILTER")]
pub(crate) struct FilterArgs {
    /// Input file: `.pbf` for OSM PBF, anything else for JSON lines.
    #[arg(long = ARG_INPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Output JSON lines file; defaults to stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Buffer entities in a SQLite file instead of memory.
    #[arg(long = ARG_SPILL_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) spill_db: Option<Utf8PathBuf>,
    /// Filter option as `key=value`; may be repeated.
    #[arg(long = ARG_OPTION, value_name = "key=value")]
    #[serde(default)]
    pub(crate) option: Vec<String>,
}

impl FilterArgs {
    pub(crate) fn into_config(self) -> Result<FilterConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FilterConfig::try_from(merged)
    }
}

/// Format of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputFormat {
    OsmPbf,
    JsonLines,
}

impl InputFormat {
    pub(crate) fn detect(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(extension) if extension.eq_ignore_ascii_case("pbf") => Self::OsmPbf,
            _ => Self::JsonLines,
        }
    }
}

/// Resolved `filter` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) format: InputFormat,
    pub(crate) output: Option<Utf8PathBuf>,
    pub(crate) spill_db: Option<Utf8PathBuf>,
    pub(crate) options: FilterOptions,
}

impl FilterConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        let path = &self.input;
        match file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field: ARG_INPUT,
                path: path.clone(),
            }),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field: ARG_INPUT,
                    path: path.clone(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_INPUT,
                path: path.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<FilterArgs> for FilterConfig {
    type Error = CliError;

    fn try_from(args: FilterArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_INPUT,
        })?;
        let options = FilterOptions::from_assignments(&args.option)?;
        Ok(Self {
            format: InputFormat::detect(&input),
            input,
            output: args.output,
            spill_db: args.spill_db,
            options,
        })
    }
}

pub(super) fn run_filter(args: FilterArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    match &config.output {
        Some(path) => {
            let file = create_utf8_file(path).map_err(|source| CliError::CreateOutput {
                path: path.clone(),
                source,
            })?;
            run_filter_with(&config, BufWriter::new(file))?;
        }
        None => {
            run_filter_with(&config, BufWriter::new(io::stdout().lock()))?;
        }
    }
    Ok(())
}

/// Filter the configured input into `writer`, returning the number of
/// entities written.
pub(super) fn run_filter_with<W: Write>(config: &FilterConfig, writer: W) -> Result<u64, CliError> {
    let mut sink = JsonLinesSink::new(writer);
    match &config.spill_db {
        Some(path) => filter_with_spill(config, path, &mut sink)?,
        None => filter_into(config, MemoryEntityStore::default(), &mut sink)?,
    }
    info!(
        "wrote {} entities to {}",
        sink.written(),
        config.output.as_ref().map_or("stdout", |path| path.as_str())
    );
    Ok(sink.written())
}

#[cfg(feature = "store-sqlite")]
fn filter_with_spill<W: Write>(
    config: &FilterConfig,
    path: &Utf8Path,
    sink: &mut JsonLinesSink<W>,
) -> Result<(), CliError> {
    let store = areafilter_core::SqliteEntityStore::open(path.as_std_path())
        .map_err(CliError::OpenSpillStore)?;
    filter_into(config, store, sink)
}

#[cfg(not(feature = "store-sqlite"))]
fn filter_with_spill<W: Write>(
    _config: &FilterConfig,
    _path: &Utf8Path,
    _sink: &mut JsonLinesSink<W>,
) -> Result<(), CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "--spill-db",
    })
}

fn filter_into<S, W>(
    config: &FilterConfig,
    store: S,
    sink: &mut JsonLinesSink<W>,
) -> Result<(), CliError>
where
    S: EntityStore,
    W: Write,
{
    let filter = AreaFilter::new(config.options, store, sink);
    match config.format {
        InputFormat::OsmPbf => {
            read_osm_pbf(config.input.as_std_path(), filter)?;
        }
        InputFormat::JsonLines => {
            let file = open_utf8_file(&config.input).map_err(|source| CliError::OpenInput {
                path: config.input.clone(),
                source,
            })?;
            read_json_lines(BufReader::new(file), filter)?;
        }
    }
    Ok(())
}
