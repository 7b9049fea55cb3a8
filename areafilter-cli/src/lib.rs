//! Command-line interface for the area filter.
#![forbid(unsafe_code)]

use std::{io, str::FromStr};

use clap::{Parser, Subcommand};
use log::LevelFilter;
use structured_logger::{Builder, json::new_writer};

mod error;
mod filter;
mod fs;

pub use error::CliError;

use filter::{FilterArgs, run_filter};

pub(crate) const ARG_INPUT: &str = "input";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_SPILL_DB: &str = "spill-db";
pub(crate) const ARG_OPTION: &str = "option";
pub(crate) const ENV_INPUT: &str = "AREAFILTER_CMDS_FILTER_INPUT";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Run the area filter CLI with the current process arguments and
/// environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(&cli.log_level)?;
    match cli.command {
        Command::Filter(args) => run_filter(args),
    }
}

/// Install the JSON logger on stderr so stdout stays free for entity output.
fn init_logging(level: &str) -> Result<(), CliError> {
    let filter = parse_log_level(level)?;
    Builder::with_level(filter.as_str())
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
    Ok(())
}

fn parse_log_level(level: &str) -> Result<LevelFilter, CliError> {
    LevelFilter::from_str(level).map_err(|_| CliError::InvalidLogLevel {
        level: level.to_owned(),
    })
}

#[derive(Debug, Parser)]
#[command(
    name = "areafilter",
    about = "Reduce a map entity stream to a bounding box",
    version
)]
struct Cli {
    /// Minimum level of the JSON log lines written to stderr.
    #[arg(long, global = true, value_name = "level", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filter an OSM PBF or JSON lines file to a bounding box.
    Filter(FilterArgs),
}

#[cfg(test)]
mod tests;
