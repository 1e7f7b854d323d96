//! Command-line driver for the Hubs → OMI audio migration
//!
//! ```text
//! omi-gltf-transform <input> [output] [--config <toml>] [--concurrency N] [--best-effort]
//! ```
//!
//! Reads a `.glb` or `.gltf`, migrates its Hubs audio to
//! `OMI_audio_emitter`, and writes the result in the layout named by the
//! output extension.

#![warn(unreachable_pub)]

pub mod convert;
pub mod paths;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use omi_transform::{CommitMode, MigrationReport, TransformConfig};
use std::path::PathBuf;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Argument definitions
#[must_use]
pub fn command() -> Command {
    Command::new("omi-gltf-transform")
        .version(VERSION)
        .about("Migrate MOZ_hubs_components audio in glTF files to OMI_audio_emitter")
        .arg(
            Arg::new("input")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Input .glb or .gltf file"),
        )
        .arg(
            Arg::new("output")
                .value_parser(value_parser!(PathBuf))
                .help("Output .glb/.gltf file or directory [default: <input>_out.<ext>]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_parser(value_parser!(usize))
                .help("Maximum concurrent audio fetches"),
        )
        .arg(
            Arg::new("best-effort")
                .long("best-effort")
                .action(ArgAction::SetTrue)
                .help("Keep nodes that migrated when other fetches fail"),
        )
}

/// Configuration from `--config`, overridden by the other flags
///
/// # Errors
/// Returns error if the config file cannot be loaded
pub fn config_from(matches: &ArgMatches) -> Result<TransformConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => TransformConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TransformConfig::default(),
    };
    if let Some(n) = matches.get_one::<usize>("concurrency") {
        config.max_concurrent_fetches = *n;
    }
    if matches.get_flag("best-effort") {
        config.commit_mode = CommitMode::BestEffort;
    }
    Ok(config)
}

/// Run a parsed command line
///
/// # Errors
/// Returns the first failure of path resolution, loading, migration or
/// saving
pub async fn execute(matches: &ArgMatches) -> Result<MigrationReport> {
    let input = matches
        .get_one::<PathBuf>("input")
        .context("missing input path")?;
    let output = matches.get_one::<PathBuf>("output");
    let paths = paths::resolve(input, output.map(PathBuf::as_path))?;
    let config = config_from(matches)?;
    tracing::debug!("{:?}", config);

    convert::convert(&paths, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ArgMatches {
        command()
            .try_get_matches_from(std::iter::once("omi-gltf-transform").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn input_is_required() {
        assert!(command()
            .try_get_matches_from(["omi-gltf-transform"])
            .is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let matches = parse(&["room.glb", "--concurrency", "4", "--best-effort"]);
        let config = config_from(&matches).unwrap();
        assert_eq!(config.max_concurrent_fetches, 4);
        assert_eq!(config.commit_mode, CommitMode::BestEffort);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("omi.toml");
        std::fs::write(&path, "max_concurrent_fetches = 2\nhttp_timeout_secs = 7\n").unwrap();

        let matches = parse(&["room.glb", "--config", path.to_str().unwrap(), "--concurrency", "6"]);
        let config = config_from(&matches).unwrap();
        assert_eq!(config.max_concurrent_fetches, 6);
        assert_eq!(config.http_timeout_secs, 7);
        assert_eq!(config.commit_mode, CommitMode::AllOrNothing);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let matches = parse(&["room.glb", "--config", "/nonexistent/omi.toml"]);
        assert!(config_from(&matches).is_err());
    }
}
