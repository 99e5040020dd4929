//! wheelhouse - publish locally built wheels
//!
//! Two independent commands:
//!
//! - `index` renders a static PEP 503 "simple" index for a directory of
//!   wheels, writing each wheel's metadata record to a `.metadata` sidecar.
//! - `sync` makes the wheel and sidecar assets of a release mirror that
//!   directory, deleting stale assets before uploading replacements.
#![allow(clippy::doc_markdown)]

pub mod cmd;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line.
#[derive(Debug, Parser)]
#[command(name = "wheelhouse")]
#[command(author, version = env!("WHEELHOUSE_VERSION"), about = "wheelhouse - wheel index builder and release asset synchronizer")]
pub struct Cli {
    /// Print debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Optional TOML configuration file
    #[arg(long, global = true, env = "WHEELHOUSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a static package index for a directory of wheels
    Index(IndexArgs),
    /// Mirror a directory of wheels into a release
    Sync(SyncArgs),
}

/// Arguments of `wheelhouse index`.
#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Directory containing *.whl files
    pub wheel_dir: PathBuf,
    /// URL prefix for artifact links ('-' for relative links)
    pub base_url: String,
    /// Where to write the index tree
    pub output_dir: PathBuf,
    /// Directory under the output root that holds the index [default: p4a]
    #[arg(long)]
    pub namespace: Option<String>,
    /// Landing page title
    #[arg(long)]
    pub title: Option<String>,
    /// Public URL of the index, shown in the install instructions
    #[arg(long)]
    pub index_url: Option<String>,
}

/// Arguments of `wheelhouse sync`.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Release tag
    pub tag: String,
    /// Directory containing *.whl and *.whl.metadata files
    pub wheel_dir: PathBuf,
    /// Show the plan without changing the release
    #[arg(long)]
    pub dry_run: bool,
    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,
    /// Store backend (github, dir, memory) [default: github]
    #[arg(long)]
    pub store: Option<String>,
    /// Root directory for the dir backend
    #[arg(long)]
    pub store_root: Option<PathBuf>,
    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
}

/// Filter directive for the given verbosity, used when `RUST_LOG` is unset.
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_index_positionals() {
        let cli = Cli::parse_from(["wheelhouse", "index", "dist", "-", "site", "--namespace", "wheels"]);
        let Commands::Index(args) = cli.command else {
            panic!("expected index");
        };
        assert_eq!(args.wheel_dir, PathBuf::from("dist"));
        assert_eq!(args.base_url, "-");
        assert_eq!(args.output_dir, PathBuf::from("site"));
        assert_eq!(args.namespace.as_deref(), Some("wheels"));
    }

    #[test]
    fn parses_sync_flags() {
        let cli = Cli::parse_from([
            "wheelhouse",
            "-v",
            "sync",
            "android-arm64_v8a",
            "dist",
            "--dry-run",
            "--store",
            "dir",
            "--store-root",
            "/srv",
        ]);
        assert!(cli.verbose);
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert!(args.dry_run);
        assert_eq!(args.tag, "android-arm64_v8a");
        assert_eq!(args.store.as_deref(), Some("dir"));
        assert_eq!(args.store_root, Some(PathBuf::from("/srv")));
    }

    #[test]
    fn verbosity_maps_to_filter() {
        assert_eq!(default_log_filter(false), "warn");
        assert_eq!(default_log_filter(true), "debug");
    }
}
