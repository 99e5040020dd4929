//! Index command

use crate::IndexArgs;
use anyhow::{Context, Result};
use std::path::Path;
use wheelhouse_core::Reporter;
use wheelhouse_core::config::{Config, IndexOverrides};
use wheelhouse_core::index::IndexBuilder;

/// Build the static index described by `args`.
///
/// # Errors
///
/// Fails on an invalid directory, a malformed wheel filename, an unreadable
/// archive or a failed write. Nothing is written in the first three cases.
pub async fn index(args: IndexArgs, config: Option<&Path>, reporter: &dyn Reporter) -> Result<()> {
    let config = Config::load_optional(config).await?;
    let options = config.index_options(IndexOverrides {
        base_url: Some(args.base_url),
        namespace: args.namespace,
        title: args.title,
        index_url: args.index_url,
    });

    let builder = IndexBuilder::new(options)?;
    let summary = builder
        .build(&args.wheel_dir, &args.output_dir, reporter)
        .with_context(|| format!("Failed to index {}", args.wheel_dir.display()))?;

    reporter.info(&format!(
        "wrote {} ({} files, {} metadata sidecars)",
        summary.root.display(),
        summary.artifacts,
        summary.descriptors
    ));
    reporter.summary(&format!("indexed {} packages", summary.packages));
    Ok(())
}
