//! Sync command

use crate::SyncArgs;
use anyhow::{Context, Result};
use std::path::Path;
use wheelhouse_core::Reporter;
use wheelhouse_core::config::{Config, SyncOverrides};
use wheelhouse_core::store;
use wheelhouse_core::sync::{SyncOutcome, sync_release};

/// Mirror `args.wheel_dir` into release `args.tag`.
///
/// # Errors
///
/// Fails on an invalid directory, bad store settings, or the first store
/// error. Steps applied before the failure are kept.
pub async fn sync(args: SyncArgs, config: Option<&Path>, reporter: &dyn Reporter) -> Result<()> {
    let config = Config::load_optional(config).await?;
    let (backend, settings) = config.store_settings(SyncOverrides {
        repo: args.repo,
        store: args.store,
        api_url: args.api_url,
        root: args.store_root,
        token: std::env::var("GITHUB_TOKEN").ok(),
    });

    let store = store::open(&backend, &settings, &args.tag)?;
    if args.dry_run {
        reporter.info(&format!("Dry run against {}", store.describe()));
    }

    let outcome = sync_release(store.as_ref(), &args.wheel_dir, args.dry_run, reporter)
        .await
        .with_context(|| format!("Failed to sync {} to {}", args.wheel_dir.display(), store.describe()))?;

    match outcome {
        SyncOutcome::NothingToDo => reporter.summary("nothing to do"),
        SyncOutcome::Applied { report, .. } => {
            let verb = if report.dry_run { "would delete" } else { "deleted" };
            let upload_verb = if report.dry_run { "would upload" } else { "uploaded" };
            reporter.summary(&format!(
                "{verb} {}, {upload_verb} {}, {} unchanged",
                report.deleted.len(),
                report.uploaded.len(),
                report.unchanged
            ));
        }
    }
    Ok(())
}
