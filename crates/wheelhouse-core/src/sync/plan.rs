//! Diffing the local build against the release.

use crate::error::Result;
use crate::local::LocalFile;
use crate::reporter::Reporter;
use crate::store::{RemoteAsset, RemoteStore};
use std::collections::{BTreeMap, BTreeSet};

/// Phase label for content comparison.
pub const PHASE_CHECKING: &str = "Checking";

/// What has to change for the release to mirror the local directory.
///
/// Names present in both `to_delete` and `to_upload` are replacements:
/// stores refuse overwrites, so the stale copy goes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Remote names to remove.
    pub to_delete: BTreeSet<String>,
    /// Local names to upload.
    pub to_upload: BTreeSet<String>,
    /// Names whose content already matches.
    pub unchanged: BTreeSet<String>,
}

impl SyncPlan {
    /// No store mutation required.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_upload.is_empty()
    }

    /// Names being replaced with new content.
    pub fn replaced(&self) -> impl Iterator<Item = &String> {
        self.to_delete.intersection(&self.to_upload)
    }
}

/// Compare `local` against `remote`.
///
/// Only names on both sides cost a remote fetch. Local hashes are memoized on
/// the [`LocalFile`], so each file is read at most once per run.
///
/// # Errors
///
/// Returns the first store or I/O error; no partial plan is produced.
pub async fn plan(
    local: &[LocalFile],
    remote: &[RemoteAsset],
    store: &dyn RemoteStore,
    reporter: &dyn Reporter,
) -> Result<SyncPlan> {
    let local: BTreeMap<&str, &LocalFile> = local.iter().map(|f| (f.name(), f)).collect();
    let remote: BTreeMap<&str, &RemoteAsset> = remote.iter().map(|a| (a.name.as_str(), a)).collect();

    let mut plan = SyncPlan::default();

    for name in remote.keys().filter(|n| !local.contains_key(*n)) {
        plan.to_delete.insert((*name).to_string());
    }
    for name in local.keys().filter(|n| !remote.contains_key(*n)) {
        plan.to_upload.insert((*name).to_string());
    }

    let overlap: Vec<(&LocalFile, &RemoteAsset)> = local
        .iter()
        .filter_map(|(name, file)| remote.get(name).map(|asset| (*file, *asset)))
        .collect();
    let total = overlap.len();

    for (i, (file, asset)) in overlap.into_iter().enumerate() {
        reporter.progress(PHASE_CHECKING, i + 1, total, file.name());
        let remote_hash = store.fetch_hash(asset).await?;
        let local_hash = file.content_hash()?;
        if *local_hash == remote_hash {
            tracing::debug!("{} unchanged", file.name());
            plan.unchanged.insert(file.name().to_string());
        } else {
            tracing::debug!("{} differs: local {local_hash}, remote {remote_hash}", file.name());
            plan.to_delete.insert(file.name().to_string());
            plan.to_upload.insert(file.name().to_string());
        }
    }

    tracing::info!(
        "plan: {} to delete, {} to upload, {} unchanged",
        plan.to_delete.len(),
        plan.to_upload.len(),
        plan.unchanged.len()
    );
    Ok(plan)
}
