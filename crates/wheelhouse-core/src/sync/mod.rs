//! Release asset synchronization.
//!
//! Makes the wheel and sidecar assets of a release mirror a local directory:
//! list both sides, diff by content hash, then delete and upload. Assets
//! that are neither wheels nor sidecars are left alone.

/// Plan execution.
pub mod exec;
/// Plan computation.
pub mod plan;

pub use exec::{SyncExecutor, SyncReport};
pub use plan::{SyncPlan, plan};

use crate::error::Result;
use crate::local::{is_release_file, scan_release_files};
use crate::reporter::Reporter;
use crate::store::RemoteStore;
use std::path::Path;

/// Result of [`sync_release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The local directory holds no wheels or sidecars; the store was not
    /// contacted.
    NothingToDo,
    /// A plan was computed and applied (or previewed).
    Applied {
        /// The computed plan.
        plan: SyncPlan,
        /// What was done.
        report: SyncReport,
    },
}

/// Synchronize `wheel_dir` into `store`.
///
/// # Errors
///
/// Returns [`crate::Error::Validation`] for a bad directory and the first
/// store or I/O error otherwise.
pub async fn sync_release(
    store: &dyn RemoteStore,
    wheel_dir: &Path,
    dry_run: bool,
    reporter: &dyn Reporter,
) -> Result<SyncOutcome> {
    let local = scan_release_files(wheel_dir)?;
    if local.is_empty() {
        tracing::info!("no wheels or sidecars in {}", wheel_dir.display());
        return Ok(SyncOutcome::NothingToDo);
    }

    tracing::info!("syncing {} local files to {}", local.len(), store.describe());
    let remote: Vec<_> = store
        .list()
        .await?
        .into_iter()
        .filter(|asset| {
            let keep = is_release_file(&asset.name);
            if !keep {
                tracing::debug!("ignoring remote asset {}", asset.name);
            }
            keep
        })
        .collect();

    let plan = plan::plan(&local, &remote, store, reporter).await?;
    let report = SyncExecutor::new(store, reporter, dry_run)
        .apply(&plan, &remote, &local)
        .await?;
    Ok(SyncOutcome::Applied { plan, report })
}
