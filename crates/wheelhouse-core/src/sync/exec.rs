//! Applying a [`SyncPlan`] to a store.

use super::plan::SyncPlan;
use crate::error::{Error, IoContext, Result};
use crate::local::LocalFile;
use crate::reporter::Reporter;
use crate::store::{RemoteAsset, RemoteStore};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Phase label for deletions.
pub const PHASE_DELETING: &str = "Deleting";
/// Phase label for uploads.
pub const PHASE_UPLOADING: &str = "Uploading";

/// What an apply did, or would have done under dry-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Names removed from the release, in order.
    pub deleted: Vec<String>,
    /// Names uploaded to the release, in order.
    pub uploaded: Vec<String>,
    /// Number of names left untouched.
    pub unchanged: usize,
    /// No store mutation was performed.
    pub dry_run: bool,
}

/// Runs a plan against one store: every delete, then every upload.
///
/// The first failure stops the run. Steps already applied stay applied, and
/// a fresh plan on the next run picks up from there.
pub struct SyncExecutor<'a> {
    store: &'a dyn RemoteStore,
    reporter: &'a dyn Reporter,
    dry_run: bool,
}

impl std::fmt::Debug for SyncExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncExecutor")
            .field("store", &self.store.describe())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl<'a> SyncExecutor<'a> {
    /// Create an executor.
    pub fn new(store: &'a dyn RemoteStore, reporter: &'a dyn Reporter, dry_run: bool) -> Self {
        Self {
            store,
            reporter,
            dry_run,
        }
    }

    /// Apply `plan`. `remote` and `local` resolve plan names to store handles
    /// and files.
    ///
    /// # Errors
    ///
    /// Returns the first store or I/O error. A name in the plan that is
    /// missing from `remote`/`local` is a [`Error::Validation`].
    pub async fn apply(
        &self,
        plan: &SyncPlan,
        remote: &[RemoteAsset],
        local: &[LocalFile],
    ) -> Result<SyncReport> {
        let remote: BTreeMap<&str, &RemoteAsset> = remote.iter().map(|a| (a.name.as_str(), a)).collect();
        let local: BTreeMap<&str, &LocalFile> = local.iter().map(|f| (f.name(), f)).collect();

        let mut report = SyncReport {
            unchanged: plan.unchanged.len(),
            dry_run: self.dry_run,
            ..SyncReport::default()
        };

        if plan.to_delete.is_empty() {
            self.reporter.info("No existing wheel/metadata assets to delete.");
        } else if self.dry_run {
            self.reporter
                .info(&format!("Would delete {} asset(s):", plan.to_delete.len()));
            for name in &plan.to_delete {
                self.reporter.info(&format!("  - {name}"));
            }
            report.deleted.extend(plan.to_delete.iter().cloned());
        } else {
            let total = plan.to_delete.len();
            for (i, name) in plan.to_delete.iter().enumerate() {
                self.reporter.progress(PHASE_DELETING, i + 1, total, name);
                let asset = remote
                    .get(name.as_str())
                    .ok_or_else(|| Error::validation(format!("planned delete of unknown asset '{name}'")))?;
                self.store.delete(asset).await?;
                tracing::debug!("deleted {name}");
                report.deleted.push(name.clone());
            }
        }

        if plan.to_upload.is_empty() {
            self.reporter.info("No wheel/metadata assets to upload.");
        } else if self.dry_run {
            self.reporter
                .info(&format!("Would upload {} asset(s):", plan.to_upload.len()));
            for name in &plan.to_upload {
                self.reporter.info(&format!("  + {name}"));
            }
            report.uploaded.extend(plan.to_upload.iter().cloned());
        } else {
            let total = plan.to_upload.len();
            for (i, name) in plan.to_upload.iter().enumerate() {
                self.reporter.progress(PHASE_UPLOADING, i + 1, total, name);
                let file = local
                    .get(name.as_str())
                    .ok_or_else(|| Error::validation(format!("planned upload of unknown file '{name}'")))?;
                let data = tokio::fs::read(file.path()).await.at(file.path())?;
                self.store.upload(name, Bytes::from(data)).await?;
                tracing::debug!("uploaded {name}");
                report.uploaded.push(name.clone());
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StoreOp};
    use crate::reporter::NullReporter;
    use crate::store::MemoryStore;
    use crate::store::memory::Call;
    use crate::sync::plan::plan as diff;
    use crate::sync::plan::tests::local_files;
    use std::sync::Mutex;
    use wheelhouse_schema::Sha256Digest;

    /// Keeps every info line.
    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl Reporter for Recorder {
        fn progress(&self, _: &str, _: usize, _: usize, _: &str) {}
        fn info(&self, msg: &str) {
            self.lines.lock().unwrap().push(msg.to_string());
        }
        fn warning(&self, _: &str) {}
        fn summary(&self, _: &str) {}
    }

    #[tokio::test]
    async fn every_delete_precedes_every_upload() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_files(
            dir.path(),
            &[("a.whl", b"a2"), ("b.whl", b"b2"), ("c.whl", b"new")],
        );
        let store = MemoryStore::with_assets("v1", [("a.whl", "a1"), ("b.whl", "b1"), ("z.whl", "z")]);
        let remote = store.list().await.unwrap();
        let plan = diff(&local, &remote, &store, &NullReporter).await.unwrap();

        let report = SyncExecutor::new(&store, &NullReporter, false)
            .apply(&plan, &remote, &local)
            .await
            .unwrap();
        assert_eq!(report.deleted, ["a.whl", "b.whl", "z.whl"]);
        assert_eq!(report.uploaded, ["a.whl", "b.whl", "c.whl"]);

        let mutations: Vec<_> = store
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Put(_) | Call::Delete(_)))
            .collect();
        let last_delete = mutations.iter().rposition(|c| matches!(c, Call::Delete(_))).unwrap();
        let first_upload = mutations.iter().position(|c| matches!(c, Call::Put(_))).unwrap();
        assert!(last_delete < first_upload);
    }

    #[tokio::test]
    async fn apply_converges_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_files(
            dir.path(),
            &[("pkg-1.0-py3-none-any.whl", b"new"), ("pkg-1.0-py3-none-any.whl.metadata", b"M")],
        );
        let store = MemoryStore::with_assets(
            "v1",
            [("pkg-1.0-py3-none-any.whl", "old"), ("stale-0.1-py3-none-any.whl", "s")],
        );
        let remote = store.list().await.unwrap();
        let plan = diff(&local, &remote, &store, &NullReporter).await.unwrap();
        SyncExecutor::new(&store, &NullReporter, false)
            .apply(&plan, &remote, &local)
            .await
            .unwrap();

        let after = store.snapshot();
        let names: Vec<_> = after.keys().map(String::as_str).collect();
        assert_eq!(names, ["pkg-1.0-py3-none-any.whl", "pkg-1.0-py3-none-any.whl.metadata"]);
        for file in &local {
            assert_eq!(
                &Sha256Digest::compute(&after[file.name()]),
                file.content_hash().unwrap()
            );
        }

        // A second pass finds nothing to do.
        let remote = store.list().await.unwrap();
        let again = diff(&local, &remote, &store, &NullReporter).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn dry_run_never_mutates() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_files(dir.path(), &[("pkg-1.0-py3-none-any.whl", b"new")]);
        let store = MemoryStore::with_assets("v1", [("pkg-1.0-py3-none-any.whl", "old")]);
        let remote = store.list().await.unwrap();
        let plan = diff(&local, &remote, &store, &NullReporter).await.unwrap();

        let reporter = Recorder::default();
        let report = SyncExecutor::new(&store, &reporter, true)
            .apply(&plan, &remote, &local)
            .await
            .unwrap();
        assert!(report.dry_run);
        assert_eq!(
            *reporter.lines.lock().unwrap(),
            [
                "Would delete 1 asset(s):",
                "  - pkg-1.0-py3-none-any.whl",
                "Would upload 1 asset(s):",
                "  + pkg-1.0-py3-none-any.whl",
            ]
        );
        assert_eq!(report.deleted, ["pkg-1.0-py3-none-any.whl"]);
        assert_eq!(report.uploaded, ["pkg-1.0-py3-none-any.whl"]);
        assert!(
            store
                .calls()
                .iter()
                .all(|c| !matches!(c, Call::Put(_) | Call::Delete(_)))
        );
        assert_eq!(store.snapshot()["pkg-1.0-py3-none-any.whl"], Bytes::from("old"));
    }

    #[tokio::test]
    async fn first_failure_stops_and_rerun_converges() {
        let dir = tempfile::tempdir().unwrap();
        let local = local_files(dir.path(), &[("a.whl", b"A"), ("b.whl", b"B"), ("c.whl", b"C")]);
        let store = MemoryStore::new("v1");
        store.fail_on(StoreOp::Put, "b.whl");

        let remote = store.list().await.unwrap();
        let plan = diff(&local, &remote, &store, &NullReporter).await.unwrap();
        let err = SyncExecutor::new(&store, &NullReporter, false)
            .apply(&plan, &remote, &local)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteStore);
        // a.whl landed, c.whl was never attempted.
        let names: Vec<_> = store.snapshot().into_keys().collect();
        assert_eq!(names, ["a.whl"]);
        assert!(!store.calls().contains(&Call::Put("c.whl".into())));

        let remote = store.list().await.unwrap();
        let plan = diff(&local, &remote, &store, &NullReporter).await.unwrap();
        assert_eq!(plan.unchanged.len(), 1);
        SyncExecutor::new(&store, &NullReporter, false)
            .apply(&plan, &remote, &local)
            .await
            .unwrap();
        assert_eq!(store.snapshot().len(), 3);
    }
}
