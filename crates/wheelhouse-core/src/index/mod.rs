//! Static PEP 503 index generation.
//!
//! The build is all-or-nothing: every filename is parsed and every archive
//! is read before the first byte of output is written, so a malformed name or
//! a corrupt wheel anywhere in the batch leaves the output tree untouched.

/// Page rendering.
pub mod html;
/// Platform tag summary and display aliases.
pub mod platform;

use crate::error::{Error, IoContext, Result};
use crate::local::{Artifact, scan_wheels};
use crate::metadata;
use crate::reporter::Reporter;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use wheelhouse_schema::{PackageName, Sha256Digest};

/// Default directory under the output root that holds the index.
pub const DEFAULT_NAMESPACE: &str = "p4a";
/// Default landing page title.
pub const DEFAULT_TITLE: &str = "p4a Python Package Index";
/// Name of every generated page.
pub const INDEX_FILE: &str = "index.html";

/// Static settings for one index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Prefix for artifact links. `None` renders bare, relative filenames.
    pub base_url: Option<String>,
    /// Directory under the output root that holds the index.
    pub namespace: String,
    /// Landing page title.
    pub title: String,
    /// Public URL of the index, shown in the install instructions.
    pub index_url: Option<String>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            title: DEFAULT_TITLE.to_string(),
            index_url: None,
        }
    }
}

/// One link on a package page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Artifact filename.
    pub filename: String,
    /// Digest of the extracted metadata record, if any.
    pub metadata_digest: Option<Sha256Digest>,
}

/// Artifacts grouped by package identity, each group sorted by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageIndex {
    packages: BTreeMap<PackageName, Vec<IndexEntry>>,
    platform_tags: BTreeSet<String>,
}

impl PackageIndex {
    /// Group artifacts. Order depends only on the set of names, never on the
    /// order they were discovered in.
    pub fn from_artifacts(artifacts: &[Artifact]) -> Self {
        let mut packages: BTreeMap<PackageName, Vec<IndexEntry>> = BTreeMap::new();
        for artifact in artifacts {
            packages
                .entry(artifact.package_identity().clone())
                .or_default()
                .push(IndexEntry {
                    filename: artifact.raw_name().to_string(),
                    metadata_digest: artifact.descriptor().map(|d| d.digest().clone()),
                });
        }
        for entries in packages.values_mut() {
            entries.sort_by(|a, b| a.filename.as_bytes().cmp(b.filename.as_bytes()));
        }

        let platform_tags = platform::summarize(
            artifacts
                .iter()
                .flat_map(|a| a.wheel().platform_tags())
                .map(String::as_str),
        );

        Self {
            packages,
            platform_tags,
        }
    }

    /// Sorted package identities.
    pub fn package_names(&self) -> impl Iterator<Item = &PackageName> {
        self.packages.keys()
    }

    /// Packages with their entries, sorted by identity.
    pub fn iter(&self) -> impl Iterator<Item = (&PackageName, &[IndexEntry])> {
        self.packages.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Display summary of platform tags, aliases included.
    pub fn platform_tags(&self) -> &BTreeSet<String> {
        &self.platform_tags
    }

    /// Number of packages.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Number of artifacts across all packages.
    pub fn artifact_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }
}

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    /// Packages indexed.
    pub packages: usize,
    /// Artifacts linked.
    pub artifacts: usize,
    /// Sidecars written.
    pub descriptors: usize,
    /// Namespace root holding the landing page.
    pub root: PathBuf,
    /// Platform summary shown on the landing page.
    pub platform_tags: BTreeSet<String>,
}

/// Remove package directories under `root` that `index` no longer names.
fn prune_stale(root: &Path, index: &PackageIndex) -> Result<()> {
    let keep: BTreeSet<&str> = index.package_names().map(PackageName::as_str).collect();
    for entry in std::fs::read_dir(root).at(root)? {
        let entry = entry.at(root)?;
        let path = entry.path();
        if !entry.file_type().at(&path)?.is_dir() {
            continue;
        }
        if !keep.contains(entry.file_name().to_string_lossy().as_ref()) {
            std::fs::remove_dir_all(&path).at(&path)?;
            tracing::debug!("removed stale package directory {}", path.display());
        }
    }
    Ok(())
}

/// Builds the static index tree for a wheel directory.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    options: IndexOptions,
}

impl IndexBuilder {
    /// Create a builder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the namespace is not a single plain
    /// path component.
    pub fn new(options: IndexOptions) -> Result<Self> {
        let ns = options.namespace.as_str();
        if ns.is_empty() || ns == "." || ns == ".." || ns.contains(['/', '\\']) {
            return Err(Error::validation(format!("invalid index namespace '{ns}'")));
        }
        Ok(Self { options })
    }

    /// Parse every wheel in `wheel_dir` and read its metadata record.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed filename or unreadable archive.
    pub fn collect(&self, wheel_dir: &Path, reporter: &dyn Reporter) -> Result<Vec<Artifact>> {
        let mut artifacts = scan_wheels(wheel_dir)?;
        let total = artifacts.len();
        for (i, artifact) in artifacts.iter_mut().enumerate() {
            reporter.progress("Reading", i + 1, total, artifact.raw_name());
            let descriptor = metadata::extract(artifact.file().path())?;
            if descriptor.is_none() {
                reporter.warning(&format!(
                    "{}: no metadata record, linked without integrity attribute",
                    artifact.raw_name()
                ));
            }
            artifact.set_descriptor(descriptor);
        }
        Ok(artifacts)
    }

    /// Write sidecars and pages for already collected artifacts.
    ///
    /// Package directories left under the namespace by an earlier build whose
    /// package is no longer present are removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on the first failed write.
    pub fn write(&self, artifacts: &[Artifact], out_root: &Path) -> Result<IndexSummary> {
        let index = PackageIndex::from_artifacts(artifacts);

        let mut descriptors = 0;
        for artifact in artifacts {
            if let Some(descriptor) = artifact.descriptor() {
                descriptor.write_sidecar(&artifact.sidecar_path())?;
                descriptors += 1;
            }
        }

        let root = out_root.join(&self.options.namespace);
        std::fs::create_dir_all(&root).at(&root)?;

        for (name, entries) in index.iter() {
            let pkg_dir = root.join(name.as_str());
            std::fs::create_dir_all(&pkg_dir).at(&pkg_dir)?;
            let page = html::render_package_page(name, entries, self.options.base_url.as_deref());
            let path = pkg_dir.join(INDEX_FILE);
            std::fs::write(&path, page).at(&path)?;
            tracing::debug!("wrote {} ({} files)", path.display(), entries.len());
        }

        prune_stale(&root, &index)?;

        let landing = root.join(INDEX_FILE);
        std::fs::write(&landing, html::render_landing_page(&index, &self.options)).at(&landing)?;
        tracing::info!(
            "index written to {} ({} packages)",
            root.display(),
            index.package_count()
        );

        Ok(IndexSummary {
            packages: index.package_count(),
            artifacts: index.artifact_count(),
            descriptors,
            root,
            platform_tags: index.platform_tags().clone(),
        })
    }

    /// Collect then write: the full index build.
    ///
    /// # Errors
    ///
    /// See [`Self::collect`] and [`Self::write`]. Nothing is written when
    /// collection fails.
    pub fn build(
        &self,
        wheel_dir: &Path,
        out_root: &Path,
        reporter: &dyn Reporter,
    ) -> Result<IndexSummary> {
        let artifacts = self.collect(wheel_dir, reporter)?;
        self.write(&artifacts, out_root)
    }
}
