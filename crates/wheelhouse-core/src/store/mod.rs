//! Remote release stores.
//!
//! A store is an opaque named-asset bucket for one release with four
//! operations: list, get, put and delete. Stores refuse blind overwrites, so
//! replacing an asset always means delete first, then upload.
//!
//! Backends are picked by name from [`BACKENDS`], an explicit registry
//! populated at compile time.

/// Local directory backend.
pub mod dir;
/// GitHub releases backend.
pub mod github;
/// In-memory backend.
pub mod memory;

pub use dir::DirStore;
pub use github::GitHubReleaseStore;
pub use memory::MemoryStore;

use crate::error::{Error, Result, StoreOp};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use wheelhouse_schema::Sha256Digest;

/// An asset currently held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    /// Asset name, unique within the release.
    pub name: String,
    /// Backend-specific handle used to fetch or delete the asset.
    pub handle: String,
}

impl RemoteAsset {
    /// Create an asset reference.
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
        }
    }
}

/// Object-store view of one release.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable identity of the release, for diagnostics.
    fn describe(&self) -> String;

    /// Every asset in the release.
    async fn list(&self) -> Result<Vec<RemoteAsset>>;

    /// Full content of an asset.
    async fn fetch(&self, asset: &RemoteAsset) -> Result<Bytes>;

    /// SHA-256 of an asset's current content. Never cached: every call
    /// reflects what the store holds right now.
    async fn fetch_hash(&self, asset: &RemoteAsset) -> Result<Sha256Digest> {
        let data = self.fetch(asset).await?;
        Ok(Sha256Digest::compute(&data))
    }

    /// Create a new asset. Fails if `name` already exists.
    async fn upload(&self, name: &str, data: Bytes) -> Result<()>;

    /// Remove an asset.
    async fn delete(&self, asset: &RemoteAsset) -> Result<()>;
}

/// Everything a backend constructor may need. Unused fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    /// `owner/name` of the GitHub repository.
    pub repo: Option<String>,
    /// GitHub API base URL.
    pub api_url: Option<String>,
    /// GitHub token.
    pub token: Option<String>,
    /// Root directory for the `dir` backend.
    pub root: Option<PathBuf>,
}

type Constructor = fn(&StoreSettings, &str) -> Result<Box<dyn RemoteStore>>;

/// A registered store backend.
#[derive(Debug, Clone, Copy)]
pub struct StoreBackend {
    /// Stable name used on the command line and in config files.
    pub name: &'static str,
    /// One-line description.
    pub summary: &'static str,
    open: Constructor,
}

impl StoreBackend {
    /// Open the release `tag` on this backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when required settings are missing.
    pub fn open(&self, settings: &StoreSettings, tag: &str) -> Result<Box<dyn RemoteStore>> {
        (self.open)(settings, tag)
    }
}

/// All available backends.
pub const BACKENDS: &[StoreBackend] = &[
    StoreBackend {
        name: "github",
        summary: "GitHub release assets via the REST API",
        open: open_github,
    },
    StoreBackend {
        name: "dir",
        summary: "a local directory per release tag",
        open: open_dir,
    },
    StoreBackend {
        name: "memory",
        summary: "an empty in-memory release (dry runs and tests)",
        open: open_memory,
    },
];

fn open_github(settings: &StoreSettings, tag: &str) -> Result<Box<dyn RemoteStore>> {
    Ok(Box::new(GitHubReleaseStore::from_settings(settings, tag)?))
}

fn open_dir(settings: &StoreSettings, tag: &str) -> Result<Box<dyn RemoteStore>> {
    Ok(Box::new(DirStore::from_settings(settings, tag)?))
}

fn open_memory(_: &StoreSettings, tag: &str) -> Result<Box<dyn RemoteStore>> {
    Ok(Box::new(MemoryStore::new(tag)))
}

/// Look up a backend by name.
pub fn backend(name: &str) -> Option<&'static StoreBackend> {
    BACKENDS.iter().find(|b| b.name == name)
}

/// Open release `tag` on the backend called `name`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an unknown backend or missing settings.
pub fn open(name: &str, settings: &StoreSettings, tag: &str) -> Result<Box<dyn RemoteStore>> {
    let Some(b) = backend(name) else {
        let known: Vec<_> = BACKENDS.iter().map(|b| b.name).collect();
        return Err(Error::validation(format!(
            "unknown store backend '{name}' (known: {})",
            known.join(", ")
        )));
    };
    tracing::debug!("opening {} store for release {tag}", b.name);
    b.open(settings, tag)
}

/// Reject empty or path-like asset names before they reach a backend.
pub(crate) fn check_asset_name(name: &str, op: StoreOp) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::store(op, name, "invalid asset name"));
    }
    Ok(())
}
