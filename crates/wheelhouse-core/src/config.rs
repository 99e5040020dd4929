//! Optional `wheelhouse.toml` settings.
//!
//! Every value can also be given on the command line; flags win over the
//! file, and the file wins over built-in defaults.
//!
//! ```toml
//! [index]
//! namespace = "p4a"
//! title = "p4a Python Package Index"
//! index_url = "https://example.org/p4a/"
//!
//! [sync]
//! repo = "owner/wheels"
//! store = "github"
//! ```

use crate::error::{Error, Result};
use crate::index::IndexOptions;
use crate::store::StoreSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend used when neither flag nor file names one.
pub const DEFAULT_STORE: &str = "github";

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[index]` table.
    pub index: IndexConfig,
    /// `[sync]` table.
    pub sync: SyncConfig,
}

/// The `[index]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Link prefix for artifacts.
    pub base_url: Option<String>,
    /// Directory under the output root.
    pub namespace: Option<String>,
    /// Landing page title.
    pub title: Option<String>,
    /// Public index URL for the install instructions.
    pub index_url: Option<String>,
}

/// The `[sync]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// `owner/name` repository.
    pub repo: Option<String>,
    /// Store backend name.
    pub store: Option<String>,
    /// GitHub API base URL.
    pub api_url: Option<String>,
    /// Root directory for the `dir` backend.
    pub root: Option<PathBuf>,
}

/// Index settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct IndexOverrides {
    /// `<base_url>` argument; `Some("-")` or `Some("")` force relative links.
    pub base_url: Option<String>,
    /// `--namespace`
    pub namespace: Option<String>,
    /// `--title`
    pub title: Option<String>,
    /// `--index-url`
    pub index_url: Option<String>,
}

/// Sync settings given on the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct SyncOverrides {
    /// `--repo` / `GITHUB_REPOSITORY`
    pub repo: Option<String>,
    /// `--store`
    pub store: Option<String>,
    /// `--api-url` / `GITHUB_API_URL`
    pub api_url: Option<String>,
    /// `--store-root`
    pub root: Option<PathBuf>,
    /// `GITHUB_TOKEN`
    pub token: Option<String>,
}

/// Map the base URL argument to a link prefix. `-` and the empty string mean
/// "no prefix".
pub fn parse_base_url(raw: &str) -> Option<String> {
    match raw.trim() {
        "" | "-" => None,
        url => Some(url.to_string()),
    }
}

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed TOML or unknown keys.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::validation(format!("invalid configuration: {e}")))
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::validation(format!("cannot read config {}: {e}", path.display())))?;
        let config = Self::parse(&text)
            .map_err(|e| Error::validation(format!("{}: {e}", path.display())))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the empty configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Resolve index options: overrides, then this file, then defaults.
    pub fn index_options(&self, overrides: IndexOverrides) -> IndexOptions {
        let defaults = IndexOptions::default();
        let base_url = match overrides.base_url {
            Some(raw) => parse_base_url(&raw),
            None => self.index.base_url.as_deref().and_then(parse_base_url),
        };
        IndexOptions {
            base_url,
            namespace: overrides
                .namespace
                .or_else(|| self.index.namespace.clone())
                .unwrap_or(defaults.namespace),
            title: overrides
                .title
                .or_else(|| self.index.title.clone())
                .unwrap_or(defaults.title),
            index_url: overrides.index_url.or_else(|| self.index.index_url.clone()),
        }
    }

    /// Resolve the store backend name and its settings.
    pub fn store_settings(&self, overrides: SyncOverrides) -> (String, StoreSettings) {
        let store = overrides
            .store
            .or_else(|| self.sync.store.clone())
            .unwrap_or_else(|| DEFAULT_STORE.to_string());
        let settings = StoreSettings {
            repo: overrides.repo.or_else(|| self.sync.repo.clone()),
            api_url: overrides.api_url.or_else(|| self.sync.api_url.clone()),
            token: overrides.token.filter(|t| !t.is_empty()),
            root: overrides.root.or_else(|| self.sync.root.clone()),
        };
        (store, settings)
    }
}
