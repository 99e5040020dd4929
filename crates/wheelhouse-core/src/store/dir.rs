use super::{RemoteAsset, RemoteStore, StoreSettings, check_asset_name};
use crate::error::{Error, Result, StoreOp};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Releases as plain directories: `<root>/<tag>/<asset>`.
///
/// Handy for staging a release on a file server or for exercising the
/// synchronizer without network access.
#[derive(Debug, Clone)]
pub struct DirStore {
    tag: String,
    release_dir: PathBuf,
}

impl DirStore {
    /// Store rooted at `root`, release `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `tag` cannot be used as a directory name.
    pub fn new(root: impl AsRef<Path>, tag: &str) -> Result<Self> {
        if check_asset_name(tag, StoreOp::List).is_err() {
            return Err(Error::validation(format!("invalid release tag '{tag}'")));
        }
        Ok(Self {
            tag: tag.to_string(),
            release_dir: root.as_ref().join(tag),
        })
    }

    /// Build from settings. `root` is required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when no root directory is configured.
    pub fn from_settings(settings: &StoreSettings, tag: &str) -> Result<Self> {
        let root = settings
            .root
            .as_ref()
            .ok_or_else(|| Error::validation("the dir store needs a root directory (--store-root)"))?;
        Self::new(root, tag)
    }

    /// Directory holding this release's assets.
    pub fn release_dir(&self) -> &Path {
        &self.release_dir
    }

    fn asset_path(&self, asset: &RemoteAsset) -> PathBuf {
        PathBuf::from(&asset.handle)
    }
}

#[async_trait]
impl RemoteStore for DirStore {
    fn describe(&self) -> String {
        format!("dir:{}", self.release_dir.display())
    }

    async fn list(&self) -> Result<Vec<RemoteAsset>> {
        let mut entries = match tokio::fs::read_dir(&self.release_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("release directory {} missing, treating as empty", self.release_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::store(StoreOp::List, &self.tag, e)),
        };

        let mut assets = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::store(StoreOp::List, &self.tag, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| Error::store(StoreOp::List, &self.tag, e))?
                .is_file();
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                assets.push(RemoteAsset::new(name, entry.path().to_string_lossy()));
            }
        }
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    async fn fetch(&self, asset: &RemoteAsset) -> Result<Bytes> {
        tokio::fs::read(self.asset_path(asset))
            .await
            .map(Bytes::from)
            .map_err(|e| Error::store(StoreOp::Get, &asset.name, e))
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<()> {
        check_asset_name(name, StoreOp::Put)?;
        tokio::fs::create_dir_all(&self.release_dir)
            .await
            .map_err(|e| Error::store(StoreOp::Put, name, e))?;

        let path = self.release_dir.join(name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => Error::store(StoreOp::Put, name, "asset already exists"),
                _ => Error::store(StoreOp::Put, name, e),
            })?;
        file.write_all(&data)
            .await
            .map_err(|e| Error::store(StoreOp::Put, name, e))?;
        file.flush()
            .await
            .map_err(|e| Error::store(StoreOp::Put, name, e))?;
        Ok(())
    }

    async fn delete(&self, asset: &RemoteAsset) -> Result<()> {
        tokio::fs::remove_file(self.asset_path(asset))
            .await
            .map_err(|e| Error::store(StoreOp::Delete, &asset.name, e))
    }
}
