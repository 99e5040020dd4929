use super::{RemoteAsset, RemoteStore, check_asset_name};
use crate::error::{Error, Result, StoreOp};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A store call as recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `list()`
    List,
    /// `fetch()` / `fetch_hash()` of the named asset.
    Get(String),
    /// `upload()` of the named asset.
    Put(String),
    /// `delete()` of the named asset.
    Delete(String),
}

#[derive(Debug, Default)]
struct Inner {
    assets: BTreeMap<String, Bytes>,
    calls: Vec<Call>,
    fail: Option<(StoreOp, String)>,
}

/// In-memory release with a call log.
///
/// Follows the same no-overwrite rule as real stores. Used by tests to check
/// plan ordering, and as a scratch backend for dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tag: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty release.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            inner: Mutex::default(),
        }
    }

    /// Create a release pre-populated with `assets`.
    pub fn with_assets<I, N, D>(tag: impl Into<String>, assets: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<Bytes>,
    {
        let store = Self::new(tag);
        {
            let mut inner = store.lock();
            for (name, data) in assets {
                inner.assets.insert(name.into(), data.into());
            }
        }
        store
    }

    /// Make the next `op` on `name` fail with a store error.
    pub fn fail_on(&self, op: StoreOp, name: impl Into<String>) {
        self.lock().fail = Some((op, name.into()));
    }

    /// Snapshot of current contents.
    pub fn snapshot(&self) -> BTreeMap<String, Bytes> {
        self.lock().assets.clone()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, call: Call, op: StoreOp, name: &str) -> Result<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if inner
            .fail
            .as_ref()
            .is_some_and(|(fail_op, fail_name)| *fail_op == op && fail_name == name)
        {
            inner.fail = None;
            return Err(Error::store(op, name, "injected failure"));
        }
        Ok(inner)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn describe(&self) -> String {
        format!("memory:{}", self.tag)
    }

    async fn list(&self) -> Result<Vec<RemoteAsset>> {
        let inner = self.record(Call::List, StoreOp::List, &self.tag)?;
        Ok(inner
            .assets
            .keys()
            .map(|name| RemoteAsset::new(name.clone(), name.clone()))
            .collect())
    }

    async fn fetch(&self, asset: &RemoteAsset) -> Result<Bytes> {
        let inner = self.record(Call::Get(asset.name.clone()), StoreOp::Get, &asset.name)?;
        inner
            .assets
            .get(&asset.handle)
            .cloned()
            .ok_or_else(|| Error::store(StoreOp::Get, &asset.name, "no such asset"))
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<()> {
        check_asset_name(name, StoreOp::Put)?;
        let mut inner = self.record(Call::Put(name.to_string()), StoreOp::Put, name)?;
        if inner.assets.contains_key(name) {
            return Err(Error::store(StoreOp::Put, name, "asset already exists"));
        }
        inner.assets.insert(name.to_string(), data);
        Ok(())
    }

    async fn delete(&self, asset: &RemoteAsset) -> Result<()> {
        let mut inner = self.record(Call::Delete(asset.name.clone()), StoreOp::Delete, &asset.name)?;
        if inner.assets.remove(&asset.handle).is_none() {
            return Err(Error::store(StoreOp::Delete, &asset.name, "no such asset"));
        }
        Ok(())
    }
}
