// src/store/file.rs
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::memory::{MemoryStore, StoreState};
use super::{Store, StoreError};
use crate::ingest::types::{Follower, Item, Profile};

/// JSON snapshot store: a [`MemoryStore`] that rewrites its file after every
/// mutation (temp file + rename, so readers never see a torn snapshot).
#[derive(Debug)]
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
}

impl FileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => StoreState::default(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!(
            path = %path.display(),
            profiles = state.profiles.len(),
            items = state.items.len(),
            "opened store file"
        );
        Ok(Self {
            inner: MemoryStore::from_state(state),
            path,
        })
    }

    pub fn with_max_image_attempts(mut self, attempts: u32) -> Self {
        self.inner = self.inner.with_max_image_attempts(attempts);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read access for inspection helpers (`item`, `following`, ...).
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn insert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.inner.insert_profile(profile)?;
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let st = self.inner.state()?;
        let json = serde_json::to_vec_pretty(&*st)?;
        write_atomic(&self.path, &json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)
}

#[async_trait]
impl Store for FileStore {
    async fn list_feed_driven_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.inner.list_feed_driven_profiles().await
    }

    async fn select_items_needing_images(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        self.inner.select_items_needing_images(limit).await
    }

    async fn upsert_item(&self, item: &Item) -> Result<(), StoreError> {
        self.inner.upsert_item(item).await?;
        self.persist()
    }

    async fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        self.inner.update_item(item).await?;
        self.persist()
    }

    async fn list_followers(
        &self,
        pid: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Follower>, StoreError> {
        self.inner.list_followers(pid, limit, offset).await
    }

    async fn follow(&self, follower: &str, pid: &str) -> Result<(), StoreError> {
        self.inner.follow(follower, pid).await?;
        self.persist()
    }

    async fn unfollow(&self, follower: &str, pid: &str) -> Result<(), StoreError> {
        self.inner.unfollow(follower, pid).await?;
        self.persist()
    }
}
