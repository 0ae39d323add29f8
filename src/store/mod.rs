// src/store/mod.rs
//! Persistence collaborator. The fetch pipeline only ever talks to [`Store`];
//! the two bundled implementations keep everything in one serializable
//! [`memory::StoreState`].

pub mod file;
pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::ingest::types::{Follower, Item, Profile};

pub use file::FileStore;
pub use memory::{MemoryStore, StoreOp};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store data error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Store operations used by the orchestrators.
///
/// Contract relied on by the reorder protocol: `follow` places the
/// `(follower, pid)` edge at the most-recent position of the follower's
/// timeline, even when the edge already existed.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_feed_driven_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    /// Items without an image, newest first, at most `limit`.
    async fn select_items_needing_images(&self, limit: usize) -> Result<Vec<Item>, StoreError>;

    /// Insert or overwrite by `item.id`.
    async fn upsert_item(&self, item: &Item) -> Result<(), StoreError>;

    /// Write back an existing item after an image attempt.
    async fn update_item(&self, item: &Item) -> Result<(), StoreError>;

    async fn list_followers(
        &self,
        pid: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Follower>, StoreError>;

    async fn follow(&self, follower: &str, pid: &str) -> Result<(), StoreError>;

    async fn unfollow(&self, follower: &str, pid: &str) -> Result<(), StoreError>;
}
