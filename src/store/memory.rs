// src/store/memory.rs
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Store, StoreError};
use crate::ingest::types::{Follower, Item, Profile};

/// Default number of failed image attempts before an item stops being selected.
pub const DEFAULT_MAX_IMAGE_ATTEMPTS: u32 = 3;

/// A store call, recorded in order when journaling is on (see
/// [`MemoryStore::with_journal`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    ListFollowers { pid: String },
    Unfollow { follower: String, pid: String },
    Follow { follower: String, pid: String },
    Upsert { id: String },
    Update { id: String },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub items: BTreeMap<String, Item>,
    /// follower pid -> followed pids, most recent first
    #[serde(default)]
    pub following: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub image_attempts: BTreeMap<String, u32>,
    /// `None` unless journaling was asked for.
    #[serde(skip)]
    journal: Option<Vec<StoreOp>>,
}

impl StoreState {
    fn record(&mut self, op: StoreOp) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
    }

    fn refresh_follower_count(&mut self, pid: &str) {
        let count = self
            .following
            .values()
            .filter(|list| list.iter().any(|p| p == pid))
            .count();
        if let Some(p) = self.profiles.get_mut(pid) {
            p.follower_count = count;
        }
    }

    pub(crate) fn feed_driven_profiles(&self) -> Vec<Profile> {
        self.profiles
            .values()
            .filter(|p| p.is_feed_driven())
            .cloned()
            .collect()
    }

    pub(crate) fn items_needing_images(&self, limit: usize, max_attempts: u32) -> Vec<Item> {
        let mut out: Vec<Item> = self
            .items
            .values()
            .filter(|it| it.needs_image())
            .filter(|it| self.image_attempts.get(&it.id).copied().unwrap_or(0) < max_attempts)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.event.cmp(&a.event).then_with(|| a.id.cmp(&b.id)));
        out.truncate(limit);
        out
    }

    pub(crate) fn upsert(&mut self, item: &Item) {
        self.record(StoreOp::Upsert {
            id: item.id.clone(),
        });
        let mut incoming = item.clone();
        // A backfilled image survives re-ingestion of the same entry.
        if let Some(existing) = self.items.get(&item.id) {
            if !existing.image.is_empty() {
                incoming.image = existing.image.clone();
            }
        }
        self.items.insert(incoming.id.clone(), incoming);
    }

    pub(crate) fn update(&mut self, item: &Item) -> Result<(), StoreError> {
        self.record(StoreOp::Update {
            id: item.id.clone(),
        });
        let slot = self
            .items
            .get_mut(&item.id)
            .ok_or_else(|| StoreError::NotFound(item.id.clone()))?;
        *slot = item.clone();
        if item.image.is_empty() {
            *self.image_attempts.entry(item.id.clone()).or_insert(0) += 1;
        } else {
            self.image_attempts.remove(&item.id);
        }
        Ok(())
    }

    pub(crate) fn followers(&mut self, pid: &str, limit: usize, offset: usize) -> Vec<Follower> {
        self.record(StoreOp::ListFollowers {
            pid: pid.to_string(),
        });
        self.following
            .iter()
            .filter(|(_, followed)| followed.iter().any(|p| p == pid))
            .map(|(follower, _)| Follower {
                pid: follower.clone(),
            })
            .skip(offset)
            .take(limit)
            .collect()
    }

    pub(crate) fn follow(&mut self, follower: &str, pid: &str) {
        self.record(StoreOp::Follow {
            follower: follower.to_string(),
            pid: pid.to_string(),
        });
        let list = self.following.entry(follower.to_string()).or_default();
        list.retain(|p| p != pid);
        list.insert(0, pid.to_string());
        self.refresh_follower_count(pid);
    }

    pub(crate) fn unfollow(&mut self, follower: &str, pid: &str) {
        self.record(StoreOp::Unfollow {
            follower: follower.to_string(),
            pid: pid.to_string(),
        });
        if let Some(list) = self.following.get_mut(follower) {
            list.retain(|p| p != pid);
        }
        self.refresh_follower_count(pid);
    }
}

/// In-process store. Backs tests and `FileStore`.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    max_image_attempts: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
            max_image_attempts: DEFAULT_MAX_IMAGE_ATTEMPTS,
        }
    }

    pub fn with_max_image_attempts(mut self, attempts: u32) -> Self {
        self.max_image_attempts = attempts.max(1);
        self
    }

    /// Record every store call from here on. Off by default; the journal is
    /// unbounded.
    pub fn with_journal(mut self) -> Self {
        if let Ok(st) = self.state.get_mut() {
            st.journal.get_or_insert_with(Vec::new);
        }
        self
    }

    pub(crate) fn state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".into()))
    }

    pub fn insert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        let mut st = self.state()?;
        let pid = profile.pid.clone();
        st.profiles.insert(pid.clone(), profile);
        st.refresh_follower_count(&pid);
        Ok(())
    }

    pub fn item(&self, id: &str) -> Option<Item> {
        self.state().ok()?.items.get(id).cloned()
    }

    pub fn items_for(&self, pid: &str) -> Vec<Item> {
        self.state()
            .map(|st| st.items.values().filter(|i| i.pid == pid).cloned().collect())
            .unwrap_or_default()
    }

    pub fn item_count(&self) -> usize {
        self.state().map(|st| st.items.len()).unwrap_or(0)
    }

    pub fn profile(&self, pid: &str) -> Option<Profile> {
        self.state().ok()?.profiles.get(pid).cloned()
    }

    /// Followed pids for `follower`, most recent first.
    pub fn following(&self, follower: &str) -> Vec<String> {
        self.state()
            .ok()
            .and_then(|st| st.following.get(follower).cloned())
            .unwrap_or_default()
    }

    /// Recorded calls; empty when journaling is off.
    pub fn journal(&self) -> Vec<StoreOp> {
        self.state()
            .ok()
            .and_then(|st| st.journal.clone())
            .unwrap_or_default()
    }

    pub fn clear_journal(&self) {
        if let Ok(mut st) = self.state() {
            if let Some(journal) = st.journal.as_mut() {
                journal.clear();
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_feed_driven_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.state()?.feed_driven_profiles())
    }

    async fn select_items_needing_images(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .state()?
            .items_needing_images(limit, self.max_image_attempts))
    }

    async fn upsert_item(&self, item: &Item) -> Result<(), StoreError> {
        self.state()?.upsert(item);
        Ok(())
    }

    async fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        self.state()?.update(item)
    }

    async fn list_followers(
        &self,
        pid: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Follower>, StoreError> {
        Ok(self.state()?.followers(pid, limit, offset))
    }

    async fn follow(&self, follower: &str, pid: &str) -> Result<(), StoreError> {
        self.state()?.follow(follower, pid);
        Ok(())
    }

    async fn unfollow(&self, follower: &str, pid: &str) -> Result<(), StoreError> {
        self.state()?.unfollow(follower, pid);
        Ok(())
    }
}
