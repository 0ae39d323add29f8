// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A followable source backed by a syndicated feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub pid: String,
    #[serde(default)]
    pub feed_url: String,
    #[serde(default)]
    pub follower_count: usize,
}

impl Profile {
    pub fn new(pid: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            feed_url: feed_url.into(),
            follower_count: 0,
        }
    }

    pub fn is_feed_driven(&self) -> bool {
        !self.feed_url.trim().is_empty()
    }
}

/// One ingested piece of content; the unit of storage and dedup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub pid: String,
    pub event: i64, // unix seconds
    pub text: String,
    pub link: String,
    #[serde(default)]
    pub image: String, // filename once backfilled, feed-supplied seed or empty before
}

impl Item {
    pub fn needs_image(&self) -> bool {
        self.image.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Follower {
    pub pid: String,
}

/// What came back from fetching one profile's feed.
#[derive(Debug)]
pub enum FeedOutcome {
    /// The feed parsed; the list may legitimately be empty.
    Parsed(Vec<Item>),
    /// The body was fetched but could not be parsed. Handled as zero entries.
    Malformed(FetchError),
    /// Retrieval failed; nothing is persisted for this profile.
    Failed(FetchError),
}

#[derive(Debug)]
pub struct FeedResult {
    pub profile: Profile,
    pub outcome: FeedOutcome,
}

impl FeedResult {
    /// Entries to persist, or `None` when the fetch itself failed.
    pub fn items(&self) -> Option<&[Item]> {
        match &self.outcome {
            FeedOutcome::Parsed(items) => Some(items),
            FeedOutcome::Malformed(_) => Some(&[]),
            FeedOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            FeedOutcome::Parsed(_) => None,
            FeedOutcome::Malformed(e) | FeedOutcome::Failed(e) => Some(e),
        }
    }
}
