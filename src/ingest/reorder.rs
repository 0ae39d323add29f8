// src/ingest/reorder.rs
//! Unfollow / upsert / re-follow around a profile's new entries.
//!
//! The store re-inserts a follow edge at the most recent position, so
//! dropping and re-adding every follower after the upserts moves this profile
//! to the top of each follower's timeline. It runs even when no entry is new.

use metrics::counter;

use crate::ingest::types::{Item, Profile};
use crate::store::{Store, StoreError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReorderReport {
    pub followers: usize,
    pub upserted: usize,
    pub upsert_failures: usize,
    pub unfollow_failures: usize,
    pub follow_failures: usize,
}

impl ReorderReport {
    pub fn is_clean(&self) -> bool {
        self.upsert_failures == 0 && self.unfollow_failures == 0 && self.follow_failures == 0
    }
}

/// Apply `items` for `profile`. Only the follower snapshot is fatal: if it
/// fails nothing is touched. Individual unfollow/upsert/follow failures are
/// logged, counted and skipped so the sequence always reaches the re-follow
/// step.
pub async fn reorder_update(
    store: &dyn Store,
    profile: &Profile,
    items: &[Item],
) -> Result<ReorderReport, StoreError> {
    let pid = profile.pid.as_str();
    let followers = store
        .list_followers(pid, profile.follower_count, 0)
        .await?;

    let mut report = ReorderReport {
        followers: followers.len(),
        ..Default::default()
    };

    for f in &followers {
        if let Err(e) = store.unfollow(&f.pid, pid).await {
            tracing::warn!(profile = pid, follower = %f.pid, error = %e, "unfollow failed");
            report.unfollow_failures += 1;
        }
    }

    for item in items {
        match store.upsert_item(item).await {
            Ok(()) => report.upserted += 1,
            Err(e) => {
                tracing::warn!(profile = pid, item = %item.id, error = %e, "upsert failed");
                report.upsert_failures += 1;
            }
        }
    }

    for f in &followers {
        if let Err(e) = store.follow(&f.pid, pid).await {
            tracing::warn!(profile = pid, follower = %f.pid, error = %e, "re-follow failed");
            report.follow_failures += 1;
        }
    }

    if !report.is_clean() {
        counter!("fetch_reorder_partial_total").increment(1);
    }
    Ok(report)
}
