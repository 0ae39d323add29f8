// src/ingest/mod.rs
pub mod content_id;
pub mod parser;
pub mod reorder;
pub mod source;
pub mod types;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::{counter, gauge};

use crate::ingest::reorder::reorder_update;
use crate::ingest::types::{FeedOutcome, FeedResult};
use crate::ingest::worker::{fetch_feeds, FeedFetcher};
use crate::metrics::ensure_metrics_described;
use crate::store::Store;

/// Normalize feed text: decode entities, strip tags, straighten quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 500 chars
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }

    out
}

/// Per-run counts, mostly for the tick log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollSummary {
    pub profiles: usize,
    pub failed: usize,
    pub malformed: usize,
    /// Profiles that went through the reorder update.
    pub updated: usize,
    pub items_upserted: usize,
    pub snapshot_failures: usize,
}

/// Feed poll orchestrator: profiles → feed workers → reorder update.
/// All store writes happen here, on the coordinator, one result at a time.
pub struct FeedPoller {
    store: Arc<dyn Store>,
    fetcher: Arc<FeedFetcher>,
    workers: usize,
}

impl FeedPoller {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<FeedFetcher>, workers: usize) -> Self {
        Self {
            store,
            fetcher,
            workers,
        }
    }

    pub async fn poll(&self) -> Result<PollSummary> {
        ensure_metrics_described();
        tracing::info!(target: "fetcher", "refreshing feeds");

        let profiles = self
            .store
            .list_feed_driven_profiles()
            .await
            .context("listing feed driven profiles")?;

        let mut summary = PollSummary {
            profiles: profiles.len(),
            ..Default::default()
        };

        let mut results = fetch_feeds(Arc::clone(&self.fetcher), profiles, self.workers);
        while let Some(result) = results.next().await {
            self.apply(&result, &mut summary).await;
        }

        counter!("fetch_feeds_total").increment(summary.profiles as u64);
        counter!("fetch_items_upserted_total").increment(summary.items_upserted as u64);
        gauge!("fetch_feed_poll_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(summary)
    }

    async fn apply(&self, result: &FeedResult, summary: &mut PollSummary) {
        let pid = result.profile.pid.as_str();
        match &result.outcome {
            FeedOutcome::Failed(e) => {
                tracing::warn!(target: "fetcher", profile = pid, error = %e, "error processing feed");
                summary.failed += 1;
            }
            FeedOutcome::Malformed(e) => {
                tracing::warn!(target: "fetcher", profile = pid, error = %e, "feed did not parse, treating as empty");
                summary.malformed += 1;
            }
            FeedOutcome::Parsed(items) => {
                tracing::info!(target: "fetcher", profile = pid, items = items.len(), "found items in feed");
            }
        }

        let Some(items) = result.items() else {
            return;
        };

        match reorder_update(self.store.as_ref(), &result.profile, items).await {
            Ok(report) => {
                summary.updated += 1;
                summary.items_upserted += report.upserted;
                if !report.is_clean() {
                    tracing::warn!(target: "fetcher", profile = pid, ?report, "reorder update partially failed");
                }
            }
            Err(e) => {
                tracing::error!(target: "fetcher", profile = pid, error = %e, "follower snapshot failed, profile not updated");
                summary.snapshot_failures += 1;
            }
        }
    }
}
