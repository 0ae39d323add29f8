// src/images/mod.rs
pub mod crop;
pub mod picker;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::{counter, gauge};

use crate::images::worker::{fetch_images, ImageFetcher};
use crate::metrics::ensure_metrics_described;
use crate::store::Store;

pub const DEFAULT_IMAGE_BATCH: usize = 30;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    pub selected: usize,
    pub found: usize,
    pub failed: usize,
    pub write_back_failures: usize,
}

/// Image backfill orchestrator. Every result, found or not, is written back
/// with `update_item`; retry policy belongs to the store's selection query.
pub struct ImageBackfiller {
    store: Arc<dyn Store>,
    fetcher: Arc<ImageFetcher>,
    workers: usize,
    batch: usize,
}

impl ImageBackfiller {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<ImageFetcher>, workers: usize) -> Self {
        Self {
            store,
            fetcher,
            workers,
            batch: DEFAULT_IMAGE_BATCH,
        }
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    pub async fn backfill(&self) -> Result<BackfillSummary> {
        ensure_metrics_described();
        tracing::info!(target: "fetcher", "fetching images");

        let items = self
            .store
            .select_items_needing_images(self.batch)
            .await
            .context("selecting items needing images")?;
        tracing::info!(target: "fetcher", count = items.len(), "images need to be fetched");

        let mut summary = BackfillSummary {
            selected: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            return Ok(summary);
        }

        let mut results = fetch_images(Arc::clone(&self.fetcher), items, self.workers);
        while let Some(result) = results.next().await {
            match &result.error {
                None => {
                    tracing::info!(target: "fetcher", item = %result.item.id, image = %result.item.image, "found image");
                    summary.found += 1;
                }
                Some(e) => {
                    tracing::warn!(target: "fetcher", item = %result.item.id, error = %e, "error processing image");
                    summary.failed += 1;
                }
            }

            if let Err(e) = self.store.update_item(&result.item).await {
                tracing::error!(target: "fetcher", item = %result.item.id, error = %e, "failed to write item back");
                summary.write_back_failures += 1;
            }
        }

        counter!("fetch_images_total").increment(summary.selected as u64);
        gauge!("fetch_image_backfill_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(summary)
    }
}
