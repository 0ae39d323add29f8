// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod debug;
pub mod error;
pub mod images;
pub mod ingest;
pub mod metrics;
pub mod pool;
pub mod scheduler;
pub mod store;

use std::sync::Arc;

// ---- Re-exports for stable public API ----
pub use crate::error::FetchError;
pub use crate::ingest::content_id::content_id;
pub use crate::ingest::types::{FeedOutcome, FeedResult, Follower, Item, Profile};
pub use crate::store::{FileStore, MemoryStore, Store, StoreError};

use crate::config::{CropStrategy, FetcherConfig};
use crate::images::crop::{CenterCropper, Cropper, SalienceCropper};
use crate::images::picker::HtmlImagePicker;
use crate::images::worker::ImageFetcher;
use crate::images::ImageBackfiller;
use crate::ingest::parser::XmlFeedParser;
use crate::ingest::source::HttpFeedSource;
use crate::ingest::worker::FeedFetcher;
use crate::ingest::FeedPoller;
use crate::scheduler::Scheduler;

/// Feed fetcher over HTTP with the bundled RSS/Atom parser.
pub fn default_feed_fetcher(client: reqwest::Client) -> FeedFetcher {
    FeedFetcher::new(
        Arc::new(HttpFeedSource::new(client)),
        Arc::new(XmlFeedParser),
    )
}

/// Image fetcher using the HTML picker and the configured cropper.
pub fn default_image_fetcher(cfg: &FetcherConfig, client: reqwest::Client) -> ImageFetcher {
    let picker = HtmlImagePicker::new(client)
        .with_max_candidates(cfg.image_candidates)
        .with_min_dimension(cfg.min_image_size);
    let cropper: Arc<dyn Cropper> = match cfg.crop_strategy {
        CropStrategy::Salience => Arc::new(SalienceCropper),
        CropStrategy::Center => Arc::new(CenterCropper),
    };
    ImageFetcher::new(Arc::new(picker), cropper, cfg.image_dir.clone())
        .with_size(cfg.crop_width, cfg.crop_height)
}

/// Wire both orchestrators against `store` with the default collaborators.
pub fn build_scheduler(
    cfg: &FetcherConfig,
    store: Arc<dyn Store>,
    client: reqwest::Client,
) -> Scheduler {
    let feeds = FeedPoller::new(
        Arc::clone(&store),
        Arc::new(default_feed_fetcher(client.clone())),
        cfg.feed_workers,
    );
    let images = ImageBackfiller::new(
        store,
        Arc::new(default_image_fetcher(cfg, client)),
        cfg.image_workers,
    )
    .with_batch(cfg.image_batch);
    Scheduler::new(feeds, images, cfg.feed_interval()).run_once(cfg.run_once)
}
