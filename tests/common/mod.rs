// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::DynamicImage;

use timescroll_fetcher::images::crop::SalienceCropper;
use timescroll_fetcher::images::picker::ImagePicker;
use timescroll_fetcher::images::worker::ImageFetcher;
use timescroll_fetcher::ingest::parser::XmlFeedParser;
use timescroll_fetcher::ingest::source::FeedSource;
use timescroll_fetcher::ingest::worker::FeedFetcher;
use timescroll_fetcher::{FetchError, Follower, Item, MemoryStore, Profile, Store, StoreError};

/// Feed bodies (or transport errors) keyed by URL.
#[derive(Default)]
pub struct MockFeedSource {
    feeds: HashMap<String, Result<String, String>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, body: impl Into<String>) -> Self {
        self.feeds.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.feeds.insert(url.to_string(), Err(message.to_string()));
        self
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.feeds.get(url) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err(msg)) => Err(FetchError::transport(url, msg)),
            None => Err(FetchError::transport(url, "HTTP status client error (404 Not Found)")),
        }
    }
}

pub fn feed_fetcher(source: MockFeedSource) -> Arc<FeedFetcher> {
    Arc::new(FeedFetcher::new(Arc::new(source), Arc::new(XmlFeedParser)))
}

/// Minimal RSS document with one item per `(guid, title)`.
pub fn rss(items: &[(&str, &str)]) -> String {
    let mut body = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Test</title>"#);
    for (guid, title) in items {
        body.push_str(&format!(
            "<item><guid>{guid}</guid><title>{title}</title><link>https://pages.test/{guid}</link>\
             <pubDate>Fri, 01 Mar 2024 12:00:00 +0000</pubDate></item>"
        ));
    }
    body.push_str("</channel></rss>");
    body
}

pub fn profile(pid: &str) -> Profile {
    Profile::new(pid, format!("http://feeds.test/{pid}"))
}

pub fn item(id: &str, link: &str) -> Item {
    Item {
        id: id.to_string(),
        pid: "p".to_string(),
        event: 1_700_000_000,
        text: format!("title {id}"),
        link: link.to_string(),
        image: String::new(),
    }
}

#[derive(Clone)]
pub enum Pick {
    Image(u32, u32),
    NotFound,
    Error,
}

/// Image picker driven by a link → outcome table; unknown links find nothing.
#[derive(Default)]
pub struct StubPicker {
    pages: HashMap<String, Pick>,
}

impl StubPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, link: &str, pick: Pick) -> Self {
        self.pages.insert(link.to_string(), pick);
        self
    }
}

#[async_trait]
impl ImagePicker for StubPicker {
    async fn pick(&self, page_url: &str) -> Result<Option<DynamicImage>, FetchError> {
        match self.pages.get(page_url).cloned().unwrap_or(Pick::NotFound) {
            Pick::Image(w, h) => Ok(Some(DynamicImage::new_rgb8(w, h))),
            Pick::NotFound => Ok(None),
            Pick::Error => Err(FetchError::transport(page_url, "connection reset")),
        }
    }
}

pub fn image_fetcher(picker: StubPicker, dir: &std::path::Path) -> Arc<ImageFetcher> {
    Arc::new(ImageFetcher::new(Arc::new(picker), Arc::new(SalienceCropper), dir))
}

/// Delegates to a `MemoryStore`, failing chosen calls.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_snapshot_for: HashSet<String>,
    pub fail_follow_for: HashSet<String>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_snapshot_for: HashSet::new(),
            fail_follow_for: HashSet::new(),
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn list_feed_driven_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.inner.list_feed_driven_profiles().await
    }

    async fn select_items_needing_images(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        self.inner.select_items_needing_images(limit).await
    }

    async fn upsert_item(&self, item: &Item) -> Result<(), StoreError> {
        self.inner.upsert_item(item).await
    }

    async fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        self.inner.update_item(item).await
    }

    async fn list_followers(
        &self,
        pid: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Follower>, StoreError> {
        if self.fail_snapshot_for.contains(pid) {
            return Err(StoreError::Unavailable("followers index offline".into()));
        }
        self.inner.list_followers(pid, limit, offset).await
    }

    async fn follow(&self, follower: &str, pid: &str) -> Result<(), StoreError> {
        if self.fail_follow_for.contains(follower) {
            return Err(StoreError::Unavailable("write rejected".into()));
        }
        self.inner.follow(follower, pid).await
    }

    async fn unfollow(&self, follower: &str, pid: &str) -> Result<(), StoreError> {
        self.inner.unfollow(follower, pid).await
    }
}
