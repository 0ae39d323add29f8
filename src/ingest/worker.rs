// src/ingest/worker.rs
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};

use crate::ingest::content_id::content_id;
use crate::ingest::parser::{FeedParser, ParsedFeed};
use crate::ingest::source::FeedSource;
use crate::ingest::types::{FeedOutcome, FeedResult, Item, Profile};
use crate::pool::{self, Dispatch};

/// Fetch + parse for one profile. Shared by all feed workers.
pub struct FeedFetcher {
    source: Arc<dyn FeedSource>,
    parser: Arc<dyn FeedParser>,
}

impl FeedFetcher {
    pub fn new(source: Arc<dyn FeedSource>, parser: Arc<dyn FeedParser>) -> Self {
        Self { source, parser }
    }

    pub fn source(&self) -> &dyn FeedSource {
        self.source.as_ref()
    }

    pub fn parser(&self) -> &dyn FeedParser {
        self.parser.as_ref()
    }

    pub async fn fetch(&self, worker: usize, profile: Profile) -> FeedResult {
        tracing::debug!(worker, profile = %profile.pid, url = %profile.feed_url, "feed worker processing feed");
        let t0 = Instant::now();

        let body = match self.source.fetch(&profile.feed_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(worker, profile = %profile.pid, error = %e, "feed worker got transport error");
                counter!("fetch_feed_errors_total", "kind" => e.kind()).increment(1);
                return FeedResult {
                    profile,
                    outcome: FeedOutcome::Failed(e),
                };
            }
        };

        let outcome = match self.parser.parse(&body) {
            Ok(feed) => FeedOutcome::Parsed(items_from_feed(&profile.pid, feed)),
            Err(e) => {
                counter!("fetch_feed_errors_total", "kind" => e.kind()).increment(1);
                FeedOutcome::Malformed(e)
            }
        };

        histogram!("fetch_feed_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        FeedResult { profile, outcome }
    }
}

/// Map parsed entries onto store items owned by `pid`.
pub fn items_from_feed(pid: &str, feed: ParsedFeed) -> Vec<Item> {
    feed.items
        .into_iter()
        .map(|it| Item {
            id: content_id(&it.id),
            pid: pid.to_string(),
            event: it.when,
            text: it.title,
            link: it.link,
            image: it.image,
        })
        .collect()
}

/// Fan `profiles` out over `workers` feed workers.
pub fn fetch_feeds(
    fetcher: Arc<FeedFetcher>,
    profiles: Vec<Profile>,
    workers: usize,
) -> Dispatch<FeedResult> {
    pool::dispatch("feeds", workers, profiles, move |worker, profile| {
        let fetcher = Arc::clone(&fetcher);
        async move { fetcher.fetch(worker, profile).await }
    })
}
