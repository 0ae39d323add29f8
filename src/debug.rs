//! `--debugfeed`: fetch and parse one feed, print what would be ingested.

use std::io::Write;

use anyhow::{Context, Result};

use crate::ingest::content_id::content_id;
use crate::ingest::worker::FeedFetcher;

/// Writes one block per item to `out`; returns the item count.
pub async fn debug_feed<W: Write>(fetcher: &FeedFetcher, url: &str, out: &mut W) -> Result<usize> {
    tracing::info!(url, "debugging feed");
    let body = fetcher
        .source()
        .fetch(url)
        .await
        .with_context(|| format!("fetching feed {url}"))?;
    tracing::info!(url, bytes = body.len(), "fetched feed");

    let feed = fetcher
        .parser()
        .parse(&body)
        .with_context(|| format!("parsing feed {url}"))?;

    writeln!(out, "Feed: {} ({} items)", feed.title, feed.items.len())?;
    for item in &feed.items {
        writeln!(out, "--Item ({})", item.id)?;
        writeln!(out, "  Id:    {}", content_id(&item.id))?;
        writeln!(out, "  Title: {}", item.title)?;
        writeln!(out, "  Link:  {}", item.link)?;
        writeln!(out, "  Image: {}", item.image)?;
    }
    Ok(feed.items.len())
}
