use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_feeds_total", "Feeds fetched by the poll orchestrator.");
        describe_counter!(
            "fetch_feed_errors_total",
            "Feed fetch failures, labelled by kind (transport/parse)."
        );
        describe_counter!(
            "fetch_items_upserted_total",
            "Items written by the reorder update."
        );
        describe_counter!(
            "fetch_reorder_partial_total",
            "Reorder updates where some unfollow/upsert/follow call failed."
        );
        describe_counter!("fetch_images_total", "Items submitted for image backfill.");
        describe_counter!("fetch_images_written_total", "Thumbnails written to disk.");
        describe_counter!(
            "fetch_image_errors_total",
            "Image backfill failures, labelled by kind."
        );
        describe_histogram!("fetch_feed_ms", "Feed fetch+parse time in milliseconds.");
        describe_gauge!(
            "fetch_feed_poll_last_run_ts",
            "Unix ts when the feed poll last finished."
        );
        describe_gauge!(
            "fetch_image_backfill_last_run_ts",
            "Unix ts when the image backfill last finished."
        );
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside the Tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    ensure_metrics_described();
    Ok(())
}
