//! timescroll-fetcher — binary entrypoint.
//! Polls feed-driven profiles into the store and backfills item thumbnails,
//! once or on a fixed interval.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use timescroll_fetcher::cli::Cli;
use timescroll_fetcher::config::check_image_dir;
use timescroll_fetcher::debug::debug_feed;
use timescroll_fetcher::metrics::install_exporter;
use timescroll_fetcher::{build_scheduler, default_feed_fetcher, FileStore};

/// Compact logs on stderr by default; `TIMESCROLL_LOG_JSON=1` switches to
/// JSON lines. Stdout is left to `--debugfeed`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("timescroll_fetcher=info,fetcher=info,warn"));

    let json = std::env::var("TIMESCROLL_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable, running until killed");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = cli.resolve_config()?;
    let client = cfg.http_client()?;

    if let Some(url) = &cli.debug_feed {
        let fetcher = default_feed_fetcher(client);
        let mut out = std::io::stdout().lock();
        debug_feed(&fetcher, url, &mut out).await?;
        return Ok(());
    }

    // Fatal before any network activity.
    check_image_dir(&cfg.image_dir)?;
    tracing::info!(dir = %cfg.image_dir.display(), "image directory");

    if let Some(addr) = cfg.metrics_addr {
        install_exporter(addr)?;
        tracing::info!(%addr, "serving metrics");
    }

    let store = FileStore::open(&cfg.store_path)?.with_max_image_attempts(cfg.max_image_attempts);
    tracing::info!(path = %store.path().display(), "store opened");

    let scheduler = build_scheduler(&cfg, Arc::new(store), client);
    let ticks = scheduler.run(shutdown_signal()).await;
    tracing::info!(ticks, "fetcher stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "fetcher failed");
            ExitCode::FAILURE
        }
    }
}
