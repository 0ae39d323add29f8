// src/cli.rs
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::FetcherConfig;

/// Poll profile feeds into the store and backfill item thumbnails.
#[derive(Debug, Parser)]
#[command(name = "timescroll-fetcher", version, about)]
pub struct Cli {
    /// Filesystem directory to store fetched images
    #[arg(long = "images", value_name = "DIR")]
    pub images: Option<PathBuf>,

    /// Interval for checking feeds (minutes)
    #[arg(long = "feedinterval", value_name = "MINUTES")]
    pub feed_interval: Option<u64>,

    /// Run the fetcher once and then exit
    #[arg(long = "runonce")]
    pub run_once: bool,

    /// Run the fetcher on the given feed url and print the parsed items
    #[arg(long = "debugfeed", value_name = "URL")]
    pub debug_feed: Option<String>,

    /// JSON store file
    #[arg(long = "store", value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// TOML config file (defaults to $TIMESCROLL_CONFIG_PATH, then config/fetcher.toml)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[arg(long = "metrics-addr", value_name = "ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// File/env config with command-line flags layered on top.
    pub fn resolve_config(&self) -> Result<FetcherConfig> {
        let base = match &self.config {
            Some(path) => FetcherConfig::load_from(path)?,
            None => FetcherConfig::load_default()?,
        };
        let cfg = self.apply(base);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply(&self, mut cfg: FetcherConfig) -> FetcherConfig {
        if let Some(dir) = &self.images {
            cfg.image_dir = dir.clone();
        }
        if let Some(mins) = self.feed_interval {
            cfg.feed_interval_mins = mins;
        }
        if self.run_once {
            cfg.run_once = true;
        }
        if let Some(store) = &self.store {
            cfg.store_path = store.clone();
        }
        if let Some(addr) = self.metrics_addr {
            cfg.metrics_addr = Some(addr);
        }
        cfg
    }
}
