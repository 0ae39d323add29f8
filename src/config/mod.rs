// src/config/mod.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "TIMESCROLL_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/fetcher.toml";
pub const DEFAULT_IMAGE_DIR: &str = "/var/opt/timescroll/img";
/// One week.
pub const MAX_FEED_INTERVAL_MINS: u64 = 7 * 24 * 60;
pub const DEFAULT_STORE_PATH: &str = "/var/opt/timescroll/store.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CropStrategy {
    /// Keep the window with the most detail.
    #[default]
    Salience,
    Center,
}

/// Everything the orchestrators and workers need, passed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetcherConfig {
    pub image_dir: PathBuf,
    pub store_path: PathBuf,
    pub feed_interval_mins: u64,
    pub run_once: bool,
    pub feed_workers: usize,
    pub image_workers: usize,
    /// Items selected per image backfill run.
    pub image_batch: usize,
    pub crop_width: u32,
    pub crop_height: u32,
    pub crop_strategy: CropStrategy,
    /// Candidate images downloaded per linked page.
    pub image_candidates: usize,
    /// Smallest acceptable side of a candidate, in pixels.
    pub min_image_size: u32,
    /// Failed image attempts before the store stops selecting an item.
    pub max_image_attempts: u32,
    /// Overall per-request timeout. `None` leaves requests unbounded.
    pub http_timeout_secs: Option<u64>,
    pub user_agent: String,
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            feed_interval_mins: 30,
            run_once: false,
            feed_workers: 3,
            image_workers: 3,
            image_batch: crate::images::DEFAULT_IMAGE_BATCH,
            crop_width: crate::images::worker::DEFAULT_CROP_WIDTH,
            crop_height: crate::images::worker::DEFAULT_CROP_HEIGHT,
            crop_strategy: CropStrategy::Salience,
            image_candidates: crate::images::picker::DEFAULT_MAX_CANDIDATES,
            min_image_size: crate::images::picker::DEFAULT_MIN_DIMENSION,
            max_image_attempts: crate::store::memory::DEFAULT_MAX_IMAGE_ATTEMPTS,
            http_timeout_secs: None,
            user_agent: concat!("timescroll-fetcher/", env!("CARGO_PKG_VERSION")).to_string(),
            metrics_addr: None,
        }
    }
}

impl FetcherConfig {
    /// Load from an explicit TOML file. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading fetcher config from {}", path.display()))?;
        let cfg: FetcherConfig = toml::from_str(&content)
            .with_context(|| format!("parsing fetcher config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $TIMESCROLL_CONFIG_PATH (must exist)
    /// 2) config/fetcher.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed_interval_mins == 0 {
            bail!("feed interval must be at least one minute");
        }
        if self.feed_interval_mins > MAX_FEED_INTERVAL_MINS {
            bail!(
                "feed interval of {} minutes exceeds the maximum of {MAX_FEED_INTERVAL_MINS}",
                self.feed_interval_mins
            );
        }
        if self.feed_workers == 0 || self.image_workers == 0 {
            bail!("worker pools need at least one worker");
        }
        if self.image_candidates == 0 {
            bail!("image_candidates must be at least 1");
        }
        if self.crop_width == 0 || self.crop_height == 0 {
            bail!(
                "crop size must be non-zero, got {}x{}",
                self.crop_width,
                self.crop_height
            );
        }
        Ok(())
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_secs(self.feed_interval_mins.saturating_mul(60))
    }

    /// HTTP client shared by the feed source and the image picker.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10));
        if let Some(secs) = self.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build().context("building http client")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("could not open image path {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// The image directory must already exist and be a directory.
pub fn check_image_dir(path: &Path) -> Result<(), StartupError> {
    let meta = fs::metadata(path).map_err(|source| StartupError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(StartupError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}
