// src/scheduler.rs
use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::images::{BackfillSummary, ImageBackfiller};
use crate::ingest::{FeedPoller, PollSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    BackfillingImages,
}

#[derive(Debug, Default, Clone)]
pub struct TickReport {
    /// `None` when the poll could not start (e.g. the store was unavailable).
    pub poll: Option<PollSummary>,
    pub backfill: Option<BackfillSummary>,
}

/// Runs the feed poll then the image backfill, immediately and then on a
/// fixed interval. Ticks never overlap: a slow tick delays the next one.
pub struct Scheduler {
    feeds: FeedPoller,
    images: ImageBackfiller,
    interval: Duration,
    run_once: bool,
    phase: Phase,
    ticks: u64,
}

impl Scheduler {
    pub fn new(feeds: FeedPoller, images: ImageBackfiller, interval: Duration) -> Self {
        Self {
            feeds,
            images,
            interval,
            run_once: false,
            phase: Phase::Idle,
            ticks: 0,
        }
    }

    pub fn run_once(mut self, once: bool) -> Self {
        self.run_once = once;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One full pass: feeds, then images.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.phase = Phase::Polling;
        match self.feeds.poll().await {
            Ok(s) => {
                tracing::info!(
                    target: "fetcher",
                    profiles = s.profiles,
                    failed = s.failed,
                    malformed = s.malformed,
                    items = s.items_upserted,
                    "feed poll done"
                );
                report.poll = Some(s);
            }
            Err(e) => tracing::error!(target: "fetcher", error = ?e, "feed poll aborted"),
        }

        self.phase = Phase::BackfillingImages;
        match self.images.backfill().await {
            Ok(s) => {
                tracing::info!(
                    target: "fetcher",
                    selected = s.selected,
                    found = s.found,
                    failed = s.failed,
                    "image backfill done"
                );
                report.backfill = Some(s);
            }
            Err(e) => tracing::error!(target: "fetcher", error = ?e, "image backfill aborted"),
        }

        self.phase = Phase::Idle;
        self.ticks += 1;
        report
    }

    /// Loop until `shutdown` resolves (checked only between ticks) or, in
    /// single-shot mode, after the first tick. Returns the number of ticks run.
    pub async fn run<F>(mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(target: "fetcher", ticks = self.ticks, "shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            self.tick().await;
            if self.run_once {
                break;
            }
            tracing::debug!(target: "fetcher", next_in_secs = self.interval.as_secs(), "sleeping until next tick");
        }
        self.ticks
    }
}
