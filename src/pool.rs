// src/pool.rs
//! Fixed-size fan-out used by both fetch stages.
//!
//! The coordinator enqueues every job up front and closes the queue; workers
//! pull until it is empty. The result channel is sized to the job count, so a
//! worker never blocks emitting. [`Dispatch::next`] hands back exactly one
//! result per job, in completion order.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

/// Results of one fan-out, drained by the coordinator.
#[derive(Debug)]
pub struct Dispatch<R> {
    rx: mpsc::Receiver<R>,
    label: &'static str,
    remaining: usize,
}

impl<R: Send + 'static> Dispatch<R> {
    /// Results not yet drained.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Next completed result, or `None` once every job has been accounted for.
    ///
    /// Yields before each receive so the coordinator does not starve the
    /// workers on a current-thread runtime.
    pub async fn next(&mut self) -> Option<R> {
        if self.remaining == 0 {
            return None;
        }
        tokio::task::yield_now().await;
        match self.rx.recv().await {
            Some(r) => {
                self.remaining -= 1;
                Some(r)
            }
            None => {
                // Only reachable if workers died (panicked) holding jobs.
                tracing::warn!(
                    target: "fetcher",
                    pool = self.label,
                    missing = self.remaining,
                    "worker pool closed before all results arrived"
                );
                self.remaining = 0;
                None
            }
        }
    }

    /// Drain everything that is left.
    pub async fn collect(mut self) -> Vec<R> {
        let mut out = Vec::with_capacity(self.remaining);
        while let Some(r) = self.next().await {
            out.push(r);
        }
        out
    }
}

/// Run `work` over `jobs` on `workers` tasks. `work` receives the worker
/// index and the job, and must turn every failure into a value of `R`.
pub fn dispatch<J, R, F, Fut>(
    label: &'static str,
    workers: usize,
    jobs: Vec<J>,
    work: F,
) -> Dispatch<R>
where
    J: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = jobs.len();
    let (res_tx, res_rx) = mpsc::channel(total.max(1));
    if total == 0 {
        return Dispatch {
            rx: res_rx,
            label,
            remaining: 0,
        };
    }

    let (job_tx, job_rx) = mpsc::unbounded_channel();
    let mut queued = 0usize;
    for job in jobs {
        if job_tx.send(job).is_err() {
            break;
        }
        queued += 1;
    }
    // Closing the queue is what lets idle workers exit.
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let work = Arc::new(work);

    for worker in 0..workers.max(1) {
        let job_rx = Arc::clone(&job_rx);
        let res_tx = res_tx.clone();
        let work = Arc::clone(&work);
        tokio::spawn(async move {
            loop {
                let job = { job_rx.lock().await.recv().await };
                let Some(job) = job else { break };
                let out = work(worker, job).await;
                if res_tx.send(out).await.is_err() {
                    break;
                }
            }
            tracing::trace!(pool = label, worker, "worker done");
        });
    }
    drop(res_tx);

    Dispatch {
        rx: res_rx,
        label,
        remaining: queued,
    }
}
