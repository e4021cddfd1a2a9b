//! Fixed-size worker pool driving the job state machine.
//!
//! Each worker drains the pending queue (claim-process until empty), then
//! parks on a wake-up signal with a fallback poll tick. The signal is a
//! single-permit [`Notify`]: wake-ups coalesce, and a notify sent while all
//! workers are busy is retained for the next park.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::Result;

use super::jobs_model::Job;
use super::jobs_traits::JobRepositoryTrait;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Handles execution of a claimed job.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, cancel: &CancellationToken, job: Job) -> Result<()>;
}

/// A fixed set of claim-process loops over the shared job store.
pub struct WorkerPool {
    repo: Arc<dyn JobRepositoryTrait>,
    processor: Arc<dyn JobProcessor>,
    workers: usize,
    notify: Arc<Notify>,
    poll_interval: Duration,
}

impl WorkerPool {
    /// Creates a pool with `workers` loops (minimum 1). `notify` is the
    /// wake-up signal shared with whoever creates pending jobs.
    pub fn new(
        repo: Arc<dyn JobRepositoryTrait>,
        processor: Arc<dyn JobProcessor>,
        workers: usize,
        notify: Arc<Notify>,
    ) -> Self {
        Self {
            repo,
            processor,
            workers: workers.max(1),
            notify,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Spawns the workers and returns once `cancel` has fired and every
    /// worker has drained. Callers rely on this ordering to tear down the
    /// store only after the last in-flight write has finished.
    pub async fn run(self, cancel: CancellationToken) {
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let repo = Arc::clone(&self.repo);
            let processor = Arc::clone(&self.processor);
            let notify = Arc::clone(&self.notify);
            let cancel = cancel.clone();
            let poll_interval = self.poll_interval;
            handles.push(tokio::spawn(async move {
                worker_loop(id, repo, processor, notify, cancel, poll_interval).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    id: usize,
    repo: Arc<dyn JobRepositoryTrait>,
    processor: Arc<dyn JobProcessor>,
    notify: Arc<Notify>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    loop {
        drain(id, repo.as_ref(), processor.as_ref(), &cancel).await;

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = notify.notified() => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

/// Claims and processes pending jobs until the queue is empty. Processing
/// errors are logged and never abort the worker.
async fn drain(
    id: usize,
    repo: &dyn JobRepositoryTrait,
    processor: &dyn JobProcessor,
    cancel: &CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let job = match repo.claim_pending().await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(err) => {
                if cancel.is_cancelled() {
                    return;
                }
                error!(worker = id, error = %err, "worker: claim pending");
                return;
            }
        };

        info!(
            worker = id,
            job = job.id,
            source = %job.source,
            symbol = %job.symbol,
            "worker: processing job"
        );

        let job_id = job.id;
        if let Err(err) = processor.process(cancel, job).await {
            error!(worker = id, job = job_id, error = %err, "worker: process job");
        }
    }
}
