//! Rate-limited queue: serial dispatch paced by a self-repositioning checkpoint

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::QueueConfig;
use super::dispatch::{DispatchQueue, Job, JobKind};
use crate::error::ApiError;
use crate::quota::{QuotaSnapshot, QuotaSource};

/// Runs submitted API calls one at a time without outrunning the remote quota
///
/// A checkpoint job lives inside the queue. Each time it runs it reads the
/// quota, moves itself `remaining` places back, stops the queue when nothing
/// else is pending and sleeps until reset when the quota is spent. Calls
/// rejected for quota exhaustion go back to the tail.
pub struct RateLimitedQueue {
    dispatch: Arc<DispatchQueue>,
    config: QueueConfig,
    worker: JoinHandle<()>,
}

impl RateLimitedQueue {
    /// Create a stopped queue holding only the checkpoint and spawn its dispatch loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(source: Arc<dyn QuotaSource>, config: QueueConfig) -> Self {
        debug!(?config, "RateLimitedQueue::new: called");
        let dispatch = Arc::new(DispatchQueue::with_jobs([Job::Checkpoint]));

        let worker = tokio::spawn(dispatch_loop(dispatch.clone(), source, config.clone()));

        Self {
            dispatch,
            config,
            worker,
        }
    }

    /// Submit an API call
    ///
    /// The call is queued immediately, so submission order is call order
    /// even before the returned future is polled. The future resolves with
    /// the call's result; quota-exceeded failures are resubmitted and never
    /// observed unless `max_quota_retries` runs out.
    pub fn enqueue<T, F, Fut>(
        &self,
        operation: F,
    ) -> impl Future<Output = Result<T, ApiError>> + Send + 'static + use<T, F, Fut>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let attempt = Attempt {
            operation: Arc::new(operation),
            reply: reply_tx,
            retries: 0,
            config: self.config.clone(),
            queue: Arc::downgrade(&self.dispatch),
        };
        self.dispatch.append(attempt.into_job());

        async move {
            match reply_rx.await {
                Ok(result) => result,
                Err(_) => Err(ApiError::QueueClosed),
            }
        }
    }

    /// Pending job kinds, head first
    pub fn jobs(&self) -> Vec<JobKind> {
        self.dispatch.jobs()
    }

    pub fn is_running(&self) -> bool {
        self.dispatch.is_running()
    }

    /// Kind of the job currently executing, if any
    pub fn in_flight(&self) -> Option<JobKind> {
        self.dispatch.in_flight()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

impl Drop for RateLimitedQueue {
    fn drop(&mut self) {
        debug!("RateLimitedQueue::drop: aborting dispatch loop");
        self.worker.abort();
    }
}

/// One submission of a caller's operation
struct Attempt<T, F> {
    operation: Arc<F>,
    reply: oneshot::Sender<Result<T, ApiError>>,
    retries: u32,
    config: QueueConfig,
    queue: Weak<DispatchQueue>,
}

impl<T, F, Fut> Attempt<T, F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    fn into_job(self) -> Job {
        Job::operation(move || self.run())
    }

    async fn run(self) {
        let result = (self.operation)().await;

        let requeue = match &result {
            Err(e) if e.is_quota_exceeded() && self.config.may_retry(self.retries) => {
                warn!(retries = self.retries, error = %e, "Quota exceeded, resubmitting call");
                self.queue.upgrade()
            }
            _ => None,
        };

        if let Some(queue) = requeue {
            let next = Attempt {
                retries: self.retries + 1,
                ..self
            };
            queue.append(next.into_job());
            return;
        }

        // Caller may have stopped waiting
        let _ = self.reply.send(result);
    }
}

/// Drain the dispatch queue forever, one job at a time
async fn dispatch_loop(queue: Arc<DispatchQueue>, source: Arc<dyn QuotaSource>, config: QueueConfig) {
    info!("Dispatch loop started");

    loop {
        let Some(job) = queue.next_job() else {
            queue.wait().await;
            continue;
        };

        match job {
            Job::Checkpoint => checkpoint(&queue, source.as_ref(), &config).await,
            Job::Operation(run) => {
                if AssertUnwindSafe(run()).catch_unwind().await.is_err() {
                    warn!("Queued operation panicked");
                }
            }
        }

        queue.finish();
    }
}

/// Read the quota, reposition the checkpoint and pace the queue
async fn checkpoint(queue: &DispatchQueue, source: &dyn QuotaSource, config: &QueueConfig) {
    debug!("checkpoint: called");

    let Some(snapshot) = query_quota(source, config).await else {
        // Nothing runs on an unknown quota; check again after a pause
        queue.insert_at(0, Job::Checkpoint);
        if queue.stop_when_drained() {
            debug!("checkpoint: idle after quota failure, stopping");
            return;
        }
        let pause = config.quota_failure_pause();
        warn!(?pause, "Quota unavailable, pausing dispatch");
        tokio::time::sleep(pause).await;
        return;
    };

    let index = usize::try_from(snapshot.remaining).unwrap_or(usize::MAX);
    let position = queue.insert_at(index, Job::Checkpoint);
    debug!(remaining = snapshot.remaining, position, "checkpoint: repositioned");

    if queue.stop_when_drained() {
        debug!("checkpoint: no pending work, stopping");
        return;
    }

    if snapshot.is_exhausted() {
        let wait = snapshot.time_until_reset();
        info!(?wait, reset_at = %snapshot.reset_at, "Quota exhausted, pausing until reset");
        tokio::time::sleep(wait).await;
    }
}

/// Query the quota, retrying failures with exponential backoff
async fn query_quota(source: &dyn QuotaSource, config: &QueueConfig) -> Option<QuotaSnapshot> {
    for attempt in 0..=config.quota_retry_limit {
        if attempt > 0 {
            let backoff = config.quota_backoff(attempt);
            warn!(attempt, ?backoff, "query_quota: retrying after failure");
            tokio::time::sleep(backoff).await;
        }

        match source.rate_limit().await {
            Ok(snapshot) => return Some(snapshot),
            Err(e) => warn!(attempt, error = %e, "Quota query failed"),
        }
    }
    None
}
