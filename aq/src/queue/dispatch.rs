//! Serial job runner with stop/start and positional insertion

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use tokio::sync::Notify;
use tracing::debug;

/// A unit of work owned by the dispatch queue
pub enum Job {
    /// Caller work, already bound to wherever its result goes
    Operation(Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>),

    /// The recurring quota checkpoint
    Checkpoint,
}

impl Job {
    /// Wrap an async closure as an operation job
    pub fn operation<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Job::Operation(Box::new(move || Box::pin(f())))
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Job::Operation(_) => JobKind::Operation,
            Job::Checkpoint => JobKind::Checkpoint,
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job::{:?}", self.kind())
    }
}

/// Introspection view of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Operation,
    Checkpoint,
}

/// State guarded by the queue mutex
struct DispatchState {
    /// Pending jobs, head first
    jobs: VecDeque<Job>,

    /// Whether the dispatch loop may start new jobs
    running: bool,

    /// Kind of the job currently executing
    in_flight: Option<JobKind>,
}

/// Ordered job list drained one job at a time by a single dispatch loop
///
/// Every mutation is one critical section, so "append" and "what runs next"
/// never interleave. The lock is never held across an await.
pub struct DispatchQueue {
    state: Mutex<DispatchState>,
    wake: Notify,
}

impl DispatchQueue {
    /// Create an empty, stopped queue
    pub fn new() -> Self {
        Self::with_jobs(Vec::new())
    }

    /// Create a stopped queue already holding `jobs`, head first
    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let jobs: VecDeque<Job> = jobs.into_iter().collect();
        debug!(pending = jobs.len(), "DispatchQueue::with_jobs: called");
        Self {
            state: Mutex::new(DispatchState {
                jobs,
                running: false,
                in_flight: None,
            }),
            wake: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        // Jobs run outside the lock, so a poisoned guard still holds consistent state
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a job at the tail and resume dispatch if the queue was stopped
    pub fn append(&self, job: Job) {
        debug!(kind = ?job.kind(), "DispatchQueue::append: called");
        self.lock().jobs.push_back(job);
        self.resume_if_idle();
    }

    /// Insert a job at `index`, clamped to the current length
    ///
    /// Resumes dispatch like [`append`](Self::append). Returns the index
    /// actually used.
    pub fn insert_at(&self, index: usize, job: Job) -> usize {
        let index = {
            let mut state = self.lock();
            let index = index.min(state.jobs.len());
            debug!(index, kind = ?job.kind(), "DispatchQueue::insert_at: called");
            state.jobs.insert(index, job);
            index
        };
        self.resume_if_idle();
        index
    }

    /// Start dispatching if stopped
    ///
    /// Always wakes the dispatch loop so a job added to an already running,
    /// parked queue is picked up. Returns true if the queue was stopped.
    pub fn resume_if_idle(&self) -> bool {
        let resumed = {
            let mut state = self.lock();
            let resumed = !state.running;
            state.running = true;
            resumed
        };
        if resumed {
            debug!("DispatchQueue::resume_if_idle: resuming");
        }
        self.wake.notify_one();
        resumed
    }

    /// Explicitly start dispatching
    pub fn start(&self) {
        debug!("DispatchQueue::start: called");
        self.resume_if_idle();
    }

    /// Stop dispatching; an in-flight job is allowed to finish
    pub fn stop(&self) {
        debug!("DispatchQueue::stop: called");
        self.lock().running = false;
    }

    /// Stop dispatching if at most one job is pending
    ///
    /// Check and stop happen under one lock so a concurrent append either
    /// prevents the stop or resumes right after it.
    pub fn stop_when_drained(&self) -> bool {
        let mut state = self.lock();
        if state.jobs.len() <= 1 {
            debug!(pending = state.jobs.len(), "DispatchQueue::stop_when_drained: stopping");
            state.running = false;
            true
        } else {
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Number of pending jobs, not counting the in-flight one
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    /// Pending job kinds, head first
    pub fn jobs(&self) -> Vec<JobKind> {
        self.lock().jobs.iter().map(Job::kind).collect()
    }

    /// Kind of the job currently executing, if any
    pub fn in_flight(&self) -> Option<JobKind> {
        self.lock().in_flight
    }

    /// Take the head job for execution
    ///
    /// Returns None while stopped or empty. The job leaves the pending list
    /// and is tracked as in-flight until [`finish`](Self::finish).
    pub(crate) fn next_job(&self) -> Option<Job> {
        let mut state = self.lock();
        if !state.running || state.in_flight.is_some() {
            return None;
        }
        let job = state.jobs.pop_front()?;
        state.in_flight = Some(job.kind());
        Some(job)
    }

    /// Mark the in-flight job as done
    pub(crate) fn finish(&self) {
        self.lock().in_flight = None;
    }

    /// Park until the queue is changed or started
    pub(crate) async fn wait(&self) {
        self.wake.notified().await;
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op() -> Job {
        Job::operation(|| async {})
    }

    #[test]
    fn test_new_queue_is_stopped_and_empty() {
        let queue = DispatchQueue::new();
        assert!(!queue.is_running());
        assert!(queue.is_empty());
        assert_eq!(queue.in_flight(), None);
    }

    #[test]
    fn test_append_resumes() {
        let queue = DispatchQueue::new();
        queue.append(op());
        assert!(queue.is_running());
        assert_eq!(queue.jobs(), vec![JobKind::Operation]);
    }

    #[test]
    fn test_insert_at_resumes() {
        let queue = DispatchQueue::new();
        queue.insert_at(0, Job::Checkpoint);
        assert!(queue.is_running());
        assert_eq!(queue.jobs(), vec![JobKind::Checkpoint]);

        queue.stop();
        queue.insert_at(0, op());
        assert!(queue.is_running());
        assert_eq!(queue.next_job().unwrap().kind(), JobKind::Operation);
    }

    #[test]
    fn test_with_jobs_is_stopped() {
        let queue = DispatchQueue::with_jobs([Job::Checkpoint]);
        assert!(!queue.is_running());
        assert_eq!(queue.jobs(), vec![JobKind::Checkpoint]);
        assert!(queue.next_job().is_none());
    }

    #[test]
    fn test_insert_at_preserves_order() {
        let queue = DispatchQueue::new();
        queue.append(op());
        queue.append(op());
        queue.append(op());

        assert_eq!(queue.insert_at(1, Job::Checkpoint), 1);
        assert_eq!(
            queue.jobs(),
            vec![
                JobKind::Operation,
                JobKind::Checkpoint,
                JobKind::Operation,
                JobKind::Operation
            ]
        );
    }

    #[test]
    fn test_insert_at_clamps_to_tail() {
        let queue = DispatchQueue::new();
        queue.append(op());

        assert_eq!(queue.insert_at(999, Job::Checkpoint), 1);
        assert_eq!(queue.jobs(), vec![JobKind::Operation, JobKind::Checkpoint]);
    }

    #[test]
    fn test_stopped_queue_dispatches_nothing() {
        let queue = DispatchQueue::new();
        queue.append(op());
        queue.stop();

        assert!(queue.next_job().is_none());
        assert_eq!(queue.len(), 1);

        queue.start();
        assert!(queue.next_job().is_some());
    }

    #[test]
    fn test_single_flight() {
        let queue = DispatchQueue::new();
        queue.append(Job::Checkpoint);
        queue.append(op());

        let first = queue.next_job().unwrap();
        assert_eq!(first.kind(), JobKind::Checkpoint);
        assert_eq!(queue.in_flight(), Some(JobKind::Checkpoint));

        // Second job waits for the first to finish
        assert!(queue.next_job().is_none());

        queue.finish();
        assert_eq!(queue.in_flight(), None);
        assert_eq!(queue.next_job().unwrap().kind(), JobKind::Operation);
    }

    #[test]
    fn test_stop_when_drained() {
        let queue = DispatchQueue::new();
        queue.append(op());
        queue.append(Job::Checkpoint);
        assert!(!queue.stop_when_drained());
        assert!(queue.is_running());

        queue.next_job();
        queue.finish();
        assert!(queue.stop_when_drained());
        assert!(!queue.is_running());
    }
}
