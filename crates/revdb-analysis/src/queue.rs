//! Worker pool that runs analysis jobs.
//!
//! # Lanes and backpressure
//!
//! Jobs arrive on one of two bounded lanes:
//!
//! - **fresh**: creation-time and explicit submissions. [`AnalysisQueue::submit`]
//!   never waits; when the lane is full it fails fast with
//!   [`SubmitError::QueueFull`].
//! - **sweep**: reprocessing submissions. [`AnalysisQueue::submit_sweep`]
//!   waits for capacity, so a large sweep is throttled to the lane size
//!   instead of flooding the pool.
//!
//! Workers always drain the fresh lane before looking at the sweep lane.
//! Retries re-enter the lane their job came from after the back-off delay,
//! from a detached timer task, so a waiting retry never occupies a worker and
//! a failing sweep never takes fresh-lane capacity. A `Retry-After` longer
//! than the 60 s back-off cap dead-letters the job instead of holding it.
//!
//! # De-duplication
//!
//! A review id is claimed when its job is accepted and released only when the
//! job reaches a terminal state (success, skip, drop, or dead letter). While
//! claimed, further submissions for the same review are coalesced into
//! [`Submission::AlreadyQueued`], so at most one job per review is queued,
//! running, or waiting to retry at any time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use revdb_core::{AppConfig, ReviewStore};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::task::JoinHandle;

use crate::backoff::{retry_delay, MAX_RETRY_AFTER};
use crate::classifier::Classifier;
use crate::dead_letter::{DeadLetter, DeadLetters};
use crate::error::{JobError, SubmitError};
use crate::job::{run_analysis, AnalysisJob, JobOrigin, JobOutcome};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of the fresh lane.
    pub queue_capacity: usize,
    /// Capacity of the sweep lane.
    pub sweep_capacity: usize,
    /// Total attempts per job, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential back-off between attempts.
    pub backoff_base_ms: u64,
    /// Upper bound on a single classifier call.
    pub classify_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
            sweep_capacity: 32,
            max_attempts: 5,
            backoff_base_ms: 1_000,
            classify_timeout: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            workers: config.analysis_workers,
            queue_capacity: config.analysis_queue_capacity,
            sweep_capacity: config.analysis_sweep_capacity,
            max_attempts: config.analysis_max_attempts,
            backoff_base_ms: config.analysis_backoff_base_ms,
            classify_timeout: Duration::from_secs(config.classifier_timeout_secs),
        }
    }
}

/// Result of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A new job was enqueued.
    Queued,
    /// A job for this review is already queued, running, or awaiting retry.
    AlreadyQueued,
}

/// Counters since the queue started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub analyzed: u64,
    pub already_analyzed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    analyzed: AtomicU64,
    already_analyzed: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> QueueStats {
        QueueStats {
            analyzed: self.analyzed.load(Ordering::Relaxed),
            already_analyzed: self.already_analyzed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

struct Lanes {
    fresh: mpsc::Receiver<AnalysisJob>,
    sweep: mpsc::Receiver<AnalysisJob>,
}

struct Shared {
    reviews: Arc<dyn ReviewStore>,
    classifier: Arc<dyn Classifier>,
    config: QueueConfig,
    fresh_tx: mpsc::Sender<AnalysisJob>,
    sweep_tx: mpsc::Sender<AnalysisJob>,
    lanes: tokio::sync::Mutex<Lanes>,
    in_flight: Mutex<HashSet<i64>>,
    idle: Notify,
    dead_letters: DeadLetters,
    counters: Counters,
    shutdown: watch::Receiver<bool>,
}

impl Shared {
    fn in_flight(&self) -> MutexGuard<'_, HashSet<i64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` if the review already has a live job.
    fn claim(&self, review_id: i64) -> bool {
        self.in_flight().insert(review_id)
    }

    fn release(&self, review_id: i64) {
        let mut in_flight = self.in_flight();
        in_flight.remove(&review_id);
        if in_flight.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

/// Fixed-size pool of analysis workers fed by the fresh and sweep lanes.
pub struct AnalysisQueue {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AnalysisQueue {
    /// Spawn `config.workers` workers on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn start(
        reviews: Arc<dyn ReviewStore>,
        classifier: Arc<dyn Classifier>,
        config: QueueConfig,
    ) -> Self {
        let worker_count = config.workers.max(1);
        let (fresh_tx, fresh_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (sweep_tx, sweep_rx) = mpsc::channel(config.sweep_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            reviews,
            classifier,
            config,
            fresh_tx,
            sweep_tx,
            lanes: tokio::sync::Mutex::new(Lanes {
                fresh: fresh_rx,
                sweep: sweep_rx,
            }),
            in_flight: Mutex::new(HashSet::new()),
            idle: Notify::new(),
            dead_letters: DeadLetters::new(),
            counters: Counters::default(),
            shutdown: shutdown_rx,
        });

        let workers = (0..worker_count)
            .map(|worker_id| tokio::spawn(run_worker(worker_id, Arc::clone(&shared))))
            .collect();

        tracing::info!(
            workers = worker_count,
            queue_capacity = shared.config.queue_capacity,
            sweep_capacity = shared.config.sweep_capacity,
            max_attempts = shared.config.max_attempts,
            "analysis queue started"
        );

        Self {
            shared,
            shutdown_tx,
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue a fresh job for `review_id` without waiting.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::QueueFull`] if the fresh lane is at capacity.
    /// - [`SubmitError::Closed`] after [`AnalysisQueue::shutdown`].
    pub fn submit(&self, review_id: i64) -> Result<Submission, SubmitError> {
        if self.is_closed() {
            return Err(SubmitError::Closed);
        }
        if !self.shared.claim(review_id) {
            tracing::debug!(review_id, "analysis already pending, coalescing submission");
            return Ok(Submission::AlreadyQueued);
        }

        let parked = self.shared.dead_letters.take(review_id);
        match self
            .shared
            .fresh_tx
            .try_send(AnalysisJob::new(review_id, JobOrigin::Fresh))
        {
            Ok(()) => Ok(Submission::Queued),
            Err(err) => {
                self.shared.release(review_id);
                if let Some(letter) = parked {
                    self.shared.dead_letters.restore(letter);
                }
                match err {
                    TrySendError::Full(_) => {
                        tracing::warn!(review_id, "analysis queue full, rejecting submission");
                        Err(SubmitError::QueueFull { review_id })
                    }
                    TrySendError::Closed(_) => Err(SubmitError::Closed),
                }
            }
        }
    }

    /// Enqueue a sweep job for `review_id`, waiting for sweep-lane capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Closed`] if the queue shuts down first.
    pub async fn submit_sweep(&self, review_id: i64) -> Result<Submission, SubmitError> {
        if self.is_closed() {
            return Err(SubmitError::Closed);
        }
        if !self.shared.claim(review_id) {
            return Ok(Submission::AlreadyQueued);
        }

        let parked = self.shared.dead_letters.take(review_id);
        let mut shutdown = self.shared.shutdown.clone();
        let job = AnalysisJob::new(review_id, JobOrigin::Sweep);
        let sent = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => false,
            result = self.shared.sweep_tx.send(job) => result.is_ok(),
        };

        if sent {
            Ok(Submission::Queued)
        } else {
            self.shared.release(review_id);
            if let Some(letter) = parked {
                self.shared.dead_letters.restore(letter);
            }
            Err(SubmitError::Closed)
        }
    }

    /// Resolve once no job is queued, running, or waiting to retry.
    ///
    /// Jobs still queued when the pool is shut down are never released, so
    /// do not wait on a stopped queue.
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking so a release between the check and the
            // await is not missed.
            let notified = self.shared.idle.notified();
            if self.shared.in_flight().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Number of reviews with a live job.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight().len()
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }

    /// Current dead letters, ordered by review id.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.shared.dead_letters.snapshot()
    }

    /// Receive each dead letter as it is parked.
    #[must_use]
    pub fn subscribe_dead_letters(&self) -> broadcast::Receiver<DeadLetter> {
        self.shared.dead_letters.subscribe()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop accepting work, let each worker finish its current job, and join
    /// the workers. Queued jobs are abandoned; their reviews stay unanalyzed
    /// for the next sweep.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let handles = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for (worker_id, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker_id, error = %e, "analysis worker panicked");
            }
        }

        let outstanding = self.in_flight();
        if outstanding > 0 {
            tracing::warn!(
                outstanding,
                "analysis queue stopped with jobs outstanding; the next sweep will pick them up"
            );
        }
        tracing::info!("analysis queue stopped");
    }
}

impl Drop for AnalysisQueue {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

async fn run_worker(worker_id: usize, shared: Arc<Shared>) {
    tracing::debug!(worker_id, "analysis worker started");
    let mut shutdown = shared.shutdown.clone();

    while let Some(job) = next_job(&shared.lanes, &mut shutdown).await {
        process(&shared, job, worker_id).await;
    }

    tracing::debug!(worker_id, "analysis worker stopped");
}

/// Wait for the next job, preferring the fresh lane. `None` on shutdown.
async fn next_job(
    lanes: &tokio::sync::Mutex<Lanes>,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<AnalysisJob> {
    let mut guard = tokio::select! {
        biased;
        _ = shutdown.wait_for(|stop| *stop) => return None,
        guard = lanes.lock() => guard,
    };
    let Lanes { fresh, sweep } = &mut *guard;

    tokio::select! {
        biased;
        _ = shutdown.wait_for(|stop| *stop) => None,
        Some(job) = fresh.recv() => Some(job),
        Some(job) = sweep.recv() => Some(job),
        else => None,
    }
}

async fn process(shared: &Arc<Shared>, mut job: AnalysisJob, worker_id: usize) {
    job.attempt += 1;
    let review_id = job.review_id;
    let attempt = job.attempt;

    let result = run_analysis(
        shared.reviews.as_ref(),
        shared.classifier.as_ref(),
        review_id,
        shared.config.classify_timeout,
    )
    .await;

    match result {
        Ok(JobOutcome::Analyzed(classification)) => {
            Counters::bump(&shared.counters.analyzed);
            tracing::info!(
                worker_id,
                review_id,
                attempt,
                origin = %job.origin,
                sentiment = %classification.sentiment,
                tone = %classification.tone,
                "review analyzed"
            );
            shared.release(review_id);
        }
        Ok(JobOutcome::AlreadyAnalyzed) => {
            Counters::bump(&shared.counters.already_analyzed);
            shared.release(review_id);
        }
        Err(JobError::NotFound(_)) => {
            Counters::bump(&shared.counters.dropped);
            tracing::warn!(
                worker_id,
                review_id,
                "review no longer exists, dropping analysis job"
            );
            shared.release(review_id);
        }
        Err(err) if err.retry_after().is_some_and(|wait| wait > MAX_RETRY_AFTER) => {
            let requested = err.retry_after().map_or(0, |wait| wait.as_secs());
            let reason = format!(
                "retry-after of {requested}s exceeds the {}s limit: {err}",
                MAX_RETRY_AFTER.as_secs()
            );
            park(shared, job, reason, true);
        }
        Err(err) if err.is_retryable() && attempt < shared.config.max_attempts => {
            Counters::bump(&shared.counters.retried);
            let delay = retry_delay(shared.config.backoff_base_ms, attempt, err.retry_after());
            #[allow(clippy::cast_possible_truncation)]
            let delay_ms = delay.as_millis() as u64;
            tracing::warn!(
                worker_id,
                review_id,
                attempt,
                max_attempts = shared.config.max_attempts,
                delay_ms,
                error = %err,
                "analysis attempt failed, retrying after back-off"
            );
            schedule_retry(Arc::clone(shared), job, delay);
        }
        Err(err) => {
            let retryable = err.is_retryable();
            let reason = if retryable {
                format!("retries exhausted after {attempt} attempts: {err}")
            } else {
                format!("permanent failure: {err}")
            };
            park(shared, job, reason, retryable);
        }
    }
}

fn park(shared: &Shared, job: AnalysisJob, reason: String, retryable: bool) {
    let review_id = job.review_id;
    Counters::bump(&shared.counters.dead_lettered);
    shared.dead_letters.park(job, reason, retryable);
    shared.release(review_id);
}

/// Re-enqueue `job` on its origin lane after `delay`. The review stays
/// claimed until the retry is delivered or abandoned.
fn schedule_retry(shared: Arc<Shared>, job: AnalysisJob, delay: Duration) {
    tokio::spawn(async move {
        let review_id = job.review_id;
        let lane = match job.origin {
            JobOrigin::Fresh => &shared.fresh_tx,
            JobOrigin::Sweep => &shared.sweep_tx,
        };
        let mut shutdown = shared.shutdown.clone();
        let delivered = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stop| *stop) => false,
            delivered = async {
                tokio::time::sleep(delay).await;
                lane.send(job).await.is_ok()
            } => delivered,
        };

        if !delivered {
            tracing::debug!(review_id, "retry abandoned, analysis queue shutting down");
            shared.release(review_id);
        }
    });
}
