//! The unit of analysis work: fetch a review, classify it, write it back.

use std::time::Duration;

use chrono::{DateTime, Utc};
use revdb_core::{ReviewStore, StoreError};

use crate::classifier::{Classification, Classifier};
use crate::error::{ClassifierError, JobError};

/// Where a job came from. Fresh jobs are served ahead of sweep jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    /// Submitted when the review was created (or by an explicit caller).
    Fresh,
    /// Submitted by a reprocessing sweep over unanalyzed reviews.
    Sweep,
}

impl std::fmt::Display for JobOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOrigin::Fresh => write!(f, "fresh"),
            JobOrigin::Sweep => write!(f, "sweep"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub review_id: i64,
    /// Attempts made so far; `0` until a worker first picks the job up.
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
    pub origin: JobOrigin,
}

impl AnalysisJob {
    #[must_use]
    pub fn new(review_id: i64, origin: JobOrigin) -> Self {
        Self {
            review_id,
            attempt: 0,
            enqueued_at: Utc::now(),
            origin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Labels were computed and written.
    Analyzed(Classification),
    /// Both labels were already present; nothing was called or written.
    AlreadyAnalyzed,
}

/// Run one analysis attempt for `review_id`.
///
/// 1. Load the review; a missing row is [`JobError::NotFound`].
/// 2. If both labels are already set, return [`JobOutcome::AlreadyAnalyzed`].
/// 3. Classify the text, bounded by `timeout`.
/// 4. Write both labels in one single-row update.
///
/// Nothing is written unless classification succeeds, so a failed attempt
/// leaves the review exactly as it was.
///
/// # Errors
///
/// Returns [`JobError`]; use [`JobError::is_retryable`] to decide whether
/// another attempt is worthwhile.
pub async fn run_analysis(
    reviews: &dyn ReviewStore,
    classifier: &dyn Classifier,
    review_id: i64,
    timeout: Duration,
) -> Result<JobOutcome, JobError> {
    let review = reviews
        .get(review_id)
        .await?
        .ok_or(JobError::NotFound(review_id))?;

    if review.is_analyzed() {
        tracing::debug!(review_id, "review already analyzed, skipping");
        return Ok(JobOutcome::AlreadyAnalyzed);
    }

    let classification = tokio::time::timeout(timeout, classifier.classify(&review.text))
        .await
        .map_err(|_| ClassifierError::Timeout(timeout))??;

    match reviews
        .update_analysis(review_id, classification.sentiment, classification.tone)
        .await
    {
        Ok(()) => Ok(JobOutcome::Analyzed(classification)),
        Err(StoreError::NotFound) => Err(JobError::NotFound(review_id)),
        Err(err) => Err(err.into()),
    }
}
