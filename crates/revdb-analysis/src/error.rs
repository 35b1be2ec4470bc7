use std::time::Duration;

use revdb_core::StoreError;
use thiserror::Error;

/// Errors returned by a [`crate::Classifier`].
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Empty or whitespace-only text. Rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The call did not complete within the configured timeout.
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),

    /// The service asked us to back off (HTTP 429).
    #[error("classifier rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The reply could not be parsed, or carried an unknown label.
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),

    /// Network failure, 5xx, or any other non-success status.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

impl ClassifierError {
    /// Returns `true` for failures that may succeed on a later attempt.
    ///
    /// **Retryable:** [`Timeout`](Self::Timeout),
    /// [`RateLimited`](Self::RateLimited), [`Unavailable`](Self::Unavailable).
    ///
    /// **Permanent:** [`InvalidInput`](Self::InvalidInput),
    /// [`MalformedResponse`](Self::MalformedResponse).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited { .. } | Self::Unavailable(_) => true,
            Self::InvalidInput(_) | Self::MalformedResponse(_) => false,
        }
    }
}

/// Errors from a single analysis attempt.
#[derive(Debug, Error)]
pub enum JobError {
    /// The review no longer exists. Never retried.
    #[error("review {0} not found")]
    NotFound(i64),

    #[error("classification failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("review store error: {0}")]
    Store(#[from] StoreError),
}

impl JobError {
    /// Whether the queue should schedule another attempt.
    ///
    /// Store outages are treated like classifier outages; conflicts and
    /// missing rows are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound(_) => false,
            Self::Classifier(err) => err.is_retryable(),
            Self::Store(err) => matches!(err, StoreError::Unavailable(_)),
        }
    }

    /// Server-requested minimum delay before the next attempt, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Classifier(ClassifierError::RateLimited {
                retry_after_secs: Some(secs),
            }) => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Errors from submitting a job to the queue.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The fresh lane is at capacity. The caller may retry later; the
    /// review stays unanalyzed and the next sweep will pick it up.
    #[error("analysis queue is full (review {review_id} not queued)")]
    QueueFull { review_id: i64 },

    #[error("analysis queue is shut down")]
    Closed,
}

/// Errors from a reprocessing sweep.
#[derive(Debug, Error)]
pub enum ReprocessError {
    #[error("failed to scan unanalyzed reviews: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Errors from a trend query. Store failures are surfaced, never retried.
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("review store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from review intake.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("category {0} not found")]
    CategoryNotFound(i64),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classifier_errors_are_retryable() {
        assert!(ClassifierError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(ClassifierError::RateLimited {
            retry_after_secs: None
        }
        .is_retryable());
        assert!(ClassifierError::Unavailable("503".to_owned()).is_retryable());
    }

    #[test]
    fn permanent_classifier_errors_are_not_retryable() {
        assert!(!ClassifierError::InvalidInput("empty".to_owned()).is_retryable());
        assert!(!ClassifierError::MalformedResponse("mixed".to_owned()).is_retryable());
    }

    #[test]
    fn not_found_is_not_retryable() {
        assert!(!JobError::NotFound(3).is_retryable());
    }

    #[test]
    fn store_outage_is_retryable_but_conflict_is_not() {
        assert!(JobError::Store(StoreError::Unavailable("down".to_owned())).is_retryable());
        assert!(!JobError::Store(StoreError::Conflict("dup".to_owned())).is_retryable());
    }

    #[test]
    fn retry_after_is_taken_from_rate_limit() {
        let err = JobError::Classifier(ClassifierError::RateLimited {
            retry_after_secs: Some(12),
        });
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
        assert_eq!(JobError::NotFound(1).retry_after(), None);
    }
}
