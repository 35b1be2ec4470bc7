//! Registry of analysis jobs that will not be retried automatically.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::job::AnalysisJob;

const SIGNAL_CAPACITY: usize = 64;

/// A parked job and why it was parked.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub job: AnalysisJob,
    pub reason: String,
    pub retryable: bool,
    pub parked_at: DateTime<Utc>,
}

/// Dead letters keyed by review id.
///
/// Parking emits exactly one `error`-level event and one broadcast signal.
/// A later submission for the same review (sweep or manual) clears the entry.
pub(crate) struct DeadLetters {
    entries: Mutex<BTreeMap<i64, DeadLetter>>,
    signal: broadcast::Sender<DeadLetter>,
}

impl DeadLetters {
    pub(crate) fn new() -> Self {
        let (signal, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            entries: Mutex::new(BTreeMap::new()),
            signal,
        }
    }

    pub(crate) fn park(&self, job: AnalysisJob, reason: String, retryable: bool) {
        tracing::error!(
            review_id = job.review_id,
            attempts = job.attempt,
            origin = %job.origin,
            retryable,
            reason = %reason,
            "analysis job dead-lettered"
        );

        let letter = DeadLetter {
            job,
            reason,
            retryable,
            parked_at: Utc::now(),
        };
        self.lock().insert(letter.job.review_id, letter.clone());
        // No subscribers is fine; the log line above is the durable signal.
        let _ = self.signal.send(letter);
    }

    /// Remove and return the entry for a review that is being resubmitted.
    pub(crate) fn take(&self, review_id: i64) -> Option<DeadLetter> {
        self.lock().remove(&review_id)
    }

    /// Put back an entry whose resubmission did not go through. Silent.
    pub(crate) fn restore(&self, letter: DeadLetter) {
        self.lock().insert(letter.job.review_id, letter);
    }

    pub(crate) fn snapshot(&self) -> Vec<DeadLetter> {
        self.lock().values().cloned().collect()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<DeadLetter> {
        self.signal.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, DeadLetter>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobOrigin;

    #[test]
    fn park_records_and_signals_once() {
        let letters = DeadLetters::new();
        let mut rx = letters.subscribe();

        letters.park(AnalysisJob::new(5, JobOrigin::Fresh), "timeout".to_owned(), true);

        let snapshot = letters.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].job.review_id, 5);
        assert_eq!(rx.try_recv().unwrap().reason, "timeout");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn take_and_restore_round_trip_without_signal() {
        let letters = DeadLetters::new();
        letters.park(AnalysisJob::new(5, JobOrigin::Sweep), "bad".to_owned(), false);
        let mut rx = letters.subscribe();

        let taken = letters.take(5).expect("entry exists");
        assert!(letters.take(5).is_none());
        assert!(letters.snapshot().is_empty());

        letters.restore(taken);
        assert_eq!(letters.snapshot().len(), 1);
        assert!(rx.try_recv().is_err(), "restore must not re-signal");
    }
}
