//! Submission surface tying the stores, the queue, and the aggregator together.

use std::sync::Arc;

use revdb_core::{
    AccessLogStore, Category, CategoryStore, NewCategory, NewReview, Review, ReviewStore,
    TrendEntry, MAX_STARS, MIN_STARS,
};
use tokio::sync::broadcast;

use crate::classifier::Classifier;
use crate::dead_letter::DeadLetter;
use crate::error::{IntakeError, ReprocessError, SubmitError, TrendError};
use crate::queue::{AnalysisQueue, QueueConfig, QueueStats, Submission};
use crate::trends::{record_trend_query, top_categories};

/// Store handles the service operates on.
#[derive(Clone)]
pub struct Stores {
    pub reviews: Arc<dyn ReviewStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub access_log: Arc<dyn AccessLogStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ReviewStore + CategoryStore + AccessLogStore + 'static,
    {
        Self {
            reviews: Arc::clone(&store) as Arc<dyn ReviewStore>,
            categories: Arc::clone(&store) as Arc<dyn CategoryStore>,
            access_log: store,
        }
    }
}

/// Counts from one reprocessing sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprocessSummary {
    /// Unanalyzed reviews found by the scan.
    pub scanned: usize,
    /// New sweep jobs enqueued.
    pub submitted: usize,
    /// Reviews that already had a live job.
    pub already_queued: usize,
}

pub struct AnalysisService {
    stores: Stores,
    queue: AnalysisQueue,
}

impl AnalysisService {
    /// Start the worker pool. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(stores: Stores, classifier: Arc<dyn Classifier>, config: QueueConfig) -> Self {
        let queue = AnalysisQueue::start(Arc::clone(&stores.reviews), classifier, config);
        Self { stores, queue }
    }

    /// Validate and store a review, then queue it for analysis if it has
    /// no labels yet.
    ///
    /// A full fresh lane does not fail the call; the review stays unanalyzed
    /// and the next sweep picks it up.
    ///
    /// # Errors
    ///
    /// - [`IntakeError::InvalidInput`] for out-of-range stars, blank text, or
    ///   only one of sentiment/tone supplied.
    /// - [`IntakeError::CategoryNotFound`] if `category_id` does not exist.
    /// - [`IntakeError::Store`] if a store call fails.
    pub async fn ingest(&self, review: NewReview) -> Result<Review, IntakeError> {
        validate_new_review(&review)?;

        if let Some(category_id) = review.category_id {
            if self.stores.categories.get(category_id).await?.is_none() {
                return Err(IntakeError::CategoryNotFound(category_id));
            }
        }

        let created = self.stores.reviews.create(review).await?;
        tracing::info!(
            review_id = created.id,
            category_id = ?created.category_id,
            stars = created.stars,
            "review created"
        );

        if !created.is_analyzed() {
            match self.queue.submit(created.id) {
                Ok(_) => {}
                Err(err @ SubmitError::QueueFull { .. }) => {
                    tracing::warn!(
                        review_id = created.id,
                        error = %err,
                        "analysis deferred to next sweep"
                    );
                }
                Err(err) => {
                    tracing::warn!(review_id = created.id, error = %err, "analysis not queued");
                }
            }
        }

        Ok(created)
    }

    /// Queue `review_id` for analysis on the fresh lane.
    ///
    /// # Errors
    ///
    /// See [`AnalysisQueue::submit`].
    pub fn submit_for_analysis(&self, review_id: i64) -> Result<Submission, SubmitError> {
        self.queue.submit(review_id)
    }

    /// Submit one sweep job per unanalyzed review.
    ///
    /// Safe to run repeatedly and alongside normal traffic: reviews that
    /// already have a live job are counted in `already_queued` and skipped.
    ///
    /// # Errors
    ///
    /// - [`ReprocessError::Store`] if the scan fails.
    /// - [`ReprocessError::Submit`] if the queue shuts down mid-sweep.
    pub async fn reprocess_all(&self) -> Result<ReprocessSummary, ReprocessError> {
        let pending = self.stores.reviews.list_unanalyzed().await?;
        let mut summary = ReprocessSummary {
            scanned: pending.len(),
            ..ReprocessSummary::default()
        };

        for review in &pending {
            match self.queue.submit_sweep(review.id).await? {
                Submission::Queued => summary.submitted += 1,
                Submission::AlreadyQueued => summary.already_queued += 1,
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            submitted = summary.submitted,
            already_queued = summary.already_queued,
            "reprocess sweep complete"
        );
        Ok(summary)
    }

    /// Top `n` categories by mean star rating.
    ///
    /// Records an access-log entry in the background; a failed write is
    /// logged and does not affect the result.
    ///
    /// # Errors
    ///
    /// See [`top_categories`].
    pub async fn get_top_trends(&self, n: usize) -> Result<Vec<TrendEntry>, TrendError> {
        let access_log = Arc::clone(&self.stores.access_log);
        tokio::spawn(async move {
            record_trend_query(access_log.as_ref(), n).await;
        });

        top_categories(
            self.stores.reviews.as_ref(),
            self.stores.categories.as_ref(),
            n,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidInput`] for a blank name, or
    /// [`IntakeError::Store`] (`Conflict` when the name is taken).
    pub async fn create_category(&self, category: NewCategory) -> Result<Category, IntakeError> {
        if category.name.trim().is_empty() {
            return Err(IntakeError::InvalidInput(
                "category name must not be empty".to_owned(),
            ));
        }
        let created = self.stores.categories.create(category).await?;
        tracing::info!(category_id = created.id, name = %created.name, "category created");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns [`IntakeError::Store`] if the scan fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, IntakeError> {
        Ok(self.stores.categories.list().await?)
    }

    /// Reviews in `category_id`, or every review when `None`, ordered by id.
    ///
    /// An unknown category yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Store`] if the scan fails.
    pub async fn list_reviews(&self, category_id: Option<i64>) -> Result<Vec<Review>, IntakeError> {
        Ok(self.stores.reviews.list_by_category(category_id).await?)
    }

    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.queue.dead_letters()
    }

    #[must_use]
    pub fn subscribe_dead_letters(&self) -> broadcast::Receiver<DeadLetter> {
        self.queue.subscribe_dead_letters()
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}

fn validate_new_review(review: &NewReview) -> Result<(), IntakeError> {
    if !(MIN_STARS..=MAX_STARS).contains(&review.stars) {
        return Err(IntakeError::InvalidInput(format!(
            "stars must be between {MIN_STARS} and {MAX_STARS}, got {}",
            review.stars
        )));
    }
    if review.text.trim().is_empty() {
        return Err(IntakeError::InvalidInput(
            "review text must not be empty".to_owned(),
        ));
    }
    if review.sentiment.is_some() != review.tone.is_some() {
        return Err(IntakeError::InvalidInput(
            "sentiment and tone must be supplied together".to_owned(),
        ));
    }
    Ok(())
}
