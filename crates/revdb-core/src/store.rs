//! Store contracts consumed by the analysis pipeline.
//!
//! Persistence is pluggable: `revdb-db` provides a Postgres implementation
//! and an in-memory one. Handles are shared as `Arc<dyn ...>` so each core
//! operation receives its store explicitly.

use async_trait::async_trait;
use thiserror::Error;

use crate::reviews::{Category, NewCategory, NewReview, Review, Sentiment, Tone};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create(&self, review: NewReview) -> Result<Review, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Review>, StoreError>;

    /// Reviews in `category_id`, or every review when `None`.
    async fn list_by_category(&self, category_id: Option<i64>) -> Result<Vec<Review>, StoreError>;

    /// Write both labels in a single-row update.
    ///
    /// Returns [`StoreError::NotFound`] if the row no longer exists.
    async fn update_analysis(
        &self,
        id: i64,
        sentiment: Sentiment,
        tone: Tone,
    ) -> Result<(), StoreError>;

    /// Reviews where sentiment or tone is still null, ordered by id.
    async fn list_unanalyzed(&self) -> Result<Vec<Review>, StoreError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Returns [`StoreError::Conflict`] if the name is taken.
    async fn create(&self, category: NewCategory) -> Result<Category, StoreError>;

    async fn list(&self) -> Result<Vec<Category>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Category>, StoreError>;
}

#[async_trait]
pub trait AccessLogStore: Send + Sync {
    async fn record(&self, text: &str) -> Result<(), StoreError>;
}
