//! Postgres-backed implementation of the revdb store traits.

use async_trait::async_trait;
use sqlx::PgPool;

use revdb_core::{
    AccessLogStore, Category, CategoryStore, NewCategory, NewReview, Review, ReviewStore,
    Sentiment, StoreError, Tone,
};

use crate::{access_log, categories, reviews, DbError};

/// Store handle over a shared connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_reviews(rows: Vec<reviews::ReviewRow>) -> Result<Vec<Review>, DbError> {
    rows.into_iter().map(reviews::ReviewRow::into_review).collect()
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn create(&self, review: NewReview) -> Result<Review, StoreError> {
        let row = reviews::insert_review(&self.pool, &review).await?;
        Ok(row.into_review()?)
    }

    async fn get(&self, id: i64) -> Result<Option<Review>, StoreError> {
        let row = reviews::get_review(&self.pool, id).await?;
        Ok(row.map(reviews::ReviewRow::into_review).transpose()?)
    }

    async fn list_by_category(&self, category_id: Option<i64>) -> Result<Vec<Review>, StoreError> {
        let rows = reviews::list_reviews(&self.pool, category_id).await?;
        Ok(into_reviews(rows)?)
    }

    async fn update_analysis(
        &self,
        id: i64,
        sentiment: Sentiment,
        tone: Tone,
    ) -> Result<(), StoreError> {
        reviews::update_review_analysis(&self.pool, id, sentiment, tone).await?;
        Ok(())
    }

    async fn list_unanalyzed(&self) -> Result<Vec<Review>, StoreError> {
        let rows = reviews::list_unanalyzed_reviews(&self.pool).await?;
        Ok(into_reviews(rows)?)
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        let row = categories::insert_category(&self.pool, &category).await?;
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let rows = categories::list_categories(&self.pool).await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Category>, StoreError> {
        let row = categories::get_category(&self.pool, id).await?;
        Ok(row.map(Category::from))
    }
}

#[async_trait]
impl AccessLogStore for PgStore {
    async fn record(&self, text: &str) -> Result<(), StoreError> {
        access_log::insert_access_log(&self.pool, text).await?;
        Ok(())
    }
}
