//! In-process store with the same semantics as [`crate::PgStore`].
//!
//! Used by tests and by embedders that do not need durability. Every
//! operation takes the lock once, so single-row updates are atomic and
//! scans see a consistent snapshot.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use revdb_core::{
    AccessLogStore, Category, CategoryStore, NewCategory, NewReview, Review, ReviewStore,
    Sentiment, StoreError, Tone,
};

#[derive(Debug, Default)]
struct Tables {
    reviews: BTreeMap<i64, Review>,
    categories: BTreeMap<i64, Category>,
    access_log: Vec<String>,
    next_review_id: i64,
    next_category_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the access-log entries, oldest first.
    #[must_use]
    pub fn access_log(&self) -> Vec<String> {
        self.read().access_log.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut tables = self.write();
        if let Some(category_id) = review.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(StoreError::Conflict(format!(
                    "category {category_id} does not exist"
                )));
            }
        }

        tables.next_review_id += 1;
        let now = Utc::now();
        let stored = Review {
            id: tables.next_review_id,
            text: review.text,
            stars: review.stars,
            category_id: review.category_id,
            sentiment: review.sentiment,
            tone: review.tone,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Option<Review>, StoreError> {
        Ok(self.read().reviews.get(&id).cloned())
    }

    async fn list_by_category(&self, category_id: Option<i64>) -> Result<Vec<Review>, StoreError> {
        let tables = self.read();
        let rows = tables
            .reviews
            .values()
            .filter(|r| category_id.is_none() || r.category_id == category_id)
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn update_analysis(
        &self,
        id: i64,
        sentiment: Sentiment,
        tone: Tone,
    ) -> Result<(), StoreError> {
        let mut tables = self.write();
        let review = tables.reviews.get_mut(&id).ok_or(StoreError::NotFound)?;
        review.sentiment = Some(sentiment);
        review.tone = Some(tone);
        review.updated_at = Utc::now();
        Ok(())
    }

    async fn list_unanalyzed(&self) -> Result<Vec<Review>, StoreError> {
        let tables = self.read();
        let rows = tables
            .reviews
            .values()
            .filter(|r| !r.is_analyzed())
            .cloned()
            .collect();
        Ok(rows)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.write();
        if tables.categories.values().any(|c| c.name == category.name) {
            return Err(StoreError::Conflict(format!(
                "category name '{}' already exists",
                category.name
            )));
        }

        tables.next_category_id += 1;
        let stored = Category {
            id: tables.next_category_id,
            name: category.name,
            description: category.description,
        };
        tables.categories.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.read().categories.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self.read().categories.get(&id).cloned())
    }
}

#[async_trait]
impl AccessLogStore for MemoryStore {
    async fn record(&self, text: &str) -> Result<(), StoreError> {
        self.write().access_log.push(text.to_string());
        Ok(())
    }
}
