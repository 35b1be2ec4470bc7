//! Database operations for the `reviews` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use revdb_core::{NewReview, Review, Sentiment, Tone};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `reviews` table.
///
/// Labels are kept as raw text here; [`ReviewRow::into_review`] parses them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub text: String,
    pub stars: i32,
    pub category_id: Option<i64>,
    pub sentiment: Option<String>,
    pub tone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRow {
    /// Convert into the domain type, parsing the label columns.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if a label column holds something
    /// other than a known label.
    pub fn into_review(self) -> Result<Review, DbError> {
        let sentiment = self
            .sentiment
            .as_deref()
            .map(str::parse::<Sentiment>)
            .transpose()
            .map_err(|e| DbError::InvalidValue(format!("review {}: {e}", self.id)))?;
        let tone = self
            .tone
            .as_deref()
            .map(str::parse::<Tone>)
            .transpose()
            .map_err(|e| DbError::InvalidValue(format!("review {}: {e}", self.id)))?;

        Ok(Review {
            id: self.id,
            text: self.text,
            stars: self.stars,
            category_id: self.category_id,
            sentiment,
            tone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const REVIEW_COLUMNS: &str =
    "id, text, stars, category_id, sentiment, tone, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a review and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including an unknown
/// `category_id` or an out-of-range star rating).
pub async fn insert_review(pool: &PgPool, review: &NewReview) -> Result<ReviewRow, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "INSERT INTO reviews (text, stars, category_id, sentiment, tone) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(&review.text)
    .bind(review.stars)
    .bind(review.category_id)
    .bind(review.sentiment.map(Sentiment::as_str))
    .bind(review.tone.map(Tone::as_str))
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Return a review by id, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review(pool: &PgPool, id: i64) -> Result<Option<ReviewRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List reviews, optionally filtered by category, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &PgPool,
    category_id: Option<i64>,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = match category_id {
        Some(id) => {
            sqlx::query_as::<_, ReviewRow>(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews \
                 WHERE category_id = $1 \
                 ORDER BY id"
            ))
            .bind(id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, ReviewRow>(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY id"
            ))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

/// Write both labels onto a review in one statement.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has this id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn update_review_analysis(
    pool: &PgPool,
    id: i64,
    sentiment: Sentiment,
    tone: Tone,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE reviews \
         SET sentiment = $1, tone = $2, updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(sentiment.as_str())
    .bind(tone.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// List reviews missing either label, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unanalyzed_reviews(pool: &PgPool) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews \
         WHERE sentiment IS NULL OR tone IS NULL \
         ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sentiment: Option<&str>, tone: Option<&str>) -> ReviewRow {
        let now = Utc::now();
        ReviewRow {
            id: 9,
            text: "arrived scratched".to_string(),
            stars: 3,
            category_id: Some(2),
            sentiment: sentiment.map(str::to_string),
            tone: tone.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn into_review_parses_labels() {
        let review = row(Some("negative"), Some("neutral")).into_review().unwrap();
        assert_eq!(review.sentiment, Some(Sentiment::Negative));
        assert_eq!(review.tone, Some(Tone::Neutral));
        assert_eq!(review.stars, 3);
    }

    #[test]
    fn into_review_keeps_null_labels() {
        let review = row(None, None).into_review().unwrap();
        assert!(!review.is_analyzed());
    }

    #[test]
    fn into_review_rejects_unknown_label() {
        let err = row(Some("mixed"), Some("neutral")).into_review().unwrap_err();
        assert!(matches!(err, DbError::InvalidValue(ref msg) if msg.contains("review 9")));
    }
}
