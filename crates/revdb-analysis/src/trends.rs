//! Category rating trends.
//!
//! Trends are recomputed from a fresh scan on every query; nothing is cached
//! between calls, so a review created or re-rated a moment ago is reflected
//! immediately.

use std::cmp::Ordering;
use std::collections::HashMap;

use revdb_core::{AccessLogStore, Category, CategoryStore, Review, ReviewStore, TrendEntry};

use crate::error::TrendError;

/// Rank categories by mean star rating.
///
/// Reviews without a category, or pointing at a category not in
/// `categories`, are ignored. Categories with no reviews are omitted.
/// Ordering is average descending, then review count descending, then
/// category id ascending. At most `n` entries are returned.
#[must_use]
pub fn rank_categories(categories: &[Category], reviews: &[Review], n: usize) -> Vec<TrendEntry> {
    let mut totals: HashMap<i64, (i64, u64)> = HashMap::new();
    for review in reviews {
        if let Some(category_id) = review.category_id {
            let entry = totals.entry(category_id).or_insert((0, 0));
            entry.0 += i64::from(review.stars);
            entry.1 += 1;
        }
    }

    let mut entries: Vec<TrendEntry> = categories
        .iter()
        .filter_map(|category| {
            let &(sum, count) = totals.get(&category.id)?;
            #[allow(clippy::cast_precision_loss)]
            let average_rating = sum as f64 / count as f64;
            Some(TrendEntry {
                category_id: category.id,
                name: category.name.clone(),
                description: category.description.clone(),
                average_rating,
                review_count: count,
            })
        })
        .collect();

    entries.sort_by(compare_entries);
    entries.truncate(n);
    entries
}

fn compare_entries(a: &TrendEntry, b: &TrendEntry) -> Ordering {
    b.average_rating
        .total_cmp(&a.average_rating)
        .then_with(|| b.review_count.cmp(&a.review_count))
        .then_with(|| a.category_id.cmp(&b.category_id))
}

/// Top `n` categories by mean star rating, read from the stores.
///
/// # Errors
///
/// - [`TrendError::InvalidInput`] if `n` is zero.
/// - [`TrendError::Store`] if either scan fails.
pub async fn top_categories(
    reviews: &dyn ReviewStore,
    categories: &dyn CategoryStore,
    n: usize,
) -> Result<Vec<TrendEntry>, TrendError> {
    if n == 0 {
        return Err(TrendError::InvalidInput(
            "n must be at least 1".to_owned(),
        ));
    }

    let categories = categories.list().await?;
    let reviews = reviews.list_by_category(None).await?;
    let ranked = rank_categories(&categories, &reviews, n);

    tracing::debug!(
        categories = categories.len(),
        reviews = reviews.len(),
        returned = ranked.len(),
        "category trends computed"
    );
    Ok(ranked)
}

/// Append the access-log entry for a trend query.
///
/// A failed write is logged at `warn` and never surfaced to the caller.
pub async fn record_trend_query(access_log: &dyn AccessLogStore, n: usize) {
    if let Err(e) = access_log.record(&format!("top_trends n={n}")).await {
        tracing::warn!(n, error = %e, "failed to record trend query in access log");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_owned(),
            description: format!("{name} products"),
        }
    }

    fn review(id: i64, category_id: Option<i64>, stars: i32) -> Review {
        let now = Utc::now();
        Review {
            id,
            text: format!("review {id}"),
            stars,
            category_id,
            sentiment: None,
            tone: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn averages_stars_per_category() {
        let categories = vec![category(1, "Electronics")];
        let reviews = vec![
            review(1, Some(1), 8),
            review(2, Some(1), 6),
            review(3, Some(1), 10),
        ];

        let ranked = rank_categories(&categories, &reviews, 5);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "Electronics");
        assert_eq!(ranked[0].description, "Electronics products");
        assert!((ranked[0].average_rating - 8.0).abs() < f64::EPSILON);
        assert_eq!(ranked[0].review_count, 3);
    }

    #[test]
    fn ties_break_on_count_then_id() {
        let categories = vec![category(3, "C"), category(2, "B"), category(1, "A")];
        let reviews = vec![
            // A: avg 7 over 1 review
            review(1, Some(1), 7),
            // B: avg 7 over 2 reviews
            review(2, Some(2), 6),
            review(3, Some(2), 8),
            // C: avg 7 over 1 review, higher id than A
            review(4, Some(3), 7),
        ];

        let ids: Vec<i64> = rank_categories(&categories, &reviews, 10)
            .iter()
            .map(|e| e.category_id)
            .collect();

        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn uncategorized_and_orphaned_reviews_are_ignored() {
        let categories = vec![category(1, "Books"), category(2, "Garden")];
        let reviews = vec![
            review(1, None, 0),
            review(2, Some(99), 0),
            review(3, Some(1), 4),
        ];

        let ranked = rank_categories(&categories, &reviews, 10);

        assert_eq!(ranked.len(), 1, "empty categories are omitted");
        assert_eq!(ranked[0].category_id, 1);
        assert_eq!(ranked[0].review_count, 1);
    }

    #[test]
    fn truncates_to_n() {
        let categories = vec![category(1, "A"), category(2, "B"), category(3, "C")];
        let reviews = vec![
            review(1, Some(1), 2),
            review(2, Some(2), 9),
            review(3, Some(3), 5),
        ];

        let ranked = rank_categories(&categories, &reviews, 2);

        let ids: Vec<i64> = ranked.iter().map(|e| e.category_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn empty_inputs_rank_nothing() {
        assert!(rank_categories(&[], &[], 5).is_empty());
    }
}
