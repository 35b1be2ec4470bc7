//! Live integration tests for `PgStore` using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. `"../../migrations"` is relative to the crate root
//! (`crates/revdb-db/`) and resolves to the workspace migration directory.

use revdb_core::{
    AccessLogStore, CategoryStore, NewCategory, NewReview, ReviewStore, Sentiment, StoreError,
    Tone,
};
use revdb_db::PgStore;

async fn insert_category(store: &PgStore, name: &str) -> i64 {
    CategoryStore::create(
        store,
        NewCategory {
            name: name.to_string(),
            description: format!("{name} description"),
        },
    )
    .await
    .unwrap_or_else(|e| panic!("insert_category failed for '{name}': {e}"))
    .id
}

#[sqlx::test(migrations = "../../migrations")]
async fn review_round_trips_through_postgres(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let category_id = insert_category(&store, "Electronics").await;

    let created = ReviewStore::create(
        &store,
        NewReview::new("Crisp screen, weak speakers", 7, Some(category_id)),
    )
    .await
    .expect("create review");

    let fetched = ReviewStore::get(&store, created.id)
        .await
        .expect("get review")
        .expect("review exists");
    assert_eq!(fetched.text, "Crisp screen, weak speakers");
    assert_eq!(fetched.stars, 7);
    assert_eq!(fetched.category_id, Some(category_id));
    assert!(!fetched.is_analyzed());
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_analysis_clears_unanalyzed(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let review = ReviewStore::create(&store, NewReview::new("meh", 5, None))
        .await
        .expect("create review");
    assert_eq!(store.list_unanalyzed().await.expect("list").len(), 1);

    store
        .update_analysis(review.id, Sentiment::Neutral, Tone::Neutral)
        .await
        .expect("update analysis");

    assert!(store.list_unanalyzed().await.expect("list").is_empty());
    let stored = ReviewStore::get(&store, review.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(stored.analysis(), Some((Sentiment::Neutral, Tone::Neutral)));
    assert!(stored.updated_at >= stored.created_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_analysis_on_missing_row_is_not_found(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let err = store
        .update_analysis(999, Sentiment::Positive, Tone::Positive)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_category_name_is_conflict(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    insert_category(&store, "Books").await;
    let err = CategoryStore::create(
        &store,
        NewCategory {
            name: "Books".to_string(),
            description: String::new(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_category_reference_is_conflict(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let err = ReviewStore::create(&store, NewReview::new("orphan", 4, Some(12345)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_by_category_filters_rows(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let books = insert_category(&store, "Books").await;
    let games = insert_category(&store, "Games").await;
    for (stars, category) in [(2, Some(books)), (9, Some(games)), (6, Some(books)), (5, None)] {
        ReviewStore::create(&store, NewReview::new("review", stars, category))
            .await
            .expect("create review");
    }

    let all = store.list_by_category(None).await.expect("list all");
    assert_eq!(all.len(), 4);

    let book_stars: Vec<i32> = store
        .list_by_category(Some(books))
        .await
        .expect("list books")
        .into_iter()
        .map(|r| r.stars)
        .collect();
    assert_eq!(book_stars, vec![2, 6]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn access_log_insert_succeeds(pool: sqlx::PgPool) {
    let store = PgStore::new(pool.clone());
    store.record("top_trends n=5").await.expect("record");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_log")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}
