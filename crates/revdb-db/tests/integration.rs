//! Offline tests for revdb-db pool configuration and row conversion.
//! These tests do not require a live database connection.

use chrono::Utc;
use revdb_core::{AppConfig, Category, Environment, Sentiment, Tone};
use revdb_db::{CategoryRow, PoolConfig, ReviewRow};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        classifier_url: "http://localhost:9000/v1".to_string(),
        classifier_api_key: None,
        classifier_model: "test-model".to_string(),
        classifier_timeout_secs: 30,
        analysis_workers: 2,
        analysis_queue_capacity: 8,
        analysis_sweep_capacity: 4,
        analysis_max_attempts: 5,
        analysis_backoff_base_ms: 0,
        reprocess_cron: "0 */15 * * * *".to_string(),
        trends_default_top: 5,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn category_row_converts_to_domain_type() {
    let category: Category = CategoryRow {
        id: 3,
        name: "Electronics".to_string(),
        description: "Gadgets".to_string(),
    }
    .into();

    assert_eq!(category.id, 3);
    assert_eq!(category.name, "Electronics");
}

#[test]
fn review_row_with_labels_is_analyzed() {
    let now = Utc::now();
    let review = ReviewRow {
        id: 1,
        text: "battery lasts forever".to_string(),
        stars: 9,
        category_id: Some(3),
        sentiment: Some("POSITIVE".to_string()),
        tone: Some("neutral".to_string()),
        created_at: now,
        updated_at: now,
    }
    .into_review()
    .expect("labels should parse");

    assert_eq!(review.analysis(), Some((Sentiment::Positive, Tone::Neutral)));
}
