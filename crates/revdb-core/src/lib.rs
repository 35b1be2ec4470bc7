//! Shared domain types, configuration, and store contracts for revdb.

pub mod app_config;
pub mod config;
pub mod reviews;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use reviews::{
    Category, LabelError, NewCategory, NewReview, Review, Sentiment, Tone, TrendEntry, MAX_STARS,
    MIN_STARS,
};
pub use store::{AccessLogStore, CategoryStore, ReviewStore, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
