//! Asynchronous review analysis for revdb.
//!
//! Reviews are classified for sentiment and tone by an external language
//! model. Classification runs on a fixed pool of workers fed by two bounded
//! lanes (fresh submissions ahead of reprocessing sweeps), with per-review
//! de-duplication, exponential back-off on transient failures, and a
//! dead-letter registry for jobs that cannot complete. Category rating
//! trends are computed on demand from a fresh scan of the review store.

pub mod classifier;
pub mod client;
pub mod dead_letter;
pub mod error;
pub mod job;
pub mod queue;
pub mod service;
pub mod trends;

mod backoff;

pub use classifier::{parse_classification, Classification, Classifier};
pub use client::LlmClassifier;
pub use dead_letter::DeadLetter;
pub use error::{
    ClassifierError, IntakeError, JobError, ReprocessError, SubmitError, TrendError,
};
pub use job::{run_analysis, AnalysisJob, JobOrigin, JobOutcome};
pub use queue::{AnalysisQueue, QueueConfig, QueueStats, Submission};
pub use service::{AnalysisService, ReprocessSummary, Stores};
pub use trends::{rank_categories, record_trend_query, top_categories};
