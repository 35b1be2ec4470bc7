//! Classifier contract and strict label validation.

use async_trait::async_trait;
use revdb_core::{Sentiment, Tone};
use serde::Deserialize;

use crate::error::ClassifierError;

/// A validated `(sentiment, tone)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub tone: Tone,
}

/// Turns review text into a [`Classification`].
///
/// Implementations make at most one outbound call per invocation and do not
/// cache results.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

/// Reject text that is empty after trimming.
///
/// # Errors
///
/// Returns [`ClassifierError::InvalidInput`] for empty or whitespace-only text.
pub(crate) fn ensure_classifiable(text: &str) -> Result<(), ClassifierError> {
    if text.trim().is_empty() {
        return Err(ClassifierError::InvalidInput(
            "review text is empty".to_owned(),
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct RawLabels {
    sentiment: String,
    tone: String,
}

/// Parse a model reply of the form `{"sentiment": "...", "tone": "..."}`.
///
/// Markdown code fences around the object are tolerated. Labels are matched
/// case-insensitively; anything other than `positive`, `negative`, or
/// `neutral` is rejected rather than defaulted.
///
/// # Errors
///
/// Returns [`ClassifierError::MalformedResponse`] if the content is not the
/// expected JSON object or carries an unknown label.
pub fn parse_classification(content: &str) -> Result<Classification, ClassifierError> {
    let body = strip_code_fence(content);
    let raw: RawLabels = serde_json::from_str(body).map_err(|e| {
        ClassifierError::MalformedResponse(format!("expected label object: {e}"))
    })?;

    let sentiment = raw
        .sentiment
        .parse::<Sentiment>()
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;
    let tone = raw
        .tone
        .parse::<Tone>()
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

    Ok(Classification { sentiment, tone })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
