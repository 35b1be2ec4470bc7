//! Review, category, and trend domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest star rating a review may carry.
pub const MIN_STARS: i32 = 0;
/// Highest star rating a review may carry.
pub const MAX_STARS: i32 = 10;

/// A classifier label that is not one of the three known values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind} label: {label:?}")]
pub struct LabelError {
    pub kind: &'static str,
    pub label: String,
}

/// Generates a three-valued positive/negative/neutral label enum.
///
/// Parsing trims surrounding whitespace and ignores case, so `" Positive "`
/// and `"POSITIVE"` both map to `Positive`. Anything else is a [`LabelError`].
macro_rules! three_valued_label {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            Positive,
            Negative,
            Neutral,
        }

        impl $name {
            /// Canonical lowercase form, as stored in the database.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    Self::Positive => "positive",
                    Self::Negative => "negative",
                    Self::Neutral => "neutral",
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = LabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    "positive" => Ok(Self::Positive),
                    "negative" => Ok(Self::Negative),
                    "neutral" => Ok(Self::Neutral),
                    _ => Err(LabelError {
                        kind: $kind,
                        label: s.to_string(),
                    }),
                }
            }
        }
    };
}

three_valued_label!(
    /// Overall polarity of a review's text.
    Sentiment,
    "sentiment"
);

three_valued_label!(
    /// Register of a review's writing (warm, hostile, or matter-of-fact).
    Tone,
    "tone"
);

/// A stored review record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub text: String,
    pub stars: i32,
    pub category_id: Option<i64>,
    pub sentiment: Option<Sentiment>,
    pub tone: Option<Tone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Both sentiment and tone have been written.
    #[must_use]
    pub fn is_analyzed(&self) -> bool {
        self.analysis().is_some()
    }

    /// The `(sentiment, tone)` pair, if both are present.
    #[must_use]
    pub fn analysis(&self) -> Option<(Sentiment, Tone)> {
        match (self.sentiment, self.tone) {
            (Some(sentiment), Some(tone)) => Some((sentiment, tone)),
            _ => None,
        }
    }
}

/// Input for creating a review.
///
/// `sentiment` and `tone` may be supplied up-front (e.g. when importing
/// already-labelled reviews); otherwise they are filled in by analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub text: String,
    pub stars: i32,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub tone: Option<Tone>,
}

impl NewReview {
    /// An unlabelled review.
    #[must_use]
    pub fn new(text: impl Into<String>, stars: i32, category_id: Option<i64>) -> Self {
        Self {
            text: text.into(),
            stars,
            category_id,
            sentiment: None,
            tone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

/// One row of the category ranking. Computed per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub average_rating: f64,
    pub review_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(sentiment: Option<Sentiment>, tone: Option<Tone>) -> Review {
        let now = Utc::now();
        Review {
            id: 1,
            text: "solid kettle".to_string(),
            stars: 7,
            category_id: Some(1),
            sentiment,
            tone,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("Positive".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert_eq!("  NEGATIVE\n".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert_eq!("neutral".parse::<Tone>().unwrap(), Tone::Neutral);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "mixed".parse::<Sentiment>().unwrap_err();
        assert_eq!(err.kind, "sentiment");
        assert_eq!(err.label, "mixed");

        let err = "".parse::<Tone>().unwrap_err();
        assert_eq!(err.kind, "tone");
    }

    #[test]
    fn labels_serialize_lowercase() {
        let json = serde_json::to_string(&Tone::Positive).unwrap();
        assert_eq!(json, "\"positive\"");
        let back: Sentiment = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(back, Sentiment::Neutral);
    }

    #[test]
    fn review_is_analyzed_only_when_both_fields_set() {
        assert!(!review(None, None).is_analyzed());
        assert!(!review(Some(Sentiment::Positive), None).is_analyzed());
        assert!(!review(None, Some(Tone::Negative)).is_analyzed());
        assert_eq!(
            review(Some(Sentiment::Positive), Some(Tone::Neutral)).analysis(),
            Some((Sentiment::Positive, Tone::Neutral))
        );
    }
}
