//! HTTP classifier backed by an OpenAI-compatible chat-completions endpoint.
//!
//! Each call sends the review text with a fixed instruction asking for a JSON
//! object with `sentiment` and `tone`, then validates the reply strictly via
//! [`parse_classification`]. HTTP failures are mapped onto the retryable and
//! permanent [`ClassifierError`] kinds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use revdb_core::AppConfig;
use serde::{Deserialize, Serialize};

use crate::classifier::{ensure_classifiable, parse_classification, Classification, Classifier};
use crate::error::ClassifierError;

const SYSTEM_PROMPT: &str = "You classify product reviews. \
Reply with a single JSON object and nothing else: \
{\"sentiment\": \"positive|negative|neutral\", \"tone\": \"positive|negative|neutral\"}. \
`sentiment` is the reviewer's overall opinion of the product; \
`tone` is the emotional register of the writing itself.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Language-model classifier client.
///
/// Use [`LlmClassifier::new`] with an explicit base URL (e.g. a wiremock
/// server in tests) or [`LlmClassifier::from_app_config`] in production.
pub struct LlmClassifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl LlmClassifier {
    /// Creates a client for `{base_url}/chat/completions`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Unavailable`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ClassifierError> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("revdb/0.1 (review-analysis)")
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.map(str::to_owned),
            model: model.to_owned(),
            timeout,
        })
    }

    /// Creates a client from the classifier section of [`AppConfig`].
    ///
    /// # Errors
    ///
    /// See [`LlmClassifier::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ClassifierError> {
        Self::new(
            &config.classifier_url,
            config.classifier_api_key.as_deref(),
            &config.classifier_model,
            config.classifier_timeout_secs,
        )
    }

    fn map_send_error(&self, err: &reqwest::Error) -> ClassifierError {
        if err.is_timeout() {
            ClassifierError::Timeout(self.timeout)
        } else {
            ClassifierError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        ensure_classifiable(text)?;

        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(ClassifierError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "classifier returned status {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            ClassifierError::MalformedResponse(format!("chat response parse error: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("chat response has no content".to_owned())
            })?;

        let classification = parse_classification(&content)?;
        tracing::debug!(
            sentiment = %classification.sentiment,
            tone = %classification.tone,
            "review classified"
        );
        Ok(classification)
    }
}
