//! Answer generation: the [`Generator`] seam and its Gemini REST client.

use std::future::Future;
use std::time::Duration;

use finrag_core::AppConfig;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::prompts::{build_prompt, PromptItem};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Turns a question and retrieved context into answer text.
pub trait Generator: Send + Sync {
    /// Generate an answer. An empty string means the model produced nothing.
    fn generate(
        &self,
        question: &str,
        context: &[PromptItem],
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiClient {
    /// Creates a client pointed at the public Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, GenerationError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint: format!(
                "{}/v1beta/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            model: model.to_owned(),
        })
    }

    /// Build from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MissingApiKey`] when `GOOGLE_API_KEY` was not
    /// configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .google_api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;
        Self::with_base_url(
            api_key,
            &config.llm_model,
            config.request_timeout_secs,
            &config.gemini_base_url,
        )
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generator for GeminiClient {
    async fn generate(
        &self,
        question: &str,
        context: &[PromptItem],
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(question, context);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [RequestPart { text: &prompt }],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        if parsed.candidates.is_empty() {
            if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(GenerationError::Blocked(reason));
            }
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(model = %self.model, chars = text.len(), "Gemini answer received");
        Ok(text.trim().to_string())
    }
}
