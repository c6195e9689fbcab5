//! Sentence embeddings: the [`Embedder`] seam and its TEI (Text Embeddings Inference) client.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::error::RetrievalError;
use crate::similarity::l2_normalize;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

/// Inputs longer than this many whitespace tokens are cut before sending.
pub const MAX_INPUT_TOKENS: usize = 256;

/// A sentence-embedding model shared by every caller in the process.
///
/// Corpus sentences and queries must go through the same instance so their
/// similarity scores are comparable.
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embed `texts` into unit-length vectors, one per input, in order.
    fn embed(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, RetrievalError>> + Send;
}

/// TEI HTTP client.
pub struct TeiClient {
    client: reqwest::Client,
    url: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
    truncate: bool,
    normalize: bool,
}

impl TeiClient {
    /// Create a new `TeiClient` expecting `dimension`-length vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(tei_url: &str, dimension: usize, timeout_secs: u64) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/embed", tei_url.trim_end_matches('/')),
            dimension,
        })
    }
}

impl Embedder for TeiClient {
    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Generate embeddings for a batch of texts.
    ///
    /// Texts are batched into groups of [`BATCH_SIZE`] (64) per request.
    /// Every vector is checked against the configured dimension and
    /// L2-normalized before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Tei`] if the request fails or the response
    /// cannot be parsed, and [`RetrievalError::DimensionMismatch`] if TEI
    /// serves a model of a different dimension.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let inputs: Vec<&str> = chunk.iter().map(|t| truncate_tokens(t)).collect();
            let request = EmbedRequest {
                inputs: &inputs,
                truncate: true,
                normalize: true,
            };
            let response = self
                .client
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| RetrievalError::Tei(format!("TEI request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(RetrievalError::Tei(format!(
                    "TEI returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| RetrievalError::Tei(format!("TEI response parse error: {e}")))?;

            if embeddings.len() != chunk.len() {
                return Err(RetrievalError::Tei(format!(
                    "TEI returned {} embeddings for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            for mut embedding in embeddings {
                if embedding.len() != self.dimension {
                    return Err(RetrievalError::DimensionMismatch {
                        expected: self.dimension,
                        got: embedding.len(),
                    });
                }
                l2_normalize(&mut embedding);
                all_embeddings.push(embedding);
            }
        }

        tracing::debug!(count = all_embeddings.len(), "embedded texts via TEI");
        Ok(all_embeddings)
    }
}

/// Cut `text` after [`MAX_INPUT_TOKENS`] whitespace-delimited tokens.
///
/// The server's `truncate` flag enforces the model's real tokenizer limit;
/// this only keeps very long rows from inflating request bodies.
fn truncate_tokens(text: &str) -> &str {
    let mut tokens = 0;
    let mut in_token = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_token = false;
        } else if !in_token {
            if tokens == MAX_INPUT_TOKENS {
                return text[..idx].trim_end();
            }
            tokens += 1;
            in_token = true;
        }
    }
    text
}
