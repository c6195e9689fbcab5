//! Embedding-similarity scores for a retrieved context and its answer.

use std::sync::Arc;

use finrag_core::ContextItem;
use finrag_retrieval::{cosine_similarity, Embedder, RetrievalError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    /// Mean query/sentence cosine over the retrieved context.
    pub retrieval_score: f32,
    /// Query/answer cosine.
    pub answer_quality: f32,
}

pub struct Evaluator<E> {
    embedder: Arc<E>,
}

fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

impl<E: Embedder> Evaluator<E> {
    pub fn new(embedder: Arc<E>) -> Self {
        Self { embedder }
    }

    /// Score one answered query. Both scores are rounded to 3 decimals;
    /// `retrieval_score` is `0.0` when nothing was retrieved.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the texts cannot be embedded.
    #[allow(clippy::cast_precision_loss)]
    pub async fn evaluate(
        &self,
        query: &str,
        retrieved: &[ContextItem],
        answer: &str,
    ) -> Result<Evaluation, RetrievalError> {
        let mut texts: Vec<&str> = Vec::with_capacity(retrieved.len() + 2);
        texts.push(query);
        texts.push(answer);
        texts.extend(retrieved.iter().map(|item| item.sentence.as_str()));

        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(RetrievalError::EmbeddingCountMismatch {
                records: texts.len(),
                vectors: vectors.len(),
            });
        }

        let query_vec = &vectors[0];
        let answer_quality = cosine_similarity(query_vec, &vectors[1]);
        let doc_vecs = &vectors[2..];
        let retrieval_score = if doc_vecs.is_empty() {
            0.0
        } else {
            doc_vecs
                .iter()
                .map(|v| cosine_similarity(query_vec, v))
                .sum::<f32>()
                / doc_vecs.len() as f32
        };

        Ok(Evaluation {
            retrieval_score: round3(retrieval_score),
            answer_quality: round3(answer_quality),
        })
    }
}
