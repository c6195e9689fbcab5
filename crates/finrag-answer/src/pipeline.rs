//! Retrieve, summarize, generate.

use std::sync::Arc;

use finrag_core::QueryResult;
use finrag_retrieval::{Embedder, Retriever, VectorIndex};

use crate::generator::Generator;
use crate::prompts::PromptItem;
use crate::summary::SentimentTally;

/// Context sentences retrieved per question.
pub const CONTEXT_TOP_K: usize = 12;

pub const NO_RELEVANT_DATA_ANSWER: &str =
    "No relevant financial data found in the index. Try rebuilding or broadening your query.";

pub const NO_RESPONSE_ANSWER: &str = "No response from the language model.";

/// Sentiment tag of the summary line appended to the generator's context.
pub const META_SENTIMENT: &str = "meta";

pub struct RagPipeline<E, V, G> {
    retriever: Retriever<E, V>,
    generator: Arc<G>,
}

impl<E, V, G> Clone for RagPipeline<E, V, G> {
    fn clone(&self) -> Self {
        Self {
            retriever: self.retriever.clone(),
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<E: Embedder, V: VectorIndex, G: Generator> RagPipeline<E, V, G> {
    pub fn new(retriever: Retriever<E, V>, generator: Arc<G>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    #[must_use]
    pub fn retriever(&self) -> &Retriever<E, V> {
        &self.retriever
    }

    /// Answer `question` from the index. Never fails: every error ends up as
    /// text in [`QueryResult::answer`].
    ///
    /// - nothing retrieved: a fixed answer, empty context, no generator call
    /// - query embedding fails: `Error running query: ...`, empty context
    /// - generator fails: `Generation error: ...`, context and summary kept
    ///   so callers can still show what was retrieved for the failed answer
    pub async fn query(&self, question: &str) -> QueryResult {
        let context = match self.retriever.search(question, CONTEXT_TOP_K).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "query failed before generation");
                return QueryResult {
                    query: question.to_string(),
                    context: Vec::new(),
                    sentiment_summary: None,
                    answer: format!("Error running query: {e}"),
                };
            }
        };

        let tally = SentimentTally::from_context(&context);
        let Some(summary) = tally.summary() else {
            tracing::info!(collection = self.retriever.collection(), "no context retrieved");
            return QueryResult {
                query: question.to_string(),
                context: Vec::new(),
                sentiment_summary: None,
                answer: NO_RELEVANT_DATA_ANSWER.to_string(),
            };
        };

        let mut prompt_items: Vec<PromptItem> = context.iter().map(PromptItem::from).collect();
        prompt_items.push(PromptItem {
            sentence: summary.clone(),
            sentiment: META_SENTIMENT.to_string(),
        });

        let answer = match self.generator.generate(question, &prompt_items).await {
            Ok(text) if text.trim().is_empty() => NO_RESPONSE_ANSWER.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                format!("Generation error: {e}")
            }
        };

        tracing::info!(
            retrieved = context.len(),
            dominant = ?tally.dominant(),
            "query answered"
        );

        QueryResult {
            query: question.to_string(),
            context,
            sentiment_summary: Some(summary),
            answer,
        }
    }
}
