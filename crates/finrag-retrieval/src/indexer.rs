//! Full rebuild of the collection from a corpus file.

use std::collections::BTreeSet;
use std::path::Path;

use finrag_core::{Payload, SentimentLabel};

use crate::corpus::{label_distribution, load_corpus, CorpusLayout};
use crate::embeddings::Embedder;
use crate::error::RetrievalError;
use crate::retriever::Retriever;
use crate::vector_store::{IndexedItem, VectorIndex};

/// Stored payloads read back after an upload to check their labels.
const VERIFY_SAMPLE_SIZE: usize = 100;

/// Placeholder for a sampled point that has no `sentiment` value.
pub const MISSING_LABEL: &str = "NA";

/// What a rebuild wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub collection: String,
    /// Rows loaded from the corpus after blank-text rows were dropped.
    pub records: usize,
    pub uploaded: usize,
    pub layout: CorpusLayout,
    /// Per-label counts in [`SentimentLabel::ALL`] order.
    pub distribution: Vec<(SentimentLabel, usize)>,
    /// Raw stored labels outside the closed set found by post-upload
    /// sampling, sorted. A point with no label shows as [`MISSING_LABEL`].
    pub unexpected_labels: Vec<String>,
}

impl IndexReport {
    /// Whether labels came from the lexicon scorer rather than a column.
    #[must_use]
    pub fn auto_labeled(&self) -> bool {
        self.layout == CorpusLayout::AutoLabeled
    }
}

impl<E: Embedder, V: VectorIndex> Retriever<E, V> {
    /// Wipe the collection and reload it from the corpus at `path`.
    ///
    /// 1. Load and label the corpus.
    /// 2. Reset the collection with the embedder's dimension.
    /// 3. Embed every sentence (TEI batches of 64).
    /// 4. Upload vectors with `{sentence, sentiment}` payloads.
    /// 5. Sample stored payloads and warn if any label left the closed set.
    ///
    /// # Errors
    ///
    /// Fails fast on an unreadable corpus, a missing text column, an
    /// embedding failure, or a failed reset/upload. A failure after the reset
    /// leaves the collection partially loaded; rerun the rebuild.
    pub async fn build_index(&self, path: &Path) -> Result<IndexReport, RetrievalError> {
        let corpus = load_corpus(path)?;
        let distribution = label_distribution(&corpus.records);
        tracing::info!(
            collection = %self.collection,
            distribution = ?distribution,
            "pre-upload sentiment distribution"
        );

        let dimension = self.embedder.dimension();
        self.store.reset_collection(&self.collection, dimension).await?;

        let texts: Vec<&str> = corpus.records.iter().map(|r| r.text.as_str()).collect();
        tracing::info!(count = texts.len(), "generating embeddings");
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != corpus.records.len() {
            return Err(RetrievalError::EmbeddingCountMismatch {
                records: corpus.records.len(),
                vectors: vectors.len(),
            });
        }

        let items: Vec<IndexedItem> = corpus
            .records
            .iter()
            .zip(vectors)
            .map(|(record, vector)| IndexedItem {
                vector,
                payload: Payload::from(record),
            })
            .collect();

        let uploaded = items.len();
        if !items.is_empty() {
            tracing::info!(
                collection = %self.collection,
                count = items.len(),
                "uploading sentences"
            );
            self.store.bulk_upload(&self.collection, items).await?;
        }

        let unexpected_labels = self.verify_labels().await;

        Ok(IndexReport {
            collection: self.collection.clone(),
            records: corpus.records.len(),
            uploaded,
            layout: corpus.layout,
            distribution,
            unexpected_labels,
        })
    }

    /// Best-effort post-upload check of the raw stored labels. Returns the
    /// ones outside the closed set; a sampling failure only logs.
    async fn verify_labels(&self) -> Vec<String> {
        let sample = match self
            .store
            .sample_labels(&self.collection, VERIFY_SAMPLE_SIZE)
            .await
        {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(collection = %self.collection, error = %e, "label verification failed");
                return Vec::new();
            }
        };

        let unique: BTreeSet<&str> = sample
            .iter()
            .map(|label| label.as_deref().unwrap_or(MISSING_LABEL))
            .collect();
        let unexpected: Vec<String> = unique
            .iter()
            .filter(|label| !SentimentLabel::ALL.iter().any(|l| l.as_str() == **label))
            .map(|label| (*label).to_string())
            .collect();

        if unexpected.is_empty() {
            tracing::info!(
                collection = %self.collection,
                labels = ?unique,
                sampled = sample.len(),
                "post-upload unique labels"
            );
        } else {
            tracing::warn!(
                collection = %self.collection,
                unexpected = ?unexpected,
                sampled = sample.len(),
                "stored labels outside positive/negative/neutral"
            );
        }
        unexpected
    }
}
