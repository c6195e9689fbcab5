//! Query-time retrieval over one collection.

use std::sync::Arc;

use finrag_core::ContextItem;

use crate::embeddings::Embedder;
use crate::error::RetrievalError;
use crate::vector_store::VectorIndex;

/// Embeds queries and corpora with one shared [`Embedder`] and reads and
/// writes one named collection of a [`VectorIndex`].
pub struct Retriever<E, V> {
    pub(crate) embedder: Arc<E>,
    pub(crate) store: Arc<V>,
    pub(crate) collection: String,
}

impl<E, V> Clone for Retriever<E, V> {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            store: Arc::clone(&self.store),
            collection: self.collection.clone(),
        }
    }
}

/// Store reachability and collection state, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    pub collections: Vec<String>,
    pub collection_exists: bool,
    /// `None` when the collection is absent.
    pub points: Option<usize>,
}

impl<E: Embedder, V: VectorIndex> Retriever<E, V> {
    pub fn new(embedder: Arc<E>, store: Arc<V>, collection: impl Into<String>) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    /// Make sure the collection exists with the embedder's dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the store is unreachable or refuses the
    /// create, and [`RetrievalError::DimensionMismatch`] if the collection
    /// already exists with a different vector size.
    pub async fn init(&self) -> Result<(), RetrievalError> {
        self.store
            .ensure_collection(&self.collection, self.embedder.dimension())
            .await
    }

    /// The `top_k` payloads most similar to `query`, most similar first.
    ///
    /// Stored sentiments are normalized when the store decodes each payload,
    /// so labels written under older rules still come back canonical. A
    /// failed store search is logged and yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] only if the query itself cannot be embedded.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ContextItem>, RetrievalError> {
        let query_vector = self
            .embedder
            .embed(&[query])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Tei("no embedding returned for query".to_string()))?;

        let hits = match self
            .store
            .search(&self.collection, &query_vector, top_k)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(
                    collection = %self.collection,
                    error = %e,
                    "vector search failed; returning no context"
                );
                return Ok(Vec::new());
            }
        };

        Ok(hits
            .into_iter()
            .map(|hit| hit.payload)
            .collect())
    }

    /// List collections and count points in ours.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the store cannot be reached.
    pub async fn status(&self) -> Result<IndexStatus, RetrievalError> {
        let collections = self.store.list_collections().await?;
        let collection_exists = collections.iter().any(|c| c == &self.collection);
        let points = if collection_exists {
            Some(self.store.count(&self.collection).await?)
        } else {
            None
        };

        Ok(IndexStatus {
            collections,
            collection_exists,
            points,
        })
    }
}
