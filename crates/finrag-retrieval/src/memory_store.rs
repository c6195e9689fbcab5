//! In-process [`VectorIndex`] with the same collection semantics as Qdrant.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use finrag_core::Payload;

use crate::error::RetrievalError;
use crate::similarity::cosine_similarity;
use crate::vector_store::{IndexedItem, ScoredPayload, VectorIndex};

struct MemoryCollection {
    dimension: usize,
    items: Vec<IndexedItem>,
}

/// Brute-force cosine index held in memory. Contents die with the process.
#[derive(Default)]
pub struct MemoryIndex {
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, MemoryCollection>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(name: &str) -> RetrievalError {
    RetrievalError::Qdrant(format!("collection '{name}' not found"))
}

impl VectorIndex for MemoryIndex {
    async fn list_collections(&self) -> Result<Vec<String>, RetrievalError> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn ensure_collection(&self, name: &str, dimension: usize) -> Result<(), RetrievalError> {
        let mut collections = self.lock();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection {
                dimension,
                items: Vec::new(),
            });
        if collection.dimension != dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: collection.dimension,
                got: dimension,
            });
        }
        Ok(())
    }

    async fn reset_collection(&self, name: &str, dimension: usize) -> Result<(), RetrievalError> {
        self.lock().insert(
            name.to_string(),
            MemoryCollection {
                dimension,
                items: Vec::new(),
            },
        );
        Ok(())
    }

    async fn bulk_upload(&self, name: &str, items: Vec<IndexedItem>) -> Result<(), RetrievalError> {
        let mut collections = self.lock();
        let collection = collections.get_mut(name).ok_or_else(|| not_found(name))?;

        if let Some(bad) = items.iter().find(|i| i.vector.len() != collection.dimension) {
            return Err(RetrievalError::DimensionMismatch {
                expected: collection.dimension,
                got: bad.vector.len(),
            });
        }

        collection.items.extend(items);
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPayload>, RetrievalError> {
        let collections = self.lock();
        let collection = collections.get(name).ok_or_else(|| not_found(name))?;

        if vector.len() != collection.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: collection.dimension,
                got: vector.len(),
            });
        }

        let mut hits: Vec<ScoredPayload> = collection
            .items
            .iter()
            .map(|item| ScoredPayload {
                score: cosine_similarity(vector, &item.vector),
                payload: item.payload.clone(),
            })
            .collect();
        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn sample_payloads(&self, name: &str, limit: usize) -> Result<Vec<Payload>, RetrievalError> {
        let collections = self.lock();
        let collection = collections.get(name).ok_or_else(|| not_found(name))?;
        Ok(collection
            .items
            .iter()
            .take(limit)
            .map(|item| item.payload.clone())
            .collect())
    }

    async fn sample_labels(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<Option<String>>, RetrievalError> {
        let collections = self.lock();
        let collection = collections.get(name).ok_or_else(|| not_found(name))?;
        Ok(collection
            .items
            .iter()
            .take(limit)
            .map(|item| Some(item.payload.sentiment.as_str().to_string()))
            .collect())
    }

    async fn count(&self, name: &str) -> Result<usize, RetrievalError> {
        let collections = self.lock();
        let collection = collections.get(name).ok_or_else(|| not_found(name))?;
        Ok(collection.items.len())
    }
}
