//! Corpus loading, embedding, vector indexing and semantic search.
//!
//! ```text
//! load_corpus → Embedder::embed → VectorIndex::bulk_upload   (build_index)
//! query → Embedder::embed → VectorIndex::search → ContextItem (search)
//! ```

pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod indexer;
pub mod memory_store;
pub mod retriever;
pub mod scorer;
pub mod similarity;
pub mod vector_store;

pub use corpus::{label_distribution, load_corpus, Corpus, CorpusLayout};
pub use embeddings::{Embedder, TeiClient};
pub use error::RetrievalError;
pub use indexer::{IndexReport, MISSING_LABEL};
pub use memory_store::MemoryIndex;
pub use retriever::{IndexStatus, Retriever};
pub use scorer::{auto_sentiment, lexicon_score};
pub use similarity::cosine_similarity;
pub use vector_store::{IndexedItem, QdrantClient, ScoredPayload, VectorIndex};
