use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("TEI embed error: {0}")]
    Tei(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("failed to read corpus {path}: {source}")]
    Corpus {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no sentence/text column found in {path} (columns: {columns:?})")]
    NoTextColumn { path: PathBuf, columns: Vec<String> },

    #[error("{records} records but {vectors} vectors")]
    EmbeddingCountMismatch { records: usize, vectors: usize },
}
