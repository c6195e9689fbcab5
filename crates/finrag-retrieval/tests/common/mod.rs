//! Shared fixtures for the retrieval integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use finrag_retrieval::similarity::l2_normalize;
use finrag_retrieval::{Embedder, RetrievalError};

pub const DIM: usize = 64;

/// Deterministic bag-of-words embedder: each lowercase word is hashed into
/// one of [`DIM`] buckets and the counts are L2-normalized. Identical text
/// always maps to the identical unit vector.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    usize::try_from(hash % DIM as u64).unwrap()
}

pub fn embed_one(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; DIM];
    for word in text.split_whitespace() {
        let w: String = word
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if !w.is_empty() {
            v[bucket(&w)] += 1.0;
        }
    }
    l2_normalize(&mut v);
    v
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| embed_one(t)).collect())
    }
}

/// An embedder whose every call fails, as if TEI were down.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Err(RetrievalError::Tei("TEI request failed: connection refused".to_string()))
    }
}

/// Write `contents` to a temporary `.csv` file that lives as long as the handle.
pub fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    write_csv_bytes(contents.as_bytes())
}

/// Like [`write_csv`] for contents that are not valid UTF-8.
pub fn write_csv_bytes(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}
