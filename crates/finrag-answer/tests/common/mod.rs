#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use finrag_answer::{GenerationError, Generator, PromptItem};
use finrag_core::{Payload, SentimentLabel};
use finrag_retrieval::similarity::l2_normalize;
use finrag_retrieval::{Embedder, IndexedItem, MemoryIndex, RetrievalError, Retriever, VectorIndex};

pub const DIM: usize = 32;
pub const COLLECTION: &str = "finrag_test";

/// Letter-frequency embedder; identical text gives identical vectors.
pub struct LetterEmbedder;

pub fn embed_one(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; DIM];
    for b in text.bytes().filter(u8::is_ascii_alphabetic) {
        v[usize::from(b.to_ascii_lowercase() - b'a') % DIM] += 1.0;
    }
    // Keeps empty text off the zero vector.
    v[DIM - 1] += 0.01;
    l2_normalize(&mut v);
    v
}

impl Embedder for LetterEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|t| embed_one(t)).collect())
    }
}

pub struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Err(RetrievalError::Tei("TEI returned status 503 Service Unavailable".to_string()))
    }
}

/// What a [`ScriptedGenerator`] does when called.
pub enum Script {
    Answer(&'static str),
    Fail,
}

/// Records every call and replies per its [`Script`].
pub struct ScriptedGenerator {
    script: Script,
    pub calls: AtomicUsize,
    pub last_context: Mutex<Vec<PromptItem>>,
}

impl ScriptedGenerator {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        _question: &str,
        context: &[PromptItem],
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = context.to_vec();
        match self.script {
            Script::Answer(text) => Ok(text.to_string()),
            Script::Fail => Err(GenerationError::Status {
                status: 429,
                body: "quota exceeded".to_string(),
            }),
        }
    }
}

/// A retriever over a memory index preloaded with `rows`.
pub async fn seeded_retriever(
    rows: &[(&str, SentimentLabel)],
) -> Retriever<LetterEmbedder, MemoryIndex> {
    let store = Arc::new(MemoryIndex::new());
    store.reset_collection(COLLECTION, DIM).await.unwrap();
    let items = rows
        .iter()
        .map(|&(sentence, sentiment)| IndexedItem {
            vector: embed_one(sentence),
            payload: Payload {
                sentence: sentence.to_string(),
                sentiment,
            },
        })
        .collect();
    store.bulk_upload(COLLECTION, items).await.unwrap();
    Retriever::new(Arc::new(LetterEmbedder), store, COLLECTION)
}
