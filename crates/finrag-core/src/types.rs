use serde::{Deserialize, Serialize};

use crate::label::SentimentLabel;

/// One sentence of the corpus with its canonical label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRecord {
    pub text: String,
    pub label: SentimentLabel,
}

/// Metadata stored next to every vector in the index.
///
/// A missing or unrecognized `sentiment` reads back as neutral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub sentence: String,
    #[serde(default)]
    pub sentiment: SentimentLabel,
}

/// A retrieved payload as handed to callers, ranked most similar first.
pub type ContextItem = Payload;

impl From<&CorpusRecord> for Payload {
    fn from(record: &CorpusRecord) -> Self {
        Self {
            sentence: record.text.clone(),
            sentiment: record.label,
        }
    }
}

/// The structured answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub context: Vec<ContextItem>,
    /// Absent when nothing was retrieved or the query failed before tallying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_summary: Option<String>,
    pub answer: String,
}
