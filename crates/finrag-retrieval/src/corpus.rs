//! Tabular corpus loading with text/label column detection.

use std::path::Path;

use finrag_core::{normalize_label, CorpusRecord, SentimentLabel};

use crate::error::RetrievalError;
use crate::scorer::auto_sentiment;

/// How the text and label columns were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusLayout {
    /// Columns named exactly `sentence` and `label`, where `sentence` holds the
    /// label and `label` holds the text (the Financial `PhraseBank` export).
    SwappedSentenceLabel,
    /// A text-like column and a label-like column found by name.
    Detected,
    /// No label-like column; labels come from the lexicon scorer.
    AutoLabeled,
}

/// A loaded corpus plus what the loader decided about its columns.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub records: Vec<CorpusRecord>,
    pub text_column: String,
    pub label_column: Option<String>,
    pub layout: CorpusLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnPlan {
    text: usize,
    label: Option<usize>,
    layout: CorpusLayout,
}

/// Pick the text and label columns from trimmed, lowercased header names.
///
/// First match wins: the literal `sentence` + `label` pair (swapped), then
/// the first column containing "sentence" or "text" for text and the first
/// containing "sentiment" or "label" for labels. `None` if no text column.
fn detect_columns(columns: &[String]) -> Option<ColumnPlan> {
    let exact = |name: &str| columns.iter().position(|c| c == name);

    if let (Some(sentence), Some(label)) = (exact("sentence"), exact("label")) {
        return Some(ColumnPlan {
            text: label,
            label: Some(sentence),
            layout: CorpusLayout::SwappedSentenceLabel,
        });
    }

    let text = columns
        .iter()
        .position(|c| c.contains("sentence") || c.contains("text"))?;
    let label = columns
        .iter()
        .position(|c| c.contains("sentiment") || c.contains("label"));

    Some(ColumnPlan {
        text,
        label,
        layout: if label.is_some() {
            CorpusLayout::Detected
        } else {
            CorpusLayout::AutoLabeled
        },
    })
}

/// Load a delimited corpus file into normalized records.
///
/// Cells are decoded lossily, so Latin-1 exports load with replacement
/// characters instead of failing. Rows with a blank text cell are skipped.
/// Every label, read or derived, goes through [`normalize_label`].
///
/// # Errors
///
/// Returns [`RetrievalError::Corpus`] if the file cannot be opened or parsed
/// and [`RetrievalError::NoTextColumn`] if no column looks like text.
pub fn load_corpus(path: &Path) -> Result<Corpus, RetrievalError> {
    let corpus_err = |source: csv::Error| RetrievalError::Corpus {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(corpus_err)?;

    let columns: Vec<String> = reader
        .byte_headers()
        .map_err(corpus_err)?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_lowercase()
        })
        .collect();
    tracing::info!(path = %path.display(), columns = ?columns, "corpus columns detected");

    let plan = detect_columns(&columns).ok_or_else(|| RetrievalError::NoTextColumn {
        path: path.to_path_buf(),
        columns: columns.clone(),
    })?;
    if plan.layout == CorpusLayout::AutoLabeled {
        tracing::warn!(
            path = %path.display(),
            "no sentiment column found; auto-labeling with the lexicon scorer"
        );
    }

    let mut records = Vec::new();
    let mut skipped = 0_usize;
    for row in reader.byte_records() {
        let row = row.map_err(corpus_err)?;
        let cell = |idx: usize| row.get(idx).map(String::from_utf8_lossy);

        let Some(text) = cell(plan.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
        else {
            skipped += 1;
            continue;
        };

        let label = match plan.label {
            Some(idx) => normalize_label(cell(idx).as_deref()),
            None => normalize_label(Some(auto_sentiment(&text).as_str())),
        };
        records.push(CorpusRecord { text, label });
    }

    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "skipped rows with blank text");
    }

    let distribution = label_distribution(&records);
    tracing::info!(
        path = %path.display(),
        records = records.len(),
        layout = ?plan.layout,
        distribution = ?distribution,
        "corpus loaded"
    );

    Ok(Corpus {
        records,
        text_column: columns[plan.text].clone(),
        label_column: plan.label.map(|idx| columns[idx].clone()),
        layout: plan.layout,
    })
}

/// Count records per label, in [`SentimentLabel::ALL`] order.
#[must_use]
pub fn label_distribution(records: &[CorpusRecord]) -> Vec<(SentimentLabel, usize)> {
    SentimentLabel::ALL
        .iter()
        .map(|&label| (label, records.iter().filter(|r| r.label == label).count()))
        .collect()
}
