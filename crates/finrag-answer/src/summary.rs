//! Sentiment tallies over retrieved context.

use finrag_core::{ContextItem, SentimentLabel};

/// Per-label counts, stored in [`SentimentLabel::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentTally {
    counts: [usize; 3],
}

fn slot(label: SentimentLabel) -> usize {
    match label {
        SentimentLabel::Positive => 0,
        SentimentLabel::Neutral => 1,
        SentimentLabel::Negative => 2,
    }
}

impl SentimentTally {
    #[must_use]
    pub fn from_context(items: &[ContextItem]) -> Self {
        let mut tally = Self::default();
        for item in items {
            tally.counts[slot(item.sentiment)] += 1;
        }
        tally
    }

    /// Build from `(label, count)` pairs; repeated labels accumulate.
    #[must_use]
    pub fn from_counts(pairs: &[(SentimentLabel, usize)]) -> Self {
        let mut tally = Self::default();
        for &(label, count) in pairs {
            tally.counts[slot(label)] += count;
        }
        tally
    }

    #[must_use]
    pub fn count(&self, label: SentimentLabel) -> usize {
        self.counts[slot(label)]
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Share of `label` in percent, `0.0` for an empty tally.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self, label: SentimentLabel) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(label) as f64 * 100.0 / total as f64
    }

    /// The most frequent label. Ties go to the label earlier in
    /// [`SentimentLabel::ALL`]: positive, then neutral, then negative.
    #[must_use]
    pub fn dominant(&self) -> Option<SentimentLabel> {
        let mut best: Option<(SentimentLabel, usize)> = None;
        for label in SentimentLabel::ALL {
            let count = self.count(label);
            if count > 0 && best.is_none_or(|(_, n)| count > n) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }

    /// `Most retrieved sentences are {dominant} in tone (positive: P, ...).`
    ///
    /// Only labels with a non-zero count are listed. `None` for an empty tally.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        let dominant = self.dominant()?;
        let counts = SentimentLabel::ALL
            .iter()
            .filter(|&&label| self.count(label) > 0)
            .map(|&label| format!("{label}: {}", self.count(label)))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "Most retrieved sentences are {dominant} in tone ({counts})."
        ))
    }
}
