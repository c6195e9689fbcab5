//! The closed sentiment label set and the normalizer that maps noisy labels onto it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// One of the three sentiment labels the system stores and returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentLabel {
    /// Canonical display order. Also the tie-break priority when two labels
    /// are equally frequent.
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Normalize an arbitrary raw label. Never fails; see [`normalize_label`].
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        normalize_label(Some(raw))
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_raw(s))
    }
}

// Stored payloads may predate a normalization rule change, so deserialization
// goes through the normalizer instead of rejecting unknown strings.
impl<'de> Deserialize<'de> for SentimentLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(normalize_label(raw.as_deref()))
    }
}

/// Map a noisy or inconsistent label onto the closed label set.
///
/// Lowercases, strips every non-alphabetic character, then matches by
/// prefix (`pos`, `neg`, `neu`) before falling back to substrings
/// (`posit`, `negat`, `neutr`). Anything else, including `None` and the
/// empty string, is [`SentimentLabel::Neutral`].
#[must_use]
pub fn normalize_label(raw: Option<&str>) -> SentimentLabel {
    let Some(raw) = raw else {
        return SentimentLabel::Neutral;
    };

    let s: String = raw
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_lowercase)
        .collect();

    if s.starts_with("pos") {
        SentimentLabel::Positive
    } else if s.starts_with("neg") {
        SentimentLabel::Negative
    } else if s.starts_with("neu") {
        SentimentLabel::Neutral
    } else if s.contains("posit") {
        SentimentLabel::Positive
    } else if s.contains("negat") {
        SentimentLabel::Negative
    } else {
        // "neutr" and every unrecognized label land here.
        SentimentLabel::Neutral
    }
}
