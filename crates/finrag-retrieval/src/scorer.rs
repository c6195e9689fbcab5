//! Lexicon polarity scorer for financial news sentences.
//!
//! Only used to label corpora that ship without a sentiment column.

use finrag_core::SentimentLabel;

/// Scores above this are positive, below its negation negative.
const POLARITY_THRESHOLD: f32 = 0.1;

/// Finance-domain word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("good", 0.5),
    ("great", 0.6),
    ("strong", 0.5),
    ("stronger", 0.5),
    ("growth", 0.4),
    ("grew", 0.4),
    ("grow", 0.3),
    ("increase", 0.3),
    ("increased", 0.3),
    ("rise", 0.3),
    ("rose", 0.3),
    ("gain", 0.4),
    ("gains", 0.4),
    ("profit", 0.4),
    ("profitable", 0.5),
    ("record", 0.4),
    ("improved", 0.5),
    ("improvement", 0.5),
    ("exceeded", 0.5),
    ("beat", 0.4),
    ("optimistic", 0.6),
    ("upgrade", 0.5),
    ("upgraded", 0.5),
    ("rally", 0.5),
    ("surge", 0.5),
    ("surged", 0.5),
    ("boost", 0.4),
    ("expansion", 0.3),
    ("success", 0.6),
    ("successful", 0.6),
    ("positive", 0.5),
    ("robust", 0.5),
    ("win", 0.4),
    ("won", 0.4),
    // Negative signals
    ("bad", -0.6),
    ("weak", -0.5),
    ("weaker", -0.5),
    ("loss", -0.5),
    ("losses", -0.5),
    ("decline", -0.4),
    ("declined", -0.4),
    ("decrease", -0.3),
    ("decreased", -0.3),
    ("fell", -0.4),
    ("fall", -0.3),
    ("drop", -0.4),
    ("dropped", -0.4),
    ("plunge", -0.6),
    ("plunged", -0.6),
    ("layoffs", -0.6),
    ("bankruptcy", -0.8),
    ("default", -0.6),
    ("downgrade", -0.5),
    ("downgraded", -0.5),
    ("concern", -0.4),
    ("concerns", -0.4),
    ("risk", -0.3),
    ("inflation", -0.2),
    ("recession", -0.7),
    ("crisis", -0.7),
    ("lawsuit", -0.5),
    ("warning", -0.4),
    ("missed", -0.4),
    ("negative", -0.5),
    ("cut", -0.3),
    ("cuts", -0.3),
    ("deficit", -0.4),
    ("failure", -0.6),
    ("failed", -0.5),
];

/// Words that flip the polarity of the lexicon word right after them.
const NEGATORS: &[&str] = &[
    "not", "no", "never", "without", "nor", "cannot", "dont", "didnt", "doesnt", "isnt",
    "wasnt", "wont", "arent", "hasnt", "havent",
];

/// Score a text string using the finance lexicon.
///
/// The score is the mean weight of the matched words, so "profit" alone and
/// "profit" in a long sentence score the same. A negator directly before a
/// lexicon word flips that word's weight and halves it. Returns `0.0` for
/// empty text or text with no lexicon hits; otherwise clamped to `[-1.0, 1.0]`.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut sum = 0.0_f32;
    let mut hits = 0_u16;
    let mut negate = false;

    for word in text.split_whitespace() {
        let w: String = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase()
            .replace('\'', "");

        if NEGATORS.contains(&w.as_str()) {
            negate = true;
            continue;
        }

        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            sum += if negate { -0.5 * weight } else { weight };
            hits = hits.saturating_add(1);
        }
        negate = false;
    }

    if hits == 0 {
        return 0.0;
    }
    (sum / f32::from(hits)).clamp(-1.0, 1.0)
}

/// Heuristic label for a sentence: above `0.1` positive, below `-0.1` negative.
#[must_use]
pub fn auto_sentiment(text: &str) -> SentimentLabel {
    let score = lexicon_score(text);
    if score > POLARITY_THRESHOLD {
        SentimentLabel::Positive
    } else if score < -POLARITY_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}
