//! Prompt construction for the answer generator.

use finrag_core::ContextItem;

/// One context line handed to the generator.
///
/// Unlike [`ContextItem`], `sentiment` is free text: the pipeline appends a
/// summary line tagged `meta`, which is not a sentiment label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptItem {
    pub sentence: String,
    pub sentiment: String,
}

impl From<&ContextItem> for PromptItem {
    fn from(item: &ContextItem) -> Self {
        Self {
            sentence: item.sentence.clone(),
            sentiment: item.sentiment.to_string(),
        }
    }
}

/// Render the analyst prompt for `question` over `context`.
#[must_use]
pub fn build_prompt(question: &str, context: &[PromptItem]) -> String {
    let context_text = context
        .iter()
        .map(|item| format!("- {} ({})", item.sentence, item.sentiment))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are FinGPT-Pro, a concise and factual financial analyst.\n\
         Use the retrieved context below to answer the user's question clearly.\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Context:\n\
         {context_text}\n\
         \n\
         Answer:"
    )
}
