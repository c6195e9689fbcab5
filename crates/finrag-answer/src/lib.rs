//! Answer synthesis over retrieved financial sentences.

pub mod error;
pub mod evaluator;
pub mod generator;
pub mod pipeline;
pub mod prompts;
pub mod summary;

pub use error::GenerationError;
pub use evaluator::{Evaluation, Evaluator};
pub use generator::{GeminiClient, Generator};
pub use pipeline::{RagPipeline, CONTEXT_TOP_K, NO_RELEVANT_DATA_ANSWER};
pub use prompts::{build_prompt, PromptItem};
pub use summary::SentimentTally;
