use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GOOGLE_API_KEY is not set")]
    MissingApiKey,

    #[error("Gemini request failed: {0}")]
    Request(String),

    #[error("Gemini returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gemini response parse error: {0}")]
    Parse(String),

    #[error("Gemini blocked the prompt: {0}")]
    Blocked(String),
}
