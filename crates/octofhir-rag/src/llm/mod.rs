//! Language model seam.
//!
//! Retrieval only needs single-shot text completions: a fixed system
//! instruction plus the user's question in, free text out. Nothing about the
//! output is trusted; callers parse and validate it themselves.

mod openai;

pub use openai::OpenAiChatModel;

use async_trait::async_trait;

/// Errors raised by language model backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport failure talking to the completion service.
    #[error("Language model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Language model returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response parsed but carried no completion text.
    #[error("Language model returned no completion")]
    EmptyCompletion,

    /// The response body was not the expected shape.
    #[error("Invalid language model response: {0}")]
    InvalidResponse(String),

    /// Backend misconfiguration (bad base URL and similar).
    #[error("Language model configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

/// A text completion service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `user` under the `system` instruction and return the raw text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}
