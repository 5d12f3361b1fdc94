//! Generative-text provider for Jarvis
//!
//! Gemini backs chat, summarization, email drafting and element explanation.

pub mod gemini;
pub mod prompts;

use thiserror::Error;

pub use gemini::{GeminiClient, TextGenerator, EMPTY_RESPONSE_PLACEHOLDER};

/// Failure from any provider client (Gemini, Gmail, GitHub)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    /// Non-2xx response; `message` is the provider's own text when it sent one
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Short failure category
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::NotConfigured(_) => "not configured",
            ApiError::Http { .. } => "http error",
            ApiError::Network(_) => "network error",
            ApiError::MalformedResponse(_) => "malformed response",
        }
    }

    /// Build an HTTP error from a status and raw body, preferring the
    /// provider's `message` field over the status text.
    pub(crate) fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let provider_message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.pointer("/error/message")
                    .or_else(|| json.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .filter(|m| !m.is_empty());

        let message = provider_message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        });

        ApiError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}
