use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::ApiError;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-pro";

/// Returned when a response carries no candidate text
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "No response generated.";

/// Prompt-in, text-out completion
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, ApiError>;
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::with_base_url(GEMINI_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn build_request_body(prompt: &str) -> Value {
        json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ]
        })
    }

    /// First candidate's text, or the placeholder when the field is absent
    pub fn extract_text(response: &Value) -> String {
        response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| EMPTY_RESPONSE_PLACEHOLDER.to_string())
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::NotConfigured("Gemini"));
        }

        log::info!("Gemini request: {} chars", prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(&Self::build_request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("Gemini API error: {}", status);
            return Err(ApiError::from_response(status, &body));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("Failed to parse Gemini response: {}", e)))?;

        Ok(Self::extract_text(&parsed))
    }
}
