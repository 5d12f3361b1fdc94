//! Gmail integration for Jarvis
//!
//! Sends plain-text mail through the Gmail REST API with an OAuth token.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cloud::ApiError;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// A message ready to send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Header values must stay on one line
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}

/// RFC 2047 encoded-word for non-ASCII subjects
fn encode_subject(subject: &str) -> String {
    let subject = header_value(subject);
    if subject.is_ascii() {
        subject
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Minimal MIME message: headers, blank line, body
    pub fn to_mime(&self) -> String {
        format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\n{}",
            header_value(&self.to),
            encode_subject(&self.subject),
            self.body
        )
    }

    /// base64url without padding, as the `raw` field expects
    pub fn encode_raw(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.to_mime().as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, auth_token: &str, email: &OutgoingEmail) -> Result<SentMessage, ApiError>;
}

pub struct GmailClient {
    client: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailSender for GmailClient {
    async fn send(&self, auth_token: &str, email: &OutgoingEmail) -> Result<SentMessage, ApiError> {
        if auth_token.trim().is_empty() {
            return Err(ApiError::NotConfigured("Gmail"));
        }

        log::info!("Sending email to {}", email.to);

        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(auth_token)
            .json(&json!({ "raw": email.encode_raw() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Gmail failures surface the status text
            let message = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            log::warn!("Gmail send failed: {}", message);
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: format!("Failed to send email: {}", message),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("Failed to parse Gmail response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_layout() {
        let email = OutgoingEmail::new("a@b.com", "Hi", "Hello there");
        assert_eq!(
            email.to_mime(),
            "To: a@b.com\r\nSubject: Hi\r\nContent-Type: text/plain; charset=\"UTF-8\"\r\n\r\nHello there"
        );
    }

    #[test]
    fn test_raw_is_base64url_without_padding() {
        let email = OutgoingEmail::new("a@b.com", "Hi?", "ok>>");
        let raw = email.encode_raw();
        assert!(!raw.contains('='));
        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));

        let decoded = URL_SAFE_NO_PAD.decode(raw).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), email.to_mime());
    }

    #[test]
    fn test_headers_cannot_be_injected() {
        let email = OutgoingEmail::new("a@b.com\r\nBcc: evil@x.com", "Hi", "body");
        let mime = email.to_mime();
        assert!(mime.starts_with("To: a@b.com  Bcc: evil@x.com\r\n"));
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let email = OutgoingEmail::new("a@b.com", "Café", "body");
        assert!(email.to_mime().contains("Subject: =?UTF-8?B?Q2Fmw6k=?="));
    }

    #[tokio::test]
    async fn test_missing_token_fails_fast() {
        let client = GmailClient::with_base_url("http://127.0.0.1:9");
        let err = client
            .send("", &OutgoingEmail::new("a@b.com", "Hi", "x"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotConfigured("Gmail"));
    }
}
