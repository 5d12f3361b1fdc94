//! Error taxonomy for Jarvis
//!
//! Every error here is recovered at the executor or dispatcher boundary and
//! turned into a user-facing message. Nothing propagates past a message handler.

use thiserror::Error;

use crate::browser::BrowserError;
use crate::cloud::ApiError;
use crate::config::StoreError;

#[derive(Debug, Error)]
pub enum JarvisError {
    /// A required API key or token is missing.
    #[error("{0} not configured")]
    Configuration(&'static str),

    /// HTTP non-2xx or network failure from a provider.
    #[error(transparent)]
    Transport(#[from] ApiError),

    /// Browser refused microphone or tab access.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// A page-scripting or tab-control call was rejected.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl JarvisError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, JarvisError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_names_service() {
        let err = JarvisError::Configuration("Gmail");
        assert_eq!(err.to_string(), "Gmail not configured");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_transport_is_transparent() {
        let err: JarvisError = ApiError::Http {
            status: 401,
            message: "Bad credentials".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Bad credentials");
        assert!(!err.is_configuration());
    }
}
