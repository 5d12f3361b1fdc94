//! Voice session state
//!
//! Owned by the presentation layer. Tracks whether recognition should be
//! running and what the popup shows. The one-command-at-a-time rule lives in
//! [`CommandExecutor`], shared with the message dispatcher.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::browser::TabId;
use crate::commands::{CommandExecutor, CommandOutcome, ExecutionResult};
use crate::error::JarvisError;

/// Recognition errors that mean the microphone is unavailable for good
const PERMISSION_ERRORS: [&str; 2] = ["not-allowed", "service-not-allowed"];

/// What the recognizer should do after it stopped on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionAction {
    Restart,
    Stop,
}

/// Snapshot for the popup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_listening: bool,
    pub is_processing: bool,
    pub language: String,
    pub status_text: String,
    pub last_transcript: Option<String>,
}

pub struct VoiceSession {
    executor: Arc<CommandExecutor>,
    is_listening: Arc<Mutex<bool>>,
    language: Arc<Mutex<String>>,
    status_text: Arc<Mutex<String>>,
    last_transcript: Arc<Mutex<Option<String>>>,
}

impl VoiceSession {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self {
            executor,
            is_listening: Arc::new(Mutex::new(false)),
            language: Arc::new(Mutex::new("en-US".to_string())),
            status_text: Arc::new(Mutex::new("Ready".to_string())),
            last_transcript: Arc::new(Mutex::new(None)),
        }
    }

    /// Start listening. Picks up the configured recognition language.
    pub async fn start(&self) -> Result<bool, JarvisError> {
        let mut is_listening = self.is_listening.lock().await;
        if *is_listening {
            return Ok(true);
        }

        let settings = self.executor.settings().load()?;
        if !settings.enabled {
            log::info!("Voice control is disabled");
            return Ok(false);
        }

        *self.language.lock().await = settings.language;
        *is_listening = true;
        self.set_status("Listening...").await;

        log::info!("Jarvis: Started listening");
        Ok(true)
    }

    pub async fn stop(&self) {
        *self.is_listening.lock().await = false;
        *self.last_transcript.lock().await = None;
        self.set_status("Ready").await;
        log::info!("Jarvis: Stopped listening");
    }

    /// The recognizer ended by itself; restart while the session is listening
    pub async fn on_recognition_end(&self) -> RecognitionAction {
        if *self.is_listening.lock().await {
            RecognitionAction::Restart
        } else {
            RecognitionAction::Stop
        }
    }

    /// Record a recognizer error. Permission denials end the session.
    pub async fn on_recognition_error(&self, kind: &str) -> Result<(), JarvisError> {
        log::warn!("Speech recognition error: {}", kind);
        self.set_status(&format!("Error: {}", kind)).await;

        if PERMISSION_ERRORS.contains(&kind) {
            *self.is_listening.lock().await = false;
            return Err(JarvisError::Permission(kind.to_string()));
        }

        Ok(())
    }

    /// Classify and execute a finalized transcript. Rejected while another
    /// command is still running.
    pub async fn submit(&self, text: &str, tab_id: TabId, page_url: Option<&str>) -> Result<CommandOutcome, ExecutionResult> {
        let outcome = self.executor.process(text, tab_id, page_url).await?;

        *self.last_transcript.lock().await = Some(text.trim().to_string());
        self.set_status(&outcome.result.message).await;

        Ok(outcome)
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            is_listening: *self.is_listening.lock().await,
            is_processing: self.executor.is_busy(),
            language: self.language.lock().await.clone(),
            status_text: self.status_text.lock().await.clone(),
            last_transcript: self.last_transcript.lock().await.clone(),
        }
    }

    async fn set_status(&self, text: &str) {
        *self.status_text.lock().await = text.to_string();
    }
}
