//! Jarvis - voice command backend for a browser assistant
//!
//! Layout:
//! - commands: classification and execution of spoken/typed commands
//! - messaging: request dispatch between extension contexts
//! - session: listening state and status text for the popup
//! - browser, cloud, integrations: collaborator seams and HTTP clients

pub mod browser;
pub mod cloud;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod integrations;
pub mod messaging;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Context;
use std::sync::Arc;

pub use browser::{Browser, BrowserError, PageAction, PageOutcome, TabId};
pub use cloud::{ApiError, GeminiClient, TextGenerator};
pub use commands::{
    classify, ClassifiedAction, Command, CommandExecutor, CommandOutcome, ExecutionContext, ExecutionResult,
    ExecutorOptions, PageContext, Services,
};
pub use config::{KeyValueStore, MemoryStore, Settings, SettingsStore, SqliteStore, StoreError};
pub use error::JarvisError;
pub use history::{HistoryEntry, HistoryLog, MAX_HISTORY_ENTRIES};
pub use integrations::{GitHubClient, GmailClient, IssueTracker, MailSender};
pub use messaging::{Dispatcher, MessageSender, Request};
pub use session::VoiceSession;

/// Initialise logging once. Honours `RUST_LOG`; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Load `.env.local` (if present) and initialise logging
pub fn init() {
    let _ = dotenvy::from_filename(".env.local");
    init_logging();

    let gemini_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    log::info!("GEMINI_API_KEY loaded: {} chars", gemini_key.len());
}

/// The assembled backend: settings, executor, dispatcher and voice session
pub struct Jarvis {
    pub executor: Arc<CommandExecutor>,
    pub dispatcher: Dispatcher,
    pub session: VoiceSession,
}

impl Jarvis {
    /// Wire the backend over a store and a set of collaborators, installing
    /// default settings on first run.
    pub fn new(store: Arc<dyn KeyValueStore>, services: Services, options: ExecutorOptions) -> Result<Self, StoreError> {
        let settings = SettingsStore::new(store);
        settings.install_defaults()?;

        let executor = Arc::new(CommandExecutor::with_options(services, settings, options));
        Ok(Self {
            dispatcher: Dispatcher::new(executor.clone()),
            session: VoiceSession::new(executor.clone()),
            executor,
        })
    }

    /// Production wiring: SQLite settings in the user data dir and the real
    /// Gemini, Gmail and GitHub clients.
    pub fn open_default(browser: Arc<dyn Browser>) -> anyhow::Result<Self> {
        let store = SqliteStore::new().context("Failed to open settings database")?;

        let services = Services {
            browser,
            gemini: Arc::new(GeminiClient::new()),
            mail: Arc::new(GmailClient::new()),
            github: Arc::new(GitHubClient::new()),
        };

        let jarvis = Self::new(Arc::new(store), services, ExecutorOptions::default())
            .context("Failed to install default settings")?;

        log::info!("Jarvis backend ready");
        Ok(jarvis)
    }

    pub fn settings(&self) -> &SettingsStore {
        self.executor.settings()
    }
}
