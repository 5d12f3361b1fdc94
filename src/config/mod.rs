//! Extension settings
//!
//! Typed view over the key-value store. Each key is independently optional
//! until set; missing keys fall back to the defaults below.

mod store;

pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::history::{HistoryEntry, HistoryLog};

/// Persisted setting keys, as they appear in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Enabled,
    Language,
    CommandHistory,
    GeminiApiKey,
    GithubToken,
    GmailClientId,
    GmailClientSecret,
    GmailAuthToken,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::Enabled,
        SettingKey::Language,
        SettingKey::CommandHistory,
        SettingKey::GeminiApiKey,
        SettingKey::GithubToken,
        SettingKey::GmailClientId,
        SettingKey::GmailClientSecret,
        SettingKey::GmailAuthToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Enabled => "enabled",
            SettingKey::Language => "language",
            SettingKey::CommandHistory => "commandHistory",
            SettingKey::GeminiApiKey => "geminiApiKey",
            SettingKey::GithubToken => "githubToken",
            SettingKey::GmailClientId => "gmailClientId",
            SettingKey::GmailClientSecret => "gmailClientSecret",
            SettingKey::GmailAuthToken => "gmailAuthToken",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    /// Environment variable that can seed this key on install
    fn env_var(&self) -> Option<&'static str> {
        match self {
            SettingKey::GeminiApiKey => Some("GEMINI_API_KEY"),
            SettingKey::GithubToken => Some("GITHUB_TOKEN"),
            SettingKey::GmailAuthToken => Some("GMAIL_AUTH_TOKEN"),
            _ => None,
        }
    }
}

/// Extension settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Voice control master switch
    pub enabled: bool,

    /// Speech recognition language (e.g., "en-US")
    pub language: String,

    /// Most recent executed commands, oldest first
    pub command_history: Vec<HistoryEntry>,

    pub gemini_api_key: Option<String>,
    pub github_token: Option<String>,
    pub gmail_client_id: Option<String>,
    pub gmail_client_secret: Option<String>,
    pub gmail_auth_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "en-US".to_string(),
            command_history: Vec::new(),
            gemini_api_key: None,
            github_token: None,
            gmail_client_id: None,
            gmail_client_secret: None,
            gmail_auth_token: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Settings {
    pub fn gemini_key(&self) -> Option<&str> {
        non_empty(&self.gemini_api_key)
    }

    pub fn github_token(&self) -> Option<&str> {
        non_empty(&self.github_token)
    }

    pub fn gmail_token(&self) -> Option<&str> {
        non_empty(&self.gmail_auth_token)
    }

    pub fn has_gmail_credentials(&self) -> bool {
        non_empty(&self.gmail_client_id).is_some() && non_empty(&self.gmail_client_secret).is_some()
    }

    /// Human-readable configuration summary for the options page
    pub fn status_report(&self) -> String {
        let mut report = String::from("Configuration Status:\n");

        if self.gemini_key().is_some() {
            report.push_str("✓ Gemini API key is configured\n");
        } else {
            report.push_str("✗ Gemini API key is not configured\n");
        }

        if self.has_gmail_credentials() {
            report.push_str("✓ Gmail OAuth client is configured\n");
        } else {
            report.push_str("✗ Gmail OAuth client is not configured\n");
        }

        if self.gmail_token().is_some() {
            report.push_str("✓ Gmail is authenticated\n");
        } else {
            report.push_str("✗ Gmail is not authenticated\n");
        }

        if self.github_token().is_some() {
            report.push_str("✓ GitHub token is configured\n");
        } else {
            report.push_str("✗ GitHub token is not configured\n");
        }

        report
    }
}

/// Typed access to settings on top of a key-value store
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write of the history key
    history_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            history_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write defaults for every key that is still missing.
    ///
    /// API keys are seeded from the environment (`.env.local` is loaded by
    /// [`crate::init`]) when present.
    pub fn install_defaults(&self) -> Result<(), StoreError> {
        let defaults = Settings::default();
        let mut missing = Vec::new();

        for key in SettingKey::ALL {
            if self.store.get(key.as_str())?.is_some() {
                continue;
            }

            let value = match key {
                SettingKey::Enabled => Some(Value::Bool(defaults.enabled)),
                SettingKey::Language => Some(Value::String(defaults.language.clone())),
                SettingKey::CommandHistory => Some(Value::Array(Vec::new())),
                _ => key
                    .env_var()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|v| !v.trim().is_empty())
                    .map(Value::String),
            };

            if let Some(value) = value {
                missing.push((key.as_str().to_string(), value));
            }
        }

        if !missing.is_empty() {
            log::info!("Installing {} default settings", missing.len());
            self.store.set_many(missing)?;
        }

        Ok(())
    }

    /// Load the full settings, falling back to defaults for missing keys
    pub fn load(&self) -> Result<Settings, StoreError> {
        let mut map = Map::new();
        for key in SettingKey::ALL {
            if let Some(value) = self.store.get(key.as_str())? {
                map.insert(key.as_str().to_string(), value);
            }
        }
        Self::decode(map)
    }

    /// Load only the named keys (unknown names are skipped)
    pub fn get_keys(&self, keys: &[String]) -> Result<Map<String, Value>, StoreError> {
        let mut result = Map::new();
        for name in keys {
            let Some(key) = SettingKey::parse(name) else {
                log::warn!("Ignoring unknown setting key: {}", name);
                continue;
            };
            if let Some(value) = self.store.get(key.as_str())? {
                result.insert(key.as_str().to_string(), value);
            }
        }
        Ok(result)
    }

    /// Apply a partial update. Unknown keys are ignored; the merged result
    /// must still decode as [`Settings`] before anything is written.
    pub fn update(&self, patch: Map<String, Value>) -> Result<Settings, StoreError> {
        let _history = self.lock_history();
        let mut merged = serde_json::to_value(self.load()?)
            .map_err(|source| StoreError::Encoding {
                key: "settings".to_string(),
                source,
            })?;

        let mut writes = Vec::new();
        for (name, value) in patch {
            let Some(key) = SettingKey::parse(&name) else {
                log::warn!("Ignoring unknown setting key: {}", name);
                continue;
            };
            let value = match key {
                SettingKey::CommandHistory => Self::capped_history(value)?,
                _ => value,
            };
            merged[key.as_str()] = value.clone();
            writes.push((key.as_str().to_string(), value));
        }

        let settings: Settings =
            serde_json::from_value(merged).map_err(|source| StoreError::Encoding {
                key: "settings".to_string(),
                source,
            })?;

        self.store.set_many(writes)?;
        Ok(settings)
    }

    pub fn set(&self, key: SettingKey, value: Value) -> Result<(), StoreError> {
        let mut patch = Map::new();
        patch.insert(key.as_str().to_string(), value);
        self.update(patch).map(|_| ())
    }

    /// Read the persisted command history
    pub fn history(&self) -> Result<HistoryLog, StoreError> {
        let entries = match self.store.get(SettingKey::CommandHistory.as_str())? {
            Some(value) => serde_json::from_value(value).map_err(|source| StoreError::Encoding {
                key: SettingKey::CommandHistory.as_str().to_string(),
                source,
            })?,
            None => Vec::new(),
        };
        Ok(HistoryLog::from_entries(entries))
    }

    /// Append one entry to the persisted history
    pub fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let _history = self.lock_history();
        let mut history = self.history()?;
        history.append(entry);
        let value = Self::encode_history(&history)?;
        self.store.set(SettingKey::CommandHistory.as_str(), value)
    }

    fn lock_history(&self) -> MutexGuard<'_, ()> {
        self.history_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keep only the newest entries of a history written through `update`
    fn capped_history(value: Value) -> Result<Value, StoreError> {
        let entries: Vec<HistoryEntry> = serde_json::from_value(value).map_err(|source| StoreError::Encoding {
            key: SettingKey::CommandHistory.as_str().to_string(),
            source,
        })?;
        Self::encode_history(&HistoryLog::from_entries(entries))
    }

    fn encode_history(history: &HistoryLog) -> Result<Value, StoreError> {
        serde_json::to_value(history.all()).map_err(|source| StoreError::Encoding {
            key: SettingKey::CommandHistory.as_str().to_string(),
            source,
        })
    }

    fn decode(map: Map<String, Value>) -> Result<Settings, StoreError> {
        serde_json::from_value(Value::Object(map)).map_err(|source| StoreError::Encoding {
            key: "settings".to_string(),
            source,
        })
    }
}
