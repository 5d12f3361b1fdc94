//! Command history
//!
//! Bounded append log of executed commands. Insertion order is eviction order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of commands kept
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// A logged command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_url: Option<String>,
}

impl HistoryEntry {
    pub fn new(command: impl Into<String>, tab_url: Option<String>) -> Self {
        Self {
            command: command.into(),
            timestamp: Utc::now(),
            tab_url,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, keeping only the newest ones
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            log.append(entry);
        }
        log
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);

        while self.entries.len() > MAX_HISTORY_ENTRIES {
            self.entries.pop_front();
        }
    }

    /// All entries, oldest first
    pub fn all(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
