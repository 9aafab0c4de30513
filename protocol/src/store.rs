//! The key-value store boundary.
//!
//! The engine and the management commands only ever see a [`StoreRecord`]: a partial snapshot
//! where each recognized top-level key is optional. `get` fills in the requested keys that exist;
//! `set` overwrites exactly the keys present in the record and leaves the others alone.

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::ClipboardHistory;
use crate::NoteTemplates;
use crate::ShortcutTable;
use crate::UsageStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum StoreKey {
    Shortcuts,
    Notes,
    ClipboardHistory,
    FuzzySearch,
    UsageStats,
}

impl StoreKey {
    pub const ALL: [StoreKey; 5] = [
        StoreKey::Shortcuts,
        StoreKey::Notes,
        StoreKey::ClipboardHistory,
        StoreKey::FuzzySearch,
        StoreKey::UsageStats,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcuts: Option<ShortcutTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<NoteTemplates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipboard_history: Option<ClipboardHistory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzzy_search: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_stats: Option<UsageStats>,
}

impl StoreRecord {
    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_none()
            && self.notes.is_none()
            && self.clipboard_history.is_none()
            && self.fuzzy_search.is_none()
            && self.usage_stats.is_none()
    }

    /// Keep only the listed keys.
    pub fn select(mut self, keys: &[StoreKey]) -> Self {
        if !keys.contains(&StoreKey::Shortcuts) {
            self.shortcuts = None;
        }
        if !keys.contains(&StoreKey::Notes) {
            self.notes = None;
        }
        if !keys.contains(&StoreKey::ClipboardHistory) {
            self.clipboard_history = None;
        }
        if !keys.contains(&StoreKey::FuzzySearch) {
            self.fuzzy_search = None;
        }
        if !keys.contains(&StoreKey::UsageStats) {
            self.usage_stats = None;
        }
        self
    }

    /// Overwrite every key present in `update`.
    pub fn merge(&mut self, update: StoreRecord) {
        let StoreRecord {
            shortcuts,
            notes,
            clipboard_history,
            fuzzy_search,
            usage_stats,
        } = update;
        if shortcuts.is_some() {
            self.shortcuts = shortcuts;
        }
        if notes.is_some() {
            self.notes = notes;
        }
        if clipboard_history.is_some() {
            self.clipboard_history = clipboard_history;
        }
        if fuzzy_search.is_some() {
            self.fuzzy_search = fuzzy_search;
        }
        if usage_stats.is_some() {
            self.usage_stats = usage_stats;
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store backend unavailable: {0}")]
    Backend(String),
}

/// Asynchronous-in-spirit get/set store. Callers never wait on a write before continuing; a
/// failed write is reported back and the caller decides whether to log it.
pub trait KeyValueStore {
    fn get(&self, keys: &[StoreKey]) -> Result<StoreRecord, StoreError>;
    fn set(&mut self, record: StoreRecord) -> Result<(), StoreError>;
}

/// Purely in-memory store, used by tests and by hosts without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: StoreRecord,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: StoreRecord) -> Self {
        Self { record, writes: 0 }
    }

    pub fn record(&self) -> &StoreRecord {
        &self.record
    }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[StoreKey]) -> Result<StoreRecord, StoreError> {
        Ok(self.record.clone().select(keys))
    }

    fn set(&mut self, record: StoreRecord) -> Result<(), StoreError> {
        self.record.merge(record);
        self.writes += 1;
        Ok(())
    }
}
