//! In-memory mirror of the persisted state.
//!
//! The mirror is loaded once when the expander starts. Every change is applied to the mirror
//! first and then written through to the backend; a failed write is returned to the caller (the
//! expander logs it, management commands report it) but the mirror keeps the new value.

use chrono::Utc;
use expander_protocol::ActivityKind;
use expander_protocol::ClipboardHistory;
use expander_protocol::NoteTemplates;
use expander_protocol::ShortcutTable;
use expander_protocol::UsageStats;
use expander_protocol::default_notes;
use expander_protocol::default_shortcuts;
use expander_protocol::store::KeyValueStore;
use expander_protocol::store::StoreError;
use expander_protocol::store::StoreKey;
use expander_protocol::store::StoreRecord;

use crate::resolver::MatchMode;

pub struct Store {
    backend: Box<dyn KeyValueStore>,
    shortcuts: ShortcutTable,
    notes: NoteTemplates,
    clipboard_history: ClipboardHistory,
    fuzzy_search: bool,
    usage_stats: UsageStats,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("shortcuts", &self.shortcuts.len())
            .field("clipboard_history", &self.clipboard_history.len())
            .field("fuzzy_search", &self.fuzzy_search)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Read every recognized key from `backend`. A failed read starts from empty state.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let record = match backend.get(&StoreKey::ALL) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("failed to load store, starting empty: {err}");
                StoreRecord::default()
            }
        };
        let store = Self {
            backend,
            shortcuts: record.shortcuts.unwrap_or_default(),
            notes: record.notes.unwrap_or_default(),
            clipboard_history: record.clipboard_history.unwrap_or_default(),
            fuzzy_search: record.fuzzy_search.unwrap_or_default(),
            usage_stats: record.usage_stats.unwrap_or_default(),
        };
        tracing::info!(
            shortcuts = store.shortcuts.len(),
            clipboard_entries = store.clipboard_history.len(),
            "loaded store"
        );
        store
    }

    /// Write the default shortcuts and notes when no shortcuts exist yet.
    ///
    /// Returns whether anything was seeded.
    pub fn seed_defaults_if_empty(&mut self) -> Result<bool, StoreError> {
        if !self.shortcuts.is_empty() {
            return Ok(false);
        }
        self.shortcuts = default_shortcuts();
        if self.notes.is_empty() {
            self.notes = default_notes();
        }
        tracing::info!("seeded default shortcuts and notes");
        self.persist(StoreRecord {
            shortcuts: Some(self.shortcuts.clone()),
            notes: Some(self.notes.clone()),
            ..Default::default()
        })?;
        Ok(true)
    }

    pub fn shortcuts(&self) -> &ShortcutTable {
        &self.shortcuts
    }

    pub fn notes(&self) -> &NoteTemplates {
        &self.notes
    }

    pub fn clipboard_history(&self) -> &ClipboardHistory {
        &self.clipboard_history
    }

    pub fn fuzzy_search(&self) -> bool {
        self.fuzzy_search
    }

    pub fn match_mode(&self) -> MatchMode {
        MatchMode::from_fuzzy_preference(self.fuzzy_search)
    }

    pub fn usage_stats(&self) -> &UsageStats {
        &self.usage_stats
    }

    pub fn edit_shortcuts<R>(
        &mut self,
        edit: impl FnOnce(&mut ShortcutTable) -> R,
    ) -> Result<R, StoreError> {
        let out = edit(&mut self.shortcuts);
        self.persist(StoreRecord {
            shortcuts: Some(self.shortcuts.clone()),
            ..Default::default()
        })?;
        Ok(out)
    }

    pub fn edit_notes<R>(
        &mut self,
        edit: impl FnOnce(&mut NoteTemplates) -> R,
    ) -> Result<R, StoreError> {
        let out = edit(&mut self.notes);
        self.persist(StoreRecord {
            notes: Some(self.notes.clone()),
            ..Default::default()
        })?;
        Ok(out)
    }

    pub fn set_fuzzy_search(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.fuzzy_search = enabled;
        self.persist(StoreRecord {
            fuzzy_search: Some(enabled),
            ..Default::default()
        })
    }

    /// Push a copied string into the clipboard history. Returns whether the history changed.
    pub fn record_copy(&mut self, text: &str) -> Result<bool, StoreError> {
        if !self.clipboard_history.push(text) {
            return Ok(false);
        }
        self.persist_clipboard_history()?;
        Ok(true)
    }

    pub fn clear_clipboard_history(&mut self) -> Result<(), StoreError> {
        self.clipboard_history.clear();
        self.persist_clipboard_history()
    }

    pub fn record_expansion(
        &mut self,
        kind: ActivityKind,
        label: &str,
        typed_chars: usize,
        inserted_chars: usize,
    ) -> Result<(), StoreError> {
        self.usage_stats
            .record_expansion(kind, label, typed_chars, inserted_chars, Utc::now());
        self.persist_usage_stats()
    }

    pub fn record_login(&mut self) -> Result<(), StoreError> {
        self.usage_stats.record_login(Utc::now());
        self.persist_usage_stats()
    }

    /// Apply an imported record: every key it carries replaces the mirrored value.
    pub fn import(&mut self, record: StoreRecord) -> Result<(), StoreError> {
        if let Some(shortcuts) = &record.shortcuts {
            self.shortcuts = shortcuts.clone();
        }
        if let Some(notes) = &record.notes {
            self.notes = notes.clone();
        }
        if let Some(history) = &record.clipboard_history {
            self.clipboard_history = history.clone();
        }
        if let Some(fuzzy) = record.fuzzy_search {
            self.fuzzy_search = fuzzy;
        }
        if let Some(stats) = &record.usage_stats {
            self.usage_stats = stats.clone();
        }
        self.persist(record)
    }

    /// Re-read the clipboard history from the backend so copies made elsewhere show up.
    pub fn reload_clipboard_history(&mut self) -> Result<(), StoreError> {
        let record = self.backend.get(&[StoreKey::ClipboardHistory])?;
        if let Some(history) = record.clipboard_history {
            self.clipboard_history = history;
        }
        Ok(())
    }

    fn persist_clipboard_history(&mut self) -> Result<(), StoreError> {
        self.persist(StoreRecord {
            clipboard_history: Some(self.clipboard_history.clone()),
            ..Default::default()
        })
    }

    fn persist_usage_stats(&mut self) -> Result<(), StoreError> {
        self.persist(StoreRecord {
            usage_stats: Some(self.usage_stats.clone()),
            ..Default::default()
        })
    }

    fn persist(&mut self, record: StoreRecord) -> Result<(), StoreError> {
        self.backend.set(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expander_protocol::store::MemoryStore;
    use pretty_assertions::assert_eq;

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _keys: &[StoreKey]) -> Result<StoreRecord, StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }

        fn set(&mut self, _record: StoreRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("offline".to_string()))
        }
    }

    #[test]
    fn failed_load_starts_empty_and_failed_writes_keep_mirror() {
        let mut store = Store::load(Box::new(FailingStore));
        assert!(store.shortcuts().is_empty());

        assert!(store.record_copy("hello").is_err());
        assert_eq!(store.clipboard_history().get(0), Some("hello"));
    }

    #[test]
    fn seeds_only_when_no_shortcuts() {
        let mut store = Store::load(Box::new(MemoryStore::new()));
        assert!(store.seed_defaults_if_empty().expect("seed"));
        assert_eq!(store.shortcuts().len(), 16);
        assert!(!store.seed_defaults_if_empty().expect("seed"));
    }

    #[test]
    fn loads_existing_record() {
        let mut shortcuts = ShortcutTable::new();
        shortcuts.insert("G", "//a", "A");
        let backend = MemoryStore::with_record(StoreRecord {
            shortcuts: Some(shortcuts.clone()),
            fuzzy_search: Some(true),
            ..Default::default()
        });
        let store = Store::load(Box::new(backend));
        assert_eq!(store.shortcuts(), &shortcuts);
        assert_eq!(store.match_mode(), MatchMode::Subsequence);
    }

    #[test]
    fn expansion_updates_usage_stats() {
        let mut store = Store::load(Box::new(MemoryStore::new()));
        store
            .record_expansion(ActivityKind::Shortcut, "//hi", 4, 10)
            .expect("record");
        assert_eq!(store.usage_stats().shortcuts_used, 1);
        assert_eq!(store.usage_stats().characters_saved, 6);
    }

    #[test]
    fn import_replaces_only_present_keys() {
        let mut store = Store::load(Box::new(MemoryStore::new()));
        store.record_copy("keep me").expect("copy");
        let mut notes = NoteTemplates::new();
        notes.insert("T", "S", "text");
        store
            .import(StoreRecord {
                notes: Some(notes.clone()),
                ..Default::default()
            })
            .expect("import");

        assert_eq!(store.notes(), &notes);
        assert_eq!(store.clipboard_history().len(), 1);
    }
}
