use serde::Deserialize;
use serde::Serialize;

pub const MAX_CLIPBOARD_ENTRIES: usize = 20;

/// Recently copied strings, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ClipboardHistory {
    entries: Vec<String>,
}

impl ClipboardHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from stored entries, re-applying dedupe and the size cap.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let mut history = Self::new();
        for entry in entries.into_iter().rev() {
            history.push(&entry);
        }
        history
    }

    /// Record a copy. The text is trimmed; empty copies are ignored.
    ///
    /// A string already present moves to the front. Returns `true` if the history changed.
    pub fn push(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if self.entries.first().is_some_and(|first| first == text) {
            return false;
        }

        self.entries.retain(|entry| entry != text);
        self.entries.insert(0, text.to_string());
        self.entries.truncate(MAX_CLIPBOARD_ENTRIES);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ClipboardHistory {
    fn from(entries: Vec<String>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<ClipboardHistory> for Vec<String> {
    fn from(history: ClipboardHistory) -> Self {
        history.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recopy_moves_entry_to_front() {
        let mut history = ClipboardHistory::new();
        history.push("one");
        history.push("two");
        history.push("one");

        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["one", "two"]);
    }

    #[test]
    fn copying_same_text_twice_keeps_one_entry() {
        let mut history = ClipboardHistory::new();
        assert!(history.push("same"));
        assert!(!history.push("  same  "));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn evicts_oldest_beyond_cap() {
        let mut history = ClipboardHistory::new();
        for idx in 0..(MAX_CLIPBOARD_ENTRIES + 5) {
            history.push(&format!("copy {idx}"));
        }

        assert_eq!(history.len(), MAX_CLIPBOARD_ENTRIES);
        assert_eq!(
            history.get(0),
            Some(format!("copy {}", MAX_CLIPBOARD_ENTRIES + 4).as_str())
        );
        assert_eq!(history.get(MAX_CLIPBOARD_ENTRIES - 1), Some("copy 5"));
    }

    #[test]
    fn blank_copies_are_ignored() {
        let mut history = ClipboardHistory::new();
        assert!(!history.push("   \n"));
        assert!(history.is_empty());
    }

    #[test]
    fn from_entries_restores_order_and_cap() {
        let stored: Vec<String> = (0..25).map(|idx| format!("e{idx}")).collect();
        let history = ClipboardHistory::from_entries(stored);
        assert_eq!(history.len(), MAX_CLIPBOARD_ENTRIES);
        assert_eq!(history.get(0), Some("e0"));
        assert_eq!(history.get(19), Some("e19"));
    }

    #[test]
    fn deserializing_applies_cap() {
        let stored: Vec<String> = (0..30).map(|idx| format!("e{idx}")).collect();
        let json = serde_json::to_string(&stored).expect("serialize");
        let history: ClipboardHistory = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(history.len(), MAX_CLIPBOARD_ENTRIES);
    }
}
