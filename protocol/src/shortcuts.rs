use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// Two-character sequence that starts every trigger.
pub const TRIGGER_MARKER: &str = "//";

/// A single expansion, flattened out of its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub group: String,
    pub key: String,
    pub value: String,
}

/// Group name → trigger key → expansion text.
///
/// Both levels keep insertion order; that order is the order the menu lists things in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortcutTable {
    groups: IndexMap<String, IndexMap<String, String>>,
}

impl ShortcutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of shortcuts across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(IndexMap::len).sum()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn group(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.groups.get(name)
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Create an empty group. Returns `false` when the group already exists.
    pub fn add_group(&mut self, name: &str) -> bool {
        if self.groups.contains_key(name) {
            return false;
        }
        self.groups.insert(name.to_string(), IndexMap::new());
        true
    }

    pub fn remove_group(&mut self, name: &str) -> Option<IndexMap<String, String>> {
        self.groups.shift_remove(name)
    }

    /// Insert or replace a shortcut, creating the group when needed. Returns the previous value.
    pub fn insert(&mut self, group: &str, key: &str, value: &str) -> Option<String> {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string())
    }

    pub fn remove(&mut self, group: &str, key: &str) -> Option<String> {
        self.groups.get_mut(group)?.shift_remove(key)
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups.get(group)?.get(key).map(String::as_str)
    }

    /// Iterate every shortcut in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.groups.iter().flat_map(|(group, entries)| {
            entries
                .iter()
                .map(move |(key, value)| (group.as_str(), key.as_str(), value.as_str()))
        })
    }

    /// Shortcuts of one group, flattened, in table order.
    pub fn shortcuts_in(&self, group: &str) -> Vec<Shortcut> {
        let Some(entries) = self.groups.get(group) else {
            return Vec::new();
        };
        entries
            .iter()
            .map(|(key, value)| Shortcut {
                group: group.to_string(),
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

/// Trim `key` and make sure it starts with the trigger marker.
pub fn normalize_trigger_key(key: &str) -> String {
    let key = key.trim();
    if key.starts_with(TRIGGER_MARKER) {
        key.to_string()
    } else {
        format!("{TRIGGER_MARKER}{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn iteration_follows_insertion_order() {
        let mut table = ShortcutTable::new();
        table.insert("Zeta", "//z", "last letter");
        table.insert("Alpha", "//b", "bee");
        table.insert("Alpha", "//a", "ay");

        let keys: Vec<&str> = table.iter().map(|(_, key, _)| key).collect();
        assert_eq!(keys, vec!["//z", "//b", "//a"]);
        assert_eq!(table.group_names().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut table = ShortcutTable::new();
        table.insert("G", "//one", "1");
        table.insert("G", "//two", "2");
        table.insert("G", "//three", "3");

        assert_eq!(table.remove("G", "//two"), Some("2".to_string()));
        let keys: Vec<&str> = table.iter().map(|(_, key, _)| key).collect();
        assert_eq!(keys, vec!["//one", "//three"]);
        assert_eq!(table.remove("Missing", "//one"), None);
    }

    #[test]
    fn add_group_refuses_duplicates() {
        let mut table = ShortcutTable::new();
        assert!(table.add_group("Greetings"));
        assert!(!table.add_group("Greetings"));
        assert!(table.group("Greetings").is_some_and(IndexMap::is_empty));
    }

    #[test]
    fn serializes_as_nested_objects_in_order() {
        let mut table = ShortcutTable::new();
        table.insert("Greetings", "//hi", "Hi there!");
        table.insert("Greetings", "//bye", "Bye!");

        let json = serde_json::to_string(&table).expect("serialize");
        assert_eq!(json, r#"{"Greetings":{"//hi":"Hi there!","//bye":"Bye!"}}"#);

        let back: ShortcutTable = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, table);
    }

    #[test]
    fn normalize_trigger_key_adds_marker_once() {
        assert_eq!(normalize_trigger_key("  hi "), "//hi");
        assert_eq!(normalize_trigger_key("//hi"), "//hi");
    }
}
