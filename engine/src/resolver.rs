//! Candidate filtering over the shortcut table.

use expander_protocol::Shortcut;
use expander_protocol::ShortcutTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::IsVariant)]
pub enum MatchMode {
    /// Case-insensitive `contains`.
    #[default]
    Substring,
    /// Case-insensitive in-order subsequence, see [`fuzzy_match`].
    Subsequence,
}

impl MatchMode {
    pub fn from_fuzzy_preference(fuzzy: bool) -> Self {
        if fuzzy {
            MatchMode::Subsequence
        } else {
            MatchMode::Substring
        }
    }

    /// Whether `candidate` matches `query`, ignoring case. An empty query matches everything.
    pub fn matches(self, query: &str, candidate: &str) -> bool {
        let needle = query.to_lowercase();
        let candidate = candidate.to_lowercase();
        match self {
            MatchMode::Substring => candidate.contains(&needle),
            MatchMode::Subsequence => fuzzy_match(&needle, &candidate),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub groups: Vec<String>,
    pub shortcuts: Vec<Shortcut>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.shortcuts.is_empty()
    }
}

/// Groups whose name matches and shortcuts whose key or value matches, both in table order.
pub fn resolve(table: &ShortcutTable, token: &str, mode: MatchMode) -> Resolution {
    let groups = table
        .group_names()
        .filter(|group| mode.matches(token, group))
        .map(str::to_string)
        .collect();
    let shortcuts = table
        .iter()
        .filter(|(_, key, value)| mode.matches(token, key) || mode.matches(token, value))
        .map(|(group, key, value)| Shortcut {
            group: group.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect();
    Resolution { groups, shortcuts }
}

/// In-order subsequence test. Comparison is exact; callers lowercase both sides.
pub fn fuzzy_match(needle: &str, haystack: &str) -> bool {
    let needle_len = needle.chars().count();
    let haystack_len = haystack.chars().count();
    if needle_len > haystack_len {
        return false;
    }
    if needle_len == haystack_len {
        return needle == haystack;
    }

    let mut remaining = haystack.chars();
    needle
        .chars()
        .all(|nc| remaining.by_ref().any(|hc| hc == nc))
}
