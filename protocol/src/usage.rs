use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

pub const MAX_RECENT_ACTIVITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
    Shortcut,
    Note,
    Clipboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub label: String,
    pub at: DateTime<Utc>,
}

/// Counters shown on the management dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub shortcuts_used: u64,
    pub characters_saved: u64,
    pub last_login: Option<DateTime<Utc>>,
    /// Most recent first, at most [`MAX_RECENT_ACTIVITY`] entries.
    pub recent_activity: Vec<ActivityEvent>,
}

impl UsageStats {
    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login = Some(at);
    }

    /// Count one expansion.
    ///
    /// `typed_chars` is what the user typed to trigger it (marker included) and `inserted_chars`
    /// what replaced it; the difference counts as saved when positive.
    pub fn record_expansion(
        &mut self,
        kind: ActivityKind,
        label: &str,
        typed_chars: usize,
        inserted_chars: usize,
        at: DateTime<Utc>,
    ) {
        self.shortcuts_used = self.shortcuts_used.saturating_add(1);
        let saved = inserted_chars.saturating_sub(typed_chars) as u64;
        self.characters_saved = self.characters_saved.saturating_add(saved);

        self.recent_activity.insert(
            0,
            ActivityEvent {
                kind,
                label: label.to_string(),
                at,
            },
        );
        self.recent_activity.truncate(MAX_RECENT_ACTIVITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("timestamp")
    }

    #[test]
    fn record_expansion_counts_saved_characters() {
        let mut stats = UsageStats::default();
        stats.record_expansion(ActivityKind::Shortcut, "//hi", 4, 10, at(1));
        stats.record_expansion(ActivityKind::Shortcut, "//long", 6, 2, at(2));

        assert_eq!(stats.shortcuts_used, 2);
        assert_eq!(stats.characters_saved, 6);
        assert_eq!(stats.recent_activity[0].label, "//long");
    }

    #[test]
    fn recent_activity_is_a_ring_of_ten() {
        let mut stats = UsageStats::default();
        for idx in 0..15 {
            stats.record_expansion(ActivityKind::Clipboard, &format!("e{idx}"), 0, 1, at(idx));
        }
        assert_eq!(stats.recent_activity.len(), MAX_RECENT_ACTIVITY);
        assert_eq!(stats.recent_activity[0].label, "e14");
        assert_eq!(stats.recent_activity[9].label, "e5");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut stats = UsageStats::default();
        stats.record_login(at(0));
        let json = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(json["shortcutsUsed"], 0);
        assert_eq!(json["lastLogin"], "1970-01-01T00:00:00Z");
        assert_eq!(ActivityKind::Note.to_string(), "note");
    }
}
