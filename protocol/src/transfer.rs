//! Backup and exchange formats.
//!
//! - JSON backup: `{ shortcuts, notes, clipboardHistory }`.
//! - Notes CSV export: `topic,subtopic,text`, one template per line.
//! - Shortcut CSV import: `key,value`, one shortcut per line.

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::ClipboardHistory;
use crate::NoteTemplates;
use crate::ShortcutTable;
use crate::normalize_trigger_key;
use crate::store::StoreRecord;

/// Group that CSV-imported shortcuts land in when the caller does not name one.
pub const DEFAULT_IMPORT_GROUP: &str = "Imported";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("backup is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("backup does not contain shortcuts, notes, or clipboard history")]
    NothingToImport,
    #[error("failed to encode backup: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Backup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shortcuts: Option<ShortcutTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<NoteTemplates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clipboard_history: Option<ClipboardHistory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fuzzy_search: Option<bool>,
}

/// Serialize a full backup.
pub fn export_backup(
    shortcuts: &ShortcutTable,
    notes: &NoteTemplates,
    clipboard_history: &ClipboardHistory,
) -> Result<String, TransferError> {
    let backup = Backup {
        shortcuts: Some(shortcuts.clone()),
        notes: Some(notes.clone()),
        clipboard_history: Some(clipboard_history.clone()),
        fuzzy_search: None,
    };
    serde_json::to_string_pretty(&backup).map_err(TransferError::Encode)
}

/// Parse a backup into the record to write. Nothing is written on error.
pub fn import_backup(contents: &str) -> Result<StoreRecord, TransferError> {
    let backup: Backup = serde_json::from_str(contents).map_err(TransferError::MalformedJson)?;
    let record = StoreRecord {
        shortcuts: backup.shortcuts,
        notes: backup.notes,
        clipboard_history: backup.clipboard_history,
        fuzzy_search: backup.fuzzy_search,
        usage_stats: None,
    };
    if record.is_empty() {
        return Err(TransferError::NothingToImport);
    }
    Ok(record)
}

pub fn export_notes_csv(notes: &NoteTemplates) -> String {
    let mut out = String::new();
    for (topic, subtopic, note) in notes.iter() {
        out.push_str(&csv_field(topic));
        out.push(',');
        out.push_str(&csv_field(subtopic));
        out.push(',');
        out.push_str(&csv_field(&note.text));
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvImport {
    /// `(key, value)` pairs with normalized keys, in file order.
    pub shortcuts: Vec<(String, String)>,
    /// Non-blank lines that lacked a key or a value.
    pub skipped: usize,
}

impl CsvImport {
    /// Insert every parsed shortcut into `group`.
    pub fn apply(&self, table: &mut ShortcutTable, group: &str) {
        table.add_group(group);
        for (key, value) in &self.shortcuts {
            table.insert(group, key, value);
        }
    }
}

pub fn parse_shortcuts_csv(contents: &str) -> CsvImport {
    let mut import = CsvImport::default();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let key = fields.first().map(|f| f.trim()).unwrap_or_default();
        let value = fields.get(1).map(|f| f.trim()).unwrap_or_default();
        if key.is_empty() || value.is_empty() {
            import.skipped += 1;
            continue;
        }
        import
            .shortcuts
            .push((normalize_trigger_key(key), value.to_string()));
    }
    import
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one CSV line, honoring double-quoted fields with `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn backup_round_trips_through_import() {
        let mut shortcuts = ShortcutTable::new();
        shortcuts.insert("Greetings", "//hi", "Hi there!");
        let mut notes = NoteTemplates::new();
        notes.insert("Support", "Greeting", "Dear {Name}");
        let mut clipboard = ClipboardHistory::new();
        clipboard.push("copied");

        let json = export_backup(&shortcuts, &notes, &clipboard).expect("export");
        let record = import_backup(&json).expect("import");

        assert_eq!(record.shortcuts, Some(shortcuts));
        assert_eq!(record.notes, Some(notes));
        assert_eq!(record.clipboard_history, Some(clipboard));
        assert_eq!(record.usage_stats, None);
    }

    #[test]
    fn malformed_backup_is_rejected() {
        assert!(matches!(
            import_backup("{not json"),
            Err(TransferError::MalformedJson(_))
        ));
        assert!(matches!(
            import_backup(r#"{"unrelated": 1}"#),
            Err(TransferError::NothingToImport)
        ));
    }

    #[test]
    fn notes_csv_quotes_fields_that_need_it() {
        let mut notes = NoteTemplates::new();
        notes.insert("Support", "Greeting", "Hello");
        notes.insert("Support", "Closing", "Thanks, \"friend\"\nBye");

        insta::assert_snapshot!(export_notes_csv(&notes), @r#"
        Support,Greeting,Hello
        Support,Closing,"Thanks, ""friend""
        Bye"
        "#);
    }

    #[test]
    fn shortcuts_csv_skips_incomplete_lines_and_normalizes_keys() {
        let import = parse_shortcuts_csv("hi, Hello there\n//bye,Goodbye\nlonely\n,value\n\n\"q\",\"a, b\"\n");

        assert_eq!(
            import.shortcuts,
            vec![
                ("//hi".to_string(), "Hello there".to_string()),
                ("//bye".to_string(), "Goodbye".to_string()),
                ("//q".to_string(), "a, b".to_string()),
            ]
        );
        assert_eq!(import.skipped, 2);

        let mut table = ShortcutTable::new();
        import.apply(&mut table, DEFAULT_IMPORT_GROUP);
        assert_eq!(table.get("Imported", "//hi"), Some("Hello there"));
    }
}
