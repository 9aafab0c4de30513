//! Management commands: everything the options page of the expander offers, over the same store.

use std::fmt::Write as _;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use clap::ValueEnum;
use expander_engine::Store;
use expander_engine::text_formatting::truncate_preview;
use expander_protocol::UsageStats;
use expander_protocol::normalize_trigger_key;
use expander_protocol::transfer::DEFAULT_IMPORT_GROUP;
use expander_protocol::transfer::export_backup;
use expander_protocol::transfer::export_notes_csv;
use expander_protocol::transfer::import_backup;
use expander_protocol::transfer::parse_shortcuts_csv;
use itertools::Itertools;

use crate::atomic_write::persist_document;

const LIST_PREVIEW_GRAPHEMES: usize = 60;

#[derive(Subcommand, Debug)]
pub enum ShortcutsCommand {
    /// List every group and its shortcuts.
    List {
        /// Keep groups whose name matches and shortcuts whose key or value matches.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Add or replace a shortcut. The key gets a leading `//` when it has none.
    Add {
        group: String,
        key: String,
        value: String,
    },
    Remove {
        group: String,
        key: String,
    },
    AddGroup {
        name: String,
    },
    /// Remove a group and every shortcut in it.
    RemoveGroup {
        name: String,
    },
    /// Import `key,value` lines from a CSV file.
    Import {
        csv: PathBuf,
        #[arg(long, default_value = DEFAULT_IMPORT_GROUP)]
        group: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotesCommand {
    /// List templates with their fill-in fields.
    List {
        /// Keep templates whose topic, subtopic or text matches.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Add or replace a template. `{Name}` spans become fill-in fields.
    Add {
        topic: String,
        subtopic: String,
        text: String,
    },
    Remove {
        topic: String,
        subtopic: String,
    },
    /// Write every template as `topic,subtopic,text` lines.
    Export {
        csv: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ClipboardCommand {
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Record `text` as if it had just been copied.
    Push {
        text: String,
    },
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

pub fn run_shortcuts(store: &mut Store, command: ShortcutsCommand) -> anyhow::Result<String> {
    match command {
        ShortcutsCommand::List { filter } => Ok(list_shortcuts(store, filter.as_deref())),
        ShortcutsCommand::Add { group, key, value } => {
            let key = normalize_trigger_key(&key);
            let previous = store.edit_shortcuts(|table| table.insert(&group, &key, &value))?;
            Ok(match previous {
                Some(_) => format!("Updated {key} in {group}\n"),
                None => format!("Added {key} to {group}\n"),
            })
        }
        ShortcutsCommand::Remove { group, key } => {
            let key = normalize_trigger_key(&key);
            if store.shortcuts().get(&group, &key).is_none() {
                anyhow::bail!("no shortcut {key} in group {group:?}");
            }
            store.edit_shortcuts(|table| table.remove(&group, &key))?;
            Ok(format!("Removed {key} from {group}\n"))
        }
        ShortcutsCommand::AddGroup { name } => {
            if store.shortcuts().contains_group(&name) {
                anyhow::bail!("group {name:?} already exists");
            }
            store.edit_shortcuts(|table| table.add_group(&name))?;
            Ok(format!("Added group {name}\n"))
        }
        ShortcutsCommand::RemoveGroup { name } => {
            if !store.shortcuts().contains_group(&name) {
                anyhow::bail!("no group {name:?}");
            }
            store.edit_shortcuts(|table| table.remove_group(&name))?;
            Ok(format!("Removed group {name}\n"))
        }
        ShortcutsCommand::Import { csv, group } => {
            let contents = read_input(&csv)?;
            let import = parse_shortcuts_csv(&contents);
            store.edit_shortcuts(|table| import.apply(table, &group))?;
            Ok(format!(
                "Imported {} shortcuts into {group} (skipped {} lines)\n",
                import.shortcuts.len(),
                import.skipped
            ))
        }
    }
}

/// Filters follow the fuzzy-search preference, like the trigger menu does.
fn list_shortcuts(store: &Store, filter: Option<&str>) -> String {
    let table = store.shortcuts();
    if table.group_names().next().is_none() {
        return "No shortcuts.\n".to_string();
    }
    let mode = store.match_mode();
    let mut out = String::new();
    for group in table.group_names() {
        let mut shortcuts = table.shortcuts_in(group);
        if let Some(query) = filter
            && !mode.matches(query, group)
        {
            shortcuts.retain(|shortcut| {
                mode.matches(query, &shortcut.key) || mode.matches(query, &shortcut.value)
            });
            if shortcuts.is_empty() {
                continue;
            }
        }
        let _ = writeln!(out, "{group} ({})", shortcuts.len());
        for shortcut in shortcuts {
            let _ = writeln!(
                out,
                "  {}  {}",
                shortcut.key,
                truncate_preview(&shortcut.value, LIST_PREVIEW_GRAPHEMES)
            );
        }
    }
    out
}

pub fn run_notes(store: &mut Store, command: NotesCommand) -> anyhow::Result<String> {
    match command {
        NotesCommand::List { filter } => Ok(list_notes(store, filter.as_deref())),
        NotesCommand::Add {
            topic,
            subtopic,
            text,
        } => {
            let previous = store.edit_notes(|notes| notes.insert(&topic, &subtopic, &text))?;
            Ok(match previous {
                Some(_) => format!("Updated {topic} / {subtopic}\n"),
                None => format!("Added {topic} / {subtopic}\n"),
            })
        }
        NotesCommand::Remove { topic, subtopic } => {
            if store.notes().get(&topic, &subtopic).is_none() {
                anyhow::bail!("no template {topic:?} / {subtopic:?}");
            }
            store.edit_notes(|notes| notes.remove(&topic, &subtopic))?;
            Ok(format!("Removed {topic} / {subtopic}\n"))
        }
        NotesCommand::Export { csv } => {
            persist_document(&csv, &export_notes_csv(store.notes()))?;
            Ok(format!("Exported notes to {}\n", csv.display()))
        }
    }
}

fn list_notes(store: &Store, filter: Option<&str>) -> String {
    let notes = store.notes();
    if notes.is_empty() {
        return "No note templates.\n".to_string();
    }
    let mode = store.match_mode();
    let mut out = String::new();
    for topic in notes.topics() {
        let topic_matches = filter.is_none_or(|query| mode.matches(query, topic));
        let templates: Vec<_> = notes
            .subtopics(topic)
            .into_iter()
            .filter_map(|subtopic| Some((subtopic, notes.get(topic, subtopic)?)))
            .filter(|(subtopic, template)| {
                topic_matches
                    || filter.is_some_and(|query| {
                        mode.matches(query, subtopic) || mode.matches(query, &template.text)
                    })
            })
            .collect();
        if templates.is_empty() && filter.is_some() {
            continue;
        }
        let _ = writeln!(out, "{topic}");
        for (subtopic, template) in templates {
            let fields = template.placeholders().into_iter().unique().join(", ");
            if fields.is_empty() {
                let _ = writeln!(out, "  {subtopic}");
            } else {
                let _ = writeln!(out, "  {subtopic} [{fields}]");
            }
        }
    }
    out
}

pub fn run_clipboard(store: &mut Store, command: ClipboardCommand) -> anyhow::Result<String> {
    match command {
        ClipboardCommand::List { filter } => {
            let history = store.clipboard_history();
            if history.is_empty() {
                return Ok("No clipboard history.\n".to_string());
            }
            let mode = store.match_mode();
            Ok(history
                .iter()
                .enumerate()
                .filter(|(_, entry)| {
                    filter
                        .as_deref()
                        .is_none_or(|query| mode.matches(query, entry))
                })
                .map(|(idx, entry)| {
                    format!(
                        "{}. {}\n",
                        idx + 1,
                        truncate_preview(entry, LIST_PREVIEW_GRAPHEMES)
                    )
                })
                .collect())
        }
        ClipboardCommand::Push { text } => {
            if store.record_copy(&text)? {
                Ok("Added to clipboard history\n".to_string())
            } else {
                Ok("Clipboard history unchanged\n".to_string())
            }
        }
        ClipboardCommand::Clear => {
            store.clear_clipboard_history()?;
            Ok("Cleared clipboard history\n".to_string())
        }
    }
}

pub fn set_fuzzy(store: &mut Store, toggle: Toggle) -> anyhow::Result<String> {
    let enabled = toggle == Toggle::On;
    store.set_fuzzy_search(enabled)?;
    Ok(if enabled {
        "Fuzzy search enabled\n".to_string()
    } else {
        "Fuzzy search disabled\n".to_string()
    })
}

pub fn render_stats(stats: &UsageStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Shortcuts used: {}", stats.shortcuts_used);
    let _ = writeln!(out, "Characters saved: {}", stats.characters_saved);
    let last_login = stats.last_login.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    let _ = writeln!(out, "Last login: {last_login}");
    if stats.recent_activity.is_empty() {
        return out;
    }
    out.push_str("Recent activity:\n");
    for event in &stats.recent_activity {
        let kind = event.kind.to_string();
        let _ = writeln!(
            out,
            "  {}  {kind:<9}  {}",
            event.at.format("%Y-%m-%d %H:%M"),
            event.label
        );
    }
    out
}

pub fn export_to(store: &Store, path: &Path) -> anyhow::Result<String> {
    let backup = export_backup(store.shortcuts(), store.notes(), store.clipboard_history())?;
    persist_document(path, &backup)?;
    Ok(format!("Exported backup to {}\n", path.display()))
}

/// Restore a backup. A malformed file leaves the store untouched.
pub fn import_from(store: &mut Store, path: &Path) -> anyhow::Result<String> {
    let contents = read_input(path)?;
    let record = import_backup(&contents).with_context(|| format!("import {}", path.display()))?;
    let keys = [
        record.shortcuts.as_ref().map(|_| "shortcuts"),
        record.notes.as_ref().map(|_| "notes"),
        record.clipboard_history.as_ref().map(|_| "clipboard history"),
        record.fuzzy_search.map(|_| "fuzzy search"),
    ]
    .into_iter()
    .flatten()
    .join(", ");
    store.import(record)?;
    Ok(format!("Imported {keys}\n"))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use expander_protocol::ActivityKind;
    use expander_protocol::store::MemoryStore;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn empty_store() -> Store {
        Store::load(Box::new(MemoryStore::new()))
    }

    #[test]
    fn add_list_and_remove_shortcuts() {
        let mut store = empty_store();
        run_shortcuts(
            &mut store,
            ShortcutsCommand::Add {
                group: "Greetings".to_string(),
                key: "hi".to_string(),
                value: "Hi there!".to_string(),
            },
        )
        .expect("add");
        run_shortcuts(
            &mut store,
            ShortcutsCommand::AddGroup {
                name: "Empty".to_string(),
            },
        )
        .expect("add group");

        let listing = run_shortcuts(&mut store, ShortcutsCommand::List { filter: None }).expect("list");
        assert_snapshot!(listing, @r"
        Greetings (1)
          //hi  Hi there!
        Empty (0)
        ");

        let err = run_shortcuts(
            &mut store,
            ShortcutsCommand::Remove {
                group: "Greetings".to_string(),
                key: "//bye".to_string(),
            },
        )
        .expect_err("missing shortcut");
        assert_eq!(err.to_string(), "no shortcut //bye in group \"Greetings\"");

        run_shortcuts(
            &mut store,
            ShortcutsCommand::Remove {
                group: "Greetings".to_string(),
                key: "hi".to_string(),
            },
        )
        .expect("remove");
        assert!(store.shortcuts().is_empty());
    }

    #[test]
    fn csv_import_lands_in_named_group() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv = dir.path().join("shortcuts.csv");
        std::fs::write(&csv, "ty,Thank you!\nbroken\n//np , No problem \n").expect("write csv");

        let mut store = empty_store();
        let out = run_shortcuts(
            &mut store,
            ShortcutsCommand::Import {
                csv,
                group: "Imported".to_string(),
            },
        )
        .expect("import");
        assert_eq!(out, "Imported 2 shortcuts into Imported (skipped 1 lines)\n");
        assert_eq!(store.shortcuts().get("Imported", "//ty"), Some("Thank you!"));
        assert_eq!(store.shortcuts().get("Imported", "//np"), Some("No problem"));
    }

    #[test]
    fn notes_listing_shows_fill_in_fields() {
        let mut store = empty_store();
        run_notes(
            &mut store,
            NotesCommand::Add {
                topic: "Billing".to_string(),
                subtopic: "Refund".to_string(),
                text: "Refund of {Amount} to {Name}, {Name}.".to_string(),
            },
        )
        .expect("add");

        let listing = run_notes(&mut store, NotesCommand::List { filter: None }).expect("list");
        assert_snapshot!(listing, @r"
        Billing
          Refund [Amount, Name]
        ");
    }

    #[test]
    fn list_filters_follow_the_fuzzy_preference() {
        let mut store = empty_store();
        store
            .edit_shortcuts(|table| {
                table.insert("Greetings", "//hi", "Hi there!");
                table.insert("Greetings", "//welcome", "Welcome back!");
                table.insert("Closing", "//bye", "Goodbye!");
            })
            .expect("shortcuts");

        let listing = run_shortcuts(
            &mut store,
            ShortcutsCommand::List {
                filter: Some("BACK".to_string()),
            },
        )
        .expect("list");
        assert_snapshot!(listing, @r"
        Greetings (1)
          //welcome  Welcome back!
        ");

        // A matching group name keeps the whole group.
        let listing = run_shortcuts(
            &mut store,
            ShortcutsCommand::List {
                filter: Some("clos".to_string()),
            },
        )
        .expect("list");
        assert_snapshot!(listing, @r"
        Closing (1)
          //bye  Goodbye!
        ");

        let filter = Some("gdb".to_string());
        let substring = run_shortcuts(&mut store, ShortcutsCommand::List { filter: filter.clone() })
            .expect("list");
        assert_eq!(substring, "");
        set_fuzzy(&mut store, Toggle::On).expect("fuzzy");
        let fuzzy = run_shortcuts(&mut store, ShortcutsCommand::List { filter }).expect("list");
        assert_snapshot!(fuzzy, @r"
        Closing (1)
          //bye  Goodbye!
        ");
    }

    #[test]
    fn notes_and_clipboard_lists_filter_entries() {
        let mut store = empty_store();
        store
            .edit_notes(|notes| {
                notes.insert("Billing", "Refund", "Refund of {Amount} issued.");
                notes.insert("Billing", "Invoice", "Invoice attached.");
                notes.insert("Shipping", "Delay", "Your order is delayed.");
            })
            .expect("notes");
        store.record_copy("order #1234").expect("copy");
        store.record_copy("tracking ZX9").expect("copy");

        let notes = run_notes(
            &mut store,
            NotesCommand::List {
                filter: Some("order".to_string()),
            },
        )
        .expect("list");
        assert_snapshot!(notes, @r"
        Shipping
          Delay
        ");

        let history = run_clipboard(
            &mut store,
            ClipboardCommand::List {
                filter: Some("ORDER".to_string()),
            },
        )
        .expect("list");
        assert_eq!(history, "2. order #1234\n");
    }

    #[test]
    fn malformed_backup_leaves_store_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("backup.json");
        std::fs::write(&path, "{ nope").expect("write");

        let mut store = empty_store();
        store.record_copy("keep").expect("copy");
        assert!(import_from(&mut store, &path).is_err());
        assert_eq!(store.clipboard_history().get(0), Some("keep"));
    }

    #[test]
    fn backup_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("backup.json");

        let mut source = empty_store();
        source.seed_defaults_if_empty().expect("seed");
        export_to(&source, &path).expect("export");

        let mut target = empty_store();
        let out = import_from(&mut target, &path).expect("import");
        assert_eq!(out, "Imported shortcuts, notes, clipboard history\n");
        assert_eq!(target.shortcuts(), source.shortcuts());
        assert_eq!(target.notes(), source.notes());
    }

    #[test]
    fn stats_render_recent_activity() {
        let at = Utc
            .with_ymd_and_hms(2026, 10, 15, 9, 30, 0)
            .single()
            .expect("timestamp");
        let mut stats = UsageStats::default();
        stats.record_login(at);
        stats.record_expansion(ActivityKind::Shortcut, "//hi", 4, 9, at);
        stats.record_expansion(ActivityKind::Clipboard, "order #1234", 11, 11, at);

        assert_snapshot!(render_stats(&stats), @r"
        Shortcuts used: 2
        Characters saved: 5
        Last login: 2026-10-15 09:30 UTC
        Recent activity:
          2026-10-15 09:30  clipboard  order #1234
          2026-10-15 09:30  shortcut   //hi
        ");
    }
}
