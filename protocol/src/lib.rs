//! Shared data model for the text expander.
//!
//! Everything that crosses the key-value store boundary lives here: the shortcut table, note
//! templates, clipboard history, usage statistics, the store record itself, and the JSON/CSV
//! import/export formats.

mod clipboard;
mod notes;
mod seed;
mod shortcuts;
pub mod store;
pub mod transfer;
mod usage;

pub use clipboard::ClipboardHistory;
pub use clipboard::MAX_CLIPBOARD_ENTRIES;
pub use notes::NoteTemplate;
pub use notes::NoteTemplates;
pub use notes::TemplateSegment;
pub use seed::default_notes;
pub use seed::default_shortcuts;
pub use shortcuts::Shortcut;
pub use shortcuts::ShortcutTable;
pub use shortcuts::TRIGGER_MARKER;
pub use shortcuts::normalize_trigger_key;
pub use usage::ActivityEvent;
pub use usage::ActivityKind;
pub use usage::MAX_RECENT_ACTIVITY;
pub use usage::UsageStats;
