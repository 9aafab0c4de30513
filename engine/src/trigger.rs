//! Trigger detection.
//!
//! A live trigger is the nearest `//` before the caret with no whitespace between the marker and
//! the caret. Everything between the marker and the caret is the token.

use expander_protocol::TRIGGER_MARKER;

pub const NOTES_KEYWORD: &str = "notes";
pub const CLIPBOARD_KEYWORD: &str = "clipboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Character offset of the first `/` of the marker.
    pub start: usize,
    pub token: String,
}

impl Trigger {
    /// Character offset just past the token.
    pub fn end(&self) -> usize {
        self.start + TRIGGER_MARKER.chars().count() + self.token.chars().count()
    }

    /// Characters the user typed to produce this trigger, marker included.
    pub fn typed_len(&self) -> usize {
        self.end() - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCommand<'a> {
    Shortcuts(&'a str),
    Notes,
    Clipboard,
}

/// Find the trigger ending at `caret` (a character offset, clamped to the text length).
pub fn detect_trigger(text: &str, caret: usize) -> Option<Trigger> {
    let chars: Vec<char> = text.chars().collect();
    let caret = caret.min(chars.len());

    let mut end = caret;
    loop {
        if end >= 2 && chars[end - 1] == '/' && chars[end - 2] == '/' {
            let start = end - 2;
            return Some(Trigger {
                start,
                token: chars[end..caret].iter().collect(),
            });
        }
        if end == 0 || chars[end - 1].is_whitespace() {
            return None;
        }
        end -= 1;
    }
}

/// Reserved tokens open the pickers; anything else is a shortcut query.
pub fn classify(token: &str) -> TriggerCommand<'_> {
    match token {
        NOTES_KEYWORD => TriggerCommand::Notes,
        CLIPBOARD_KEYWORD => TriggerCommand::Clipboard,
        _ => TriggerCommand::Shortcuts(token),
    }
}
