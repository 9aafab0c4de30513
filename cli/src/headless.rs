//! `text-expander expand`: run the engine once against a single-surface document.

use std::fmt::Write as _;

use expander_engine::ActiveMenu;
use expander_engine::Document;
use expander_engine::Expander;
use expander_engine::HostEvent;
use expander_engine::Key;
use expander_engine::NodeId;
use expander_engine::dom::BoundaryPoint;
use expander_engine::dom::SelectionRange;
use expander_engine::dom::Size;
use expander_engine::menu::BACK_TO_GROUPS_TEXT;
use expander_engine::menu::EMPTY_CLIPBOARD_TEXT;
use expander_engine::menu::MenuRow;
use expander_engine::text_formatting::PREVIEW_GRAPHEMES;
use expander_engine::text_formatting::truncate_preview;

const VIEWPORT: Size = Size {
    width: 1280.0,
    height: 800.0,
};

#[derive(Debug, Clone, Default)]
pub struct ExpandRequest {
    pub text: String,
    /// Character offset of the caret; the end of `text` when absent.
    pub caret: Option<usize>,
    /// Highlight the row at this index and press Enter.
    pub pick: Option<usize>,
    pub contenteditable: bool,
}

/// A document holding one editable surface.
pub struct SingleSurface {
    pub doc: Document,
    pub surface: NodeId,
    contenteditable: bool,
}

impl SingleSurface {
    pub fn new(contenteditable: bool) -> anyhow::Result<Self> {
        let mut doc = Document::new(VIEWPORT);
        let surface = if contenteditable {
            let div = doc.create_element("div");
            doc.set_attribute(div, "contenteditable", "true")?;
            div
        } else {
            doc.create_element("textarea")
        };
        let body = doc.body();
        doc.append_child(body, surface)?;
        Ok(Self {
            doc,
            surface,
            contenteditable,
        })
    }

    pub fn text(&self) -> String {
        if self.contenteditable {
            self.doc.text_content(self.surface)
        } else {
            self.doc
                .value(self.surface)
                .map(str::to_string)
                .unwrap_or_default()
        }
    }

    pub fn caret(&self) -> usize {
        if self.contenteditable {
            self.doc
                .selection()
                .and_then(|range| self.doc.text_offset_within(self.surface, range.start))
                .unwrap_or_default()
        } else {
            self.doc
                .selection_range(self.surface)
                .map(|(start, _)| start)
                .unwrap_or_default()
        }
    }

    pub fn set_caret(&mut self, caret: usize) -> anyhow::Result<()> {
        if !self.contenteditable {
            self.doc.set_selection_range(self.surface, caret, caret)?;
            return Ok(());
        }
        let Some(node) = self.doc.first_child(self.surface) else {
            return Ok(());
        };
        self.doc
            .set_selection(SelectionRange::collapsed(BoundaryPoint {
                node,
                offset: caret,
            }))?;
        Ok(())
    }

    /// Type `text` at the caret and deliver the input event.
    pub fn type_text(&mut self, expander: &mut Expander, text: &str) -> anyhow::Result<()> {
        self.doc.focus(self.surface)?;
        self.doc.insert_text_at_caret(self.surface, text)?;
        expander.dispatch(
            &mut self.doc,
            HostEvent::Input {
                target: self.surface,
            },
        );
        Ok(())
    }

    pub fn press(&mut self, expander: &mut Expander, key: Key) -> bool {
        expander
            .dispatch(
                &mut self.doc,
                HostEvent::KeyDown {
                    target: self.surface,
                    key,
                },
            )
            .prevent_default
    }
}

pub fn run_expand(mut expander: Expander, request: &ExpandRequest) -> anyhow::Result<String> {
    let mut page = SingleSurface::new(request.contenteditable)?;
    expander.attach(&mut page.doc);

    page.doc.focus(page.surface)?;
    page.doc.insert_text_at_caret(page.surface, &request.text)?;
    if let Some(caret) = request.caret {
        page.set_caret(caret.min(request.text.chars().count()))?;
    }
    expander.dispatch(
        &mut page.doc,
        HostEvent::Input {
            target: page.surface,
        },
    );

    let mut out = describe_menu(expander.active_menu());
    let Some(pick) = request.pick else {
        return Ok(out);
    };
    if expander.active_menu().is_none() {
        anyhow::bail!("nothing to pick: no menu is open");
    }
    for _ in 0..pick {
        page.press(&mut expander, Key::ArrowDown);
    }
    page.press(&mut expander, Key::Enter);

    if expander.active_menu().is_some() {
        out.push_str("after pick:\n");
        out.push_str(&describe_menu(expander.active_menu()));
    }
    let _ = writeln!(out, "text: {:?}", page.text());
    let _ = writeln!(out, "caret: {}", page.caret());
    Ok(out)
}

/// One line per selectable row, the highlighted one marked with `>`.
pub fn describe_menu(menu: Option<&ActiveMenu>) -> String {
    let mut out = String::new();
    match menu {
        None => out.push_str("no menu\n"),
        Some(ActiveMenu::Shortcuts(menu)) => {
            for (idx, row) in menu.rows().iter().enumerate() {
                let marker = if menu.selected_idx() == Some(idx) { '>' } else { ' ' };
                let _ = writeln!(out, "{marker} {idx}: {}", describe_row(row));
            }
        }
        Some(ActiveMenu::Clipboard(picker)) => {
            if picker.entries().is_empty() {
                let _ = writeln!(out, "  {EMPTY_CLIPBOARD_TEXT}");
            }
            let highlighted = picker.highlighted();
            for (idx, entry) in picker.entries().iter().enumerate() {
                let marker = if highlighted == Some(entry.as_str()) { '>' } else { ' ' };
                let _ = writeln!(
                    out,
                    "{marker} {idx}: {}",
                    truncate_preview(entry, PREVIEW_GRAPHEMES)
                );
            }
        }
        Some(ActiveMenu::Notes(picker)) => {
            let _ = writeln!(
                out,
                "notes: {} / {}",
                picker.selected_topic().unwrap_or("-"),
                picker.selected_subtopic().unwrap_or("-")
            );
            for (_, name) in picker.placeholder_inputs() {
                let _ = writeln!(out, "  field: {name}");
            }
        }
    }
    out
}

fn describe_row(row: &MenuRow) -> String {
    match row {
        MenuRow::Group(group) => format!("[{group}]"),
        MenuRow::Back => BACK_TO_GROUPS_TEXT.to_string(),
        MenuRow::Shortcut(shortcut) => format!(
            "{} = {}",
            shortcut.key,
            truncate_preview(&shortcut.value, PREVIEW_GRAPHEMES)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expander_engine::ExpanderConfig;
    use expander_engine::Store;
    use expander_protocol::ShortcutTable;
    use expander_protocol::store::MemoryStore;
    use expander_protocol::store::StoreRecord;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn expander() -> Expander {
        let mut shortcuts = ShortcutTable::new();
        shortcuts.insert("Greetings", "//hi", "Hi there!");
        shortcuts.insert("Greetings", "//hello", "Hello, friend!");
        let store = Store::load(Box::new(MemoryStore::with_record(StoreRecord {
            shortcuts: Some(shortcuts),
            ..Default::default()
        })));
        Expander::new(store, ExpanderConfig::default())
    }

    #[test]
    fn lists_rows_without_pick() {
        let out = run_expand(
            expander(),
            &ExpandRequest {
                text: "say //h".to_string(),
                ..Default::default()
            },
        )
        .expect("expand");
        assert_snapshot!(out, @r"
        > 0: //hi = Hi there!
          1: //hello = Hello, friend!
        ");
    }

    #[test]
    fn pick_splices_the_chosen_row() {
        let out = run_expand(
            expander(),
            &ExpandRequest {
                text: "say //h".to_string(),
                pick: Some(1),
                ..Default::default()
            },
        )
        .expect("expand");
        assert!(out.ends_with("text: \"say Hello, friend! \"\ncaret: 19\n"));
    }

    #[test]
    fn caret_inside_text_uses_trigger_before_it() {
        let out = run_expand(
            expander(),
            &ExpandRequest {
                text: "//hi tail".to_string(),
                caret: Some(4),
                pick: Some(0),
                contenteditable: true,
            },
        )
        .expect("expand");
        assert!(out.contains("text: \"Hi there!  tail\""));
    }

    #[test]
    fn pick_without_menu_is_an_error() {
        let err = run_expand(
            expander(),
            &ExpandRequest {
                text: "plain".to_string(),
                pick: Some(0),
                ..Default::default()
            },
        )
        .expect_err("no menu");
        assert_eq!(err.to_string(), "nothing to pick: no menu is open");
    }
}
