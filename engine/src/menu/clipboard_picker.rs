use expander_protocol::ClipboardHistory;

use super::Overlay;
use super::SelectionState;
use super::append_text_node;
use super::set_class;
use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::dom::Rect;
use crate::text_formatting::PREVIEW_GRAPHEMES;
use crate::text_formatting::truncate_preview;
use crate::trigger::Trigger;

pub const EMPTY_CLIPBOARD_TEXT: &str = "No clipboard history";
pub(crate) const CLIPBOARD_ITEM_HEIGHT: f32 = 40.0;

/// Recent copies listed next to the caret; choosing one inserts it over the trigger.
#[derive(Debug)]
pub struct ClipboardPicker {
    overlay: Overlay,
    entries: Vec<String>,
    item_nodes: Vec<NodeId>,
    state: SelectionState,
}

impl ClipboardPicker {
    pub(crate) fn open(
        doc: &mut Document,
        surface: NodeId,
        trigger: Trigger,
        history: &ClipboardHistory,
        rect: Rect,
    ) -> Result<Self, DomError> {
        let overlay = Overlay::mount(doc, surface, trigger, "clipboard-menu", rect)?;
        let root = overlay.root;
        let entries: Vec<String> = history.iter().map(str::to_string).collect();

        let mut item_nodes = Vec::with_capacity(entries.len());
        if entries.is_empty() {
            append_text_node(doc, root, "div", "clipboard-empty", EMPTY_CLIPBOARD_TEXT)?;
        }
        for entry in &entries {
            let preview = truncate_preview(entry, PREVIEW_GRAPHEMES);
            let node = append_text_node(doc, root, "div", "clipboard-item", &preview)?;
            doc.set_attribute(node, "title", entry)?;
            item_nodes.push(node);
        }

        let mut picker = Self {
            overlay,
            entries,
            item_nodes,
            state: SelectionState::new(),
        };
        picker.state.reset(picker.entries.len());
        picker.apply_highlight(doc)?;
        Ok(picker)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn item_nodes(&self) -> &[NodeId] {
        &self.item_nodes
    }

    /// Full entry whose row contains `node`.
    pub(crate) fn entry_at(&self, doc: &Document, node: NodeId) -> Option<&str> {
        let idx = self
            .item_nodes
            .iter()
            .position(|item| doc.contains(*item, node))?;
        self.entries.get(idx).map(String::as_str)
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.entries
            .get(self.state.selected_idx?)
            .map(String::as_str)
    }

    pub(crate) fn move_up(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.state.move_up_wrap(self.entries.len());
        self.apply_highlight(doc)
    }

    pub(crate) fn move_down(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.state.move_down_wrap(self.entries.len());
        self.apply_highlight(doc)
    }

    fn apply_highlight(&self, doc: &mut Document) -> Result<(), DomError> {
        for (idx, node) in self.item_nodes.iter().enumerate() {
            set_class(doc, *node, "active", self.state.selected_idx == Some(idx))?;
        }
        Ok(())
    }

    pub(crate) fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub(crate) fn into_overlay(self) -> Overlay {
        self.overlay
    }
}
