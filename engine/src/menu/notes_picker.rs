//! The note template picker opened by `//notes`.
//!
//! A centered dialog with a topic select, a subtopic select, a preview where every placeholder is
//! an input field, and a clipboard side panel kept fresh by a polling interval. Importing fills
//! the placeholders and replaces the trigger with the result.

use std::time::Duration;

use expander_protocol::ClipboardHistory;
use expander_protocol::NoteTemplates;
use expander_protocol::TemplateSegment;

use super::Overlay;
use super::SearchableSelect;
use super::append_text_node;
use super::new_overlay_node;
use super::set_class;
use super::set_hidden;
use crate::caret_geometry::center_in_viewport;
use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::dom::Size;
use crate::dom::TimerId;
use crate::menu::clipboard_picker::EMPTY_CLIPBOARD_TEXT;
use crate::text_formatting::PREVIEW_GRAPHEMES;
use crate::text_formatting::truncate_preview;
use crate::trigger::Trigger;

pub const NOTES_POPUP_SIZE: Size = Size {
    width: 640.0,
    height: 420.0,
};
pub const CLIPBOARD_REFRESH_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesAction {
    Close,
    Import,
    ToggleMinimize,
    CopyToClipboard(String),
    SelectTopic(String),
    SelectSubtopic(String),
    OpenTopicSelect,
    OpenSubtopicSelect,
    CloseDropdowns,
}

#[derive(Debug)]
pub struct NotesPicker {
    overlay: Overlay,
    minimize_button: NodeId,
    close_button: NodeId,
    cancel_button: NodeId,
    import_button: NodeId,
    body: NodeId,
    footer: NodeId,
    topic: SearchableSelect,
    subtopic: SearchableSelect,
    preview: NodeId,
    placeholder_inputs: Vec<(NodeId, String)>,
    clipboard_list: NodeId,
    clipboard_entries: Vec<String>,
    clipboard_nodes: Vec<NodeId>,
    minimized: bool,
    refresh_timer: TimerId,
}

impl NotesPicker {
    pub(crate) fn open(
        doc: &mut Document,
        surface: NodeId,
        trigger: Trigger,
        notes: &NoteTemplates,
        history: &ClipboardHistory,
    ) -> Result<Self, DomError> {
        let rect = center_in_viewport(NOTES_POPUP_SIZE, doc.viewport());
        let mut overlay = Overlay::mount(doc, surface, trigger, "notes-popup", rect)?;
        let root = overlay.root;

        let header = new_overlay_node(doc, "div", "notes-popup-header")?;
        doc.append_child(root, header)?;
        append_text_node(doc, header, "span", "notes-popup-title", "Note Templates")?;
        let minimize_button = append_text_node(doc, header, "button", "minimize-button", "−")?;
        let close_button = append_text_node(doc, header, "button", "close-button", "×")?;

        let body = new_overlay_node(doc, "div", "notes-popup-body")?;
        doc.append_child(root, body)?;
        let main = new_overlay_node(doc, "div", "notes-popup-main")?;
        doc.append_child(body, main)?;

        append_text_node(doc, main, "label", "select-label", "Topic")?;
        let topics: Vec<String> = notes.topics().map(str::to_string).collect();
        let topic = SearchableSelect::mount(doc, main, topics, None)?;

        append_text_node(doc, main, "label", "select-label", "Subtopic")?;
        let subtopics = subtopic_options(notes, topic.selected());
        let subtopic = SearchableSelect::mount(doc, main, subtopics, None)?;

        let preview = new_overlay_node(doc, "div", "template-preview")?;
        doc.append_child(main, preview)?;

        let panel = new_overlay_node(doc, "div", "clipboard-panel")?;
        doc.append_child(body, panel)?;
        append_text_node(doc, panel, "div", "clipboard-panel-title", "Clipboard History")?;
        let clipboard_list = new_overlay_node(doc, "div", "clipboard-panel-items")?;
        doc.append_child(panel, clipboard_list)?;

        let footer = new_overlay_node(doc, "div", "notes-popup-footer")?;
        doc.append_child(root, footer)?;
        let cancel_button = append_text_node(doc, footer, "button", "cancel-button", "Cancel")?;
        let import_button = append_text_node(doc, footer, "button", "import-button", "Import")?;

        let refresh_timer = doc.set_interval(CLIPBOARD_REFRESH_INTERVAL);
        overlay.adopt_timer(refresh_timer);

        let mut picker = Self {
            overlay,
            minimize_button,
            close_button,
            cancel_button,
            import_button,
            body,
            footer,
            topic,
            subtopic,
            preview,
            placeholder_inputs: Vec::new(),
            clipboard_list,
            clipboard_entries: Vec::new(),
            clipboard_nodes: Vec::new(),
            minimized: false,
            refresh_timer,
        };
        picker.render_preview(doc, notes)?;
        picker.render_clipboard(doc, history)?;
        Ok(picker)
    }

    pub fn selected_topic(&self) -> Option<&str> {
        self.topic.selected()
    }

    pub fn selected_subtopic(&self) -> Option<&str> {
        self.subtopic.selected()
    }

    pub fn topic_select(&self) -> &SearchableSelect {
        &self.topic
    }

    pub fn subtopic_select(&self) -> &SearchableSelect {
        &self.subtopic
    }

    /// Placeholder inputs in template order, with their placeholder names.
    pub fn placeholder_inputs(&self) -> &[(NodeId, String)] {
        &self.placeholder_inputs
    }

    pub fn clipboard_nodes(&self) -> &[NodeId] {
        &self.clipboard_nodes
    }

    pub fn import_button(&self) -> NodeId {
        self.import_button
    }

    pub fn cancel_button(&self) -> NodeId {
        self.cancel_button
    }

    pub fn close_button(&self) -> NodeId {
        self.close_button
    }

    pub fn minimize_button(&self) -> NodeId {
        self.minimize_button
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn refresh_timer(&self) -> TimerId {
        self.refresh_timer
    }

    /// What clicking `node` inside the popup means.
    pub(crate) fn action_at(&self, doc: &Document, node: NodeId) -> Option<NotesAction> {
        if !self.overlay.contains(doc, node) {
            return None;
        }
        if doc.contains(self.minimize_button, node) {
            return Some(NotesAction::ToggleMinimize);
        }
        if doc.contains(self.close_button, node) || doc.contains(self.cancel_button, node) {
            return Some(NotesAction::Close);
        }
        if doc.contains(self.import_button, node) {
            return Some(NotesAction::Import);
        }
        if let Some(idx) = self
            .clipboard_nodes
            .iter()
            .position(|item| doc.contains(*item, node))
        {
            return self
                .clipboard_entries
                .get(idx)
                .cloned()
                .map(NotesAction::CopyToClipboard);
        }
        if let Some(topic) = self.topic.option_at(doc, node) {
            return Some(NotesAction::SelectTopic(topic.to_string()));
        }
        if let Some(subtopic) = self.subtopic.option_at(doc, node) {
            return Some(NotesAction::SelectSubtopic(subtopic.to_string()));
        }
        if node == self.topic.input() {
            return Some(NotesAction::OpenTopicSelect);
        }
        if node == self.subtopic.input() {
            return Some(NotesAction::OpenSubtopicSelect);
        }
        Some(NotesAction::CloseDropdowns)
    }

    pub(crate) fn select_topic(
        &mut self,
        doc: &mut Document,
        notes: &NoteTemplates,
        topic: &str,
    ) -> Result<(), DomError> {
        self.topic.select(doc, topic)?;
        let subtopics = subtopic_options(notes, self.topic.selected());
        self.subtopic.set_options(doc, subtopics, None)?;
        self.render_preview(doc, notes)
    }

    pub(crate) fn select_subtopic(
        &mut self,
        doc: &mut Document,
        notes: &NoteTemplates,
        subtopic: &str,
    ) -> Result<(), DomError> {
        self.subtopic.select(doc, subtopic)?;
        self.render_preview(doc, notes)
    }

    pub(crate) fn open_topic_select(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.subtopic.close(doc)?;
        self.topic.open(doc)
    }

    pub(crate) fn open_subtopic_select(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.topic.close(doc)?;
        self.subtopic.open(doc)
    }

    pub(crate) fn close_dropdowns(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.topic.close(doc)?;
        self.subtopic.close(doc)
    }

    /// Route an input event from inside the popup. Returns whether a select consumed it.
    pub(crate) fn handle_input(&mut self, doc: &mut Document, target: NodeId) -> Result<bool, DomError> {
        if target == self.topic.input() {
            self.topic.handle_input(doc)?;
            return Ok(true);
        }
        if target == self.subtopic.input() {
            self.subtopic.handle_input(doc)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Route focus moving onto a select input.
    pub(crate) fn handle_focus(&mut self, doc: &mut Document, target: NodeId) -> Result<(), DomError> {
        if target == self.topic.input() {
            self.open_topic_select(doc)
        } else if target == self.subtopic.input() {
            self.open_subtopic_select(doc)
        } else {
            Ok(())
        }
    }

    pub(crate) fn toggle_minimized(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.minimized = !self.minimized;
        set_class(doc, self.overlay.root, "minimized", self.minimized)?;
        set_hidden(doc, self.body, self.minimized)?;
        set_hidden(doc, self.footer, self.minimized)?;
        doc.set_text_content(self.minimize_button, if self.minimized { "+" } else { "−" })?;
        Ok(())
    }

    /// The selected template with every placeholder filled from its input; empty inputs keep
    /// the literal placeholder.
    pub(crate) fn filled_text(&self, doc: &Document, notes: &NoteTemplates) -> Option<String> {
        let template = notes.get(self.topic.selected()?, self.subtopic.selected()?)?;
        let values: Vec<String> = self
            .placeholder_inputs
            .iter()
            .map(|(input, _)| doc.value(*input).map(str::to_string).unwrap_or_default())
            .collect();
        Some(template.fill(&values))
    }

    /// Redraw the clipboard panel when the history changed since the last draw.
    pub(crate) fn refresh_clipboard(
        &mut self,
        doc: &mut Document,
        history: &ClipboardHistory,
    ) -> Result<(), DomError> {
        if history.iter().eq(self.clipboard_entries.iter().map(String::as_str)) {
            return Ok(());
        }
        self.render_clipboard(doc, history)
    }

    fn render_clipboard(&mut self, doc: &mut Document, history: &ClipboardHistory) -> Result<(), DomError> {
        doc.clear_children(self.clipboard_list)?;
        self.clipboard_entries = history.iter().map(str::to_string).collect();
        self.clipboard_nodes.clear();

        if self.clipboard_entries.is_empty() {
            append_text_node(doc, self.clipboard_list, "div", "clipboard-empty", EMPTY_CLIPBOARD_TEXT)?;
            return Ok(());
        }
        for entry in &self.clipboard_entries {
            let preview = truncate_preview(entry, PREVIEW_GRAPHEMES);
            let node = append_text_node(doc, self.clipboard_list, "div", "clipboard-item", &preview)?;
            doc.set_attribute(node, "title", entry)?;
            self.clipboard_nodes.push(node);
        }
        Ok(())
    }

    fn render_preview(&mut self, doc: &mut Document, notes: &NoteTemplates) -> Result<(), DomError> {
        doc.clear_children(self.preview)?;
        self.placeholder_inputs.clear();

        let template = self
            .topic
            .selected()
            .zip(self.subtopic.selected())
            .and_then(|(topic, subtopic)| notes.get(topic, subtopic));
        let Some(template) = template else {
            append_text_node(doc, self.preview, "div", "template-empty", "No template selected")?;
            return Ok(());
        };

        for segment in template.segments() {
            match segment {
                TemplateSegment::Literal(text) => {
                    append_text_node(doc, self.preview, "span", "template-text", &text)?;
                }
                TemplateSegment::Placeholder(name) => {
                    let input = new_overlay_node(doc, "input", "placeholder-input")?;
                    doc.set_attribute(input, "type", "text")?;
                    doc.set_attribute(input, "placeholder", &name)?;
                    doc.set_attribute(input, "data-placeholder", &name)?;
                    doc.append_child(self.preview, input)?;
                    self.placeholder_inputs.push((input, name));
                }
            }
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

fn subtopic_options(notes: &NoteTemplates, topic: Option<&str>) -> Vec<String> {
    topic
        .map(|topic| notes.subtopics(topic).into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}
