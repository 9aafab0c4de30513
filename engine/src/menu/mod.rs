//! Overlays shown next to a surface.
//!
//! At most one overlay is live at a time; the [`ActiveMenu`] slot in the expander holds it and
//! every variant owns the DOM nodes, document listeners and timers it created, releasing all of
//! them in `teardown`.

mod clipboard_picker;
mod notes_picker;
mod searchable_select;
mod selection_state;
mod shortcut_menu;

pub use clipboard_picker::ClipboardPicker;
pub use clipboard_picker::EMPTY_CLIPBOARD_TEXT;
pub(crate) use clipboard_picker::CLIPBOARD_ITEM_HEIGHT;
pub use notes_picker::CLIPBOARD_REFRESH_INTERVAL;
pub use notes_picker::NOTES_POPUP_SIZE;
pub use notes_picker::NotesAction;
pub use notes_picker::NotesPicker;
pub use searchable_select::NO_MATCHES_TEXT;
pub use searchable_select::SearchableSelect;
pub use selection_state::SelectionState;
pub use shortcut_menu::BACK_TO_GROUPS_TEXT;
pub use shortcut_menu::MenuRow;
pub use shortcut_menu::MenuView;
pub use shortcut_menu::ShortcutMenu;
pub use shortcut_menu::menu_rows;

use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::ListenerId;
use crate::dom::ListenerKind;
use crate::dom::NodeId;
use crate::dom::Rect;
use crate::dom::TimerId;
use crate::surface::OVERLAY_ATTR;
use crate::trigger::Trigger;

#[derive(Debug, derive_more::IsVariant)]
pub enum ActiveMenu {
    Shortcuts(ShortcutMenu),
    Clipboard(ClipboardPicker),
    Notes(NotesPicker),
}

impl ActiveMenu {
    /// The surface the overlay was opened for.
    pub fn surface(&self) -> NodeId {
        self.overlay().surface
    }

    pub fn root(&self) -> NodeId {
        self.overlay().root
    }

    /// Trigger the overlay was opened for.
    pub fn trigger(&self) -> &Trigger {
        &self.overlay().trigger
    }

    /// Whether `node` belongs to any node this overlay created.
    pub fn contains(&self, doc: &Document, node: NodeId) -> bool {
        self.overlay().contains(doc, node)
    }

    pub fn owns_timer(&self, timer: TimerId) -> bool {
        self.overlay().timers.contains(&timer)
    }

    pub fn teardown(self, doc: &mut Document) {
        let overlay = match self {
            ActiveMenu::Shortcuts(menu) => menu.into_overlay(),
            ActiveMenu::Clipboard(picker) => picker.into_overlay(),
            ActiveMenu::Notes(picker) => picker.into_overlay(),
        };
        overlay.teardown(doc);
    }

    fn overlay(&self) -> &Overlay {
        match self {
            ActiveMenu::Shortcuts(menu) => menu.overlay(),
            ActiveMenu::Clipboard(picker) => picker.overlay(),
            ActiveMenu::Notes(picker) => picker.overlay(),
        }
    }
}

/// DOM nodes, document listeners and timers owned by one overlay.
#[derive(Debug)]
pub(crate) struct Overlay {
    pub(crate) surface: NodeId,
    pub(crate) root: NodeId,
    /// Trigger the overlay was opened for; its span is replaced on commit.
    pub(crate) trigger: Trigger,
    detached_roots: Vec<NodeId>,
    listeners: Vec<ListenerId>,
    timers: Vec<TimerId>,
}

impl Overlay {
    /// Create `<div class=…>` at `rect`, append it to the body and register the outside-click
    /// and Escape listeners.
    pub(crate) fn mount(
        doc: &mut Document,
        surface: NodeId,
        trigger: Trigger,
        class: &str,
        rect: Rect,
    ) -> Result<Self, DomError> {
        let root = new_overlay_node(doc, "div", class)?;
        doc.set_rect(root, rect)?;
        let body = doc.body();
        doc.append_child(body, root)?;

        let listeners = vec![
            doc.add_document_listener(ListenerKind::MouseDown),
            doc.add_document_listener(ListenerKind::KeyDown),
        ];
        Ok(Self {
            surface,
            root,
            trigger,
            detached_roots: Vec::new(),
            listeners,
            timers: Vec::new(),
        })
    }

    /// Track an extra top-level node (e.g. a tooltip) appended to the body.
    pub(crate) fn adopt_root(&mut self, node: NodeId) {
        self.detached_roots.push(node);
    }

    pub(crate) fn adopt_timer(&mut self, timer: TimerId) {
        self.timers.push(timer);
    }

    pub(crate) fn contains(&self, doc: &Document, node: NodeId) -> bool {
        doc.contains(self.root, node)
            || self
                .detached_roots
                .iter()
                .any(|extra| doc.contains(*extra, node))
    }

    pub(crate) fn teardown(self, doc: &mut Document) {
        for timer in self.timers {
            doc.clear_interval(timer);
        }
        for listener in self.listeners {
            doc.remove_document_listener(listener);
        }
        for node in self.detached_roots.into_iter().chain([self.root]) {
            if !doc.is_alive(node) {
                continue;
            }
            if let Err(err) = doc.remove(node) {
                tracing::debug!("failed to remove overlay node: {err}");
            }
        }
    }
}

/// An element tagged as engine-owned so the surface watcher never instruments it.
pub(crate) fn new_overlay_node(
    doc: &mut Document,
    tag: &str,
    class: &str,
) -> Result<NodeId, DomError> {
    let node = doc.create_element(tag);
    doc.set_attribute(node, "class", class)?;
    doc.set_attribute(node, OVERLAY_ATTR, "")?;
    Ok(node)
}

/// Append `<tag class=…>text</tag>` to `parent`.
pub(crate) fn append_text_node(
    doc: &mut Document,
    parent: NodeId,
    tag: &str,
    class: &str,
    text: &str,
) -> Result<NodeId, DomError> {
    let node = doc.create_element_with_text(tag, class, text);
    doc.append_child(parent, node)?;
    Ok(node)
}

pub(crate) fn set_hidden(doc: &mut Document, node: NodeId, hidden: bool) -> Result<(), DomError> {
    if hidden {
        doc.set_attribute(node, "hidden", "")
    } else {
        doc.remove_attribute(node, "hidden")
    }
}

pub(crate) fn set_class(
    doc: &mut Document,
    node: NodeId,
    class: &str,
    on: bool,
) -> Result<(), DomError> {
    if on {
        doc.add_class(node, class)
    } else {
        doc.remove_class(node, class)
    }
}
