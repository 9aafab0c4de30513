//! Surface classification and caret context.
//!
//! Editable surfaces come in two shapes: form fields that expose a `value` plus a selection
//! (`PlainValue`), and editable regions whose text lives in a node tree addressed through the
//! document selection (`NodeTree`). Embedded rich-text editors are node trees addressed through
//! their container rather than the element that received the event.

use std::collections::HashMap;

use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;

/// Attribute set on every node the engine creates (menus, pickers, tooltips, measurement spans).
pub const OVERLAY_ATTR: &str = "data-expander-overlay";

/// Id of the embedded editor container whose text is edited through the container itself.
pub const EMBEDDED_EDITOR_ID: &str = "tinymce";

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SurfaceKind {
    PlainValue,
    NodeTree,
    Unsupported,
}

/// Where the caret context text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretAnchor {
    /// The form field value.
    Value,
    /// A text node holding the selection.
    TextNode(NodeId),
    /// The editing root's whole text content (selection sat on an element).
    Root(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretContext {
    pub text: String,
    /// Character offset into `text`.
    pub caret: usize,
    pub kind: SurfaceKind,
    pub anchor: CaretAnchor,
}

/// Whether `node` sits inside an engine-created overlay.
pub fn is_overlay_node(doc: &Document, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if doc.attribute(id, OVERLAY_ATTR).is_some() {
            return true;
        }
        current = doc.parent(id);
    }
    false
}

/// Uncached classification of a single element.
pub fn classify_surface(doc: &Document, node: NodeId) -> SurfaceKind {
    let Some(tag) = doc.tag(node) else {
        return SurfaceKind::Unsupported;
    };
    if is_overlay_node(doc, node) {
        return SurfaceKind::Unsupported;
    }

    match tag {
        "input" => {
            let input_type = doc
                .attribute(node, "type")
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if matches!(input_type.as_str(), "" | "text" | "search") {
                SurfaceKind::PlainValue
            } else {
                SurfaceKind::Unsupported
            }
        }
        "textarea" => SurfaceKind::PlainValue,
        _ if doc
            .attribute(node, "contenteditable")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
            || doc.attribute(node, "role") == Some("textbox")
            || doc.attribute(node, "aria-multiline") == Some("true")
            || editor_container(doc, node).is_some() =>
        {
            SurfaceKind::NodeTree
        }
        _ => SurfaceKind::Unsupported,
    }
}

/// Nearest ancestor-or-self carrying the embedded editor id.
pub fn editor_container(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if doc.attribute(id, "id") == Some(EMBEDDED_EDITOR_ID) {
            return Some(id);
        }
        current = doc.parent(id);
    }
    None
}

/// The node whose text a node-tree surface edits.
pub fn editing_root(doc: &Document, surface: NodeId) -> NodeId {
    editor_container(doc, surface).unwrap_or(surface)
}

/// Per-element classification cache. Entries are dropped when the element is removed.
#[derive(Debug, Default)]
pub struct SurfaceClassifier {
    cache: HashMap<NodeId, SurfaceKind>,
}

impl SurfaceClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&mut self, doc: &Document, node: NodeId) -> SurfaceKind {
        *self
            .cache
            .entry(node)
            .or_insert_with(|| classify_surface(doc, node))
    }

    pub fn forget(&mut self, node: NodeId) {
        self.cache.remove(&node);
    }
}

/// Read the text and caret of `surface`.
///
/// Returns `Ok(None)` when there is nothing to read: unsupported surfaces, or node-tree surfaces
/// whose document selection is elsewhere.
pub fn caret_context(
    doc: &Document,
    surface: NodeId,
    kind: SurfaceKind,
) -> Result<Option<CaretContext>, DomError> {
    match kind {
        SurfaceKind::Unsupported => Ok(None),
        SurfaceKind::PlainValue => {
            let text = doc.value(surface)?.to_string();
            let (start, _end) = doc.selection_range(surface)?;
            Ok(Some(CaretContext {
                text,
                caret: start,
                kind,
                anchor: CaretAnchor::Value,
            }))
        }
        SurfaceKind::NodeTree => {
            let root = editing_root(doc, surface);
            let Some(range) = doc.selection() else {
                return Ok(None);
            };
            let point = range.start;
            if !doc.contains(root, point.node) {
                return Ok(None);
            }
            if doc.is_text(point.node) {
                let text = doc.text(point.node)?.to_string();
                let caret = point.offset.min(text.chars().count());
                return Ok(Some(CaretContext {
                    text,
                    caret,
                    kind,
                    anchor: CaretAnchor::TextNode(point.node),
                }));
            }
            let text = doc.text_content(root);
            let caret = doc
                .text_offset_within(root, point)
                .unwrap_or_else(|| text.chars().count());
            Ok(Some(CaretContext {
                text,
                caret,
                kind,
                anchor: CaretAnchor::Root(root),
            }))
        }
    }
}
