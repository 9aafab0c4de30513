//! In-memory host document.
//!
//! The engine never talks to a browser directly; it drives this arena-backed model of the few DOM
//! capabilities it needs. A browser binding implements the same operations over the real page,
//! while tests, the headless CLI and the terminal playground use this model as is.
//!
//! All text offsets (form-field selections, range boundary offsets inside text nodes) are
//! *character* offsets, never byte offsets. Node ids are never reused, so a stale id is always
//! detected as [`DomError::DetachedNode`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node {0:?} is no longer attached")]
    DetachedNode(NodeId),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0:?} is not a text node")]
    NotAText(NodeId),
    #[error("node {0:?} has no value")]
    NoValue(NodeId),
    #[error("offset {offset} is out of range for node {node:?} (length {len})")]
    OffsetOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("frame {0:?} is not a frame")]
    NotAFrame(NodeId),
    #[error("blocked access to cross-origin frame {0:?}")]
    CrossOrigin(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Monospace font metrics used for text measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub char_width: f32,
    pub line_height: f32,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 18.0,
        }
    }
}

/// A range boundary point: a node plus an offset inside it.
///
/// For text nodes the offset counts characters; for elements it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl SelectionRange {
    pub fn collapsed(point: BoundaryPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Input,
    KeyDown,
    MouseDown,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Added(NodeId),
    /// The removed node and all of its descendants.
    Removed(Vec<NodeId>),
}

#[derive(Debug)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    value: Option<String>,
    selection: (usize, usize),
    rect: Option<Rect>,
    font: Font,
    scroll_top: f32,
    frame: Option<Frame>,
    listeners: Vec<ListenerKind>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    root: NodeId,
    cross_origin: bool,
}

#[derive(Debug)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug)]
struct Interval {
    period: Duration,
    next_due: Duration,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    body: NodeId,
    frame_owners: HashMap<NodeId, NodeId>,
    viewport: Size,
    focused: Option<NodeId>,
    selection: Option<SelectionRange>,
    document_listeners: HashMap<ListenerId, ListenerKind>,
    next_listener_id: u64,
    intervals: HashMap<TimerId, Interval>,
    next_timer_id: u64,
    now: Duration,
    clipboard: Option<String>,
    mutations: Vec<Mutation>,
}

impl Document {
    pub fn new(viewport: Size) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            body: NodeId(0),
            frame_owners: HashMap::new(),
            viewport,
            focused: None,
            selection: None,
            document_listeners: HashMap::new(),
            next_listener_id: 0,
            intervals: HashMap::new(),
            next_timer_id: 0,
            now: Duration::ZERO,
            clipboard: None,
            mutations: Vec::new(),
        };
        doc.body = doc.create_element("body");
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    // ---- tree construction -------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            value: matches!(tag.to_ascii_lowercase().as_str(), "input" | "textarea")
                .then(String::new),
            selection: (0, 0),
            rect: None,
            font: Font::default(),
            scroll_top: 0.0,
            frame: None,
            listeners: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    /// Create an `<iframe>` together with the root of its content document.
    pub fn create_frame(&mut self, cross_origin: bool) -> NodeId {
        let iframe = self.create_element("iframe");
        let root = self.create_element("body");
        if let Some(Node {
            data: NodeData::Element(element),
            ..
        }) = self.nodes[iframe.0].as_mut()
        {
            element.frame = Some(Frame { root, cross_origin });
        }
        self.frame_owners.insert(root, iframe);
        iframe
    }

    /// Root of a frame's content document, if the frame is same-origin.
    pub fn content_root(&self, iframe: NodeId) -> Result<NodeId, DomError> {
        let frame = self.element(iframe)?.frame.ok_or(DomError::NotAFrame(iframe))?;
        if frame.cross_origin {
            return Err(DomError::CrossOrigin(iframe));
        }
        Ok(frame.root)
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            parent: None,
            children: Vec::new(),
            data,
        }));
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.element(parent)?;
        self.node(child)?;
        if let Some(old_parent) = self.node(child)?.parent {
            self.node_mut(old_parent)?.children.retain(|c| *c != child);
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        if self.is_connected(parent) {
            self.mutations.push(Mutation::Added(child));
        }
        Ok(())
    }

    /// Detach `node` from the tree and drop it together with its subtree.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        let was_connected = self.is_connected(node);
        if let Some(parent) = self.node(node)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != node);
        }

        let removed = self.subtree(node);
        for id in &removed {
            if let Some(Node {
                data: NodeData::Element(element),
                ..
            }) = self.nodes[id.0].as_ref()
                && let Some(frame) = element.frame
            {
                self.frame_owners.remove(&frame.root);
                for frame_node in self.subtree(frame.root) {
                    self.nodes[frame_node.0] = None;
                }
            }
        }
        for id in &removed {
            self.nodes[id.0] = None;
        }

        if self.focused.is_some_and(|f| !self.is_alive(f)) {
            self.focused = None;
        }
        if self
            .selection
            .is_some_and(|s| !self.is_alive(s.start.node) || !self.is_alive(s.end.node))
        {
            self.selection = None;
        }
        if was_connected {
            self.mutations.push(Mutation::Removed(removed));
        }
        Ok(())
    }

    pub fn clear_children(&mut self, node: NodeId) -> Result<(), DomError> {
        let children = self.node(node)?.children.clone();
        for child in children {
            self.remove(child)?;
        }
        Ok(())
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(Option::is_some)
    }

    /// Whether `node` is reachable from the document body (through same- or cross-origin frames).
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            let Ok(n) = self.node(current) else {
                return false;
            };
            match n.parent {
                Some(parent) => current = parent,
                None if current == self.body => return true,
                None => match self.frame_owners.get(&current) {
                    Some(iframe) => current = *iframe,
                    None => return false,
                },
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    /// Inclusive ancestry test; does not cross frame boundaries.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `node` and its descendants in pre-order. Frame contents are not included.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if !self.is_alive(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Connected elements carrying `class`, in document order.
    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.subtree(self.body)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    // ---- element data ------------------------------------------------------------------------

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_ok()
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.node(node),
            Ok(Node {
                data: NodeData::Text(_),
                ..
            })
        )
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).ok().map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).ok()?.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(node)?.attributes.remove(name);
        Ok(())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        if self.has_class(node, class) {
            return Ok(());
        }
        let classes = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &classes)
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DomError> {
        let Some(existing) = self.attribute(node, "class") else {
            return Ok(());
        };
        let classes = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &classes)
    }

    pub fn rect(&self, node: NodeId) -> Rect {
        let Ok(element) = self.element(node) else {
            return Rect::default();
        };
        if let Some(rect) = element.rect {
            return rect;
        }
        // Unpositioned elements lay out as a single line of their text.
        let text = self.text_content(node);
        Rect::new(
            0.0,
            0.0,
            UnicodeWidthStr::width(text.as_str()) as f32 * element.font.char_width,
            element.font.line_height,
        )
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) -> Result<(), DomError> {
        self.element_mut(node)?.rect = Some(rect);
        Ok(())
    }

    pub fn font(&self, node: NodeId) -> Font {
        self.element(node).map(|e| e.font).unwrap_or_default()
    }

    pub fn set_font(&mut self, node: NodeId, font: Font) -> Result<(), DomError> {
        self.element_mut(node)?.font = font;
        Ok(())
    }

    pub fn scroll_top(&self, node: NodeId) -> f32 {
        self.element(node).map(|e| e.scroll_top).unwrap_or_default()
    }

    pub fn set_scroll_top(&mut self, node: NodeId, scroll_top: f32) -> Result<(), DomError> {
        self.element_mut(node)?.scroll_top = scroll_top;
        Ok(())
    }

    // ---- form field value + selection --------------------------------------------------------

    pub fn value(&self, node: NodeId) -> Result<&str, DomError> {
        self.element(node)?
            .value
            .as_deref()
            .ok_or(DomError::NoValue(node))
    }

    /// Replace a form field's value. Like the DOM, this moves the caret to the end.
    pub fn set_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(node)?;
        let Some(current) = element.value.as_mut() else {
            return Err(DomError::NoValue(node));
        };
        *current = value.to_string();
        let end = value.chars().count();
        element.selection = (end, end);
        Ok(())
    }

    pub fn selection_range(&self, node: NodeId) -> Result<(usize, usize), DomError> {
        let element = self.element(node)?;
        if element.value.is_none() {
            return Err(DomError::NoValue(node));
        }
        Ok(element.selection)
    }

    /// Set a form field selection; offsets past the end are clamped.
    pub fn set_selection_range(
        &mut self,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<(), DomError> {
        let element = self.element_mut(node)?;
        let Some(value) = element.value.as_ref() else {
            return Err(DomError::NoValue(node));
        };
        let len = value.chars().count();
        let end = end.min(len);
        element.selection = (start.min(end), end);
        Ok(())
    }

    // ---- text ------------------------------------------------------------------------------

    /// Data of a text node.
    pub fn text(&self, node: NodeId) -> Result<&str, DomError> {
        match &self.node(node)?.data {
            NodeData::Text(text) => Ok(text),
            NodeData::Element(_) => Err(DomError::NotAText(node)),
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(data) => {
                *data = text.to_string();
                Ok(())
            }
            NodeData::Element(_) => Err(DomError::NotAText(node)),
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        self.subtree(node)
            .into_iter()
            .filter_map(|id| self.text(id).ok())
            .collect()
    }

    /// Replace every child of `node` with a single text node holding `text`.
    ///
    /// Returns the new text node (`None` when `text` is empty). Any earlier reference to a child
    /// of `node` is invalidated.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<Option<NodeId>, DomError> {
        if self.is_text(node) {
            self.set_text(node, text)?;
            return Ok(Some(node));
        }
        self.clear_children(node)?;
        if text.is_empty() {
            return Ok(None);
        }
        let text_node = self.create_text(text);
        self.append_child(node, text_node)?;
        Ok(Some(text_node))
    }

    /// Convenience for building overlays: an element with a class and optional text.
    pub fn create_element_with_text(&mut self, tag: &str, class: &str, text: &str) -> NodeId {
        let element = self.create_element(tag);
        let _ = self.set_attribute(element, "class", class);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            let _ = self.append_child(element, text_node);
        }
        element
    }

    /// Character offset of `point` within the text content of `root`.
    pub fn text_offset_within(&self, root: NodeId, point: BoundaryPoint) -> Option<usize> {
        if !self.contains(root, point.node) {
            return None;
        }
        let mut offset = 0;
        for id in self.subtree(root) {
            if id == point.node {
                if self.is_text(id) {
                    return Some(offset + point.offset);
                }
                let before: usize = self
                    .children(id)
                    .iter()
                    .take(point.offset)
                    .map(|child| self.text_content(*child).chars().count())
                    .sum();
                return Some(offset + before);
            }
            if let Ok(text) = self.text(id) {
                offset += text.chars().count();
            }
        }
        None
    }

    fn boundary_len(&self, node: NodeId) -> Result<usize, DomError> {
        match &self.node(node)?.data {
            NodeData::Text(text) => Ok(text.chars().count()),
            NodeData::Element(_) => Ok(self.children(node).len()),
        }
    }

    // ---- focus + document selection ----------------------------------------------------------

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn focus(&mut self, node: NodeId) -> Result<(), DomError> {
        self.element(node)?;
        self.focused = Some(node);
        Ok(())
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        self.selection
    }

    /// Install a selection range. Fails when either boundary is detached or out of range.
    pub fn set_selection(&mut self, range: SelectionRange) -> Result<(), DomError> {
        for point in [range.start, range.end] {
            if !self.is_alive(point.node) {
                return Err(DomError::DetachedNode(point.node));
            }
            let len = self.boundary_len(point.node)?;
            if point.offset > len {
                return Err(DomError::OffsetOutOfRange {
                    node: point.node,
                    offset: point.offset,
                    len,
                });
            }
        }
        self.selection = Some(range);
        Ok(())
    }

    /// Text currently selected in the focused form field or within a single text node.
    pub fn selected_text(&self) -> String {
        if let Some(focused) = self.focused
            && let Ok(value) = self.value(focused)
            && let Ok((start, end)) = self.selection_range(focused)
        {
            return value.chars().skip(start).take(end.saturating_sub(start)).collect();
        }

        let Some(range) = self.selection else {
            return String::new();
        };
        if range.start.node != range.end.node {
            return String::new();
        }
        let Ok(text) = self.text(range.start.node) else {
            return String::new();
        };
        text.chars()
            .skip(range.start.offset)
            .take(range.end.offset.saturating_sub(range.start.offset))
            .collect()
    }

    /// Client rect of a collapsed range at `point`.
    pub fn range_rect(&self, point: BoundaryPoint) -> Option<Rect> {
        if !self.is_alive(point.node) {
            return None;
        }
        let (container, preceding) = if self.is_text(point.node) {
            let parent = self.parent(point.node)?;
            let mut preceding = String::new();
            for sibling in self.children(parent) {
                if *sibling == point.node {
                    break;
                }
                preceding.push_str(&self.text_content(*sibling));
            }
            let text = self.text(point.node).ok()?;
            preceding.extend(text.chars().take(point.offset));
            (parent, preceding)
        } else {
            let preceding: String = self
                .children(point.node)
                .iter()
                .take(point.offset)
                .map(|child| self.text_content(*child))
                .collect();
            (point.node, preceding)
        };

        let base = self.rect(container);
        let font = self.font(container);
        Some(Rect::new(
            base.x + UnicodeWidthStr::width(preceding.as_str()) as f32 * font.char_width,
            base.y,
            0.0,
            font.line_height,
        ))
    }

    // ---- listeners ---------------------------------------------------------------------------

    pub fn add_listener(&mut self, node: NodeId, kind: ListenerKind) -> Result<(), DomError> {
        self.element_mut(node)?.listeners.push(kind);
        Ok(())
    }

    pub fn listener_count(&self, node: NodeId, kind: ListenerKind) -> usize {
        self.element(node)
            .map(|e| e.listeners.iter().filter(|k| **k == kind).count())
            .unwrap_or_default()
    }

    pub fn add_document_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.document_listeners.insert(id, kind);
        id
    }

    pub fn remove_document_listener(&mut self, id: ListenerId) -> bool {
        self.document_listeners.remove(&id).is_some()
    }

    pub fn document_listener_count(&self) -> usize {
        self.document_listeners.len()
    }

    // ---- timers ------------------------------------------------------------------------------

    pub fn set_interval(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.intervals.insert(
            id,
            Interval {
                period,
                next_due: self.now + period,
            },
        );
        id
    }

    pub fn clear_interval(&mut self, id: TimerId) -> bool {
        self.intervals.remove(&id).is_some()
    }

    pub fn active_timer_count(&self) -> usize {
        self.intervals.len()
    }

    /// Advance the clock and return every interval firing, in firing order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<TimerId> {
        let target = self.now + elapsed;
        let mut fired = Vec::new();
        loop {
            let next = self
                .intervals
                .iter()
                .filter(|(_, interval)| interval.next_due <= target)
                .min_by_key(|(id, interval)| (interval.next_due, id.0))
                .map(|(id, _)| *id);
            let Some(id) = next else {
                break;
            };
            if let Some(interval) = self.intervals.get_mut(&id) {
                self.now = interval.next_due;
                interval.next_due += interval.period.max(Duration::from_millis(1));
            }
            fired.push(id);
        }
        self.now = target;
        fired
    }

    // ---- misc host capabilities --------------------------------------------------------------

    pub fn write_clipboard(&mut self, text: &str) {
        self.clipboard = Some(text.to_string());
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Native editing: insert `text` at the caret of `node`, replacing any selection.
    ///
    /// For form fields this edits the value; for editable regions it edits the text node that
    /// holds the document selection (creating one when the selection sits on an element).
    pub fn insert_text_at_caret(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        if let Ok(value) = self.value(node) {
            let (start, end) = self.selection_range(node)?;
            let mut chars: Vec<char> = value.chars().collect();
            chars.splice(start..end, text.chars());
            let updated: String = chars.into_iter().collect();
            self.set_value(node, &updated)?;
            let caret = start + text.chars().count();
            self.set_selection_range(node, caret, caret)?;
            self.focus(node)?;
            return Ok(());
        }

        let point = match self.selection {
            Some(range) if self.contains(node, range.start.node) => range.start,
            _ => BoundaryPoint {
                node,
                offset: self.children(node).len(),
            },
        };

        let (text_node, offset) = if self.is_text(point.node) {
            (point.node, point.offset)
        } else {
            let text_node = self.create_text("");
            self.append_child(point.node, text_node)?;
            (text_node, 0)
        };

        let mut chars: Vec<char> = self.text(text_node)?.chars().collect();
        let offset = offset.min(chars.len());
        chars.splice(offset..offset, text.chars());
        let updated: String = chars.into_iter().collect();
        self.set_text(text_node, &updated)?;
        let caret = BoundaryPoint {
            node: text_node,
            offset: offset + text.chars().count(),
        };
        self.set_selection(SelectionRange::collapsed(caret))?;
        self.focus(node)
    }

    // ---- internals ---------------------------------------------------------------------------

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(DomError::DetachedNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(DomError::DetachedNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&Element, DomError> {
        match &self.node(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::new(Size::new(800.0, 600.0))
    }

    #[test]
    fn set_value_moves_caret_to_end() {
        let mut doc = doc();
        let input = doc.create_element("input");
        doc.set_value(input, "héllo").expect("set value");
        assert_eq!(doc.selection_range(input), Ok((5, 5)));
    }

    #[test]
    fn removing_a_node_invalidates_its_subtree() {
        let mut doc = doc();
        let div = doc.create_element("div");
        let text = doc.create_text("hi");
        doc.append_child(div, text).expect("append");
        doc.append_child(doc.body(), div).expect("append");
        doc.take_mutations();

        doc.remove(div).expect("remove");
        assert!(!doc.is_alive(text));
        assert_eq!(doc.take_mutations(), vec![Mutation::Removed(vec![div, text])]);
        assert_eq!(doc.text(text), Err(DomError::DetachedNode(text)));
    }

    #[test]
    fn mutations_are_recorded_only_for_connected_parents() {
        let mut doc = doc();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(div, span).expect("append");
        assert!(doc.take_mutations().is_empty());

        doc.append_child(doc.body(), div).expect("append");
        assert_eq!(doc.take_mutations(), vec![Mutation::Added(div)]);
    }

    #[test]
    fn set_selection_rejects_out_of_range_offsets() {
        let mut doc = doc();
        let text = doc.create_text("abc");
        let err = doc
            .set_selection(SelectionRange::collapsed(BoundaryPoint {
                node: text,
                offset: 4,
            }))
            .expect_err("out of range");
        assert_eq!(
            err,
            DomError::OffsetOutOfRange {
                node: text,
                offset: 4,
                len: 3
            }
        );
    }

    #[test]
    fn cross_origin_frames_refuse_access() {
        let mut doc = doc();
        let same = doc.create_frame(false);
        let cross = doc.create_frame(true);
        assert!(doc.content_root(same).is_ok());
        assert_eq!(doc.content_root(cross), Err(DomError::CrossOrigin(cross)));
    }

    #[test]
    fn text_offset_within_counts_preceding_text_nodes() {
        let mut doc = doc();
        let root = doc.create_element("div");
        let a = doc.create_text("ab");
        let b = doc.create_element("b");
        let c = doc.create_text("cd");
        doc.append_child(root, a).expect("append");
        doc.append_child(root, b).expect("append");
        doc.append_child(b, c).expect("append");

        assert_eq!(
            doc.text_offset_within(root, BoundaryPoint { node: c, offset: 1 }),
            Some(3)
        );
        assert_eq!(
            doc.text_offset_within(root, BoundaryPoint { node: root, offset: 1 }),
            Some(2)
        );
    }

    #[test]
    fn intervals_fire_until_cleared() {
        let mut doc = doc();
        let timer = doc.set_interval(Duration::from_millis(1000));
        assert_eq!(doc.advance(Duration::from_millis(2500)), vec![timer, timer]);
        assert!(doc.clear_interval(timer));
        assert!(doc.advance(Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn insert_text_at_caret_edits_value_and_text_nodes() {
        let mut doc = doc();
        let input = doc.create_element("input");
        doc.insert_text_at_caret(input, "Hello").expect("type");
        doc.set_selection_range(input, 0, 0).expect("caret");
        doc.insert_text_at_caret(input, ">").expect("type");
        assert_eq!(doc.value(input), Ok(">Hello"));
        assert_eq!(doc.selection_range(input), Ok((1, 1)));

        let editable = doc.create_element("div");
        doc.insert_text_at_caret(editable, "ab").expect("type");
        doc.insert_text_at_caret(editable, "c").expect("type");
        assert_eq!(doc.text_content(editable), "abc");
        assert_eq!(doc.focused(), Some(editable));
    }
}
