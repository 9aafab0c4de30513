//! The shortcut completion menu.
//!
//! The menu is a small state machine: `Open(filter)` lists matches for the current token (or
//! every group when the token is empty), `GroupView(group)` lists one group behind a back row.
//! The menu node is created once and reused; only the content children are rebuilt when the
//! view changes.

use expander_protocol::Shortcut;
use expander_protocol::ShortcutTable;

use super::Overlay;
use super::SelectionState;
use super::append_text_node;
use super::new_overlay_node;
use super::set_class;
use super::set_hidden;
use crate::caret_geometry::place_tooltip;
use crate::dom::DomError;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::dom::Rect;
use crate::dom::Size;
use crate::resolver::MatchMode;
use crate::resolver::resolve;
use crate::trigger::Trigger;

pub const BACK_TO_GROUPS_TEXT: &str = "← Back to Groups";

const ROW_HEIGHT: f32 = 32.0;
const CONTENT_PADDING: f32 = 8.0;
const TOOLTIP_WIDTH: f32 = 240.0;
const TOOLTIP_CHARS_PER_LINE: usize = 30;
const TOOLTIP_LINE_HEIGHT: f32 = 18.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuView {
    Open { filter: String },
    GroupView { group: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuRow {
    Group(String),
    Back,
    Shortcut(Shortcut),
}

/// Selectable rows for `view`, in display order.
pub fn menu_rows(table: &ShortcutTable, view: &MenuView, mode: MatchMode) -> Vec<MenuRow> {
    match view {
        MenuView::Open { filter } if filter.is_empty() => table
            .group_names()
            .map(|group| MenuRow::Group(group.to_string()))
            .collect(),
        MenuView::Open { filter } => {
            let resolution = resolve(table, filter, mode);
            resolution
                .groups
                .into_iter()
                .map(MenuRow::Group)
                .chain(resolution.shortcuts.into_iter().map(MenuRow::Shortcut))
                .collect()
        }
        MenuView::GroupView { group } => std::iter::once(MenuRow::Back)
            .chain(table.shortcuts_in(group).into_iter().map(MenuRow::Shortcut))
            .collect(),
    }
}

#[derive(Debug)]
pub struct ShortcutMenu {
    overlay: Overlay,
    content: NodeId,
    tooltip: NodeId,
    view: MenuView,
    rows: Vec<MenuRow>,
    row_nodes: Vec<NodeId>,
    state: SelectionState,
}

impl ShortcutMenu {
    pub(crate) fn open(
        doc: &mut Document,
        surface: NodeId,
        trigger: Trigger,
        rect: Rect,
    ) -> Result<Self, DomError> {
        let mut overlay = Overlay::mount(doc, surface, trigger, "menu", rect)?;
        let content = new_overlay_node(doc, "div", "menu-content")?;
        doc.append_child(overlay.root, content)?;

        let tooltip = new_overlay_node(doc, "div", "menu-tooltip")?;
        set_hidden(doc, tooltip, true)?;
        let body = doc.body();
        doc.append_child(body, tooltip)?;
        overlay.adopt_root(tooltip);

        Ok(Self {
            overlay,
            content,
            tooltip,
            view: MenuView::Open {
                filter: String::new(),
            },
            rows: Vec::new(),
            row_nodes: Vec::new(),
            state: SelectionState::new(),
        })
    }

    pub fn view(&self) -> &MenuView {
        &self.view
    }

    pub fn rows(&self) -> &[MenuRow] {
        &self.rows
    }

    pub fn row_nodes(&self) -> &[NodeId] {
        &self.row_nodes
    }

    pub fn selected_idx(&self) -> Option<usize> {
        self.state.selected_idx
    }

    pub fn highlighted(&self) -> Option<&MenuRow> {
        self.rows.get(self.state.selected_idx?)
    }

    pub fn row(&self, idx: usize) -> Option<&MenuRow> {
        self.rows.get(idx)
    }

    pub(crate) fn set_trigger(&mut self, trigger: Trigger) {
        self.overlay.trigger = trigger;
    }

    /// Switch to `view` and rebuild the content. Returns `false` when the view has no rows.
    pub(crate) fn show(
        &mut self,
        doc: &mut Document,
        table: &ShortcutTable,
        mode: MatchMode,
        view: MenuView,
    ) -> Result<bool, DomError> {
        self.rows = menu_rows(table, &view, mode);
        self.view = view;
        self.render(doc)?;
        Ok(!self.rows.is_empty())
    }

    fn render(&mut self, doc: &mut Document) -> Result<(), DomError> {
        doc.clear_children(self.content)?;
        set_hidden(doc, self.tooltip, true)?;
        self.row_nodes.clear();

        let menu_rect = doc.rect(self.overlay.root);
        let mut line = 0usize;
        let mut next_rect = || {
            let rect = Rect::new(
                menu_rect.x,
                menu_rect.y + CONTENT_PADDING + line as f32 * ROW_HEIGHT,
                menu_rect.width,
                ROW_HEIGHT,
            );
            line += 1;
            rect
        };

        let sectioned = matches!(&self.view, MenuView::Open { filter } if !filter.is_empty());
        let mut section: Option<NodeId> = None;
        let mut section_title: Option<&str> = None;

        for row in &self.rows {
            let parent = if sectioned {
                let title = match row {
                    MenuRow::Group(_) => "Groups",
                    _ => "Shortcuts",
                };
                if section_title != Some(title) {
                    let node = new_overlay_node(doc, "div", "menu-section")?;
                    doc.append_child(self.content, node)?;
                    let title_node = append_text_node(doc, node, "div", "menu-section-title", title)?;
                    doc.set_rect(title_node, next_rect())?;
                    section = Some(node);
                    section_title = Some(title);
                }
                section.unwrap_or(self.content)
            } else {
                self.content
            };

            let node = match row {
                MenuRow::Group(group) => append_text_node(doc, parent, "div", "group-item", group)?,
                MenuRow::Back => {
                    append_text_node(doc, parent, "div", "back-button", BACK_TO_GROUPS_TEXT)?
                }
                MenuRow::Shortcut(shortcut) => {
                    let item = new_overlay_node(doc, "div", "shortcut-menu-item")?;
                    doc.append_child(parent, item)?;
                    append_text_node(doc, item, "span", "shortcut-key", &shortcut.key)?;
                    if sectioned {
                        append_text_node(doc, item, "span", "shortcut-group", &shortcut.group)?;
                    }
                    item
                }
            };
            doc.set_rect(node, next_rect())?;
            self.row_nodes.push(node);
        }

        self.state.reset(self.rows.len());
        self.apply_highlight(doc)
    }

    pub(crate) fn move_up(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.state.move_up_wrap(self.rows.len());
        self.apply_highlight(doc)
    }

    pub(crate) fn move_down(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.state.move_down_wrap(self.rows.len());
        self.apply_highlight(doc)
    }

    fn apply_highlight(&self, doc: &mut Document) -> Result<(), DomError> {
        for (idx, node) in self.row_nodes.iter().enumerate() {
            set_class(doc, *node, "active", self.state.selected_idx == Some(idx))?;
        }
        Ok(())
    }

    /// Index of the row containing `node`.
    pub(crate) fn row_at(&self, doc: &Document, node: NodeId) -> Option<usize> {
        self.row_nodes
            .iter()
            .position(|row_node| doc.contains(*row_node, node))
    }

    /// Show the expansion of shortcut row `idx` beside the menu.
    pub(crate) fn show_tooltip(&mut self, doc: &mut Document, idx: usize) -> Result<(), DomError> {
        let (Some(MenuRow::Shortcut(shortcut)), Some(row_node)) =
            (self.rows.get(idx), self.row_nodes.get(idx))
        else {
            return self.hide_tooltip(doc);
        };

        doc.set_text_content(self.tooltip, &shortcut.value)?;
        let lines = shortcut.value.chars().count().div_ceil(TOOLTIP_CHARS_PER_LINE).max(1);
        let size = Size::new(
            TOOLTIP_WIDTH,
            lines as f32 * TOOLTIP_LINE_HEIGHT + 2.0 * CONTENT_PADDING,
        );
        let rect = place_tooltip(
            doc.rect(self.overlay.root),
            doc.rect(*row_node),
            size,
            doc.viewport(),
        );
        doc.set_rect(self.tooltip, rect)?;
        set_hidden(doc, self.tooltip, false)
    }

    pub(crate) fn hide_tooltip(&mut self, doc: &mut Document) -> Result<(), DomError> {
        set_hidden(doc, self.tooltip, true)
    }

    pub fn tooltip(&self) -> NodeId {
        self.tooltip
    }

    pub(crate) fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub(crate) fn into_overlay(self) -> Overlay {
        self.overlay
    }
}
