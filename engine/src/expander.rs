//! The expander: routes host events to trigger detection, the overlays, and the splicer.
//!
//! One [`Expander`] serves one document. It owns the store mirror, the surface watcher, and the
//! single active overlay slot. Every entry point takes the document explicitly and never panics;
//! DOM and storage failures are logged and the event is dropped.

use std::ops::Range;

use expander_protocol::ActivityKind;
use expander_protocol::TRIGGER_MARKER;

use crate::caret_geometry::CaretPoint;
use crate::caret_geometry::MENU_SIZE;
use crate::caret_geometry::caret_point;
use crate::caret_geometry::place_menu;
use crate::dom::Document;
use crate::dom::NodeId;
use crate::dom::Rect;
use crate::dom::Size;
use crate::dom::TimerId;
use crate::event::EventOutcome;
use crate::event::HostEvent;
use crate::event::Key;
use crate::menu::ActiveMenu;
use crate::menu::CLIPBOARD_ITEM_HEIGHT;
use crate::menu::ClipboardPicker;
use crate::menu::MenuRow;
use crate::menu::MenuView;
use crate::menu::NotesAction;
use crate::menu::NotesPicker;
use crate::menu::ShortcutMenu;
use crate::splice::splice;
use crate::store::Store;
use crate::surface::CaretContext;
use crate::surface::SurfaceClassifier;
use crate::surface::caret_context;
use crate::text_formatting::PREVIEW_GRAPHEMES;
use crate::text_formatting::truncate_preview;
use crate::trigger::Trigger;
use crate::trigger::TriggerCommand;
use crate::trigger::classify;
use crate::trigger::detect_trigger;
use crate::watcher::SurfaceWatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpanderConfig {
    /// Append a single space after every insertion.
    pub trailing_space: bool,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            trailing_space: true,
        }
    }
}

#[derive(Debug)]
pub struct Expander {
    store: Store,
    config: ExpanderConfig,
    classifier: SurfaceClassifier,
    watcher: SurfaceWatcher,
    active: Option<ActiveMenu>,
    /// Escape closes the menu for this (surface, token) until the token changes.
    dismissed: Option<(NodeId, String)>,
}

impl Expander {
    pub fn new(store: Store, config: ExpanderConfig) -> Self {
        Self {
            store,
            config,
            classifier: SurfaceClassifier::new(),
            watcher: SurfaceWatcher::new(),
            active: None,
            dismissed: None,
        }
    }

    /// Instrument every surface already in the document and record the session start.
    pub fn attach(&mut self, doc: &mut Document) {
        // Records queued before the observer existed describe the initial page.
        let _ = doc.take_mutations();
        let body = doc.body();
        let instrumented = self
            .watcher
            .instrument_tree(doc, &mut self.classifier, body);
        if let Err(err) = self.store.record_login() {
            tracing::warn!("failed to record session start: {err}");
        }
        tracing::info!(instrumented, "expander attached");
    }

    /// Close any open overlay.
    pub fn detach(&mut self, doc: &mut Document) {
        self.close_menu(doc);
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn config(&self) -> ExpanderConfig {
        self.config
    }

    pub fn active_menu(&self) -> Option<&ActiveMenu> {
        self.active.as_ref()
    }

    pub fn watcher(&self) -> &SurfaceWatcher {
        &self.watcher
    }

    pub fn dispatch(&mut self, doc: &mut Document, event: HostEvent) -> EventOutcome {
        let outcome = match event {
            HostEvent::Input { target } => self.handle_input(doc, target),
            HostEvent::KeyDown { target, key } => self.handle_key_down(doc, target, key),
            HostEvent::MouseDown { target } => self.handle_mouse_down(doc, target),
            HostEvent::Click { target } => self.handle_click(doc, target),
            HostEvent::MouseEnter { target } => self.handle_hover(doc, target, true),
            HostEvent::MouseLeave { target } => self.handle_hover(doc, target, false),
            HostEvent::FocusIn { target } => self.handle_focus_in(doc, target),
            HostEvent::Copy => self.handle_copy(doc),
            HostEvent::Timer(timer) => self.handle_timer(doc, timer),
        };
        self.handle_mutations(doc);
        outcome
    }

    /// Drain pending mutation records: instrument added surfaces, forget removed ones, and close
    /// the overlay when its surface left the document.
    pub fn handle_mutations(&mut self, doc: &mut Document) {
        let mutations = doc.take_mutations();
        if mutations.is_empty() {
            return;
        }
        self.watcher
            .handle_mutations(doc, &mut self.classifier, &mutations);
        if let Some(active) = &self.active
            && !doc.is_connected(active.surface())
        {
            tracing::debug!("surface removed; closing overlay");
            self.close_menu(doc);
        }
        // Teardown queues removals of its own nodes.
        let _ = doc.take_mutations();
    }

    fn handle_input(&mut self, doc: &mut Document, target: NodeId) -> EventOutcome {
        if let Some(active) = self.active.as_mut()
            && active.contains(doc, target)
        {
            if let ActiveMenu::Notes(picker) = active
                && let Err(err) = picker.handle_input(doc, target)
            {
                tracing::warn!("failed to filter note select: {err}");
            }
            return EventOutcome::ignored();
        }
        let Some(surface) = self.watcher.surface_for(doc, target) else {
            return EventOutcome::ignored();
        };
        self.refresh_for_surface(doc, surface);
        EventOutcome::ignored()
    }

    /// Re-read the caret context of `surface` and open, update, or close the overlay.
    fn refresh_for_surface(&mut self, doc: &mut Document, surface: NodeId) {
        let kind = self.classifier.kind(doc, surface);
        let context = match caret_context(doc, surface, kind) {
            Ok(Some(context)) => context,
            Ok(None) => {
                self.close_transient_menu(doc);
                return;
            }
            Err(err) => {
                tracing::debug!("no caret context: {err}");
                self.close_transient_menu(doc);
                return;
            }
        };
        let Some(trigger) = detect_trigger(&context.text, context.caret) else {
            self.dismissed = None;
            self.close_transient_menu(doc);
            return;
        };
        if self
            .dismissed
            .as_ref()
            .is_some_and(|(dismissed, token)| *dismissed == surface && *token == trigger.token)
        {
            return;
        }
        self.dismissed = None;

        match classify(&trigger.token) {
            TriggerCommand::Notes => self.open_notes(doc, surface, trigger.clone()),
            TriggerCommand::Clipboard => {
                self.open_clipboard(doc, surface, &context, trigger.clone());
            }
            TriggerCommand::Shortcuts(_) => {
                self.show_shortcuts(doc, surface, &context, trigger.clone());
            }
        }
    }

    fn show_shortcuts(
        &mut self,
        doc: &mut Document,
        surface: NodeId,
        context: &CaretContext,
        trigger: Trigger,
    ) {
        let reuse = matches!(
            &self.active,
            Some(ActiveMenu::Shortcuts(menu)) if menu.overlay().surface == surface
        );
        if !reuse {
            self.close_menu(doc);
            let rect = menu_rect(doc, surface, context, MENU_SIZE);
            match ShortcutMenu::open(doc, surface, trigger.clone(), rect) {
                Ok(menu) => self.active = Some(ActiveMenu::Shortcuts(menu)),
                Err(err) => {
                    tracing::warn!("failed to open shortcut menu: {err}");
                    return;
                }
            }
        }
        let view = MenuView::Open {
            filter: trigger.token.clone(),
        };
        if let Some(ActiveMenu::Shortcuts(menu)) = self.active.as_mut() {
            menu.set_trigger(trigger);
        }
        self.show_view(doc, view);
    }

    /// Render `view` in the open shortcut menu; an empty view closes the menu.
    fn show_view(&mut self, doc: &mut Document, view: MenuView) {
        let Some(ActiveMenu::Shortcuts(menu)) = self.active.as_mut() else {
            return;
        };
        match menu.show(doc, self.store.shortcuts(), self.store.match_mode(), view) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("no matching rows; closing shortcut menu");
                self.close_menu(doc);
            }
            Err(err) => {
                tracing::warn!("failed to render shortcut menu: {err}");
                self.close_menu(doc);
            }
        }
    }

    fn open_clipboard(
        &mut self,
        doc: &mut Document,
        surface: NodeId,
        context: &CaretContext,
        trigger: Trigger,
    ) {
        if matches!(
            &self.active,
            Some(ActiveMenu::Clipboard(picker)) if picker.overlay().surface == surface
        ) {
            return;
        }
        self.close_menu(doc);
        let rows = self.store.clipboard_history().len().max(1);
        let size = Size::new(
            MENU_SIZE.width,
            (rows as f32 * CLIPBOARD_ITEM_HEIGHT).min(MENU_SIZE.height),
        );
        let rect = menu_rect(doc, surface, context, size);
        match ClipboardPicker::open(doc, surface, trigger, self.store.clipboard_history(), rect) {
            Ok(picker) => self.active = Some(ActiveMenu::Clipboard(picker)),
            Err(err) => tracing::warn!("failed to open clipboard picker: {err}"),
        }
    }

    fn open_notes(&mut self, doc: &mut Document, surface: NodeId, trigger: Trigger) {
        if matches!(
            &self.active,
            Some(ActiveMenu::Notes(picker)) if picker.overlay().surface == surface
        ) {
            return;
        }
        self.close_menu(doc);
        match NotesPicker::open(
            doc,
            surface,
            trigger,
            self.store.notes(),
            self.store.clipboard_history(),
        ) {
            Ok(picker) => self.active = Some(ActiveMenu::Notes(picker)),
            Err(err) => tracing::warn!("failed to open notes picker: {err}"),
        }
    }

    fn handle_key_down(&mut self, doc: &mut Document, target: NodeId, key: Key) -> EventOutcome {
        let Some(active) = self.active.as_mut() else {
            return EventOutcome::ignored();
        };
        if !doc.contains(active.surface(), target) && !active.contains(doc, target) {
            return EventOutcome::ignored();
        }
        match active {
            ActiveMenu::Shortcuts(menu) => match key {
                Key::ArrowDown | Key::ArrowUp => {
                    let moved = if key == Key::ArrowDown {
                        menu.move_down(doc)
                    } else {
                        menu.move_up(doc)
                    };
                    if let Err(err) = moved {
                        tracing::warn!("failed to move menu highlight: {err}");
                    }
                    EventOutcome::handled()
                }
                Key::Enter | Key::Tab => {
                    let Some(row) = menu.highlighted().cloned() else {
                        return EventOutcome::ignored();
                    };
                    self.activate_row(doc, row);
                    EventOutcome::handled()
                }
                Key::Escape => {
                    self.dismiss(doc);
                    EventOutcome::handled()
                }
                Key::Char(_) | Key::Other => EventOutcome::ignored(),
            },
            ActiveMenu::Clipboard(picker) => match key {
                Key::ArrowDown | Key::ArrowUp => {
                    let moved = if key == Key::ArrowDown {
                        picker.move_down(doc)
                    } else {
                        picker.move_up(doc)
                    };
                    if let Err(err) = moved {
                        tracing::warn!("failed to move clipboard highlight: {err}");
                    }
                    EventOutcome::handled()
                }
                Key::Enter | Key::Tab => {
                    let Some(entry) = picker.highlighted().map(str::to_string) else {
                        return EventOutcome::ignored();
                    };
                    self.insert_clipboard_entry(doc, &entry);
                    EventOutcome::handled()
                }
                Key::Escape => {
                    self.dismiss(doc);
                    EventOutcome::handled()
                }
                Key::Char(_) | Key::Other => EventOutcome::ignored(),
            },
            ActiveMenu::Notes(_) => match key {
                Key::Escape => {
                    self.close_menu(doc);
                    EventOutcome::handled()
                }
                _ => EventOutcome::ignored(),
            },
        }
    }

    fn activate_row(&mut self, doc: &mut Document, row: MenuRow) {
        match row {
            MenuRow::Group(group) => self.show_view(doc, MenuView::GroupView { group }),
            MenuRow::Back => self.show_view(
                doc,
                MenuView::Open {
                    filter: String::new(),
                },
            ),
            MenuRow::Shortcut(shortcut) => {
                self.commit(doc, &shortcut.value, ActivityKind::Shortcut, &shortcut.key);
            }
        }
    }

    fn insert_clipboard_entry(&mut self, doc: &mut Document, entry: &str) {
        let label = truncate_preview(entry, PREVIEW_GRAPHEMES);
        self.commit(doc, entry, ActivityKind::Clipboard, &label);
    }

    fn handle_mouse_down(&mut self, doc: &mut Document, target: NodeId) -> EventOutcome {
        let Some(active) = &self.active else {
            return EventOutcome::ignored();
        };
        if active.contains(doc, target) {
            // Keep focus and the selection on the surface while a menu row is pressed.
            return if active.is_notes() {
                EventOutcome::ignored()
            } else {
                EventOutcome::handled()
            };
        }
        if doc.contains(active.surface(), target) {
            return EventOutcome::ignored();
        }
        // The notes popup outlives clicks elsewhere so page text can be selected and copied.
        self.close_transient_menu(doc);
        EventOutcome::ignored()
    }

    fn handle_click(&mut self, doc: &mut Document, target: NodeId) -> EventOutcome {
        let Some(active) = self.active.as_mut() else {
            return EventOutcome::ignored();
        };
        if !active.contains(doc, target) {
            return EventOutcome::ignored();
        }
        match active {
            ActiveMenu::Shortcuts(menu) => {
                let Some(row) = menu
                    .row_at(doc, target)
                    .and_then(|idx| menu.row(idx))
                    .cloned()
                else {
                    return EventOutcome::ignored();
                };
                self.activate_row(doc, row);
            }
            ActiveMenu::Clipboard(picker) => {
                let Some(entry) = picker.entry_at(doc, target).map(str::to_string) else {
                    return EventOutcome::ignored();
                };
                self.insert_clipboard_entry(doc, &entry);
            }
            ActiveMenu::Notes(picker) => {
                let Some(action) = picker.action_at(doc, target) else {
                    return EventOutcome::ignored();
                };
                self.apply_notes_action(doc, action);
            }
        }
        EventOutcome::handled()
    }

    fn apply_notes_action(&mut self, doc: &mut Document, action: NotesAction) {
        match action {
            NotesAction::Close => self.close_menu(doc),
            NotesAction::Import => self.import_note(doc),
            NotesAction::CopyToClipboard(text) => doc.write_clipboard(&text),
            action => {
                let Some(ActiveMenu::Notes(picker)) = self.active.as_mut() else {
                    return;
                };
                let notes = self.store.notes();
                let result = match action {
                    NotesAction::ToggleMinimize => picker.toggle_minimized(doc),
                    NotesAction::SelectTopic(topic) => picker.select_topic(doc, notes, &topic),
                    NotesAction::SelectSubtopic(subtopic) => {
                        picker.select_subtopic(doc, notes, &subtopic)
                    }
                    NotesAction::OpenTopicSelect => picker.open_topic_select(doc),
                    NotesAction::OpenSubtopicSelect => picker.open_subtopic_select(doc),
                    NotesAction::CloseDropdowns => picker.close_dropdowns(doc),
                    NotesAction::Close | NotesAction::Import | NotesAction::CopyToClipboard(_) => {
                        Ok(())
                    }
                };
                if let Err(err) = result {
                    tracing::warn!("failed to update notes picker: {err}");
                }
            }
        }
    }

    fn import_note(&mut self, doc: &mut Document) {
        let Some(ActiveMenu::Notes(picker)) = &self.active else {
            return;
        };
        let Some(text) = picker.filled_text(doc, self.store.notes()) else {
            tracing::debug!("import without a selected template");
            return;
        };
        let label = format!(
            "{} / {}",
            picker.selected_topic().unwrap_or_default(),
            picker.selected_subtopic().unwrap_or_default()
        );
        self.commit(doc, &text, ActivityKind::Note, &label);
    }

    fn handle_hover(&mut self, doc: &mut Document, target: NodeId, entering: bool) -> EventOutcome {
        let Some(ActiveMenu::Shortcuts(menu)) = self.active.as_mut() else {
            return EventOutcome::ignored();
        };
        let result = match menu.row_at(doc, target) {
            Some(idx) if entering => menu.show_tooltip(doc, idx),
            _ => menu.hide_tooltip(doc),
        };
        if let Err(err) = result {
            tracing::debug!("failed to update tooltip: {err}");
        }
        EventOutcome::ignored()
    }

    fn handle_focus_in(&mut self, doc: &mut Document, target: NodeId) -> EventOutcome {
        let Some(active) = self.active.as_mut() else {
            return EventOutcome::ignored();
        };
        if active.contains(doc, target) {
            if let ActiveMenu::Notes(picker) = active
                && let Err(err) = picker.handle_focus(doc, target)
            {
                tracing::warn!("failed to open note select: {err}");
            }
            return EventOutcome::ignored();
        }
        if doc.contains(active.surface(), target) {
            return EventOutcome::ignored();
        }
        self.close_transient_menu(doc);
        EventOutcome::ignored()
    }

    fn handle_copy(&mut self, doc: &mut Document) -> EventOutcome {
        let copied = doc.selected_text();
        match self.store.record_copy(&copied) {
            Ok(true) => tracing::debug!("captured copy"),
            Ok(false) => {}
            Err(err) => tracing::warn!("failed to persist clipboard history: {err}"),
        }
        self.refresh_notes_clipboard(doc);
        EventOutcome::ignored()
    }

    fn handle_timer(&mut self, doc: &mut Document, timer: TimerId) -> EventOutcome {
        if !self
            .active
            .as_ref()
            .is_some_and(|active| active.owns_timer(timer))
        {
            return EventOutcome::ignored();
        }
        if let Err(err) = self.store.reload_clipboard_history() {
            tracing::debug!("failed to reload clipboard history: {err}");
        }
        self.refresh_notes_clipboard(doc);
        EventOutcome::ignored()
    }

    fn refresh_notes_clipboard(&mut self, doc: &mut Document) {
        let Some(ActiveMenu::Notes(picker)) = self.active.as_mut() else {
            return;
        };
        if let Err(err) = picker.refresh_clipboard(doc, self.store.clipboard_history()) {
            tracing::warn!("failed to refresh clipboard panel: {err}");
        }
    }

    /// Replace the trigger of the active overlay with `replacement`, close the overlay, and
    /// record the expansion.
    fn commit(&mut self, doc: &mut Document, replacement: &str, kind: ActivityKind, label: &str) {
        let Some(active) = self.active.take() else {
            return;
        };
        let surface = active.surface();
        let recorded = active.trigger().clone();
        active.teardown(doc);
        self.dismissed = None;

        let surface_kind = self.classifier.kind(doc, surface);
        let context = match caret_context(doc, surface, surface_kind) {
            Ok(Some(context)) => context,
            Ok(None) => {
                tracing::warn!("surface has no caret; dropping insertion");
                return;
            }
            Err(err) => {
                tracing::warn!("failed to read surface before insertion: {err}");
                return;
            }
        };
        let Some(span) = trigger_span(&context, &recorded) else {
            tracing::warn!(token = %recorded.token, "trigger no longer present; dropping insertion");
            return;
        };

        let mut inserted = replacement.to_string();
        if self.config.trailing_space {
            inserted.push(' ');
        }
        let typed_chars = span.len();
        match splice(doc, surface, &context, span, &inserted) {
            Ok(outcome) => tracing::debug!(caret = outcome.caret, label, "inserted expansion"),
            Err(err) => {
                tracing::warn!("failed to insert expansion: {err}");
                return;
            }
        }
        if let Err(err) =
            self.store
                .record_expansion(kind, label, typed_chars, replacement.chars().count())
        {
            tracing::warn!("failed to persist usage stats: {err}");
        }
    }

    /// Escape: close the overlay and suppress it for the current token.
    fn dismiss(&mut self, doc: &mut Document) {
        if let Some(active) = &self.active {
            self.dismissed = Some((active.surface(), active.trigger().token.clone()));
        }
        self.close_menu(doc);
    }

    /// Close menus that only live while the trigger is being typed; the notes popup stays.
    fn close_transient_menu(&mut self, doc: &mut Document) {
        if self.active.as_ref().is_some_and(|active| !active.is_notes()) {
            self.close_menu(doc);
        }
    }

    fn close_menu(&mut self, doc: &mut Document) {
        if let Some(active) = self.active.take() {
            active.teardown(doc);
        }
    }
}

/// Where a menu of `size` goes: next to the caret, or next to the surface when the caret cannot
/// be measured.
fn menu_rect(doc: &mut Document, surface: NodeId, context: &CaretContext, size: Size) -> Rect {
    let point = caret_point(doc, surface, context).unwrap_or_else(|| {
        let rect = doc.rect(surface);
        CaretPoint {
            x: rect.x,
            y: rect.y,
        }
    });
    place_menu(point, size, doc.viewport())
}

/// The span to replace: the live trigger at the caret when it still carries the recorded token,
/// otherwise the recorded span when its text is unchanged.
fn trigger_span(context: &CaretContext, recorded: &Trigger) -> Option<Range<usize>> {
    if let Some(live) = detect_trigger(&context.text, context.caret)
        && live.token == recorded.token
    {
        return Some(live.start..context.caret);
    }
    let expected = format!("{TRIGGER_MARKER}{}", recorded.token);
    let present: String = context
        .text
        .chars()
        .skip(recorded.start)
        .take(recorded.typed_len())
        .collect();
    (present == expected).then(|| recorded.start..recorded.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::CaretAnchor;
    use crate::surface::SurfaceKind;
    use expander_protocol::ShortcutTable;
    use expander_protocol::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn context(text: &str, caret: usize) -> CaretContext {
        CaretContext {
            text: text.to_string(),
            caret,
            kind: SurfaceKind::PlainValue,
            anchor: CaretAnchor::Value,
        }
    }

    #[test]
    fn trigger_span_prefers_live_trigger() {
        let recorded = Trigger {
            start: 0,
            token: "hi".to_string(),
        };
        assert_eq!(trigger_span(&context("x //hi", 6), &recorded), Some(2..6));
    }

    #[test]
    fn trigger_span_falls_back_to_recorded_span() {
        let recorded = Trigger {
            start: 6,
            token: "notes".to_string(),
        };
        // Caret moved away from the trigger while the popup was open.
        assert_eq!(
            trigger_span(&context("Hello //notes and more", 0), &recorded),
            Some(6..13)
        );
        assert_eq!(trigger_span(&context("Hello world", 0), &recorded), None);
    }

    #[test]
    fn escape_suppresses_menu_until_token_changes() {
        let mut shortcuts = ShortcutTable::new();
        shortcuts.insert("Greetings", "//hi", "Hi there!");
        let backend = MemoryStore::with_record(expander_protocol::store::StoreRecord {
            shortcuts: Some(shortcuts),
            ..Default::default()
        });
        let mut expander = Expander::new(
            Store::load(Box::new(backend)),
            ExpanderConfig::default(),
        );
        let mut doc = Document::new(Size::new(1024.0, 768.0));
        let input = doc.create_element("input");
        let body = doc.body();
        doc.append_child(body, input).expect("append");
        expander.attach(&mut doc);

        doc.focus(input).expect("focus");
        doc.insert_text_at_caret(input, "//h").expect("type");
        expander.dispatch(&mut doc, HostEvent::Input { target: input });
        assert!(expander.active_menu().is_some());

        let outcome = expander.dispatch(
            &mut doc,
            HostEvent::KeyDown {
                target: input,
                key: Key::Escape,
            },
        );
        assert!(outcome.prevent_default);
        assert!(expander.active_menu().is_none());

        expander.dispatch(&mut doc, HostEvent::Input { target: input });
        assert!(expander.active_menu().is_none());

        doc.insert_text_at_caret(input, "i").expect("type");
        expander.dispatch(&mut doc, HostEvent::Input { target: input });
        assert!(expander.active_menu().is_some());
    }
}
