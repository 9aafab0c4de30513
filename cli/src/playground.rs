//! `text-expander playground`: an interactive textarea in the terminal, driven by the engine.

use std::io;
use std::time::Duration;
use std::time::Instant;

use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::execute;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use expander_engine::ActiveMenu;
use expander_engine::Expander;
use expander_engine::HostEvent;
use expander_engine::Key;
use expander_engine::NodeId;
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::layout::Position;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;

use crate::headless::SingleSurface;
use crate::headless::describe_menu;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const HELP: &str =
    "type //key to expand · ↑/↓ move · Enter/Tab pick · Esc dismiss · Ctrl-Y copy all · Ctrl-Q quit";
const NOTES_HELP: &str = "Tab next field · Enter import · Esc close · Ctrl-Q quit";

/// Raw mode plus the alternate screen, undone on drop.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best-effort: try both steps even if one fails.
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Playground {
    expander: Expander,
    page: SingleSurface,
    /// Index into the notes picker's placeholder inputs that receives typing.
    notes_field: Option<usize>,
}

impl Playground {
    pub fn new(mut expander: Expander) -> anyhow::Result<Self> {
        let mut page = SingleSurface::new(false)?;
        expander.attach(&mut page.doc);
        page.doc.focus(page.surface)?;
        Ok(Self {
            expander,
            page,
            notes_field: None,
        })
    }

    pub fn text(&self) -> String {
        self.page.text()
    }

    pub fn caret(&self) -> usize {
        self.page.caret()
    }

    pub fn expander(&self) -> &Expander {
        &self.expander
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<Flow> {
        if key.kind != KeyEventKind::Press {
            return Ok(Flow::Continue);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c' | 'q') => Ok(Flow::Quit),
                KeyCode::Char('y') => {
                    self.copy_all()?;
                    Ok(Flow::Continue)
                }
                _ => Ok(Flow::Continue),
            };
        }

        if self.notes_open() {
            self.handle_notes_key(key)?;
        } else {
            self.notes_field = None;
            self.handle_surface_key(key)?;
        }
        Ok(Flow::Continue)
    }

    /// Advance the document clock and deliver the timers that fired.
    pub fn tick(&mut self, elapsed: Duration) {
        for timer in self.page.doc.advance(elapsed) {
            self.expander
                .dispatch(&mut self.page.doc, HostEvent::Timer(timer));
        }
    }

    fn handle_surface_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        match key.code {
            KeyCode::Char(ch) => {
                if !self.page.press(&mut self.expander, Key::Char(ch)) {
                    let mut buf = [0u8; 4];
                    self.page
                        .type_text(&mut self.expander, ch.encode_utf8(&mut buf))?;
                }
            }
            KeyCode::Backspace => {
                let surface = self.page.surface;
                self.delete_before_caret(surface)?;
            }
            KeyCode::Left => {
                let caret = self.page.caret();
                self.page.set_caret(caret.saturating_sub(1))?;
            }
            KeyCode::Right => {
                let caret = self.page.caret();
                self.page.set_caret(caret + 1)?;
            }
            KeyCode::Up => {
                self.page.press(&mut self.expander, Key::ArrowUp);
            }
            KeyCode::Down => {
                self.page.press(&mut self.expander, Key::ArrowDown);
            }
            KeyCode::Tab => {
                self.page.press(&mut self.expander, Key::Tab);
            }
            KeyCode::Esc => {
                self.page.press(&mut self.expander, Key::Escape);
            }
            KeyCode::Enter => {
                if !self.page.press(&mut self.expander, Key::Enter) {
                    self.page.type_text(&mut self.expander, "\n")?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_notes_key(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        let fields: Vec<NodeId> = match self.expander.active_menu() {
            Some(ActiveMenu::Notes(picker)) => picker
                .placeholder_inputs()
                .iter()
                .map(|(node, _)| *node)
                .collect(),
            _ => return Ok(()),
        };
        let focused = self.notes_field.and_then(|idx| fields.get(idx).copied());

        match key.code {
            KeyCode::Esc => {
                self.notes_field = None;
                self.page.press(&mut self.expander, Key::Escape);
            }
            KeyCode::Tab => {
                if fields.is_empty() {
                    return Ok(());
                }
                let next = self.notes_field.map_or(0, |idx| (idx + 1) % fields.len());
                self.notes_field = Some(next);
                let node = fields[next];
                self.page.doc.focus(node)?;
                self.expander
                    .dispatch(&mut self.page.doc, HostEvent::FocusIn { target: node });
            }
            KeyCode::Enter => {
                let import = match self.expander.active_menu() {
                    Some(ActiveMenu::Notes(picker)) => picker.import_button(),
                    _ => return Ok(()),
                };
                self.notes_field = None;
                self.expander
                    .dispatch(&mut self.page.doc, HostEvent::Click { target: import });
                self.page.doc.focus(self.page.surface)?;
            }
            KeyCode::Char(ch) => match focused {
                Some(node) => {
                    let mut buf = [0u8; 4];
                    self.page
                        .doc
                        .insert_text_at_caret(node, ch.encode_utf8(&mut buf))?;
                    self.expander
                        .dispatch(&mut self.page.doc, HostEvent::Input { target: node });
                }
                None => {
                    let mut buf = [0u8; 4];
                    self.page
                        .type_text(&mut self.expander, ch.encode_utf8(&mut buf))?;
                }
            },
            KeyCode::Backspace => {
                let node = focused.unwrap_or(self.page.surface);
                self.delete_before_caret(node)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn delete_before_caret(&mut self, node: NodeId) -> anyhow::Result<()> {
        let (start, end) = self.page.doc.selection_range(node)?;
        if start == end && start == 0 {
            return Ok(());
        }
        let start = if start == end { start - 1 } else { start };
        self.page.doc.set_selection_range(node, start, end)?;
        self.page.doc.insert_text_at_caret(node, "")?;
        self.expander
            .dispatch(&mut self.page.doc, HostEvent::Input { target: node });
        Ok(())
    }

    /// Select the whole textarea, deliver a copy, and put the caret back.
    fn copy_all(&mut self) -> anyhow::Result<()> {
        let caret = self.page.caret();
        let len = self.page.text().chars().count();
        self.page.doc.focus(self.page.surface)?;
        self.page.doc.set_selection_range(self.page.surface, 0, len)?;
        let text = self.page.text();
        self.page.doc.write_clipboard(&text);
        self.expander.dispatch(&mut self.page.doc, HostEvent::Copy);
        self.page.set_caret(caret)?;
        Ok(())
    }

    fn notes_open(&self) -> bool {
        self.expander
            .active_menu()
            .is_some_and(ActiveMenu::is_notes)
    }

    fn menu_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = describe_menu(self.expander.active_menu())
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect();
        if let Some(ActiveMenu::Notes(picker)) = self.expander.active_menu() {
            let values = picker.placeholder_inputs().iter().enumerate();
            for (idx, (node, name)) in values {
                let value = self.page.doc.value(*node).unwrap_or_default();
                let line = Line::from(format!("  {name}: {value}"));
                let line = if self.notes_field == Some(idx) {
                    line.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    line
                };
                // Replace the bare `field:` line with one that shows the typed value.
                if let Some(slot) = lines.get_mut(idx + 1) {
                    *slot = line;
                }
            }
        }
        lines
    }

    fn render(&self, frame: &mut Frame) {
        let [editor_area, menu_area, help_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(12),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let text = self.text();
        let editor = Paragraph::new(text.clone())
            .block(Block::default().borders(Borders::ALL).title("textarea"))
            .wrap(Wrap { trim: false });
        frame.render_widget(editor, editor_area);

        let menu = Paragraph::new(self.menu_lines())
            .block(Block::default().borders(Borders::ALL).title("menu"));
        frame.render_widget(menu, menu_area);

        let help = if self.notes_open() { NOTES_HELP } else { HELP };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().add_modifier(Modifier::DIM)),
            help_area,
        );

        if self.notes_field.is_none() {
            let (row, col) = caret_row_col(&text, self.caret());
            let x = editor_area.x.saturating_add(1).saturating_add(col);
            let y = editor_area.y.saturating_add(1).saturating_add(row);
            frame.set_cursor_position(Position::new(x, y));
        }
    }
}

/// Line and column of `caret` within `text`, in characters.
fn caret_row_col(text: &str, caret: usize) -> (u16, u16) {
    let before: String = text.chars().take(caret).collect();
    let row = before.matches('\n').count();
    let col = before
        .rsplit_once('\n')
        .map_or(before.as_str(), |(_, tail)| tail)
        .chars()
        .count();
    (
        u16::try_from(row).unwrap_or(u16::MAX),
        u16::try_from(col).unwrap_or(u16::MAX),
    )
}

pub fn run(expander: Expander) -> anyhow::Result<()> {
    let mut playground = Playground::new(expander)?;
    let _guard = TerminalGuard::new()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    tracing::info!("playground started");

    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|frame| playground.render(frame))?;

        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && playground.handle_key(key)? == Flow::Quit
        {
            break;
        }

        let now = Instant::now();
        playground.tick(now.duration_since(last_tick));
        last_tick = now;
    }

    tracing::info!(
        shortcuts_used = playground.expander().store().usage_stats().shortcuts_used,
        "playground closed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expander_engine::ExpanderConfig;
    use expander_engine::Store;
    use expander_protocol::NoteTemplates;
    use expander_protocol::ShortcutTable;
    use expander_protocol::store::MemoryStore;
    use expander_protocol::store::StoreRecord;
    use pretty_assertions::assert_eq;

    fn playground() -> Playground {
        let mut shortcuts = ShortcutTable::new();
        shortcuts.insert("Greetings", "//hi", "Hi there!");
        let mut notes = NoteTemplates::new();
        notes.insert("Billing", "Refund", "Refund of {Amount} issued.");
        let store = Store::load(Box::new(MemoryStore::with_record(StoreRecord {
            shortcuts: Some(shortcuts),
            notes: Some(notes),
            ..Default::default()
        })));
        Playground::new(Expander::new(store, ExpanderConfig::default())).expect("playground")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(playground: &mut Playground, text: &str) {
        for ch in text.chars() {
            playground
                .handle_key(key(KeyCode::Char(ch)))
                .expect("type");
        }
    }

    #[test]
    fn typing_and_enter_expands() {
        let mut playground = playground();
        type_str(&mut playground, "Hey //hi");
        assert!(playground.expander().active_menu().is_some());

        playground.handle_key(key(KeyCode::Enter)).expect("enter");
        assert_eq!(playground.text(), "Hey Hi there! ");
        assert_eq!(playground.caret(), 14);
    }

    #[test]
    fn enter_without_menu_inserts_newline() {
        let mut playground = playground();
        type_str(&mut playground, "ab");
        playground.handle_key(key(KeyCode::Enter)).expect("enter");
        assert_eq!(playground.text(), "ab\n");
    }

    #[test]
    fn backspace_and_arrows_edit_at_caret() {
        let mut playground = playground();
        type_str(&mut playground, "abc");
        playground.handle_key(key(KeyCode::Left)).expect("left");
        playground.handle_key(key(KeyCode::Backspace)).expect("backspace");
        assert_eq!(playground.text(), "ac");
        assert_eq!(playground.caret(), 1);
    }

    #[test]
    fn notes_fields_receive_typing_and_enter_imports() {
        let mut playground = playground();
        type_str(&mut playground, "//notes");
        assert!(playground.notes_open());

        playground.handle_key(key(KeyCode::Tab)).expect("tab");
        type_str(&mut playground, "$5");
        playground.handle_key(key(KeyCode::Enter)).expect("import");

        assert_eq!(playground.text(), "Refund of $5 issued. ");
        assert!(playground.expander().active_menu().is_none());
    }

    #[test]
    fn ctrl_y_copies_into_history() {
        let mut playground = playground();
        type_str(&mut playground, "keep me");
        playground
            .handle_key(KeyEvent::new(KeyCode::Char('y'), KeyModifiers::CONTROL))
            .expect("copy");
        assert_eq!(
            playground.expander().store().clipboard_history().get(0),
            Some("keep me")
        );
        assert_eq!(playground.caret(), 7);
    }

    #[test]
    fn ctrl_q_quits() {
        let mut playground = playground();
        let flow = playground
            .handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL))
            .expect("quit");
        assert_eq!(flow, Flow::Quit);
    }

    #[test]
    fn caret_position_counts_lines_and_columns() {
        assert_eq!(caret_row_col("ab\ncde", 5), (1, 2));
        assert_eq!(caret_row_col("abc", 0), (0, 0));
    }
}
