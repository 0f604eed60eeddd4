use crate::config::Config;
use crate::drag::{DragController, DragState, Listen};
use crate::editor::{Editor, FieldValue, FormField, ItemForm};
use crate::export::{ExportRequest, ExportWorker};
use crate::model::{AxisKey, Board, Item, Quadrant};
use crate::view::{contains, BoardLayout, Hit, ItemPart};
use anyhow::Result;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const LABEL_GUTTER: u16 = 14;
const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const OVERLAY_WIDTH: u16 = 46;
const OVERLAY_HEIGHT: u16 = 12;
const BOARD_BG: Color = Color::Rgb(16, 18, 24);
const NOTE_BG: Color = Color::Rgb(252, 214, 112);

pub fn run(board: Board, config: Config, export_dir: PathBuf) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(board, config, export_dir);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    board: Board,
    config: Config,
    export_dir: PathBuf,
    mode: Mode,
    editor: Editor,
    drag: DragController,
    listeners: PointerListeners,
    exporter: ExportWorker,
    layout: Option<BoardLayout>,
    overlay: Option<Rect>,
    last_click: Option<Click>,
    status: String,
}

enum Mode {
    Normal,
    EditingTitle { axis: AxisKey, field: FieldValue },
}

#[derive(Clone, Copy)]
struct Click {
    col: u16,
    row: u16,
    at: Instant,
}

/// Pointer move/release routing. Attached only while a drag session is alive.
#[derive(Default)]
struct PointerListeners {
    attached: bool,
}

impl PointerListeners {
    fn apply(&mut self, change: Option<Listen>) {
        match change {
            Some(Listen::Subscribe) => {
                self.attached = true;
                debug!("pointer listeners attached");
            }
            Some(Listen::Unsubscribe) => {
                self.attached = false;
                debug!("pointer listeners detached");
            }
            None => {}
        }
    }
}

impl App {
    fn new(board: Board, config: Config, export_dir: PathBuf) -> Self {
        let status = format!(
            "Click empty space to add a note. Exports go to {}",
            export_dir.display()
        );
        App {
            board,
            config,
            export_dir,
            mode: Mode::Normal,
            editor: Editor::Closed,
            drag: DragController::new(),
            listeners: PointerListeners::default(),
            exporter: ExportWorker::default(),
            layout: None,
            overlay: None,
            last_click: None,
            status,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.poll_export();
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? && self.handle_event(event::read()?) {
                break;
            }
        }
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse);
                false
            }
            // Focus reporting is enabled in setup_terminal; a release outside the
            // window never arrives, so losing focus ends the drag.
            Event::FocusLost => {
                self.end_drag(true);
                false
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Mode::EditingTitle { .. } = self.mode {
            self.handle_title_key(key);
            return false;
        }
        if self.editor.is_open() {
            self.handle_form_key(key);
            return false;
        }
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('x') => self.start_export(),
            KeyCode::Esc => self.end_drag(true),
            _ => {}
        }
        false
    }

    fn handle_title_key(&mut self, key: KeyEvent) {
        let Mode::EditingTitle { axis, field } = &mut self.mode else {
            return;
        };
        let axis = *axis;
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => {
                self.status = format!("Title {} set", axis.label());
                self.mode = Mode::Normal;
                return;
            }
            KeyCode::Left => field.move_left(),
            KeyCode::Right => field.move_right(),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    field.insert_char(c);
                }
            }
            _ => return,
        }
        let text = field.value.clone();
        self.board.set_title(axis, &text);
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = self.editor.form_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.editor.cancel();
                self.status = "Canceled".into();
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left => {
                if let Some(field) = form.active_field_mut() {
                    field.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(field) = form.active_field_mut() {
                    field.move_right();
                }
            }
            KeyCode::Enter => {
                let control = key.modifiers.contains(KeyModifiers::CONTROL);
                if form.field == FormField::Text && !control {
                    form.text.insert_char('\n');
                } else {
                    self.save_editor();
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = form.active_field_mut() {
                    field.backspace();
                }
            }
            KeyCode::Char(' ') if form.field == FormField::Todo => form.toggle_todo(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    if let Some(field) = form.active_field_mut() {
                        field.insert_char(c);
                    }
                }
            }
            _ => {}
        }
    }

    fn save_editor(&mut self) {
        let editing = matches!(self.editor, Editor::OpenForEdit { .. });
        match self.editor.save(&self.board.contents) {
            Ok(commit) => {
                self.board.apply(commit);
                self.status = if editing {
                    "Note updated".into()
                } else {
                    "Note added".into()
                };
            }
            Err(err) => self.status = format!("Could not save: {}", err),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (col, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.handle_press(col, row),
            MouseEventKind::Drag(MouseButton::Left) if self.listeners.attached => {
                self.handle_drag(col, row)
            }
            MouseEventKind::Up(MouseButton::Left) if self.listeners.attached => {
                self.end_drag(false)
            }
            _ => {}
        }
    }

    fn handle_press(&mut self, col: u16, row: u16) {
        // A new press means the previous one was released, even if its Up never arrived.
        self.end_drag(true);
        if self.overlay.is_some_and(|rect| contains(rect, col, row)) {
            return;
        }
        if let Mode::EditingTitle { axis, .. } = self.mode {
            self.status = format!("Title {} set", axis.label());
            self.mode = Mode::Normal;
        }
        let Some(layout) = self.layout else {
            return;
        };
        let double = self.register_click(col, row);
        let footprint = self.config.footprint;
        match layout.hit_test(&self.board.contents, footprint, col, row) {
            Hit::Title(axis) => {
                let field = FieldValue::capped(self.board.titles.get(axis), self.board.title_max_len());
                self.mode = Mode::EditingTitle { axis, field };
                self.status = format!("Editing title {} (Enter to finish)", axis.label());
            }
            Hit::Item {
                quadrant,
                index,
                part: ItemPart::Delete,
            } => {
                self.editor.cancel();
                self.board.remove_item(quadrant, index);
                self.status = format!("Deleted note from {}", quadrant);
            }
            Hit::Item {
                quadrant,
                index,
                part: ItemPart::Toggle,
            } => {
                self.board.toggle_todo(quadrant, index);
            }
            Hit::Item {
                quadrant,
                index,
                part: ItemPart::Body,
            } => {
                if double {
                    if self.editor.open_edit(&self.board.contents, quadrant, index) {
                        self.status = "Editing note (Ctrl+Enter save, Esc cancel)".into();
                    }
                    return;
                }
                self.editor.cancel();
                let pointer = layout.to_board(col, row);
                let change = self
                    .drag
                    .begin(&self.board.contents, quadrant, index, pointer);
                self.listeners.apply(change);
            }
            Hit::Board(point) => {
                let defaults = self.config.item_defaults();
                if self
                    .editor
                    .open_create(point, layout.bounds(), &defaults, footprint)
                {
                    self.status = "New note (Tab fields, Ctrl+Enter save, Esc cancel)".into();
                }
            }
            Hit::Outside => {}
        }
    }

    fn register_click(&mut self, col: u16, row: u16) -> bool {
        let now = Instant::now();
        let double = self.last_click.is_some_and(|last| {
            last.col == col && last.row == row && now.duration_since(last.at) <= DOUBLE_CLICK
        });
        self.last_click = if double {
            None
        } else {
            Some(Click { col, row, at: now })
        };
        double
    }

    fn handle_drag(&mut self, col: u16, row: u16) {
        // No layout yet means the move cannot be measured; keep the last position.
        let Some(layout) = self.layout else {
            return;
        };
        let pointer = layout.to_board(col, row);
        if let Some(next) = self.drag.drag_to(
            &self.board.contents,
            pointer,
            layout.bounds(),
            self.config.footprint,
        ) {
            self.board.commit(next);
        }
    }

    fn end_drag(&mut self, canceled: bool) {
        let change = if canceled {
            self.drag.cancel()
        } else {
            self.drag.release()
        };
        self.listeners.apply(change);
    }

    fn start_export(&mut self) {
        let request = ExportRequest {
            titles: self.board.titles.clone(),
            contents: self.board.contents.clone(),
            bounds: self.layout.and_then(|l| l.bounds()),
        };
        if self.exporter.start(request, self.export_dir.clone()) {
            info!(dir = %self.export_dir.display(), "export started");
            self.status = "Exporting image...".into();
        } else {
            self.status = "An export is already running".into();
        }
    }

    fn poll_export(&mut self) {
        match self.exporter.poll() {
            Some(Ok(path)) => self.status = format!("Exported to {}", path.display()),
            Some(Err(err)) => self.status = format!("Export failed: {}", err),
            None => {}
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_board(f, layout[1]);
        self.draw_footer(f, layout[2]);
        self.overlay = None;
        if self.editor.is_open() {
            self.draw_editor(f);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let counts = Quadrant::ALL
            .iter()
            .map(|q| format!("{} {}", q, self.board.contents.get(*q).len()))
            .collect::<Vec<_>>()
            .join("  ");
        let title = Line::from(vec![
            Span::styled(
                "quadrant ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(counts, Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                if self.exporter.is_busy() {
                    "exporting"
                } else {
                    "idle"
                },
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_board(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let layout = BoardLayout::compute(area, LABEL_GUTTER);
        self.layout = Some(layout);
        if layout.bounds().is_none() {
            f.render_widget(
                Paragraph::new("Terminal too small for the board").alignment(Alignment::Center),
                area,
            );
            return;
        }

        for (axis, rect) in layout.labels {
            self.draw_label(f, axis, rect);
        }
        f.render_widget(Block::default().style(Style::default().bg(BOARD_BG)), layout.board);
        draw_axes(f, layout.board);

        let dragging = match self.drag.state() {
            DragState::Dragging(session) => Some((session.quadrant, session.index)),
            DragState::Idle => None,
        };
        for (quadrant, items) in self.board.contents.iter() {
            for (index, item) in items.iter().enumerate() {
                let rect = layout.item_rect(item, self.config.footprint);
                draw_item(f, item, rect, dragging == Some((quadrant, index)));
            }
        }
    }

    fn draw_label(&self, f: &mut ratatui::Frame<'_>, axis: AxisKey, rect: Rect) {
        let (text, style) = match &self.mode {
            Mode::EditingTitle { axis: editing, field } if *editing == axis => (
                field.with_caret(),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightCyan)
                    .add_modifier(Modifier::BOLD),
            ),
            _ => (
                self.board.titles.get(axis).to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        let paragraph = Paragraph::new(Span::styled(text, style)).alignment(Alignment::Center);
        f.render_widget(paragraph, rect);
    }

    fn draw_editor(&mut self, f: &mut ratatui::Frame<'_>) {
        let (Some(layout), Some(position), Some(form)) =
            (self.layout, self.editor.position(), self.editor.form())
        else {
            return;
        };
        let (col, row) = layout.to_cell(position);
        let area = overlay_rect(col, row, f.size());
        let title = match &self.editor {
            Editor::OpenForEdit {
                quadrant, index, ..
            } => format!("Edit note {}#{}", quadrant, index + 1),
            Editor::OpenForCreate { quadrant, .. } => format!("New note in {}", quadrant),
            Editor::Closed => String::new(),
        };
        let dialog = Paragraph::new(form_lines(form))
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
        self.overlay = Some(area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Places the editor at the anchor cell, shifted back inside the frame if needed.
fn overlay_rect(col: u16, row: u16, frame: Rect) -> Rect {
    let width = OVERLAY_WIDTH.min(frame.width);
    let height = OVERLAY_HEIGHT.min(frame.height);
    Rect {
        x: col.min(frame.right().saturating_sub(width)),
        y: row.min(frame.bottom().saturating_sub(height)),
        width,
        height,
    }
}

fn draw_axes(f: &mut ratatui::Frame<'_>, board: Rect) {
    let mid_col = board.x + board.width / 2;
    let mid_row = board.y + board.height / 2;
    let axis = Style::default().fg(Color::DarkGray).bg(BOARD_BG);
    let buf = f.buffer_mut();
    for y in board.top()..board.bottom() {
        buf.get_mut(mid_col, y).set_symbol("│").set_style(axis);
    }
    for x in board.left()..board.right() {
        let symbol = if x == mid_col { "┼" } else { "─" };
        buf.get_mut(x, mid_row).set_symbol(symbol).set_style(axis);
    }
    buf.get_mut(board.right().saturating_sub(1), mid_row)
        .set_symbol("▶")
        .set_style(axis);
    buf.get_mut(mid_col, board.top()).set_symbol("▲").set_style(axis);

    let letter = Style::default()
        .fg(Color::Gray)
        .bg(BOARD_BG)
        .add_modifier(Modifier::DIM);
    let corners = [
        (Quadrant::A, mid_col.saturating_sub(2), board.y),
        (Quadrant::B, board.right().saturating_sub(2), board.y),
        (Quadrant::C, board.right().saturating_sub(2), mid_row + 1),
        (Quadrant::D, mid_col.saturating_sub(2), mid_row + 1),
    ];
    for (quadrant, x, y) in corners {
        if contains(board, x, y) {
            buf.get_mut(x, y)
                .set_symbol(quadrant.label())
                .set_style(letter);
        }
    }
}

fn draw_item(f: &mut ratatui::Frame<'_>, item: &Item, rect: Rect, grabbed: bool) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let color = Color::Rgb(item.color.0, item.color.1, item.color.2);
    let mut text_style = Style::default().fg(color).bg(NOTE_BG);
    if item.font_size >= 24 {
        text_style = text_style.add_modifier(Modifier::BOLD);
    }
    if item.is_todo && item.completed {
        text_style = text_style.add_modifier(Modifier::CROSSED_OUT);
    }
    let border = if grabbed {
        Style::default()
            .fg(Color::Cyan)
            .bg(NOTE_BG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray).bg(NOTE_BG)
    };
    let note = Paragraph::new(item.display_text())
        .style(text_style)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).border_style(border));
    f.render_widget(Clear, rect);
    f.render_widget(note, rect);

    let (x, y) = BoardLayout::delete_cell(rect);
    f.buffer_mut().get_mut(x, y).set_symbol("×").set_style(
        Style::default()
            .fg(Color::LightRed)
            .bg(NOTE_BG)
            .add_modifier(Modifier::BOLD),
    );
}

fn form_lines(form: &ItemForm) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    lines.extend(field_lines("Text", &form.text, form.field == FormField::Text));
    lines.extend(field_lines("Color", &form.color, form.field == FormField::Color));
    lines.extend(field_lines(
        "Font size",
        &form.font_size,
        form.field == FormField::FontSize,
    ));
    let check = if form.is_todo { "[x]" } else { "[ ]" };
    lines.push(Line::from(Span::styled(
        format!("{} To-do", check),
        Style::default().fg(if form.field == FormField::Todo {
            Color::Cyan
        } else {
            Color::White
        }),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Ctrl+Enter save • Esc cancel • Tab next field • Space toggles to-do",
        Style::default().fg(Color::Gray),
    )));
    lines
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let lead = if idx == 0 { prefix.clone() } else { spacer.clone() };
            Line::from(vec![
                Span::styled(lead, label_style),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("click", Style::default().fg(Color::LightMagenta)),
        Span::raw(" new  "),
        Span::styled("double-click", Style::default().fg(Color::LightYellow)),
        Span::raw(" edit  "),
        Span::styled("drag", Style::default().fg(Color::LightCyan)),
        Span::raw(" move  "),
        Span::styled("×", Style::default().fg(Color::LightRed)),
        Span::raw(" delete  "),
        Span::styled("□", Style::default().fg(Color::LightGreen)),
        Span::raw(" check  "),
        Span::styled("x", Style::default().fg(Color::LightGreen)),
        Span::raw(" export  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crossterm::event::KeyEventState;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let config = Config::default();
        let board = Board::new(config.titles.clone(), config.title_max_len);
        App::new(board, config, PathBuf::from("."))
    }

    fn drawn_app() -> App {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(68, 28)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn type_str(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    fn cell_of(app: &App, point: Point) -> (u16, u16) {
        app.layout.unwrap().to_cell(point)
    }

    fn redraw(app: &mut App, width: u16, height: u16) {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
    }

    fn note(text: &str, x: f32, y: f32, is_todo: bool) -> Item {
        Item {
            text: text.into(),
            color: crate::model::Rgb::BLACK,
            font_size: 16,
            position: Point::new(x, y),
            is_todo,
            completed: false,
        }
    }

    fn down(app: &mut App, col: u16, row: u16) {
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
    }

    fn up(app: &mut App, col: u16, row: u16) {
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), col, row));
    }

    fn move_to(app: &mut App, col: u16, row: u16) {
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), col, row));
    }

    #[test]
    fn click_type_save_adds_note() {
        let mut app = drawn_app();
        let (col, row) = cell_of(&app, Point::new(10.0, 20.0));
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), col, row));
        assert!(app.editor.is_open());
        type_str(&mut app, "hello");
        app.handle_key(key(KeyCode::Enter, KeyModifiers::CONTROL));

        assert!(!app.editor.is_open());
        let items = app.board.contents.get(Quadrant::A);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "hello");
        assert_eq!(items[0].position, Point::new(10.0, 20.0));
    }

    #[test]
    fn drag_listeners_only_live_during_drag() {
        let mut app = drawn_app();
        app.board.append_item(
            Quadrant::A,
            Item {
                text: "move me".into(),
                color: crate::model::Rgb::BLACK,
                font_size: 16,
                position: Point::new(0.0, 0.0),
                is_todo: false,
                completed: false,
            },
        );
        let layout = app.layout.unwrap();
        let (col, row) = cell_of(&app, Point::new(0.0, 0.0));
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), col + 2, row + 1));
        assert!(app.listeners.attached);

        let target = layout.board.right() - 2;
        let bottom = layout.board.bottom() - 1;
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), target, bottom));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), target, bottom));
        assert!(!app.listeners.attached);
        assert!(app.board.contents.get(Quadrant::A).is_empty());
        assert_eq!(app.board.contents.get(Quadrant::C).len(), 1);

        // Stray moves after release change nothing.
        let snapshot = app.board.contents.clone();
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), col, row));
        assert_eq!(app.board.contents, snapshot);
    }

    #[test]
    fn title_edits_are_capped() {
        let mut app = drawn_app();
        let (_, rect) = app.layout.unwrap().labels[2];
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), rect.x + 1, rect.y));
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Backspace, KeyModifiers::NONE));
        }
        type_str(&mut app, "Important and urgent");
        app.handle_key(key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.board.titles.get(AxisKey::Y1), "Important an");
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn vertical_drag_on_midline_column_keeps_quadrant() {
        let mut app = app();
        redraw(&mut app, 69, 28);
        let bounds = app.layout.unwrap().bounds().unwrap();
        app.board
            .append_item(Quadrant::B, note("on the axis", bounds.mid_x(), 40.0, false));
        let (col, row) = cell_of(&app, Point::new(bounds.mid_x(), 40.0));

        down(&mut app, col, row + 1);
        assert!(app.listeners.attached);
        move_to(&mut app, col, row + 2);
        up(&mut app, col, row + 2);

        assert!(app.board.contents.get(Quadrant::A).is_empty());
        let moved = app.board.contents.item(Quadrant::B, 0).unwrap();
        assert_eq!(moved.position, Point::new(bounds.mid_x(), 60.0));
    }

    #[test]
    fn new_press_ends_a_drag_whose_release_was_lost() {
        let mut app = drawn_app();
        app.board.append_item(Quadrant::A, note("first", 0.0, 0.0, false));
        app.board.append_item(Quadrant::A, note("second", 0.0, 80.0, false));
        app.board.append_item(Quadrant::A, note("third", 0.0, 140.0, false));
        let layout = app.layout.unwrap();
        let fp = app.config.footprint;
        let first = layout.item_rect(app.board.contents.item(Quadrant::A, 0).unwrap(), fp);
        let (first_x, first_y) = BoardLayout::delete_cell(first);
        let (col, row) = cell_of(&app, Point::new(0.0, 80.0));

        down(&mut app, col + 2, row + 1);
        assert!(app.listeners.attached);
        // Release happened outside the terminal; the next press deletes the first note.
        down(&mut app, first_x, first_y);
        assert!(!app.listeners.attached);
        assert_eq!(app.drag.state(), DragState::Idle);

        let snapshot = app.board.contents.clone();
        move_to(&mut app, col + 5, row + 8);
        assert_eq!(app.board.contents, snapshot);
        let texts: Vec<_> = snapshot
            .get(Quadrant::A)
            .iter()
            .map(|item| item.text.clone())
            .collect();
        assert_eq!(texts, ["second", "third"]);
    }

    #[test]
    fn focus_loss_cancels_drag() {
        let mut app = drawn_app();
        app.board.append_item(Quadrant::A, note("held", 0.0, 0.0, false));
        let (col, row) = cell_of(&app, Point::new(0.0, 0.0));
        down(&mut app, col + 2, row + 1);
        assert!(app.listeners.attached);

        assert!(!app.handle_event(Event::FocusLost));
        assert!(!app.listeners.attached);
        assert_eq!(app.drag.state(), DragState::Idle);
        assert!(app.handle_event(Event::Key(key(KeyCode::Char('q'), KeyModifiers::NONE))));
    }

    #[test]
    fn delete_control_removes_without_dragging() {
        let mut app = drawn_app();
        app.board.append_item(Quadrant::A, note("bye", 0.0, 0.0, false));
        let rect = app
            .layout
            .unwrap()
            .item_rect(app.board.contents.item(Quadrant::A, 0).unwrap(), app.config.footprint);
        let (x, y) = BoardLayout::delete_cell(rect);

        down(&mut app, x, y);
        assert!(app.board.contents.get(Quadrant::A).is_empty());
        assert!(!app.listeners.attached);
        assert_eq!(app.drag.state(), DragState::Idle);
    }

    #[test]
    fn double_click_opens_edit_at_stored_position() {
        let mut app = drawn_app();
        let stored = Point::new(30.0, 40.0);
        app.board.append_item(Quadrant::A, note("edit me", stored.x, stored.y, false));
        let (col, row) = cell_of(&app, stored);
        let (x, y) = (col + 3, row + 1);

        down(&mut app, x, y);
        up(&mut app, x, y);
        down(&mut app, x, y);

        assert!(!app.listeners.attached);
        match &app.editor {
            Editor::OpenForEdit {
                quadrant,
                index,
                position,
                form,
            } => {
                assert_eq!((*quadrant, *index), (Quadrant::A, 0));
                assert_eq!(*position, stored);
                assert_ne!(*position, app.layout.unwrap().to_board(x, y));
                assert_eq!(form.text.value, "edit me");
            }
            other => panic!("unexpected editor {:?}", other),
        }
        assert_eq!(app.board.contents.item(Quadrant::A, 0).unwrap().position, stored);
    }

    #[test]
    fn checkbox_click_toggles_once_in_place() {
        let mut app = drawn_app();
        app.board.append_item(Quadrant::C, note("buy milk", 250.0, 300.0, true));
        let rect = app
            .layout
            .unwrap()
            .item_rect(app.board.contents.item(Quadrant::C, 0).unwrap(), app.config.footprint);
        let (x, y) = BoardLayout::toggle_cell(rect);

        down(&mut app, x, y);
        up(&mut app, x, y);

        let item = app.board.contents.item(Quadrant::C, 0).unwrap();
        assert!(item.completed);
        assert_eq!(item.display_text(), "☑ buy milk");
        assert_eq!(item.position, Point::new(250.0, 300.0));
        assert!(!app.listeners.attached);
    }

    #[test]
    fn press_inside_editor_overlay_keeps_session() {
        let mut app = drawn_app();
        let (col, row) = cell_of(&app, Point::new(10.0, 20.0));
        down(&mut app, col, row);
        redraw(&mut app, 68, 28);
        let overlay = app.overlay.unwrap();
        let (x, y) = (overlay.x + 10, overlay.y + 5);
        assert!(contains(app.layout.unwrap().board, x, y));

        down(&mut app, x, y);
        match &app.editor {
            Editor::OpenForCreate { position, .. } => {
                assert_eq!(*position, Point::new(10.0, 20.0))
            }
            other => panic!("unexpected editor {:?}", other),
        }
    }

    #[test]
    fn export_without_layout_reports_failure() {
        let mut app = app();
        let dir = tempfile::tempdir().unwrap();
        app.export_dir = dir.path().to_path_buf();
        app.start_export();
        let deadline = Instant::now() + Duration::from_secs(10);
        while app.exporter.is_busy() && Instant::now() < deadline {
            app.poll_export();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(app.status.starts_with("Export failed"), "{}", app.status);
    }
}
