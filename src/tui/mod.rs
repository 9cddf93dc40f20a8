use std::io::{self, Stdout};
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Row as TableRow, Table, TableState};
use ratatui::{Frame, Terminal};

use crate::picker::{Exit, HELP_TEXT, Input, Picker, PickerView, SEARCH_PROMPT};

mod sanitize;

use sanitize::sanitize_cell;

const UPDATED_WIDTH: u16 = 16;
const ID_WIDTH: u16 = 36;
const DIRECTORY_WIDTH: u16 = 40;

/// Run the picker until the user resumes a session or exits.
///
/// # Errors
///
/// Returns an error if terminal IO fails.
pub fn run(picker: &mut Picker) -> Result<Exit> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(picker, &mut terminal);

    disable_raw_mode()?;
    terminal
        .backend_mut()
        .execute(crossterm::terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(picker: &mut Picker, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<Exit> {
    loop {
        draw_picker(terminal, picker)?;

        if event::poll(Duration::from_millis(200))?
            && let Event::Key(key) = event::read()?
            && let Some(input) = input_for_key(key)
            && let Some(exit) = picker.handle(input)
        {
            return Ok(exit);
        }
    }
}

pub(crate) fn draw_picker<B: Backend>(
    terminal: &mut Terminal<B>,
    picker: &mut Picker,
) -> io::Result<()> {
    terminal.draw(|frame| draw(frame, picker))?;
    Ok(())
}

/// Translate a terminal key press into a picker input.
pub(crate) fn input_for_key(key: KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let input = match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Input::Quit,
        (KeyCode::Esc, _) => Input::Escape,
        (KeyCode::Enter, _) => Input::Confirm,
        (KeyCode::Delete, _) => Input::Delete,
        (KeyCode::Backspace, _) => Input::Backspace,
        (KeyCode::Up, _) => Input::Up,
        (KeyCode::Down, _) => Input::Down,
        (KeyCode::PageUp, _) => Input::PageUp,
        (KeyCode::PageDown, _) => Input::PageDown,
        (KeyCode::Char(ch), mods) if mods.is_empty() || mods == KeyModifiers::SHIFT => {
            Input::Char(ch)
        }
        _ => return None,
    };
    Some(input)
}

fn draw(frame: &mut Frame<'_>, picker: &mut Picker) {
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // One table line is taken by the header.
    picker.set_page_size(usize::from(areas[3].height.saturating_sub(1)));
    let view = picker.view();

    draw_search(frame, areas[0], &view);
    frame.render_widget(Paragraph::new(view.info_line()), areas[2]);
    draw_table(frame, areas[3], &view);
    frame.render_widget(
        Paragraph::new(HELP_TEXT).style(Style::default().fg(Color::Green)),
        areas[5],
    );
    frame.render_widget(Paragraph::new(sanitize_cell(&view.status)), areas[6]);
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, view: &PickerView) {
    let line = Line::from(vec![
        Span::styled(
            SEARCH_PROMPT,
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(sanitize_cell(&view.query)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_table(frame: &mut Frame<'_>, area: Rect, view: &PickerView) {
    let header = TableRow::new(["Updated", "Session ID", "Directory", "Last Action"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = view.rows.iter().map(|row| {
        TableRow::new([
            sanitize_cell(&row.updated),
            sanitize_cell(&row.id),
            sanitize_cell(&row.directory),
            sanitize_cell(&row.last_action),
        ])
    });
    let widths = [
        Constraint::Length(UPDATED_WIDTH),
        Constraint::Length(ID_WIDTH),
        Constraint::Length(DIRECTORY_WIDTH),
        Constraint::Fill(1),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    let mut state = TableState::default().with_selected(view.selected_in_page);
    frame.render_stateful_widget(table, area, &mut state);
}
