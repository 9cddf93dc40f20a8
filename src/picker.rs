use std::path::PathBuf;

use crate::search::{self, Row};
use crate::session::{self, Session};
use crate::util::{abbreviate_path, format_local_minute, truncate_text};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const SEARCH_PROMPT: &str = "Search> ";
pub const HELP_TEXT: &str = "Up/Down move  PgUp/PgDn page  Enter resume  Del delete  Type to search  Backspace delete  Esc clear/exit  Ctrl+C quit";

const DIRECTORY_WIDTH: usize = 40;
const ACTION_WIDTH: usize = 80;

/// Discrete input delivered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Backspace,
    Escape,
    Confirm,
    Delete,
    Up,
    Down,
    PageUp,
    PageDown,
    Quit,
}

/// How the picker finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Resume(String),
    Cancel,
}

impl Exit {
    /// The selected session ID, or an empty string when nothing was chosen.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Exit::Resume(id) => id,
            Exit::Cancel => "",
        }
    }
}

/// Filtered, paginated selection over aggregated sessions.
#[derive(Debug)]
pub struct Picker {
    rows: Vec<Row>,
    filtered: Vec<usize>,
    selected: usize,
    page_size: usize,
    query: String,
    status: String,
    root: PathBuf,
}

/// Snapshot handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerView {
    pub query: String,
    pub matches: usize,
    pub total: usize,
    pub showing: usize,
    pub rows: Vec<RowView>,
    pub selected_in_page: Option<usize>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub updated: String,
    pub id: String,
    pub directory: String,
    pub last_action: String,
}

impl PickerView {
    #[must_use]
    pub fn info_line(&self) -> String {
        format!(
            "Matches: {} / Total: {} | Showing: {}",
            self.matches, self.total, self.showing
        )
    }
}

impl Picker {
    #[must_use]
    pub fn new(sessions: Vec<Session>, root: impl Into<PathBuf>, status: Option<String>) -> Self {
        let rows = sessions.into_iter().map(Row::new).collect();
        let mut picker = Self {
            rows,
            filtered: Vec::new(),
            selected: 0,
            page_size: DEFAULT_PAGE_SIZE,
            query: String::new(),
            status: status.unwrap_or_default(),
            root: root.into(),
        };
        picker.apply_filter();
        picker
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn filtered(&self) -> &[usize] {
        &self.filtered
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn selected_session(&self) -> Option<&Session> {
        let index = *self.filtered.get(self.selected)?;
        self.rows.get(index).map(|row| &row.session)
    }

    /// Record how many rows the renderer can show.
    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    /// Apply one input. Returns `Some` once the picker should close.
    pub fn handle(&mut self, input: Input) -> Option<Exit> {
        match input {
            Input::Char(ch) => {
                if !ch.is_control() {
                    self.query.push(ch);
                    self.apply_filter();
                }
                None
            }
            Input::Backspace => {
                if self.query.pop().is_some() {
                    self.apply_filter();
                }
                None
            }
            Input::Escape => {
                if self.query.is_empty() {
                    return Some(Exit::Cancel);
                }
                self.query.clear();
                self.apply_filter();
                None
            }
            Input::Confirm => self
                .selected_session()
                .map(|session| Exit::Resume(session.id.clone())),
            Input::Delete => {
                self.delete_selected();
                None
            }
            Input::Up => {
                self.move_selection(-1);
                None
            }
            Input::Down => {
                self.move_selection(1);
                None
            }
            Input::PageUp => {
                self.move_selection(-self.page_delta());
                None
            }
            Input::PageDown => {
                self.move_selection(self.page_delta());
                None
            }
            Input::Quit => Some(Exit::Cancel),
        }
    }

    /// Move the cursor by `delta`, clamped to the filtered list.
    pub fn move_selection(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            return;
        }
        let max_index = self.filtered.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(max_index);
    }

    /// Delete the selected session's files and drop it from the list.
    pub fn delete_selected(&mut self) {
        let Some(&index) = self.filtered.get(self.selected) else {
            self.status = "Nothing to delete".to_string();
            return;
        };
        let session = &self.rows[index].session;
        if let Err(err) = session::delete_files(session, &self.root) {
            tracing::warn!(id = %session.id, "failed to delete session: {err}");
            self.status = format!("Delete failed: {err}");
            return;
        }
        let removed = self.rows.remove(index);
        tracing::info!(id = %removed.session.id, "deleted session");
        self.status = format!("Session {} deleted", removed.session.id);
        self.apply_filter();
    }

    /// Snapshot the page that contains the cursor.
    #[must_use]
    pub fn view(&self) -> PickerView {
        let page_start = (self.selected / self.page_size) * self.page_size;
        let rows = self
            .filtered
            .iter()
            .skip(page_start)
            .take(self.page_size)
            .map(|&index| row_view(&self.rows[index].session))
            .collect::<Vec<_>>();
        let selected_in_page = (!self.filtered.is_empty()).then(|| self.selected - page_start);

        PickerView {
            query: self.query.clone(),
            matches: self.filtered.len(),
            total: self.rows.len(),
            showing: self.filtered.len().min(self.page_size),
            rows,
            selected_in_page,
            status: self.status.clone(),
        }
    }

    fn page_delta(&self) -> isize {
        isize::try_from(self.page_size).unwrap_or(isize::MAX)
    }

    fn apply_filter(&mut self) {
        self.filtered = search::rank(&self.query, &self.rows);
        if self.filtered.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len() - 1;
        }
    }
}

fn row_view(session: &Session) -> RowView {
    RowView {
        updated: format_local_minute(session.updated_at),
        id: session.id.clone(),
        directory: abbreviate_path(&session.working_dir, DIRECTORY_WIDTH),
        last_action: truncate_text(&session.last_action, ACTION_WIDTH),
    }
}
