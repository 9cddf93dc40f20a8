use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Deserialize;
use time::OffsetDateTime;
use walkdir::WalkDir;

use crate::events::{self, EventKind, LogEntry, SessionMeta};
use crate::session::Session;
use crate::util::parse_timestamp;

/// Longest accepted log line; payloads can embed large encrypted blobs.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

const SESSION_STARTED: &str = "session started";

/// Why a single log fragment could not be turned into a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("open: {0}")]
    Open(#[source] io::Error),
    #[error("read: {0}")]
    Read(#[source] io::Error),
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("decode log entry on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("decode session_meta payload on line {line}: {source}")]
    Meta {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing session id")]
    MissingId,
    #[error("{0}")]
    Walk(#[source] walkdir::Error),
}

/// Failures that abort a whole load.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("unable to determine home directory for the default sessions root")]
    HomeDirectory,
    #[error("stat sessions dir {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sessions path {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

#[derive(Debug)]
pub struct LoadError {
    pub path: PathBuf,
    pub error: ParseError,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            ParseError::Walk(err) => match err.io_error() {
                Some(cause) => write!(f, "walk {}: {cause}", self.path.display()),
                None => write!(f, "walk {}: {err}", self.path.display()),
            },
            error => write!(f, "parse {}: {error}", self.path.display()),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub sessions: Vec<Session>,
    pub scanned: usize,
    pub errors: Vec<LoadError>,
}

impl LoadReport {
    /// Combined message for every non-fatal failure, if any occurred.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(self.errors.iter().join("; "))
        }
    }
}

/// Discover and aggregate every session under `root`.
///
/// A missing root yields an empty report. Per-file failures are collected in
/// [`LoadReport::errors`] and never stop the walk.
///
/// # Errors
///
/// Returns [`SetupError`] when `root` exists but cannot be inspected or is not a
/// directory.
pub fn load(root: &Path) -> Result<LoadReport, SetupError> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "sessions root missing");
            return Ok(LoadReport::default());
        }
        Err(source) => {
            return Err(SetupError::Stat {
                path: root.to_path_buf(),
                source,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(SetupError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut report = LoadReport::default();
    let mut by_id: HashMap<String, Session> = HashMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), "failed to walk session directory: {err}");
                report.errors.push(LoadError {
                    path,
                    error: ParseError::Walk(err),
                });
                continue;
            }
        };
        if !is_session_file(&entry) {
            continue;
        }

        report.scanned += 1;
        let session = match parse_session_file(entry.path()) {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(path = %entry.path().display(), "skipping session file: {error}");
                report.errors.push(LoadError {
                    path: entry.path().to_path_buf(),
                    error,
                });
                continue;
            }
        };

        match by_id.get_mut(&session.id) {
            Some(existing) => existing.merge(session),
            None => {
                by_id.insert(session.id.clone(), session);
            }
        }
    }

    let mut sessions: Vec<Session> = by_id.into_values().collect();
    for session in &mut sessions {
        session.normalize_paths();
    }
    sessions.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::debug!(
        scanned = report.scanned,
        sessions = sessions.len(),
        errors = report.errors.len(),
        "loaded sessions"
    );
    report.sessions = sessions;
    Ok(report)
}

/// Parse a single log fragment into a [`Session`] record.
///
/// # Errors
///
/// Returns a [`ParseError`] when the file cannot be read, a line is malformed or
/// oversized, or no session identifier is present.
pub fn parse_session_file(path: &Path) -> Result<Session, ParseError> {
    let file = File::open(path).map_err(ParseError::Open)?;
    let mut reader = BufReader::new(file);

    let mut state = ParseState::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        let limit = u64::try_from(MAX_LINE_BYTES).unwrap_or(u64::MAX) + 1;
        let read = reader
            .by_ref()
            .take(limit)
            .read_until(b'\n', &mut buf)
            .map_err(ParseError::Read)?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let line = trim_line_ending(&buf);
        if line.len() > MAX_LINE_BYTES {
            return Err(ParseError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let entry: LogEntry = serde_json::from_slice(line).map_err(|source| ParseError::Decode {
            line: line_no,
            source,
        })?;
        state.apply(&entry, line_no)?;
    }

    state.finish(path)
}

#[derive(Default)]
struct ParseState {
    id: Option<String>,
    working_dir: String,
    created_at: Option<OffsetDateTime>,
    last_action: String,
    latest: Option<OffsetDateTime>,
}

impl ParseState {
    fn apply(&mut self, entry: &LogEntry, line: usize) -> Result<(), ParseError> {
        let kind = entry.event_kind();
        let ts = entry.timestamp.as_deref().and_then(parse_timestamp);

        if kind == EventKind::SessionMeta {
            let meta = SessionMeta::deserialize(&entry.payload)
                .map_err(|source| ParseError::Meta { line, source })?;
            self.id = meta.id.filter(|id| !id.is_empty());
            self.working_dir = meta.cwd.unwrap_or_default();
            if let Some(created) = meta.timestamp.as_deref().and_then(parse_timestamp) {
                self.created_at = Some(created);
            }
        }

        if self.latest.is_some() && ts <= self.latest {
            return Ok(());
        }
        if let Some(description) = events::describe(kind, &entry.payload) {
            self.last_action = description;
            self.latest = ts;
        } else if kind == EventKind::SessionMeta && self.last_action.is_empty() {
            SESSION_STARTED.clone_into(&mut self.last_action);
            self.latest = ts;
        }
        Ok(())
    }

    fn finish(self, path: &Path) -> Result<Session, ParseError> {
        let id = self.id.ok_or(ParseError::MissingId)?;
        let updated_at = self.latest;
        Ok(Session {
            id,
            created_at: self.created_at.or(updated_at),
            updated_at,
            working_dir: self.working_dir,
            last_action: self.last_action,
            file_paths: vec![path.to_path_buf()],
        })
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &buf[..end]
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(OsStr::to_str) == Some("jsonl")
}

// Links are not followed during the walk, so a linked fragment is checked
// against its target.
fn is_session_file(entry: &walkdir::DirEntry) -> bool {
    if !is_jsonl(entry.path()) {
        return false;
    }
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}
