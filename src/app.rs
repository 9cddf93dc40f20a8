use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use serde_json::json;
use time::OffsetDateTime;
use tracing::debug;
use which::which;

use crate::cli::{Cli, ListCommand};
use crate::config::{self, Config};
use crate::indexer::{self, LoadReport};
use crate::picker::{Exit, Picker};
use crate::providers::{ResumePlan, codex};
use crate::session::Session;
use crate::tui;
use crate::util;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("command exited with status {}", describe_code(*code))]
    ResumeFailed { code: Option<i32> },
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(|| "unknown (terminated by signal)".to_string(), |c| c.to_string())
}

pub struct App<'cli> {
    pub cli: &'cli Cli,
    pub config: Config,
    pub sessions_root: PathBuf,
}

impl<'cli> App<'cli> {
    /// Load configuration and resolve the sessions root.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or no sessions root
    /// can be determined.
    pub fn bootstrap(cli: &'cli Cli) -> Result<Self> {
        let config = Config::load(cli.config_dir.as_deref())?;
        let sessions_root = config::resolve_sessions_dir(cli.sessions_dir.as_deref(), &config)?;
        debug!(root = %sessions_root.display(), "resolved sessions root");
        Ok(Self {
            cli,
            config,
            sessions_root,
        })
    }

    /// Run the interactive picker and act on the selection.
    ///
    /// # Errors
    ///
    /// Returns an error if sessions cannot be loaded, the terminal fails, or the
    /// resume command cannot be run to a successful exit.
    pub fn run_ui(&self) -> Result<()> {
        let report = self.load_sessions()?;
        let warning = report.warning();
        let mut picker = Picker::new(report.sessions, &self.sessions_root, warning);

        match tui::run(&mut picker)? {
            Exit::Cancel => Ok(()),
            Exit::Resume(id) => self.finish(&id, io::stdout()),
        }
    }

    /// Render the aggregated sessions without the picker.
    ///
    /// # Errors
    ///
    /// Returns an error if sessions cannot be loaded or JSON serialization fails.
    pub fn list(&self, cmd: &ListCommand) -> Result<()> {
        let report = self.load_sessions()?;
        let sessions = select_sessions(report.sessions, cmd, OffsetDateTime::now_utc());

        if cmd.json {
            let payload: Vec<_> = sessions.iter().map(session_to_json).collect();
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }

        if sessions.is_empty() {
            println!("No sessions found.");
            return Ok(());
        }

        print_sessions_table(&sessions);
        Ok(())
    }

    /// Resume, print, or emit the command for a chosen session.
    ///
    /// Printed IDs and emitted commands go to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails, or the resume program is missing or
    /// exits unsuccessfully.
    pub fn finish(&self, session_id: &str, mut out: impl Write) -> Result<()> {
        if self.cli.no_resume || self.config.resume.no_resume {
            writeln!(out, "{session_id}")?;
            out.flush()?;
            return Ok(());
        }

        let plan = self.resume_plan(session_id);
        if self.cli.emit_command {
            emit_command(&plan, out)
        } else {
            execute_plan(&plan)
        }
    }

    fn resume_plan(&self, session_id: &str) -> ResumePlan {
        codex::resume_plan(
            session_id,
            &self.config.resume,
            self.cli.codex_bin.as_deref(),
            &self.cli.resume_args,
        )
    }

    fn load_sessions(&self) -> Result<LoadReport> {
        let report = indexer::load(&self.sessions_root).wrap_err_with(|| {
            format!(
                "failed to load sessions from {}",
                self.sessions_root.display()
            )
        })?;
        log_load_report(&report);
        if let Some(warning) = report.warning() {
            eprintln!("warning: {warning}");
        }
        Ok(report)
    }
}

pub(crate) fn emit_command(plan: &ResumePlan, mut out: impl Write) -> Result<()> {
    writeln!(out, "{}", plan.display())?;
    out.flush()?;
    Ok(())
}

pub(crate) fn execute_plan(plan: &ResumePlan) -> Result<()> {
    let program = resolve_program(&plan.program)?;
    debug!(program = %program.display(), args = ?plan.args, "resuming session");
    let status = Command::new(&program)
        .args(&plan.args)
        .status()
        .wrap_err_with(|| format!("failed to run {}", program.display()))?;
    if !status.success() {
        return Err(AppError::ResumeFailed {
            code: status.code(),
        }
        .into());
    }
    Ok(())
}

fn resolve_program(program: &str) -> Result<PathBuf> {
    which(program).map_err(|err| eyre!("resume program '{program}' not found: {err}"))
}

fn select_sessions(sessions: Vec<Session>, cmd: &ListCommand, now: OffsetDateTime) -> Vec<Session> {
    let cutoff = cmd.since.map(|window| {
        time::Duration::try_from(window)
            .ok()
            .and_then(|window| now.checked_sub(window))
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    });
    let limit = cmd.limit.unwrap_or(usize::MAX);
    sessions
        .into_iter()
        .filter(|session| match cutoff {
            Some(cutoff) => session.updated_at.is_some_and(|updated| updated >= cutoff),
            None => true,
        })
        .take(limit)
        .collect()
}

fn session_to_json(session: &Session) -> serde_json::Value {
    let files: Vec<_> = session
        .file_paths
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    json!({
        "id": session.id,
        "created_at": util::format_rfc3339(session.created_at),
        "updated_at": util::format_rfc3339(session.updated_at),
        "working_dir": session.working_dir,
        "last_action": session.last_action,
        "files": files,
    })
}

fn print_sessions_table(sessions: &[Session]) {
    println!(
        "{:<16} {:<36} {:<40} Last Action",
        "Updated", "Session ID", "Directory"
    );
    println!("{}", "-".repeat(120));
    for session in sessions {
        println!(
            "{:<16} {:<36} {:<40} {}",
            util::format_local_minute(session.updated_at),
            session.id,
            util::abbreviate_path(&session.working_dir, 40),
            util::truncate_text(&session.last_action, 80),
        );
    }
}

fn log_load_report(report: &LoadReport) {
    debug!(
        scanned = report.scanned,
        sessions = report.sessions.len(),
        failures = report.errors.len(),
        "session load complete"
    );
}
