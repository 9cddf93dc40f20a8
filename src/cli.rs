use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None, name = "cxs", bin_name = "cxs")]
pub struct Cli {
    /// Override the configuration directory.
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,
    /// Read sessions from this directory instead of `$CODEX_HOME/sessions`.
    #[arg(long, value_name = "DIR", global = true)]
    pub sessions_dir: Option<PathBuf>,
    /// Program used to resume a session.
    #[arg(long, value_name = "BIN", global = true)]
    pub codex_bin: Option<String>,
    /// Print the selected session ID instead of resuming it.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub no_resume: bool,
    /// Print the fully-resolved resume command instead of executing it.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub emit_command: bool,
    /// Increase log verbosity (use -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Silence all log output.
    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    pub quiet: bool,
    /// Arguments forwarded to the resume command after `--`.
    #[arg(last = true, value_name = "RESUME_ARGS")]
    pub resume_args: Vec<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print aggregated sessions without starting the picker.
    List(ListCommand),
}

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Emit JSON results.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
    /// Maximum number of sessions to print.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Only include sessions updated within this duration (e.g. 7d, 12h).
    #[arg(long, value_parser = parse_since)]
    pub since: Option<Duration>,
}

fn parse_since(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|err| format!("invalid duration '{raw}': {err}"))
}
