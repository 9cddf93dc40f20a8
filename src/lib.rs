pub mod config;
pub mod events;
pub mod indexer;
pub mod picker;
pub mod providers;
pub mod search;
pub mod session;

mod app;
pub mod cli;
#[doc(hidden)]
pub mod test_support;
mod tui;
mod util;

use std::io::Write;

use clap::{CommandFactory, Parser};
use cli::Command;

pub use app::AppError;
pub use cli::Cli;

/// Parse command-line arguments for the `cxs` binaries.
#[must_use]
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the cxs CLI entrypoint.
///
/// # Errors
///
/// Returns an error when initialization or the chosen command fails to execute.
pub fn run(cli: &Cli) -> color_eyre::Result<()> {
    init_tracing(cli);

    let app = app::App::bootstrap(cli)?;

    match &cli.command {
        Some(Command::List(cmd)) => app.list(cmd),
        None => app.run_ui(),
    }
}

/// Process exit code for a failed run: the resume program's own code when it
/// reported one, otherwise 1.
#[must_use]
pub fn exit_code_for_error(err: &color_eyre::Report) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::ResumeFailed { code: Some(code) }) if *code != 0 => *code,
        _ => 1,
    }
}

/// Print an error and its causes the way the binaries report failures.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_cli_error(err: &color_eyre::Report, mut out: impl Write) -> std::io::Result<()> {
    let mut chain = err.chain();
    if let Some(head) = chain.next() {
        writeln!(out, "cxs: {head}")?;
    }
    for cause in chain {
        writeln!(out, "    caused by: {cause}")?;
    }
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let level = desired_level(cli);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn desired_level(cli: &Cli) -> tracing::level_filters::LevelFilter {
    if cli.quiet {
        return tracing::level_filters::LevelFilter::ERROR;
    }

    match cli.verbose {
        0 => tracing::level_filters::LevelFilter::INFO,
        1 => tracing::level_filters::LevelFilter::DEBUG,
        _ => tracing::level_filters::LevelFilter::TRACE,
    }
}

#[must_use]
pub fn command() -> clap::Command {
    Cli::command()
}
