fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = codex_sessions::parse_cli();
    match codex_sessions::run(&cli) {
        Ok(()) => Ok(()),
        Err(err) => {
            let exit_code = codex_sessions::exit_code_for_error(&err);
            codex_sessions::write_cli_error(&err, &mut std::io::stderr())?;
            std::process::exit(exit_code);
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use clap::Parser;
    use codex_sessions::Cli;
    use codex_sessions::test_support::{ENV_LOCK, EnvOverride, minimal_session_log};

    #[test]
    fn main_handles_successful_list_run() -> color_eyre::Result<()> {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp = TempDir::new()?;
        let _config = EnvOverride::set_path("CXS_CONFIG_DIR", &temp.path().join("config"));
        let sessions = temp.child("sessions");
        sessions
            .child("2024/05/01/a.jsonl")
            .write_str(&minimal_session_log(
                "S1",
                "/work",
                "2024-05-01T10:00:00Z",
                "2024-05-01T10:05:00Z",
                "hello",
            ))?;

        let cli = Cli::try_parse_from([
            "cxs",
            "--sessions-dir",
            sessions.path().to_str().expect("utf8 path"),
            "list",
            "--json",
        ])?;
        codex_sessions::run(&cli)
    }

    #[test]
    fn main_fails_when_sessions_root_is_a_file() -> color_eyre::Result<()> {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp = TempDir::new()?;
        let _config = EnvOverride::set_path("CXS_CONFIG_DIR", &temp.path().join("config"));
        let file = temp.child("not-a-dir");
        file.write_str("x")?;

        let cli = Cli::try_parse_from([
            "cxs",
            "--sessions-dir",
            file.path().to_str().expect("utf8 path"),
            "list",
        ])?;
        let err = codex_sessions::run(&cli).unwrap_err();
        assert_eq!(codex_sessions::exit_code_for_error(&err), 1);

        let mut rendered = Vec::new();
        codex_sessions::write_cli_error(&err, &mut rendered)?;
        let rendered = String::from_utf8(rendered)?;
        assert!(rendered.starts_with("cxs: failed to load sessions from"));
        assert!(rendered.contains("caused by: sessions path"));
        Ok(())
    }
}
