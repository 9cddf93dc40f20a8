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
