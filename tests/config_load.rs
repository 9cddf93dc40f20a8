use assert_fs::TempDir;
use assert_fs::prelude::*;
use codex_sessions::config::{self, Config};
use codex_sessions::test_support::{ENV_LOCK, EnvOverride, toml_path};
use color_eyre::Result;

#[test]
fn load_merges_dropins_with_override_directory() -> Result<()> {
    let temp = TempDir::new()?;
    let config_dir = temp.child("config");
    config_dir.child("config.toml").write_str(&format!(
        "[sessions]\ndir = \"{}\"\n[resume]\nbin = \"codex\"\n",
        toml_path(&temp.path().join("logs"))
    ))?;
    config_dir
        .child("conf.d/10-resume.toml")
        .write_str("[resume]\nargs = [\"--search\"]\n")?;

    let config = Config::load(Some(config_dir.path()))?;
    assert_eq!(config.sessions.dir, Some(temp.path().join("logs")));
    assert_eq!(config.resume.bin, "codex");
    assert_eq!(config.resume.args, vec!["--search".to_string()]);
    Ok(())
}

#[test]
fn xdg_config_home_is_consulted() -> Result<()> {
    let _guard = ENV_LOCK.lock().unwrap();
    let temp = TempDir::new()?;
    temp.child("cxs/config.toml")
        .write_str("[resume]\nno_resume = true\n")?;
    let _explicit = EnvOverride::remove("CXS_CONFIG_DIR");
    let _xdg = EnvOverride::set_path("XDG_CONFIG_HOME", temp.path());

    let config = Config::load(None)?;
    assert!(config.resume.no_resume);
    Ok(())
}

#[test]
fn explicit_env_dir_beats_xdg() -> Result<()> {
    let _guard = ENV_LOCK.lock().unwrap();
    let temp = TempDir::new()?;
    temp.child("xdg/cxs/config.toml")
        .write_str("[resume]\nbin = \"from-xdg\"\n")?;
    temp.child("explicit/config.toml")
        .write_str("[resume]\nbin = \"from-env\"\n")?;
    let _xdg = EnvOverride::set_path("XDG_CONFIG_HOME", &temp.path().join("xdg"));
    let _explicit = EnvOverride::set_path("CXS_CONFIG_DIR", &temp.path().join("explicit"));

    let config = Config::load(None)?;
    assert_eq!(config.resume.bin, "from-env");
    Ok(())
}

#[test]
fn blank_codex_home_falls_through_to_home() -> Result<()> {
    let _guard = ENV_LOCK.lock().unwrap();
    let temp = TempDir::new()?;
    let _codex = EnvOverride::set_var("CODEX_HOME", "");
    let _home = EnvOverride::set_path("HOME", temp.path());

    let resolved = config::resolve_sessions_dir(None, &Config::default())?;
    if cfg!(unix) {
        assert_eq!(resolved, temp.path().join(".codex").join("sessions"));
    } else {
        assert!(resolved.ends_with(".codex/sessions"));
    }
    Ok(())
}
