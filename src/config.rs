use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::{Result, Section, SectionExt, eyre::Context};
use directories::BaseDirs;
use serde::Deserialize;

use crate::indexer::SetupError;

const CONFIG_FILE: &str = "config.toml";
const CONF_D_DIR: &str = "conf.d";
const APP_CONFIG_DIR: &str = "cxs";
const ENV_CONFIG_DIR: &str = "CXS_CONFIG_DIR";
const ENV_CODEX_HOME: &str = "CODEX_HOME";
const DEFAULT_RESUME_BIN: &str = "codex";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sessions: SessionsConfig,
    pub resume: ResumeConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SessionsConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResumeConfig {
    pub bin: String,
    pub args: Vec<String>,
    pub no_resume: bool,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            bin: DEFAULT_RESUME_BIN.to_string(),
            args: Vec::new(),
            no_resume: false,
        }
    }
}

impl Config {
    /// Load configuration from the standard directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be read or parsed as TOML,
    /// or if `sessions.dir` references an undefined environment variable.
    pub fn load(dir_override: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();
        let Some(root) = locate_config_dir(dir_override) else {
            return Ok(config);
        };

        if !root.exists() {
            tracing::debug!(path = %root.display(), "config directory missing; using defaults");
            return Ok(config);
        }

        if root.is_file() {
            tracing::warn!(
                path = %root.display(),
                "Config path points to a file; skipping configuration load"
            );
            return Ok(config);
        }

        let main = root.join(CONFIG_FILE);
        if main.is_file() {
            config.apply_file(&main)?;
        }

        let conf_d = root.join(CONF_D_DIR);
        if conf_d.is_dir() {
            let mut entries = fs::read_dir(&conf_d)
                .with_context(|| format!("failed to read {}", conf_d.display()))?
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().map(|ty| ty.is_file()).unwrap_or(false))
                .map(|entry| entry.path())
                .filter(|path| is_toml_file(path))
                .collect::<Vec<PathBuf>>();

            entries.sort();

            for entry in entries {
                config.apply_file(&entry)?;
            }
        }

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
            .map_err(|err| {
                err.with_section(|| {
                    format!(
                        "Ensure the file exists and is readable.\nResolved path: {}",
                        path.display()
                    )
                    .header("Suggested fix")
                })
            })?;
        let partial: PartialConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
            .map_err(|err| {
                err.with_section(|| {
                    format!(
                        "Double-check the TOML syntax or remove the file if it is no longer needed.\nResolved path: {}",
                        path.display()
                    )
                    .header("Suggested fix")
                })
            })?;
        tracing::debug!(path = %path.display(), "applied config file");
        self.merge(partial)
    }

    fn merge(&mut self, partial: PartialConfig) -> Result<()> {
        if let Some(dir) = partial.sessions.dir {
            self.sessions.dir = Some(expand_path(&dir)?);
        }
        if let Some(bin) = partial.resume.bin {
            self.resume.bin = bin;
        }
        if let Some(args) = partial.resume.args {
            self.resume.args = args;
        }
        if let Some(no_resume) = partial.resume.no_resume {
            self.resume.no_resume = no_resume;
        }
        Ok(())
    }
}

/// Pick the sessions root: explicit flag, then config, then `CODEX_HOME`, then `~/.codex`.
///
/// # Errors
///
/// Returns [`SetupError::HomeDirectory`] when every fallback is exhausted and the
/// home directory cannot be determined.
pub fn resolve_sessions_dir(flag: Option<&Path>, config: &Config) -> Result<PathBuf, SetupError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.sessions.dir {
        return Ok(path.clone());
    }
    if let Some(home) = std::env::var_os(ENV_CODEX_HOME).filter(|raw| !raw.is_empty()) {
        return Ok(PathBuf::from(home).join("sessions"));
    }
    let base = BaseDirs::new().ok_or(SetupError::HomeDirectory)?;
    Ok(base.home_dir().join(".codex").join("sessions"))
}

fn locate_config_dir(dir_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = dir_override {
        return Some(path.to_path_buf());
    }

    if let Some(raw) = std::env::var(ENV_CONFIG_DIR)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
    {
        return Some(PathBuf::from(raw));
    }

    if let Some(xdg_home) = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|home| !home.trim().is_empty())
    {
        return Some(Path::new(&xdg_home).join(APP_CONFIG_DIR));
    }

    let base_dirs = BaseDirs::new()?;
    Some(base_dirs.config_dir().join(APP_CONFIG_DIR))
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("failed to expand path '{raw}': environment variable missing"))
        .map_err(|err| {
            err.with_section(|| {
                "Export the referenced variable or write the sessions path literally."
                    .header("Suggested fix")
            })
        })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn is_toml_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    #[serde(default)]
    sessions: PartialSessionsConfig,
    #[serde(default)]
    resume: PartialResumeConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PartialSessionsConfig {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialResumeConfig {
    bin: Option<String>,
    args: Option<Vec<String>>,
    no_resume: Option<bool>,
}
