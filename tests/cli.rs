use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use codex_sessions::test_support::{log_line, minimal_session_log, toml_path};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{Value, json};

#[allow(deprecated)]
fn base_command(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cxs-dev").expect("cxs-dev binary available");
    let config_dir = temp.child("config-root");
    config_dir.create_dir_all().unwrap();
    cmd.env("CXS_CONFIG_DIR", config_dir.path());

    let home_dir = temp.child("home");
    home_dir.create_dir_all().unwrap();
    cmd.env("HOME", home_dir.path());
    cmd.env("USERPROFILE", home_dir.path());

    let codex_home = temp.child("codex-home");
    codex_home.create_dir_all().unwrap();
    cmd.env("CODEX_HOME", codex_home.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_session(temp: &TempDir, relative: &str, contents: &str) -> color_eyre::Result<()> {
    temp.child("codex-home/sessions")
        .child(relative)
        .write_str(contents)?;
    Ok(())
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run cxs-dev");
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn list_json_merges_fragments_from_codex_home() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    write_session(
        &temp,
        "2024/05/01/a.jsonl",
        &minimal_session_log("S1", "/a", "2024-05-01T10:00:00Z", "2024-05-01T10:05:00Z", "hi"),
    )?;
    write_session(
        &temp,
        "2024/05/02/b.jsonl",
        &log_line(
            "session_meta",
            "2024-05-02T08:00:00Z",
            &json!({ "id": "S1", "timestamp": "2024-05-02T08:00:00Z", "cwd": "/b" }),
        ),
    )?;

    let value = json_output(base_command(&temp).args(["list", "--json"]));
    let sessions = value.as_array().expect("array");
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session["id"], "S1");
    assert_eq!(session["working_dir"], "/b");
    assert_eq!(session["last_action"], "session started");
    assert_eq!(session["created_at"], "2024-05-01T10:00:00Z");
    assert_eq!(session["updated_at"], "2024-05-02T08:00:00Z");
    assert_eq!(session["files"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn list_orders_by_recency_and_honours_limit() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    write_session(
        &temp,
        "old.jsonl",
        &minimal_session_log("OLD", "/w", "2024-01-01T00:00:00Z", "2024-01-01T00:05:00Z", "first"),
    )?;
    write_session(
        &temp,
        "new.jsonl",
        &minimal_session_log("NEW", "/w", "2024-06-01T00:00:00Z", "2024-06-01T00:05:00Z", "second"),
    )?;

    let value = json_output(base_command(&temp).args(["list", "--json"]));
    let ids: Vec<_> = value
        .as_array()
        .expect("array")
        .iter()
        .map(|s| s["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["NEW", "OLD"]);

    let value = json_output(base_command(&temp).args(["list", "--json", "--limit", "1"]));
    assert_eq!(value.as_array().map(Vec::len), Some(1));
    assert_eq!(value[0]["id"], "NEW");
    Ok(())
}

#[test]
fn list_table_prints_headers_and_actions() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    write_session(
        &temp,
        "a.jsonl",
        &minimal_session_log(
            "S1",
            "/srv/app",
            "2024-05-01T10:00:00Z",
            "2024-05-01T10:05:00Z",
            "ship it",
        ),
    )?;

    base_command(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(
            contains("Session ID")
                .and(contains("Last Action"))
                .and(contains("S1"))
                .and(contains("user_message: ship it")),
        );
    Ok(())
}

#[test]
fn missing_sessions_root_lists_nothing() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    base_command(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No sessions found."));

    let value = json_output(base_command(&temp).args(["list", "--json"]));
    assert_eq!(value, json!([]));
    Ok(())
}

#[test]
fn bad_fragment_warns_but_lists_the_rest() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    write_session(
        &temp,
        "good.jsonl",
        &minimal_session_log("S1", "/w", "2024-05-01T10:00:00Z", "2024-05-01T10:05:00Z", "fine"),
    )?;
    write_session(&temp, "broken.jsonl", "{not json\n")?;

    base_command(&temp)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(contains("\"S1\""))
        .stderr(contains("warning: parse").and(contains("broken.jsonl")));
    Ok(())
}

#[test]
fn sessions_dir_flag_overrides_codex_home() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    let custom = temp.child("custom");
    custom
        .child("x.jsonl")
        .write_str(&minimal_session_log(
            "CUSTOM",
            "/w",
            "2024-05-01T10:00:00Z",
            "2024-05-01T10:05:00Z",
            "x",
        ))?;
    write_session(
        &temp,
        "y.jsonl",
        &minimal_session_log("DEFAULT", "/w", "2024-05-01T10:00:00Z", "2024-05-01T10:05:00Z", "y"),
    )?;

    let value = json_output(
        base_command(&temp)
            .arg("--sessions-dir")
            .arg(custom.path())
            .args(["list", "--json"]),
    );
    assert_eq!(value.as_array().map(Vec::len), Some(1));
    assert_eq!(value[0]["id"], "CUSTOM");
    Ok(())
}

#[test]
fn config_sessions_dir_is_used() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    let configured = temp.child("configured");
    configured
        .child("x.jsonl")
        .write_str(&minimal_session_log(
            "CONF",
            "/w",
            "2024-05-01T10:00:00Z",
            "2024-05-01T10:05:00Z",
            "x",
        ))?;
    temp.child("config-root/config.toml").write_str(&format!(
        "[sessions]\ndir = \"{}\"\n",
        toml_path(configured.path())
    ))?;

    let value = json_output(base_command(&temp).args(["list", "--json"]));
    assert_eq!(value[0]["id"], "CONF");
    Ok(())
}

#[test]
fn sessions_root_that_is_a_file_fails() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    let file = temp.child("plain-file");
    file.write_str("x")?;

    base_command(&temp)
        .arg("--sessions-dir")
        .arg(file.path())
        .arg("list")
        .assert()
        .code(1)
        .stderr(
            contains("cxs: failed to load sessions from")
                .and(contains("caused by: sessions path")),
        );
    Ok(())
}

#[test]
fn invalid_config_prints_error_chain() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    temp.child("config-root/config.toml")
        .write_str("[resume\nbin = 1")?;

    base_command(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("cxs: failed to parse"));
    Ok(())
}

#[test]
fn invalid_since_is_rejected() -> color_eyre::Result<()> {
    let temp = TempDir::new()?;
    base_command(&temp)
        .args(["list", "--since", "whenever"])
        .assert()
        .failure()
        .stderr(contains("invalid duration 'whenever'"));
    Ok(())
}
