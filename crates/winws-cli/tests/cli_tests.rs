//! End-to-end tests of the winws-manager binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .canonicalize()
        .unwrap()
}

/// Temp work dir with a config pointing at the shipped data
struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data = data_dir();
        let config = dir.path().join("winws-manager.toml");
        fs::write(
            &config,
            format!(
                "[paths]\n\
                 work_dir = '{work}'\n\
                 builtin_strategies = '{data}/strategies/builtin'\n\
                 categories = '{data}/strategies/categories.json'\n\
                 filter_dir = '{data}/windivert.filter'\n\
                 \n\
                 [state]\n\
                 backend = 'file'\n\
                 file = 'state.json'\n",
                work = dir.path().display(),
                data = data.display(),
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("winws-manager").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("WINWS_MANAGER_CONFIG")
            .env("RUST_LOG", "error")
            .arg("--config")
            .arg(&self.config);
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("winws-manager")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("autostart"))
        .stdout(predicate::str::contains("strategies"));
}

#[test]
fn test_generate_then_validate() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("generated.toml");

    Command::cargo_bin("winws-manager")
        .unwrap()
        .current_dir(dir.path())
        .args(["config", "generate", "--output"])
        .arg(&output)
        .assert()
        .success();
    assert!(fs::read_to_string(&output).unwrap().contains("[autostart]"));

    Command::cargo_bin("winws-manager")
        .unwrap()
        .current_dir(dir.path())
        .args(["config", "generate", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    Command::cargo_bin("winws-manager")
        .unwrap()
        .current_dir(dir.path())
        .args(["config", "validate"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_invalid_config_is_reported() {
    let fixture = Fixture::new();
    fs::write(&fixture.config, "[autostart]\ntimeout_secs = 600\n").unwrap();

    fixture
        .cmd()
        .args(["categories", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_secs"));
}

#[test]
fn test_categories_and_strategies_listing() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube"))
        .stdout(predicate::str::contains("discord_voice"));

    fixture
        .cmd()
        .args(["strategies", "list", "tcp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other_seqovl"))
        .stdout(predicate::str::contains("split_legacy").not());

    fixture
        .cmd()
        .args(["strategies", "list", "tcp", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("split_legacy"));

    fixture
        .cmd()
        .args(["categories", "filters", "discord_voice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("raw_discord"));
}

#[test]
fn test_select_and_build() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["select", "youtube", "other_seqovl"])
        .assert()
        .success();
    fixture
        .cmd()
        .args(["select", "youtube", "no_such_strategy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown strategy"));
    fixture
        .cmd()
        .args(["select", "youtube", "split_legacy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));

    let output = fixture.cmd().args(["build", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let built: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(built["active_categories"], serde_json::json!(["youtube"]));
    let tokens: Vec<&str> = built["tokens"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(tokens[0], "--wf-tcp=443");
    assert!(tokens.contains(&"--filter-tcp=443"));
    assert!(!tokens.contains(&"--new"));

    fixture
        .cmd()
        .args(["build", "--no-capture", "--format", "tokens"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--wf-tcp").not())
        .stdout(predicate::str::contains("--dpi-desync=multisplit"));
}

#[test]
fn test_build_overrides_do_not_persist() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["build", "--select", "http=http_fake_split", "--select", "youtube_quic=quic_fake"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--new"))
        .stdout(predicate::str::contains("--wf-udp=443"));

    fixture
        .cmd()
        .args(["select", "http"])
        .assert()
        .success()
        .stdout(predicate::str::diff("none\n"));
}

#[test]
fn test_filter_disable_cascades() {
    let fixture = Fixture::new();
    fixture.cmd().args(["select", "youtube", "other_seqovl"]).assert().success();
    fixture.cmd().args(["select", "discord", "other_seqovl"]).assert().success();
    fixture.cmd().args(["select", "youtube_quic", "quic_fake"]).assert().success();

    fixture
        .cmd()
        .args(["filters", "disable", "tcp_443"])
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube"))
        .stdout(predicate::str::contains("discord"));

    fixture
        .cmd()
        .args(["select", "youtube_quic"])
        .assert()
        .success()
        .stdout(predicate::str::diff("quic_fake\n"));
    fixture
        .cmd()
        .args(["select", "youtube"])
        .assert()
        .success()
        .stdout(predicate::str::diff("none\n"));
}

#[test]
fn test_corrupt_state_file_recovers() {
    let fixture = Fixture::new();
    fs::write(fixture.dir.path().join("state.json"), "{broken").unwrap();

    fixture
        .cmd()
        .args(["select", "youtube"])
        .assert()
        .success()
        .stdout(predicate::str::diff("none\n"));
    fixture
        .cmd()
        .args(["select", "youtube", "other_seqovl"])
        .assert()
        .success();
    fixture
        .cmd()
        .args(["select", "youtube"])
        .assert()
        .success()
        .stdout(predicate::str::diff("other_seqovl\n"));
}

#[test]
fn test_user_strategy_lifecycle() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args([
            "strategies",
            "save",
            "tcp",
            "--id",
            "my_split",
            "--name",
            "My split",
            "--args",
            "--dpi-desync=split2 --dpi-desync-split-pos=2",
            "--label",
            "experimental",
        ])
        .assert()
        .success();

    fixture
        .cmd()
        .args(["strategies", "show", "tcp", "my_split"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dpi-desync-split-pos=2"))
        .stdout(predicate::str::contains("User"));

    fixture
        .cmd()
        .args(["strategies", "save", "tcp", "--id", "bad id", "--name", "x", "--args", "--x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid strategy"));

    fixture.cmd().args(["strategies", "delete", "tcp", "my_split"]).assert().success();
    fixture
        .cmd()
        .args(["strategies", "delete", "tcp", "my_split"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_run_dry_run_and_empty_selection() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active categories"));

    fixture
        .cmd()
        .args(["run", "--dry-run", "--select", "youtube=other_seqovl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("winws.exe"))
        .stdout(predicate::str::contains("--filter-tcp=443"));
}

#[cfg(not(windows))]
#[test]
fn test_autostart_status_without_windows() {
    let fixture = Fixture::new();

    fixture
        .cmd()
        .args(["autostart", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed: none"))
        .stdout(predicate::str::contains("In sync"));

    fixture
        .cmd()
        .args(["autostart", "reconcile"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already in sync"));
}

#[test]
fn test_completions() {
    Command::cargo_bin("winws-manager")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("winws-manager"));
}
