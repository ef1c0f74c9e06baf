//! End-to-end tests for the mvnsecrets binary
//!
//! The secrets store is simulated with the `env` provider and the build
//! tool with a shell script that records its argv and settings file.
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SECRET_VAR: &str = "MVNSECRETS_IT_NEXUS";
const PAYLOAD: &str = r#"{"username":"ci-bot","password":"s3cr3t-value"}"#;
const MIRROR: &str = "https://nexus.example.com/repository/maven-public/";

const MANAGED_VARS: &[&str] = &[
    "MVNSECRETS_CONFIG",
    "MVNSECRETS_SECRET_ID",
    "MVNSECRETS_PROVIDER",
    "MVNSECRETS_REGION",
    "MVNSECRETS_ENDPOINT_URL",
    "MVNSECRETS_PROFILE",
    "MVNSECRETS_MIRROR_URL",
    "MVNSECRETS_TEMPLATE",
    "MVNSECRETS_TOOL",
    "MVNSECRETS_LOG_FORMAT",
    "RUST_LOG",
];

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// A project directory with a fake build tool exiting with `exit_code`
    /// and a config file pointing the rendered settings at `scratch/`
    fn new(exit_code: i32) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("mvnsecrets_test_")
            .tempdir()
            .expect("Failed to create temp directory");
        let ws = Self { dir };

        fs::create_dir(ws.scratch()).unwrap();
        fs::write(
            ws.tool(),
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\ncp \"$2\" '{}'\nexit {exit_code}\n",
                ws.argv().display(),
                ws.settings_copy().display()
            ),
        )
        .unwrap();
        fs::set_permissions(ws.tool(), fs::Permissions::from_mode(0o755)).unwrap();

        ws.write_config(&format!(
            "[tool]\ntemp_dir = \"{}\"\n",
            ws.scratch().display()
        ));
        ws
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn scratch(&self) -> PathBuf {
        self.path().join("scratch")
    }

    fn tool(&self) -> PathBuf {
        self.path().join("fake-mvn")
    }

    fn argv(&self) -> PathBuf {
        self.path().join("argv.txt")
    }

    fn settings_copy(&self) -> PathBuf {
        self.path().join("settings-copy.xml")
    }

    fn write_config(&self, contents: &str) {
        fs::write(self.path().join("mvnsecrets.toml"), contents).unwrap();
    }

    fn scratch_is_empty(&self) -> bool {
        fs::read_dir(self.scratch()).unwrap().count() == 0
    }

    /// The binary, run in this workspace against the env provider
    fn command(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("mvnsecrets").unwrap();
        cmd.current_dir(self.path());
        for var in MANAGED_VARS {
            cmd.env_remove(var);
        }
        cmd.env("MVNSECRETS_PROVIDER", "env")
            .env("MVNSECRETS_SECRET_ID", SECRET_VAR)
            .env("MVNSECRETS_MIRROR_URL", MIRROR)
            .env("MVNSECRETS_TOOL", self.tool());
        cmd
    }
}

#[test]
fn run_renders_settings_and_passes_them_to_the_tool() {
    let ws = Workspace::new(0);

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .args(["run", "--", "-B", "verify"])
        .assert()
        .success();

    let settings = fs::read_to_string(ws.settings_copy()).unwrap();
    assert_eq!(settings.matches("<username>ci-bot</username>").count(), 2);
    assert_eq!(settings.matches("<password>s3cr3t-value</password>").count(), 2);
    assert!(settings.contains(MIRROR));

    let argv = fs::read_to_string(ws.argv()).unwrap();
    let argv: Vec<&str> = argv.lines().collect();
    assert_eq!(argv[0], "-s");
    assert!(Path::new(argv[1]).starts_with(ws.scratch()));
    assert_eq!(&argv[2..], &["-B", "verify"]);

    assert!(ws.scratch_is_empty(), "rendered settings left behind");
}

#[test]
fn run_propagates_tool_exit_code() {
    let ws = Workspace::new(5);

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .args(["--json", "run"])
        .assert()
        .code(5)
        .stdout(predicate::str::contains(r#""code":"non_zero_exit""#))
        .stdout(predicate::str::contains(r#""exit_code":5"#));

    assert!(ws.scratch_is_empty());
}

#[test]
fn missing_secret_exits_before_rendering() {
    let ws = Workspace::new(0);

    ws.command()
        .env_remove(SECRET_VAR)
        .args(["--json", "run"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains(r#""code":"secret_not_found""#));

    assert!(!ws.argv().exists(), "build tool should not have run");
    assert!(ws.scratch_is_empty());
}

#[test]
fn malformed_secret_exits_with_secret_error() {
    let ws = Workspace::new(0);

    ws.command()
        .env(SECRET_VAR, r#"{"user":"ci-bot"}"#)
        .args(["--json", "run"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains(r#""code":"malformed_secret_payload""#));

    assert!(ws.scratch_is_empty());
}

#[test]
fn missing_mirror_url_is_a_template_error() {
    let ws = Workspace::new(0);

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .env_remove("MVNSECRETS_MIRROR_URL")
        .args(["--json", "run"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""code":"missing_template_value""#))
        .stdout(predicate::str::contains("MVN_MIRROR_URL"));

    assert!(!ws.argv().exists());
    assert!(ws.scratch_is_empty());
}

#[test]
fn unlaunchable_tool_exits_with_launch_code() {
    let ws = Workspace::new(0);

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .env("MVNSECRETS_TOOL", ws.path().join("no-such-tool"))
        .arg("run")
        .assert()
        .code(4);

    assert!(ws.scratch_is_empty());
}

#[test]
fn render_redacts_secret_values() {
    let ws = Workspace::new(0);

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains("<username>[REDACTED]</username>"))
        .stdout(predicate::str::contains(MIRROR))
        .stdout(predicate::str::contains("s3cr3t-value").not())
        .stdout(predicate::str::contains("ci-bot").not());

    assert!(ws.scratch_is_empty());
}

#[test]
fn render_check_reports_json_envelope() {
    let ws = Workspace::new(0);

    let output = ws
        .command()
        .env(SECRET_VAR, PAYLOAD)
        .args(["render", "--check", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["status"], "ok");
    assert_eq!(envelope["data"]["resolved"], true);
    assert_eq!(
        envelope["data"]["placeholders"],
        serde_json::json!(["MVN_USERNAME", "MVN_PASSWORD", "MVN_MIRROR_URL"])
    );
}

#[test]
fn fetch_prints_lengths_not_values() {
    let ws = Workspace::new(0);

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .arg("fetch")
        .assert()
        .success()
        .stdout(predicate::str::contains("username: 6 characters"))
        .stdout(predicate::str::contains("password: 12 characters"))
        .stdout(predicate::str::contains("s3cr3t-value").not());
}

#[test]
fn placeholders_lists_bindings() {
    let ws = Workspace::new(0);

    ws.command()
        .env_remove("MVNSECRETS_MIRROR_URL")
        .arg("placeholders")
        .assert()
        .success()
        .stdout(predicate::str::contains("MVN_USERNAME"))
        .stdout(predicate::str::contains("secret password"))
        .stdout(predicate::str::contains("unbound"));
}

#[test]
fn unknown_provider_is_a_configuration_error() {
    let ws = Workspace::new(0);

    ws.command()
        .env("MVNSECRETS_PROVIDER", "vault")
        .args(["--json", "fetch"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""code":"unsupported_provider""#));
}

#[test]
fn unknown_config_key_is_rejected() {
    let ws = Workspace::new(0);
    ws.write_config("[tool]\nprogramme = \"mvn\"\n");

    ws.command()
        .env(SECRET_VAR, PAYLOAD)
        .args(["--json", "fetch"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""code":"config""#))
        .stdout(predicate::str::contains("mvnsecrets.toml"));
}

#[test]
fn flags_override_environment() {
    let ws = Workspace::new(0);

    ws.command()
        .env("OTHER_SECRET", r#"{"username":"flag-user","password":"pw"}"#)
        .args(["fetch", "--secret-id", "OTHER_SECRET"])
        .assert()
        .success()
        .stdout(predicate::str::contains("username: 9 characters"));
}

#[test]
fn log_events_carry_the_correlation_id() {
    let ws = Workspace::new(0);

    let output = ws
        .command()
        .env(SECRET_VAR, PAYLOAD)
        .args(["fetch", "--json", "-L", "info"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    let fetched = stderr
        .lines()
        .find(|line| line.contains("Credentials fetched"))
        .unwrap_or_else(|| panic!("no fetch event in:\n{stderr}"));
    let event: serde_json::Value = serde_json::from_str(fetched).unwrap();
    let spans = event["spans"].as_array().unwrap();
    assert_eq!(spans[0]["name"], "mvnsecrets");
    assert!(spans[0]["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
}
