//! CLI integration tests
//!
//! Each test runs the `docsync` binary in a temp directory holding a
//! `docsync.toml` with sequential ids, so node identifiers are predictable:
//! app `doc-1`, posts `doc-2`, author `doc-3`, post `doc-4`, its comments
//! `doc-5`, and the first comment `doc-6`.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn setup() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("docsync.toml"),
        "[logging]\nprofile = \"test\"\n\n[registry]\nid_prefix = \"doc\"\n",
    )
    .unwrap();
    temp_dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docsync"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn write_commands(dir: &Path, lines: &[&str]) -> String {
    let path = dir.join("commands.jsonl");
    fs::write(&path, lines.join("\n")).unwrap();
    path.to_str().unwrap().to_string()
}

fn stdout_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_export_prints_snapshot() {
    let temp_dir = setup();

    let output = run(temp_dir.path(), &["export"]);

    assert!(
        output.status.success(),
        "Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["id"], "doc-1");
    assert_eq!(snapshot["models"]["author"]["attrs"]["name"], "henrik");
    let post = &snapshot["collections"]["posts"]["models"][0];
    assert_eq!(post["id"], "doc-4");
    assert_eq!(post["attrs"]["title"], "Hello world");
    assert_eq!(post["collections"]["comments"]["models"][0]["id"], "doc-6");
}

#[test]
fn test_export_digest_is_stable() {
    let temp_dir = setup();

    let first = run(temp_dir.path(), &["export", "--digest"]);
    let second = run(temp_dir.path(), &["export", "--digest"]);

    assert!(first.status.success());
    let digest = String::from_utf8_lossy(&first.stdout).trim().to_string();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_export_to_file() {
    let temp_dir = setup();
    let target = temp_dir.path().join("snapshot.json");

    let output = run(
        temp_dir.path(),
        &["export", "--shallow", "--output", target.to_str().unwrap()],
    );

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let snapshot: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(snapshot["id"], "doc-1");
    assert!(snapshot.get("collections").is_none());
}

#[test]
fn test_replay_prints_published_messages() {
    // GIVEN the author renames the post and pins the comment
    let temp_dir = setup();
    let commands = write_commands(
        temp_dir.path(),
        &[
            r#"{"event":"set","id":"doc-4","change":{"title":"Renamed"}}"#,
            r#"{"event":"set","id":"doc-6","change":{"pinned":true}}"#,
        ],
    );

    // WHEN the commands are replayed
    let output = run(temp_dir.path(), &["replay", "--commands", &commands]);

    // THEN each publish appears on stdout, in order
    assert!(
        output.status.success(),
        "Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let messages = stdout_lines(&output);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["event"], "change");
    assert_eq!(messages[0]["id"], "doc-4");
    assert_eq!(messages[0]["data"]["title"], "Renamed");
    assert_eq!(messages[1]["id"], "doc-6");
    assert_eq!(messages[1]["data"]["pinned"], true);
}

#[test]
fn test_replay_reports_denials_for_outsiders() {
    let temp_dir = setup();
    let commands = write_commands(
        temp_dir.path(),
        &[
            r#"{"event":"delete","id":"doc-4"}"#,
            r#"{"event":"add","id":"doc-5","data":{"subject":"hi from outside"}}"#,
        ],
    );

    let output = run(
        temp_dir.path(),
        &["replay", "--commands", &commands, "--requester", "mallory"],
    );

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 1: denied: delete"), "Stderr: {}", stderr);
    // commenting is open to everyone
    let messages = stdout_lines(&output);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["event"], "add");
    assert_eq!(messages[0]["collection"], "doc-5");
    assert_eq!(messages[0]["data"]["attrs"]["subject"], "hi from outside");
}

#[test]
fn test_replay_continues_after_failed_command() {
    let temp_dir = setup();
    let commands = write_commands(
        temp_dir.path(),
        &[
            r#"{"event":"set","id":"doc-404","change":{"title":"x"}}"#,
            r#"{"event":"move","collection":"doc-2","id":"doc-4","newPosition":3}"#,
            r#"{"event":"method","id":"doc-3","method":"dance"}"#,
        ],
    );

    let output = run(temp_dir.path(), &["replay", "--commands", &commands]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: line 1"), "Stderr: {}", stderr);
    // a lone post cannot move; the person type exposes no methods
    assert!(stdout_lines(&output).is_empty());
    assert!(stderr.contains("line 3: denied: call"), "Stderr: {}", stderr);
}

#[test]
fn test_replay_rejects_malformed_file() {
    let temp_dir = setup();
    let commands = write_commands(temp_dir.path(), &["not json"]);

    let output = run(temp_dir.path(), &["replay", "--commands", &commands]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 1"));
}

#[test]
fn test_sync_converges() {
    let temp_dir = setup();
    let commands = write_commands(
        temp_dir.path(),
        &[
            r#"{"event":"add","id":"doc-2","data":{"title":"Second","published":"2024-02-01T00:00:00Z"}}"#,
            r#"{"event":"add","id":"doc-5","data":{"subject":"another"}}"#,
            r#"{"event":"set","id":"doc-6","change":{"pinned":true}}"#,
            r#"{"event":"move","collection":"doc-2","id":"doc-4","newPosition":1}"#,
            r#"{"event":"unset","id":"doc-6","property":"body"}"#,
            r#"{"event":"delete","id":"doc-4"}"#,
        ],
    );

    let output = run(temp_dir.path(), &["sync", "--commands", &commands]);

    assert!(
        output.status.success(),
        "Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("converged"));
    assert!(stdout.contains("messages: 6"), "Stdout: {}", stdout);
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("docsync.toml"), "[logging]\nprofile = \"loud\"\n").unwrap();

    let output = run(temp_dir.path(), &["export"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid config"));
}
