use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn bin(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_proj"));
    cmd.env("PROJ_HOME", dir.path());
    cmd.arg("--state-file").arg(dir.path().join("projects.json"));
    cmd
}

fn project_slugs(dir: &TempDir) -> Vec<String> {
    let output = bin(dir)
        .args(["project", "list", "--json"])
        .output()
        .expect("list");
    assert!(output.status.success());
    let listed: Value = serde_json::from_slice(&output.stdout).expect("json");
    listed
        .get("projects")
        .and_then(|v| v.as_array())
        .expect("projects")
        .iter()
        .map(|project| {
            project
                .get("slug")
                .and_then(|v| v.as_str())
                .expect("slug")
                .to_string()
        })
        .collect()
}

#[test]
fn demo_seeds_once_and_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");

    let first = bin(&dir).arg("demo").output().expect("demo");
    assert!(first.status.success());
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("Created demo projects"), "stdout: {stdout}");

    let slugs = project_slugs(&dir);
    assert_eq!(slugs, vec!["website", "api", "research"]);

    let second = bin(&dir).arg("demo").output().expect("demo again");
    assert!(second.status.success());
    let stdout = String::from_utf8_lossy(&second.stdout);
    assert!(stdout.contains("nothing created"), "stdout: {stdout}");
    assert_eq!(project_slugs(&dir).len(), 3);
}

#[test]
fn import_reads_the_legacy_conf_format() {
    let dir = TempDir::new().expect("tempdir");
    let conf = dir.path().join("legacy.conf");
    std::fs::write(
        &conf,
        "name=Old Project\ncolor=blue\ntask=finish the port\nnote=first note\nnote=second note\n",
    )
    .expect("write conf");

    let output = bin(&dir)
        .args(["import", "legacy"])
        .arg(&conf)
        .output()
        .expect("import");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Imported Old Project as legacy"),
        "stdout: {stdout}"
    );

    let list = bin(&dir)
        .args(["project", "list", "--json"])
        .output()
        .expect("list");
    let listed: Value = serde_json::from_slice(&list.stdout).expect("json");
    assert_eq!(
        listed.pointer("/projects/0/name").and_then(|v| v.as_str()),
        Some("Old Project")
    );
    assert_eq!(
        listed.pointer("/projects/0/task").and_then(|v| v.as_str()),
        Some("finish the port")
    );
    assert_eq!(
        listed.pointer("/projects/0/notes").and_then(|v| v.as_i64()),
        Some(2)
    );
}

#[test]
fn import_missing_conf_exits_nonzero() {
    let dir = TempDir::new().expect("tempdir");
    let output = bin(&dir)
        .args(["import", "legacy", "/nonexistent/legacy.conf"])
        .output()
        .expect("import");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
}

#[test]
fn audit_journal_records_mutating_commands() {
    let dir = TempDir::new().expect("tempdir");
    assert!(bin(&dir)
        .args(["project", "create", "api"])
        .status()
        .expect("create")
        .success());
    assert!(bin(&dir)
        .args(["start", "api"])
        .status()
        .expect("start")
        .success());
    assert!(bin(&dir).arg("stop").status().expect("stop").success());

    let journal =
        std::fs::read_to_string(dir.path().join("audit.jsonl")).expect("journal exists");
    let actions: Vec<String> = journal
        .lines()
        .map(|line| {
            serde_json::from_str::<Value>(line)
                .expect("line json")
                .get("action")
                .and_then(|v| v.as_str())
                .expect("action")
                .to_string()
        })
        .collect();
    assert_eq!(actions, vec!["project.create", "timer.start", "timer.stop"]);

    let log = bin(&dir).arg("log").output().expect("log");
    assert!(log.status.success());
    let stdout = String::from_utf8_lossy(&log.stdout);
    assert!(stdout.contains("timer.stop"), "stdout: {stdout}");
}

#[test]
fn reconcile_with_nothing_stale_reports_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    assert!(bin(&dir)
        .args(["project", "create", "api"])
        .status()
        .expect("create")
        .success());
    assert!(bin(&dir)
        .args(["start", "api"])
        .status()
        .expect("start")
        .success());

    let output = bin(&dir)
        .args(["reconcile", "--stale-after-hours", "8", "--json"])
        .output()
        .expect("reconcile");
    assert!(output.status.success());
    let parsed: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert!(parsed.get("closed").map(Value::is_null).unwrap_or(false));

    // The freshly started timer is still running.
    let status = bin(&dir)
        .args(["status", "--json"])
        .output()
        .expect("status");
    let parsed: Value = serde_json::from_slice(&status.stdout).expect("json");
    assert_eq!(
        parsed.pointer("/status/state").and_then(|v| v.as_str()),
        Some("running")
    );
}

#[test]
fn time_log_totals_closed_entries() {
    let dir = TempDir::new().expect("tempdir");
    assert!(bin(&dir)
        .args(["project", "create", "api"])
        .status()
        .expect("create")
        .success());
    assert!(bin(&dir)
        .args(["start", "api"])
        .status()
        .expect("start")
        .success());
    assert!(bin(&dir).arg("stop").status().expect("stop").success());

    let output = bin(&dir)
        .args(["time", "log", "api", "--json"])
        .output()
        .expect("time log");
    assert!(output.status.success());
    let parsed: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(
        parsed.pointer("/report/entries").and_then(|v| v.as_i64()),
        Some(1)
    );
    let rows = parsed
        .pointer("/report/rows")
        .and_then(|v| v.as_array())
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].get("end").and_then(|v| v.as_str()).is_some());
}
