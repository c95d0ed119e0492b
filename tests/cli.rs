use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ideastack"))
}

fn run_cmd_with_backend(
    data_dir: &Path,
    backend: &str,
    args: &[&str],
    input: Option<&str>,
) -> Output {
    let mut cmd = Command::new(bin_path());
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--backend")
        .arg(backend);
    cmd.args(args);
    cmd.env_remove("IDEASTACK_LOG").env_remove("RUST_LOG");
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().expect("spawn command");
    if let Some(input) = input {
        child
            .stdin
            .as_mut()
            .expect("stdin")
            .write_all(input.as_bytes())
            .expect("write stdin");
    }
    child.wait_with_output().expect("wait output")
}

fn run_cmd(dir: &TempDir, args: &[&str], input: Option<&str>) -> Output {
    run_cmd_with_backend(dir.path(), "file", args, input)
}

fn output_stdout(output: Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout utf8")
}

fn output_failure(output: Output) -> String {
    assert!(!output.status.success(), "command unexpectedly succeeded");
    String::from_utf8(output.stderr).expect("stderr utf8")
}

fn parse_idea_id(stdout: &str) -> String {
    let prefix = "Created idea ID: ";
    let rest = stdout.trim().strip_prefix(prefix).expect("idea output");
    rest.split(':').next().expect("idea id").trim().to_string()
}

fn parse_task_id(stdout: &str) -> String {
    let prefix = "Created task ID: ";
    let rest = stdout.trim().strip_prefix(prefix).expect("task output");
    rest.split_whitespace().next().expect("task id").to_string()
}

fn create_idea(dir: &TempDir, title: &str) -> String {
    let stdout = output_stdout(run_cmd(
        dir,
        &["idea", "add", title, "--category", "tech", "--description", "desc"],
        None,
    ));
    parse_idea_id(&stdout)
}

fn add_task(dir: &TempDir, idea_id: &str, title: &str, due: Option<&str>) -> String {
    let mut args = vec!["task", "add", idea_id, title];
    if let Some(due) = due {
        args.push("--due");
        args.push(due);
    }
    let stdout = output_stdout(run_cmd(dir, &args, None));
    parse_task_id(&stdout)
}

fn stored_json(dir: &TempDir) -> Value {
    let contents =
        std::fs::read_to_string(dir.path().join("ideas-stack-data.json")).expect("read store");
    serde_json::from_str(&contents).expect("store json")
}

#[test]
fn idea_add_persists_camel_case_json() {
    let dir = TempDir::new().expect("temp dir");
    let id = create_idea(&dir, "Build a robot");

    let value = stored_json(&dir);
    let ideas = value.as_array().expect("array");
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0]["id"], id.as_str());
    assert_eq!(ideas[0]["category"], "Tech");
    assert_eq!(ideas[0]["status"], "Concept");
    assert_eq!(ideas[0]["tasks"], Value::Array(Vec::new()));
    assert_eq!(ideas[0]["createdAt"], ideas[0]["updatedAt"]);
    assert!(ideas[0]["createdAt"]
        .as_str()
        .expect("timestamp")
        .ends_with('Z'));
}

#[test]
fn idea_add_rejects_blank_title() {
    let dir = TempDir::new().expect("temp dir");
    let stderr = output_failure(run_cmd(&dir, &["idea", "add", "  "], None));
    assert!(stderr.contains("idea title cannot be empty"));
    assert!(!dir.path().join("ideas-stack-data.json").exists());
}

#[test]
fn robot_scenario_through_cli() {
    let dir = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&dir, "Build a robot");
    let task_id = add_task(&dir, &idea_id, "Buy motors", None);

    let show = output_stdout(run_cmd(&dir, &["idea", "show", &idea_id], None));
    assert!(show.contains("- [ ] Buy motors"));
    assert!(show.contains("Progress: 0%"));

    let stdout = output_stdout(run_cmd(&dir, &["task", "done", &idea_id, &task_id], None));
    assert!(stdout.contains("marked done"));

    let value = stored_json(&dir);
    assert_eq!(value[0]["tasks"][0]["completed"], true);
    assert_eq!(value[0]["tasks"][0]["ideaId"], idea_id.as_str());

    let show = output_stdout(run_cmd(&dir, &["idea", "show", &idea_id], None));
    assert!(show.contains("- [x] Buy motors"));
    assert!(show.contains("Progress: 100%"));

    output_stdout(run_cmd(&dir, &["task", "undo", &idea_id, &task_id], None));
    assert_eq!(stored_json(&dir)[0]["tasks"][0]["completed"], false);
}

#[test]
fn idea_list_searches_case_insensitively() {
    let dir = TempDir::new().expect("temp dir");
    create_idea(&dir, "Robot arm");
    create_idea(&dir, "Garden planner");

    let stdout = output_stdout(run_cmd(&dir, &["idea", "list"], None));
    assert!(stdout.contains("Robot arm"));
    assert!(stdout.contains("Garden planner"));

    let stdout = output_stdout(run_cmd(&dir, &["idea", "list", "--search", "ROBOT"], None));
    assert!(stdout.contains("Robot arm"));
    assert!(!stdout.contains("Garden planner"));

    let stdout = output_stdout(run_cmd(&dir, &["idea", "list", "--search", "zzz"], None));
    assert_eq!(stdout.trim(), "No ideas found.");
}

#[test]
fn idea_update_and_status_change() {
    let dir = TempDir::new().expect("temp dir");
    let id = create_idea(&dir, "Draft");
    output_stdout(run_cmd(
        &dir,
        &["idea", "update", &id, "--title", "Final", "--notes", "ship it"],
        None,
    ));
    output_stdout(run_cmd(&dir, &["idea", "status", &id, "Testing"], None));

    let value = stored_json(&dir);
    assert_eq!(value[0]["title"], "Final");
    assert_eq!(value[0]["notes"], "ship it");
    assert_eq!(value[0]["status"], "Testing");

    let show = output_stdout(run_cmd(&dir, &["idea", "show", &id], None));
    assert!(show.contains("Concept > Prototype > [Testing] > Implementation"));
}

#[test]
fn idea_remove_twice_reports_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let keep = create_idea(&dir, "Keep");
    let doomed = create_idea(&dir, "Remove me");
    add_task(&dir, &doomed, "Goes too", None);

    output_stdout(run_cmd(&dir, &["idea", "remove", &doomed], None));
    let value = stored_json(&dir);
    assert_eq!(value.as_array().expect("array").len(), 1);
    assert_eq!(value[0]["id"], keep.as_str());

    let stderr = output_failure(run_cmd(&dir, &["idea", "remove", &doomed], None));
    assert!(stderr.contains("Idea not found"));
    assert!(stderr.contains("Not found: idea id"));
}

#[test]
fn task_remove_unknown_leaves_tasks() {
    let dir = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&dir, "Idea");
    add_task(&dir, &idea_id, "Stay", None);

    let stderr = output_failure(run_cmd(
        &dir,
        &["task", "remove", &idea_id, "nonexistent-id"],
        None,
    ));
    assert!(stderr.contains("Task not found"));
    let value = stored_json(&dir);
    assert_eq!(value[0]["tasks"].as_array().expect("tasks").len(), 1);
}

#[test]
fn task_list_filters_upcoming() {
    let dir = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&dir, "Idea");
    add_task(&dir, &idea_id, "Far future", Some("2999-01-01"));
    add_task(&dir, &idea_id, "Long ago", Some("2000-01-01"));
    add_task(&dir, &idea_id, "Whenever", None);

    let all = output_stdout(run_cmd(&dir, &["task", "list"], None));
    assert!(all.contains("Far future"));
    assert!(all.contains("Long ago"));
    assert!(all.contains("Whenever"));

    let upcoming = output_stdout(run_cmd(&dir, &["task", "list", "--upcoming"], None));
    assert!(upcoming.contains("Far future"));
    assert!(!upcoming.contains("Long ago"));
    assert!(!upcoming.contains("Whenever"));
}

#[test]
fn task_update_sets_and_clears_due_date() {
    let dir = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&dir, "Idea");
    let task_id = add_task(&dir, &idea_id, "Task", None);

    output_stdout(run_cmd(
        &dir,
        &["task", "update", &idea_id, &task_id, "--due", "2030-02-03", "--title", "Renamed"],
        None,
    ));
    let value = stored_json(&dir);
    assert_eq!(value[0]["tasks"][0]["title"], "Renamed");
    assert_eq!(value[0]["tasks"][0]["dueDate"], "2030-02-03T00:00:00.000Z");

    output_stdout(run_cmd(
        &dir,
        &["task", "update", &idea_id, &task_id, "--clear-due"],
        None,
    ));
    let value = stored_json(&dir);
    assert!(value[0]["tasks"][0].get("dueDate").is_none());
}

#[test]
fn task_add_rejects_bad_due_date() {
    let dir = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&dir, "Idea");
    let stderr = output_failure(run_cmd(
        &dir,
        &["task", "add", &idea_id, "Task", "--due", "tomorrow-ish"],
        None,
    ));
    assert!(stderr.contains("invalid due date"));
}

#[test]
fn export_then_import_into_fresh_store() {
    let source = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&source, "Portable");
    add_task(&source, &idea_id, "Carry over", Some("2031-05-06"));

    let export_path = source.path().join("backup.json");
    let stdout = output_stdout(run_cmd(
        &source,
        &["export", "--output", export_path.to_str().expect("path")],
        None,
    ));
    assert!(stdout.contains("Exported data to"));

    let target = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd(
        &target,
        &["import", "--file", export_path.to_str().expect("path")],
        None,
    ));
    assert_eq!(stdout.trim(), "Imported 1 ideas");
    assert_eq!(stored_json(&target), stored_json(&source));
}

#[test]
fn export_to_directory_uses_default_file_name() {
    let dir = TempDir::new().expect("temp dir");
    create_idea(&dir, "Idea");
    let out_dir = TempDir::new().expect("out dir");
    output_stdout(run_cmd(
        &dir,
        &["export", "--output", out_dir.path().to_str().expect("path")],
        None,
    ));
    let exported = std::fs::read_to_string(out_dir.path().join("ideas-stack-data.json"))
        .expect("exported file");
    let value: Value = serde_json::from_str(&exported).expect("json");
    assert_eq!(value[0]["title"], "Idea");
}

#[test]
fn export_to_stdout_is_plain_json() {
    let dir = TempDir::new().expect("temp dir");
    create_idea(&dir, "Idea");
    let stdout = output_stdout(run_cmd(&dir, &["export"], None));
    let value: Value = serde_json::from_str(&stdout).expect("stdout json");
    assert_eq!(value.as_array().expect("array").len(), 1);
}

#[test]
fn import_invalid_payload_keeps_existing_data() {
    let dir = TempDir::new().expect("temp dir");
    create_idea(&dir, "Precious");
    let before = stored_json(&dir);

    let stderr = output_failure(run_cmd(&dir, &["import"], Some("not an array")));
    assert!(stderr.contains("Failed to import data. Invalid format."));
    let stderr = output_failure(run_cmd(&dir, &["import"], Some("{\"id\":1}")));
    assert!(stderr.contains("expected a JSON array of ideas"));

    assert_eq!(stored_json(&dir), before);
}

#[test]
fn import_empty_array_clears_everything() {
    let dir = TempDir::new().expect("temp dir");
    create_idea(&dir, "Old");
    let stdout = output_stdout(run_cmd(&dir, &["import"], Some("[]")));
    assert_eq!(stdout.trim(), "Imported 0 ideas");
    assert_eq!(stored_json(&dir), Value::Array(Vec::new()));

    let stdout = output_stdout(run_cmd(&dir, &["idea", "list"], None));
    assert_eq!(stdout.trim(), "No ideas found.");
}

#[test]
fn corrupt_store_reads_as_empty() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("ideas-stack-data.json"), "{{{").expect("corrupt");
    let stdout = output_stdout(run_cmd(&dir, &["idea", "list"], None));
    assert_eq!(stdout.trim(), "No ideas found.");
}

#[test]
fn sqlite_backend_keeps_data_separately() {
    let dir = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd_with_backend(
        dir.path(),
        "sqlite",
        &["idea", "add", "In the database"],
        None,
    ));
    let id = parse_idea_id(&stdout);
    assert!(dir.path().join("ideastack.db").exists());
    assert!(!dir.path().join("ideas-stack-data.json").exists());

    let show = output_stdout(run_cmd_with_backend(
        dir.path(),
        "sqlite",
        &["idea", "show", &id],
        None,
    ));
    assert!(show.contains("Title: In the database"));

    let stderr = output_failure(run_cmd_with_backend(dir.path(), "sqlite", &["watch"], None));
    assert!(stderr.contains("cannot report external changes"));
}

#[test]
fn notices_go_to_stderr_only() {
    let dir = TempDir::new().expect("temp dir");
    let output = run_cmd(&dir, &["idea", "add", "Quiet stdout"], None);
    let stderr = String::from_utf8(output.stderr.clone()).expect("stderr utf8");
    let stdout = output_stdout(output);
    assert!(stderr.contains("[ok] Idea added successfully!"));
    assert!(!stdout.contains("Idea added successfully!"));
    assert!(stdout.starts_with("Created idea ID: "));
}

#[test]
fn task_done_unknown_task_reports_notice() {
    let dir = TempDir::new().expect("temp dir");
    let idea_id = create_idea(&dir, "Idea");
    for action in ["done", "undo"] {
        let stderr = output_failure(run_cmd(&dir, &["task", action, &idea_id, "missing"], None));
        assert!(stderr.contains("[error] Task not found"), "{action}: {stderr}");
        assert!(stderr.contains("Not found: task id missing"));
    }
    let stderr = output_failure(run_cmd(
        &dir,
        &["task", "update", &idea_id, "missing", "--title", "x"],
        None,
    ));
    assert!(stderr.contains("[error] Task not found"));
}

#[test]
fn import_accepts_date_only_due_dates() {
    let dir = TempDir::new().expect("temp dir");
    let payload = r#"[{"id":"a","title":"Dated","category":"Study","description":"",
        "status":"Concept","tasks":[{"id":"t","title":"Read","completed":false,"ideaId":"a",
        "createdAt":"2024-05-01T10:00:00.000Z","dueDate":"2024-06-01"}],
        "createdAt":"2024-05-01T10:00:00.000Z","updatedAt":"2024-05-01T10:00:00.000Z"}]"#;
    let stdout = output_stdout(run_cmd(&dir, &["import"], Some(payload)));
    assert_eq!(stdout.trim(), "Imported 1 ideas");
    assert_eq!(
        stored_json(&dir)[0]["tasks"][0]["dueDate"],
        "2024-06-01T00:00:00.000Z"
    );
}
