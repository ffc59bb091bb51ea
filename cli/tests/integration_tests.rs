use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_userstore");

/// Runs the binary against `db` with optional stdin.
fn run(db: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(BIN)
        .arg("--db")
        .arg(db)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run userstore");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("write stdin");
        }
    }
    child.wait_with_output().expect("wait for userstore")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("users.db")
}

// ---------------------------------------------------------------------------
// one-shot commands
// ---------------------------------------------------------------------------

#[test]
fn create_then_get_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);

    let created = run(
        &db,
        &["create", "--username", "alice", "--email", "alice@x.com", "--format", "json"],
        None,
    );
    assert!(created.status.success(), "stderr: {}", stderr(&created));
    let user: serde_json::Value = serde_json::from_str(&stdout(&created)).unwrap();
    assert_eq!(user["id"], 1);
    assert_eq!(user["username"], "alice");

    let fetched = run(&db, &["get", "1", "--format", "json"], None);
    assert!(fetched.status.success());
    let again: serde_json::Value = serde_json::from_str(&stdout(&fetched)).unwrap();
    assert_eq!(again, user);
}

#[test]
fn duplicate_create_exits_with_code_3() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);

    let first = run(&db, &["create", "--username", "a", "--email", "a@x.com"], None);
    assert!(first.status.success());

    let second = run(&db, &["create", "--username", "a", "--email", "b@x.com"], None);
    assert_eq!(second.status.code(), Some(3));
    assert!(stderr(&second).contains("error: User already exists"));
}

#[test]
fn get_missing_user_exits_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&db_path(&dir), &["get", "42"], None);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("error: User not found"));
}

#[test]
fn create_rejects_invalid_fields() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        &db_path(&dir),
        &["create", "--username", " ", "--email", "nope"],
        None,
    );
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("username is required"));
    assert!(err.contains("invalid email address: nope"));
}

#[test]
fn list_returns_users_in_id_order() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);
    for name in ["carol", "alice", "bob"] {
        let email = format!("{name}@x.com");
        let out = run(&db, &["create", "--username", name, "--email", &email], None);
        assert!(out.status.success());
    }

    let output = run(&db, &["list", "--format", "json"], None);
    assert!(output.status.success());
    let users: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = users.iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["carol", "alice", "bob"]);
}

#[test]
fn update_changes_only_given_fields() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);
    run(&db, &["create", "--username", "a", "--email", "a@x.com"], None);

    let updated = run(&db, &["update", "1", "--email", "new@x.com"], None);
    assert!(updated.status.success(), "stderr: {}", stderr(&updated));

    let fetched = run(&db, &["get", "1", "--format", "json"], None);
    let user: serde_json::Value = serde_json::from_str(&stdout(&fetched)).unwrap();
    assert_eq!(user["username"], "a");
    assert_eq!(user["email"], "new@x.com");
}

#[test]
fn update_without_fields_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&db_path(&dir), &["update", "1"], None);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--username or --email"));
}

#[test]
fn delete_asks_for_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);
    run(&db, &["create", "--username", "a", "--email", "a@x.com"], None);

    let declined = run(&db, &["delete", "1"], Some("n\n"));
    assert!(declined.status.success());
    assert!(stdout(&declined).contains("Delete cancelled."));
    assert!(run(&db, &["get", "1"], None).status.success());

    let confirmed = run(&db, &["delete", "1"], Some("y\n"));
    assert!(confirmed.status.success());
    assert_eq!(run(&db, &["get", "1"], None).status.code(), Some(2));
}

#[test]
fn delete_with_yes_and_missing_id() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);
    run(&db, &["create", "--username", "a", "--email", "a@x.com"], None);

    assert!(run(&db, &["delete", "1", "--yes"], None).status.success());
    assert_eq!(run(&db, &["delete", "1", "--yes"], None).status.code(), Some(2));
}

#[test]
fn status_reports_wal_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);
    run(&db, &["create", "--username", "a", "--email", "a@x.com"], None);

    let output = run(&db, &["status"], None);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Tables exist: yes"));
    assert!(text.contains("User count: 1"));
    assert!(text.contains("Journal mode: wal"));
    assert!(text.contains("Foreign keys: on"));
    assert!(text.contains("Busy timeout: 5000 ms"));
}

#[test]
fn directory_database_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &["list"], None);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("connection error"));
}

#[test]
fn out_of_range_busy_timeout_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        &db_path(&dir),
        &["--busy-timeout-ms", "3000000000", "list"],
        None,
    );
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("connection error"));
    assert!(err.contains("busy_timeout"));
}

#[test]
fn config_file_supplies_database_and_busy_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);
    let config = dir.path().join("userstore.yaml");
    std::fs::write(
        &config,
        format!("database: {}\nbusy_timeout_ms: 1234\n", db.display()),
    )
    .unwrap();

    let output = Command::new(BIN)
        .args(["--config", config.to_str().unwrap(), "status"])
        .output()
        .expect("failed to run userstore");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains(&format!("Database: {}", db.display())));
    assert!(text.contains("Busy timeout: 1234 ms"));
}

// ---------------------------------------------------------------------------
// interactive shell
// ---------------------------------------------------------------------------

#[test]
fn shell_is_the_default_command() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_path(&dir);

    let output = run(&db, &[], Some("1\nalice\nalice@x.com\n2\n5\n"));
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--- User Management System ---"));
    assert!(text.contains("User Created!"));
    assert!(text.contains("alice@x.com"));
    assert!(text.contains("Exiting program..."));

    // records persist past the session
    assert!(run(&db, &["get", "1"], None).status.success());
}

#[test]
fn shell_exits_cleanly_at_end_of_input() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&db_path(&dir), &["shell"], Some("2\n"));
    assert!(output.status.success());
    assert!(stdout(&output).contains("Exiting program..."));
}
