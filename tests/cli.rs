use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn stmt_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("stmt");
    path
}

/// Minimal but structurally plausible PDF bytes for fixtures.
fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n".to_vec()
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Create config
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Create statement fixtures
    let files_dir = root.join("statements");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("smith_1984_5550123456.pdf"), pdf_bytes()).unwrap();
    fs::write(files_dir.join("smythe_1984_5550199887.pdf"), pdf_bytes()).unwrap();
    fs::write(files_dir.join("jones_1972_5550123456.pdf"), pdf_bytes()).unwrap();
    fs::write(files_dir.join("notes.txt"), "not a statement").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/stmt.sqlite"

[identity]
contact_digits = 10
min_birth_year = 1900

[ingest]
chunk_size = 50

[storage]
backend = "local"
blob_dir = "{}/data/blobs"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("stmt.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_stmt_env(
    config_path: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> (String, String, bool) {
    let binary = stmt_binary();
    let mut command = Command::new(&binary);
    command
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("STMT_OPERATOR");
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("Failed to run stmt binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn run_stmt(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_stmt_env(config_path, args, &[("STMT_OPERATOR", "test-operator")])
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_stmt(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/stmt.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_stmt(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_stmt(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_upload_directory() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_stmt(&config_path, &["upload", dir, "--progress", "off"]);
    assert!(
        success,
        "upload failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(
        stdout.contains("Uploaded 3 of 3 statements."),
        "unexpected summary: {}",
        stdout
    );
    assert!(stdout.contains("Skipped 1 non-PDF file."));

    // Blobs land in the configured directory
    assert!(tmp
        .path()
        .join("data/blobs/smith_1984_5550123456.pdf")
        .exists());
}

#[test]
fn test_upload_and_search_roundtrip() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    run_stmt(&config_path, &["upload", dir, "--progress", "off"]);

    let (stdout, stderr, success) = run_stmt(&config_path, &["search", "sm", "1984"]);
    assert!(
        success,
        "search failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("smith_1984_5550123456.pdf"));
    assert!(stdout.contains("smythe_1984_5550199887.pdf"));
    assert!(
        !stdout.contains("jones"),
        "wrong year must not match, got: {}",
        stdout
    );
}

#[test]
fn test_search_json_output() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    run_stmt(&config_path, &["upload", dir, "--progress", "off"]);

    let (stdout, _, success) = run_stmt(&config_path, &["search", "smith", "1984", "--json"]);
    assert!(success);

    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["file_name"], "smith_1984_5550123456.pdf");
    assert_eq!(records[0]["identity"]["last_name"], "Smith");
    assert_eq!(records[0]["identity"]["birth_year"], 1984);
}

#[test]
fn test_search_contact_narrows() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    run_stmt(&config_path, &["upload", dir, "--progress", "off"]);

    let (stdout, _, success) = run_stmt(
        &config_path,
        &["search", "sm", "1984", "--contact", "5550199887"],
    );
    assert!(success);
    assert!(stdout.contains("smythe_1984_5550199887.pdf"));
    assert!(!stdout.contains("smith_1984_5550123456.pdf"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();

    run_stmt(&config_path, &["init"]);
    let (stdout, _, success) = run_stmt(&config_path, &["search", "zimmermann", "1984"]);
    assert!(success);
    assert!(stdout.contains("No statements found."));
}

#[test]
fn test_search_invalid_year_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_stmt(&config_path, &["init"]);
    let (_, stderr, success) = run_stmt(&config_path, &["search", "smith", "192"]);
    assert!(!success, "3-digit year should fail");
    assert!(
        stderr.contains("4 digits"),
        "Should mention the expected format, got: {}",
        stderr
    );
}

#[test]
fn test_upload_requires_operator() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (_, stderr, success) =
        run_stmt_env(&config_path, &["upload", dir, "--progress", "off"], &[]);
    assert!(!success, "upload without an operator should fail");
    assert!(
        stderr.contains("authentication required"),
        "Should mention authentication, got: {}",
        stderr
    );

    // Fail-fast: nothing was stored
    assert!(!tmp.path().join("data/blobs").exists());
}

#[test]
fn test_upload_non_pdf_only() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("statements/notes.txt");
    let file = file.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (stdout, _, success) = run_stmt(&config_path, &["upload", file, "--progress", "off"]);
    assert!(success, "an all-filtered batch is not a failure");
    assert!(stdout.contains("Only PDF files are allowed."));
}

#[test]
fn test_upload_reports_failures_and_exits_nonzero() {
    let (tmp, config_path) = setup_test_env();
    let bad_dir = tmp.path().join("bad");
    fs::create_dir_all(&bad_dir).unwrap();
    fs::write(bad_dir.join("smith_1899_5550123456.pdf"), pdf_bytes()).unwrap();
    let file = bad_dir.join("smith_1899_5550123456.pdf");
    let file = file.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (stdout, _, success) = run_stmt(&config_path, &["upload", file, "--progress", "off"]);
    assert!(!success, "a batch with failures should exit non-zero");
    assert!(stdout.contains("Failed 1:"), "got: {}", stdout);
    assert!(stdout.contains("1899"), "got: {}", stdout);
}

#[test]
fn test_upload_missing_file_errors() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("nope.pdf");
    let missing = missing.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (_, stderr, success) = run_stmt(&config_path, &["upload", missing]);
    assert!(!success);
    assert!(
        stderr.contains("Failed to read"),
        "Should report the unreadable path, got: {}",
        stderr
    );
}

#[test]
fn test_upload_json_progress_per_chunk() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (_, stderr, success) = run_stmt(
        &config_path,
        &[
            "upload",
            dir,
            "--progress",
            "json",
            "--chunk-size",
            "2",
        ],
    );
    assert!(success);
    assert!(
        stderr.contains("\"event\":\"progress\""),
        "expected progress events on stderr, got: {}",
        stderr
    );
    assert!(stderr.contains("\"completed\":2"));
    assert!(stderr.contains("\"completed\":3"));
    assert!(stderr.contains("\"total\":3"));
}

#[test]
fn test_reupload_updates_in_place() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("statements/smith_1984_5550123456.pdf");
    let file = file.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    run_stmt(&config_path, &["upload", file, "--progress", "off"]);
    let (stdout, _, success) = run_stmt(&config_path, &["upload", file, "--progress", "off"]);
    assert!(success, "re-upload with overwrite on should succeed");
    assert!(stdout.contains("Uploaded 1 of 1 statement."));

    let (stdout, _, _) = run_stmt(&config_path, &["search", "smith", "1984", "--json"]);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        records.as_array().unwrap().len(),
        1,
        "re-upload must not duplicate the record"
    );
}

#[test]
fn test_unknown_progress_mode_errors() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("statements");
    let dir = dir.to_str().unwrap();

    run_stmt(&config_path, &["init"]);
    let (_, stderr, success) =
        run_stmt(&config_path, &["upload", dir, "--progress", "loud"]);
    assert!(!success);
    assert!(
        stderr.contains("Unknown progress mode"),
        "got: {}",
        stderr
    );
}
