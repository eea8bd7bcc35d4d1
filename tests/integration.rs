use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn docwell_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docwell");
    path
}

const SPEC_JSON: &str = r#"{
    "openapi": "3.0.0",
    "info": {"title": "Billing", "version": "1.0.0"},
    "paths": {
        "/invoices": {"post": {"operationId": "createInvoice", "summary": "Create invoice"}},
        "/invoices/{id}": {"get": {"operationId": "getInvoice", "summary": "Get invoice"}}
    }
}"#;

const GUIDE_MD: &str = "# Billing Guide\n\nThe billing API issues invoices for every order. \
Authentication uses bearer tokens sent in the Authorization header. \
Refunds are processed against the original invoice.";

fn write_config(root: &Path, detection: &str) -> PathBuf {
    let config_content = format!(
        r#"[db]
path = "{}/data/docwell.sqlite"

[server]
bind = "127.0.0.1:8799"

[ingest]
detection = "{}"
max_chunk_len = 700
overlap = 80

[embedding]
provider = "fallback"
seed = 12345

[index]
backend = "memory"
dims = 64
"#,
        root.display(),
        detection
    );
    let config_path = root.join("config").join("docwell.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    // Create test files
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("billing.json"), SPEC_JSON).unwrap();
    fs::write(files_dir.join("guide.md"), GUIDE_MD).unwrap();

    let config_path = write_config(&root, "permissive");
    (tmp, config_path)
}

fn run_docwell(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = docwell_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docwell binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn file_arg(tmp: &TempDir, name: &str) -> String {
    tmp.path().join("files").join(name).to_str().unwrap().to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docwell(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("docwell.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docwell(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_docwell(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_reports_documents_and_chunks() {
    let (tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    let (stdout, stderr, success) = run_docwell(
        &config_path,
        &[
            "ingest",
            &file_arg(&tmp, "billing.json"),
            &file_arg(&tmp, "guide.md"),
        ],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files: 2"));
    assert!(stdout.contains("billing.json ->"));
    assert!(stdout.contains("guide.md ->"));
    assert!(stdout.contains("chunks indexed:"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_missing_file_fails() {
    let (tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    let (_, stderr, success) = run_docwell(&config_path, &["ingest", &file_arg(&tmp, "nope.md")]);
    assert!(!success, "ingest of a missing file should fail");
    assert!(
        stderr.contains("Failed to read"),
        "Should report the unreadable path, got: {}",
        stderr
    );
}

#[test]
fn test_ask_after_ingest_answers_and_saves() {
    let (tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    run_docwell(&config_path, &["ingest", &file_arg(&tmp, "billing.json")]);

    // ask runs in a fresh process: retrieval must work from persisted state
    let (stdout, stderr, success) =
        run_docwell(&config_path, &["ask", "How do I create an invoice?"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("--- Answer ---"));
    assert!(stdout.contains("what the docs state"));
    assert!(stdout.contains("--- Citations"));
    assert!(stdout.contains("--- Snippets"));
    assert!(stdout.contains("[curl]"));
    assert!(stdout.contains("POST"));
    assert!(stdout.contains("saved to history:"));
}

#[test]
fn test_ask_before_ingest_reports_not_found() {
    let (_tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    let (stdout, _, success) = run_docwell(&config_path, &["ask", "What is an invoice?"]);
    assert!(success, "ask against an empty corpus should not fail");
    assert!(stdout.contains("couldn't find an answer"));
    assert!(
        !stdout.contains("saved to history"),
        "Not-found answers must not be persisted, got: {}",
        stdout
    );

    let (stdout, _, _) = run_docwell(&config_path, &["history", "list"]);
    assert!(stdout.contains("No history."));
}

#[test]
fn test_docs_list_and_remove() {
    let (tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    run_docwell(
        &config_path,
        &[
            "ingest",
            &file_arg(&tmp, "billing.json"),
            &file_arg(&tmp, "guide.md"),
        ],
    );

    let (stdout, _, success) = run_docwell(&config_path, &["docs", "list"]);
    assert!(success, "docs list failed");
    assert!(stdout.contains("billing.json (openapi)"));
    assert!(stdout.contains("guide.md (markdown)"));

    // Extract the first listed id
    let id = stdout
        .lines()
        .find(|l| l.trim().starts_with("id:"))
        .and_then(|l| l.split("id:").nth(1))
        .map(|s| s.trim().to_string())
        .expect("docs list should print ids");

    let (stdout, _, success) = run_docwell(&config_path, &["docs", "rm", &id]);
    assert!(success, "docs rm should succeed for a listed id");
    assert!(stdout.contains("deleted"));

    let (stdout, _, _) = run_docwell(&config_path, &["docs", "list"]);
    assert!(
        !stdout.contains(&id),
        "Removed document should disappear from the listing, got: {}",
        stdout
    );
}

#[test]
fn test_docs_rm_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    let (_, stderr, success) = run_docwell(&config_path, &["docs", "rm", "nonexistent-id"]);
    assert!(!success, "docs rm with an unknown id should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_strict_config_rejects_markdown() {
    let (tmp, _config_path) = setup_test_env();
    let strict_path = write_config(tmp.path(), "strict-json");

    run_docwell(&strict_path, &["init"]);
    let (_, stderr, success) = run_docwell(&strict_path, &["ingest", &file_arg(&tmp, "guide.md")]);
    assert!(!success, "strict detection should reject markdown");
    assert!(
        stderr.contains("Only JSON is supported. Invalid file: guide.md"),
        "Should use the strict rejection message, got: {}",
        stderr
    );
}

#[test]
fn test_history_list_and_show() {
    let (tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    run_docwell(&config_path, &["ingest", &file_arg(&tmp, "billing.json")]);
    let (ask_out, _, _) = run_docwell(&config_path, &["ask", "How do I create an invoice?"]);

    let id = ask_out
        .lines()
        .find(|l| l.starts_with("saved to history:"))
        .and_then(|l| l.split("saved to history:").nth(1))
        .map(|s| s.trim().to_string())
        .expect("ask should print the saved record id");

    let (stdout, _, success) = run_docwell(&config_path, &["history", "list"]);
    assert!(success, "history list failed");
    assert!(stdout.contains("How do I create an invoice?"));
    assert!(stdout.contains(&id));

    let (stdout, _, success) = run_docwell(&config_path, &["history", "show", &id]);
    assert!(success, "history show failed");
    assert!(stdout.contains("--- Question ---"));
    assert!(stdout.contains("--- Answer ---"));
    assert!(stdout.contains("asked:"));
}

#[test]
fn test_history_show_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_docwell(&config_path, &["init"]);
    let (_, stderr, success) = run_docwell(&config_path, &["history", "show", "nonexistent-id"]);
    assert!(!success, "history show with an unknown id should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_unknown_detection_mode_errors() {
    let (tmp, _config_path) = setup_test_env();
    let bad_path = write_config(tmp.path(), "loose");

    let (_, stderr, success) = run_docwell(&bad_path, &["init"]);
    assert!(!success, "Unknown detection mode should fail");
    assert!(
        stderr.contains("Unknown ingest detection mode"),
        "Should reject the mode, got: {}",
        stderr
    );
}
