// Integration tests for `outreach run` and `outreach ai doctor`.
// Run with: cargo test -p outreach-cli --test run_tests -- --nocapture
//
// The model endpoint is an httpmock server; every test runs in its own temp
// directory with an isolated settings path so user config never leaks in.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use httpmock::prelude::*;
use outreach_engine::cell::CellValue;
use outreach_engine::table::Table;
use outreach_io::TableFormat;

const KEY: &str = "sk-test-123";

fn outreach(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_outreach"));
    cmd.current_dir(dir)
        .env("OUTREACH_CONFIG", dir.join("no-settings.json"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("OUTREACH_OPENAI_KEY")
        .env_remove("OUTREACH_ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn run_with_server(dir: &Path, server: &MockServer, args: &[&str]) -> Output {
    outreach(dir)
        .arg("run")
        .args(args)
        .args(["--endpoint", &server.url("/v1")])
        .env("OUTREACH_OPENAI_KEY", KEY)
        .output()
        .expect("run outreach")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// Positional mode (delimited text)
// ---------------------------------------------------------------------------

#[test]
fn run_csv_appends_generated_column() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.csv",
        "Name,Col2,Col3,Description\nAcme,x,y,Builds rockets\n",
    );

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", format!("Bearer {}", KEY))
            .body_includes("Builds rockets")
            .body_includes("Dear Team, ...");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(completion("Dear Acme team, rockets!"));
    });

    let output = run_with_server(
        dir.path(),
        &server,
        &[input.to_str().unwrap(), "--template", "Dear Team, ..."],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert();

    let log = stderr(&output);
    assert!(log.contains("Processing row 1"), "log: {log}");
    assert!(log.contains("Successfully saved updated spreadsheet to"), "log: {log}");

    assert!(input.exists(), "input must be left in place");
    let table = outreach_io::load(&dir.path().join("leads_updated.csv"), TableFormat::Csv, None).unwrap();
    assert_eq!(table.headers(), &["Name", "Col2", "Col3", "Description", "Custom Email"]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.get(0, 0), &CellValue::text("Acme"));
    assert_eq!(table.get(0, 3), &CellValue::text("Builds rockets"));
    assert_eq!(table.get(0, 4), &CellValue::text("Dear Acme team, rockets!"));
}

#[test]
fn run_csv_empty_description_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "leads.csv", "Name,Col2,Col3,Description\nAcme,x,y,\n");

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(completion("unexpected"));
    });

    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert_calls(0);

    let table = outreach_io::load(&dir.path().join("leads_updated.csv"), TableFormat::Csv, None).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.col_count(), 4);
    assert_eq!(table.get(0, 0), &CellValue::text("Acme"));
}

#[test]
fn run_csv_too_few_columns_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "leads.csv", "Name,Col2,Col3\nAcme,x,y\n");

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(completion("unexpected"));
    });

    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("too few columns"));
    mock.assert_calls(0);
    assert!(!dir.path().join("leads_updated.csv").exists());
}

#[test]
fn run_api_failure_writes_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.csv",
        "Name,Col2,Col3,Description\nAcme,x,y,Builds rockets\nGlobex,x,y,Sells widgets\n",
    );

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(500)
            .header("content-type", "application/json")
            .json_body(serde_json::json!({ "error": { "message": "The server had an error" } }));
    });

    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert_calls(2);

    let table = outreach_io::load(&dir.path().join("leads_updated.csv"), TableFormat::Csv, None).unwrap();
    for row in 0..2 {
        assert_eq!(
            table.get(row, 4),
            &CellValue::text("Error generating email: API error (500): The server had an error")
        );
    }
}

#[test]
fn run_tsv_keeps_tab_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.tsv",
        "Name\tCol2\tCol3\tDescription\nAcme\tx\ty\tBuilds rockets\n",
    );

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(completion("Hello Acme"));
    });

    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let written = std::fs::read_to_string(dir.path().join("leads_updated.tsv")).unwrap();
    assert!(written.starts_with("Name\tCol2\tCol3\tDescription\tCustom Email"), "got {written:?}");
    assert!(written.contains("Hello Acme"));
}

// ---------------------------------------------------------------------------
// Label mode (workbooks)
// ---------------------------------------------------------------------------

#[test]
fn run_xlsx_label_mode_fills_column_e() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("companies.xlsx");

    let mut table = Table::new(vec!["Company".into(), "D".into()]);
    table.name = Some("Leads".into());
    table.push_row(vec![CellValue::text("Acme"), CellValue::text("Builds rockets")]).unwrap();
    table.push_row(vec![CellValue::text("Initech"), CellValue::Empty]).unwrap();
    outreach_io::save(&table, &input, TableFormat::Xlsx).unwrap();

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(completion("Dear Acme"));
    });

    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert_calls(1);

    let out = outreach_io::load(&dir.path().join("companies_updated.xlsx"), TableFormat::Xlsx, None).unwrap();
    assert_eq!(out.name.as_deref(), Some("Leads"));
    assert_eq!(out.headers(), &["Company", "D", "E"]);
    assert_eq!(out.get(0, 2), &CellValue::text("Dear Acme"));
    assert!(out.get(1, 2).is_empty());
}

#[test]
fn run_xlsx_missing_description_label() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("companies.xlsx");

    let mut table = Table::new(vec!["Company".into(), "About".into()]);
    table.push_row(vec![CellValue::text("Acme"), CellValue::text("Builds rockets")]).unwrap();
    outreach_io::save(&table, &input, TableFormat::Xlsx).unwrap();

    let server = MockServer::start();
    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("column 'D' not found"), "stderr: {}", stderr(&output));
    assert!(!dir.path().join("companies_updated.xlsx").exists());
}

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

#[test]
fn run_reads_path_and_template_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.csv",
        "Name,Col2,Col3,Description\nAcme,x,y,Builds rockets\n",
    );

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_includes("Dear Team from stdin");
        then.status(200).json_body(completion("Hello Acme"));
    });

    let mut child = outreach(dir.path())
        .args(["run", "--endpoint", &server.url("/v1")])
        .env("OUTREACH_OPENAI_KEY", KEY)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(format!("{}\nDear Team from stdin\n", input.display()).as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Enter the path to the spreadsheet: "));
    assert!(stdout.contains("Enter the generic email template: "));
    assert!(dir.path().join("leads_updated.csv").exists());
}

#[test]
fn run_missing_file_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();

    let output = run_with_server(dir.path(), &server, &["nope.csv", "--template", "Hi"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("file not found"));
}

#[test]
fn run_unsupported_format_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "leads.ods", "not really");
    let server = MockServer::start();

    let output = run_with_server(dir.path(), &server, &[input.to_str().unwrap(), "--template", "Hi"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_without_key_fails_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.csv",
        "Name,Col2,Col3,Description\nAcme,x,y,Builds rockets\n",
    );

    let output = outreach(dir.path())
        .args(["run", input.to_str().unwrap(), "--template", "Hi"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(11));
    assert!(stderr(&output).contains("OUTREACH_OPENAI_KEY"));
    assert!(!dir.path().join("leads_updated.csv").exists());
}

#[test]
fn run_key_from_dotenv_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.csv",
        "Name,Col2,Col3,Description\nAcme,x,y,Builds rockets\n",
    );
    std::fs::write(dir.path().join(".env"), format!("OPENAI_API_KEY={}\n", KEY)).unwrap();

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", format!("Bearer {}", KEY));
        then.status(200).json_body(completion("Hello Acme"));
    });

    let output = outreach(dir.path())
        .args(["run", input.to_str().unwrap(), "--template", "Hi", "--endpoint", &server.url("/v1")])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    mock.assert();
}

#[test]
fn run_dry_run_prints_prompts_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(
        dir.path(),
        "leads.csv",
        "Name,Col2,Col3,Description\nAcme,x,y,Builds rockets\n",
    );

    let output = outreach(dir.path())
        .args(["run", input.to_str().unwrap(), "--template", "Dear Team", "--dry-run"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Company name:\nAcme"));
    assert!(stdout.contains("Company description:\nBuilds rockets"));
    assert!(!dir.path().join("leads_updated.csv").exists());
}

#[test]
fn run_settings_file_sets_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_csv(dir.path(), "leads.csv", "Company,About\nAcme,Builds rockets\n");
    let settings = dir.path().join("settings.json");
    std::fs::write(
        &settings,
        r#"{
  // label mode for a narrow sheet
  "pipeline": { "mode": "label", "description_column": "About", "output_column": "Draft", "output_suffix": "_out" }
}"#,
    )
    .unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(completion("Hello Acme"));
    });

    let output = run_with_server(
        dir.path(),
        &server,
        &[input.to_str().unwrap(), "--template", "Hi", "--config", settings.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let table = outreach_io::load(&dir.path().join("leads_out.csv"), TableFormat::Csv, None).unwrap();
    assert_eq!(table.headers(), &["Company", "About", "Draft"]);
    assert_eq!(table.get(0, 2), &CellValue::text("Hello Acme"));
}

// ---------------------------------------------------------------------------
// ai doctor
// ---------------------------------------------------------------------------

#[test]
fn ai_doctor_json_reports_key_source() {
    let dir = tempfile::tempdir().unwrap();
    let output = outreach(dir.path())
        .args(["ai", "doctor", "--json"])
        .env("OUTREACH_OPENAI_KEY", KEY)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["status"], "ready");
    assert_eq!(json["provider"], "openai");
    assert_eq!(json["model"], "gpt-4o");
    assert_eq!(json["key"], "present");
    assert_eq!(json["key_source"], "environment");
}

#[test]
fn ai_doctor_missing_key_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = outreach(dir.path()).args(["ai", "doctor"]).output().unwrap();

    assert_eq!(output.status.code(), Some(11));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status:          missing_key"));
}
