use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const SHAPES: &str = "ex:PersonShape a sh:NodeShape ;\n    sh:targetClass ex:Person .";

fn command(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shacl-transformer").expect("binary");
    cmd.current_dir(workdir.path())
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("SHACL_MODEL")
        .env_remove("SHACL_MAX_TOKENS")
        .env_remove("SHACL_PROMPTS_DIR")
        .env_remove("SHACL_LOG_FILE")
        .env("RUST_LOG", "warn");
    cmd
}

fn mock_messages<'a>(server: &'a MockServer, needle: &str) -> httpmock::Mock<'a> {
    let needle = needle.to_string();
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .header("x-api-key", "sk-test")
            .body_contains(needle);
        then.status(200).json_body(json!({
            "content": [{ "type": "text", "text": format!("```turtle\n{SHAPES}\n```") }],
            "stop_reason": "end_turn"
        }));
    })
}

#[test]
fn missing_api_key_fails_before_reading_source() {
    let workdir = TempDir::new().expect("tempdir");

    command(&workdir)
        .args(["convert", "does-not-exist.owl"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}

#[test]
fn writes_result_to_output_file_without_printing() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(
        workdir.path().join("person.json"),
        r#"{"$schema": "https://json-schema.org/draft/2020-12/schema", "properties": {}}"#,
    )
    .expect("write source");
    let server = MockServer::start();
    let mock = mock_messages(&server, "JSON Schema");

    command(&workdir)
        .env("ANTHROPIC_BASE_URL", server.base_url())
        .args([
            "--api-key",
            "sk-test",
            "convert",
            "person.json",
            "-o",
            "out/person.ttl",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    mock.assert();
    let written = fs::read_to_string(workdir.path().join("out/person.ttl")).expect("output");
    assert_eq!(written, format!("{SHAPES}\n"));
}

#[test]
fn prints_result_when_no_output_is_given() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(
        workdir.path().join("people.csv"),
        "name,age\nAda,36\n",
    )
    .expect("write source");
    let server = MockServer::start();
    let mock = mock_messages(&server, "Ada");

    command(&workdir)
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ANTHROPIC_BASE_URL", server.base_url())
        .args(["data", "people.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ex:PersonShape a sh:NodeShape"))
        .stdout(predicate::str::contains("```").not());

    mock.assert();
}

#[test]
fn raw_flag_keeps_code_fences() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(workdir.path().join("people.csv"), "name\nAda\n").expect("write source");
    let server = MockServer::start();
    mock_messages(&server, "Ada");

    command(&workdir)
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ANTHROPIC_BASE_URL", server.base_url())
        .args(["--raw", "convert", "people.csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("```turtle"));
}

#[test]
fn detect_reports_tag_and_template_without_a_key() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(
        workdir.path().join("legacy.ttl"),
        "ex:S a sh:NodeShape ; sh:targetClass ex:Thing .",
    )
    .expect("write source");

    command(&workdir)
        .args(["detect", "legacy.ttl"])
        .assert()
        .success()
        .stdout(predicate::str::diff("shacl1\tupgrade\n"));
}

#[test]
fn forced_template_rejects_incompatible_source() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(workdir.path().join("people.csv"), "name\nAda\n").expect("write source");
    let server = MockServer::start();
    let mock = mock_messages(&server, "Ada");

    command(&workdir)
        .env("ANTHROPIC_API_KEY", "sk-test")
        .env("ANTHROPIC_BASE_URL", server.base_url())
        .args(["xsd", "people.csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));

    mock.assert_hits(0);
}

#[test]
fn api_errors_exit_with_code_one() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(workdir.path().join("people.csv"), "name\nAda\n").expect("write source");
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/messages");
        then.status(401).json_body(json!({
            "type": "error",
            "error": { "type": "authentication_error", "message": "invalid x-api-key" }
        }));
    });

    command(&workdir)
        .env("ANTHROPIC_API_KEY", "sk-bad")
        .env("ANTHROPIC_BASE_URL", server.base_url())
        .args(["convert", "people.csv"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid x-api-key"));
}

#[test]
fn usage_errors_exit_with_code_one() {
    let workdir = TempDir::new().expect("tempdir");

    command(&workdir)
        .args(["convert", "a.bin", "--type", "docx"])
        .assert()
        .code(1);
}

#[test]
fn malformed_url_is_reported_as_url_error() {
    let workdir = TempDir::new().expect("tempdir");

    command(&workdir)
        .env("ANTHROPIC_API_KEY", "sk-test")
        .args(["convert", "https://exa mple.com/onto.owl"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid URL"))
        .stderr(predicate::str::contains("not found").not());
}

#[test]
fn max_tokens_option_shadows_invalid_environment_value() {
    let workdir = TempDir::new().expect("tempdir");
    fs::write(workdir.path().join("people.csv"), "name\nAda\n").expect("write source");

    command(&workdir)
        .env("SHACL_MAX_TOKENS", "lots")
        .args(["--max-tokens", "512", "detect", "people.csv"])
        .assert()
        .success()
        .stdout(predicate::str::diff("csv\tdata\n"));

    command(&workdir)
        .args(["--max-tokens", "0", "detect", "people.csv"])
        .assert()
        .code(1);
}
