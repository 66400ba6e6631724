//! Integration tests for `lapio ingest` and `lapio directive`.
//!
//! The backend is an httpmock server speaking the `_bulk` protocol.

use std::fs;
use std::path::{Path, PathBuf};

use httpmock::prelude::*;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use lapio_cli::commands::{directive, ingest};
use lapio_cli::error::CliError;
use lapio_core::config::LapioConfig;

const DIRECTIVE: &str = r#"
name: access
description: simple access log
regexes:
  - expression: '^(?P<ts>\S+) (?P<level>[A-Z]+) (?P<msg>.+)$'
    capture_groups: 3
"#;

struct Fixture {
    dir: TempDir,
    directive: PathBuf,
    log: PathBuf,
}

impl Fixture {
    fn new(log_content: &str) -> Self {
        let dir = TempDir::new().expect("should create temp dir");
        let directive = dir.path().join("access.yml");
        let log = dir.path().join("access.log");
        fs::write(&directive, DIRECTIVE).expect("should write directive");
        fs::write(&log, log_content).expect("should write log");
        Self {
            dir,
            directive,
            log,
        }
    }

    fn error_file(&self) -> PathBuf {
        self.dir.path().join("errors.log")
    }

    fn config(&self, host: String) -> LapioConfig {
        let mut config = LapioConfig::default();
        config.backend.host = host;
        config.backend.index = "access".to_owned();
        config.bulk.workers = 1;
        config.bulk.backoff_initial_ms = 1;
        config.bulk.backoff_max_ms = 5;
        config.ingest.error_file = self.error_file().display().to_string();
        config
    }
}

fn mock_ping(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body(r#"{"tagline":"You Know, for Search"}"#);
    });
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("should read file")
}

#[tokio::test]
async fn test_ingest_indexes_matched_lines_and_records_unmatched() {
    let fixture = Fixture::new(
        "2026-01-01T00:00:00Z INFO started\ngarbage\n2026-01-01T00:00:01Z WARN slow\n",
    );
    let server = MockServer::start();
    mock_ping(&server);
    let bulk = server.mock(|when, then| {
        when.method(POST)
            .path("/_bulk")
            .header("content-type", "application/x-ndjson")
            .body_contains(r#""_index":"access""#)
            .body_contains(r#""msg":"started""#)
            .body_contains(r#""msg":"slow""#);
        then.status(200).json_body(serde_json::json!({
            "took": 1,
            "errors": false,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 201}}
            ]
        }));
    });

    let config = fixture.config(server.base_url());
    let summary = ingest::run(
        &config,
        &fixture.directive,
        &fixture.log,
        CancellationToken::new(),
    )
    .await
    .expect("ingest should complete");

    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.indexed_entries, 2);
    assert_eq!(summary.error_count, 1);
    assert!(summary.is_balanced());
    bulk.assert_hits(1);
    assert_eq!(read(&fixture.error_file()), "garbage\n");
}

#[tokio::test]
async fn test_ingest_counts_rejected_documents_as_errors() {
    let fixture = Fixture::new("t1 INFO one\nt2 INFO two\n");
    let server = MockServer::start();
    mock_ping(&server);
    server.mock(|when, then| {
        when.method(POST).path("/_bulk");
        then.status(200).json_body(serde_json::json!({
            "took": 1,
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception", "reason": "bad field"}}}
            ]
        }));
    });

    let config = fixture.config(server.base_url());
    let summary = ingest::run(
        &config,
        &fixture.directive,
        &fixture.log,
        CancellationToken::new(),
    )
    .await
    .expect("ingest should complete");

    assert_eq!(summary.row_count, 2);
    assert_eq!(summary.indexed_entries, 1);
    assert_eq!(summary.error_count, 1);
}

#[tokio::test]
async fn test_ingest_backend_unreachable_fails_before_reading() {
    let fixture = Fixture::new("t1 INFO one\n");
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(503).body("unavailable");
    });

    let config = fixture.config(server.base_url());
    let err = ingest::run(
        &config,
        &fixture.directive,
        &fixture.log,
        CancellationToken::new(),
    )
    .await
    .expect_err("unreachable backend should abort the run");

    assert!(matches!(err, CliError::BackendUnavailable(_)), "got {err:?}");
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_ingest_missing_directive() {
    let fixture = Fixture::new("t1 INFO one\n");
    let config = fixture.config("http://127.0.0.1:9".to_owned());
    let missing = fixture.dir.path().join("nope.yml");

    let err = ingest::run(&config, &missing, &fixture.log, CancellationToken::new())
        .await
        .expect_err("missing directive should fail");

    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("nope.yml"));
}

#[tokio::test]
async fn test_directive_validate_describes_rules() {
    let fixture = Fixture::new("");

    let report = directive::validate(&fixture.directive)
        .await
        .expect("directive should validate");

    assert_eq!(report.name, "access");
    assert_eq!(report.rules.len(), 1);
    assert_eq!(report.rules[0].fields, vec!["ts", "level", "msg"]);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_directive_test_line_match() {
    let fixture = Fixture::new("");

    let report = directive::test_line(&fixture.directive, "t1 ERROR disk full")
        .await
        .expect("dry run should succeed");

    assert!(report.matched);
    assert_eq!(report.rule_index, Some(0));
    let document = report.document.expect("matched line has a document");
    assert_eq!(document.get("message"), Some("t1 ERROR disk full"));
    assert_eq!(document.get("level"), Some("ERROR"));
    assert_eq!(document.get("msg"), Some("disk full"));
}

#[tokio::test]
async fn test_directive_test_line_no_match() {
    let fixture = Fixture::new("");

    let report = directive::test_line(&fixture.directive, "garbage")
        .await
        .expect("dry run should succeed");

    assert!(!report.matched);
    assert!(report.document.is_none());
    assert!(report.id.is_none());
}
