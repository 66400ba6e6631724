//! lapio.toml 통합 설정 테스트
//!
//! - lapio.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 잘못된 형식 에러 테스트

use lapio_core::config::{DocumentIdPolicy, LapioConfig};
use lapio_core::error::{ConfigError, LapioError};

const EXAMPLE: &str = include_str!("../../../lapio.toml.example");

/// 환경변수를 설정하고 클로저 실행 후 원래 값으로 복원합니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: 테스트는 serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe { std::env::set_var(key, value) };

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

// =============================================================================
// lapio.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = LapioConfig::parse(EXAMPLE).expect("example config should parse");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
}

#[test]
fn example_config_passes_validation() {
    let config = LapioConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let example = LapioConfig::parse(EXAMPLE).expect("should parse");
    let defaults = LapioConfig::default();

    assert_eq!(example.backend.host, defaults.backend.host);
    assert_eq!(example.backend.index, defaults.backend.index);
    assert_eq!(
        example.backend.request_timeout_secs,
        defaults.backend.request_timeout_secs
    );
    assert_eq!(example.bulk.workers, defaults.bulk.workers);
    assert_eq!(example.bulk.flush_bytes, defaults.bulk.flush_bytes);
    assert_eq!(
        example.bulk.flush_interval_secs,
        defaults.bulk.flush_interval_secs
    );
    assert_eq!(example.bulk.queue_capacity, defaults.bulk.queue_capacity);
    assert_eq!(example.bulk.max_retries, defaults.bulk.max_retries);
    assert_eq!(example.bulk.retry_on_status, defaults.bulk.retry_on_status);
    assert_eq!(
        example.bulk.backoff_initial_ms,
        defaults.bulk.backoff_initial_ms
    );
    assert_eq!(example.bulk.backoff_max_ms, defaults.bulk.backoff_max_ms);
    assert_eq!(
        example.bulk.drain_timeout_secs,
        defaults.bulk.drain_timeout_secs
    );
    assert_eq!(example.ingest.error_file, defaults.ingest.error_file);
    assert_eq!(example.ingest.document_id, defaults.ingest.document_id);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_backend_only() {
    let toml = r#"
[backend]
host = "https://search.example.com"
index = "nginx"
"#;
    let config = LapioConfig::parse(toml).expect("should parse");
    assert_eq!(config.backend.host, "https://search.example.com");
    assert_eq!(config.backend.index, "nginx");
    // 나머지 필드는 기본값
    assert_eq!(config.backend.request_timeout_secs, 30);
    assert_eq!(config.bulk.workers, 4);
}

#[test]
fn partial_config_bulk_only() {
    let toml = r#"
[bulk]
workers = 2
retry_on_status = [503]
"#;
    let config = LapioConfig::parse(toml).expect("should parse");
    assert_eq!(config.bulk.workers, 2);
    assert_eq!(config.bulk.retry_on_status, vec![503]);
    assert_eq!(config.bulk.max_retries, 5);
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn partial_config_ingest_only() {
    let toml = r#"
[ingest]
document_id = "backend"
"#;
    let config = LapioConfig::parse(toml).expect("should parse");
    assert_eq!(config.ingest.document_id, DocumentIdPolicy::Backend);
    assert_eq!(config.ingest.error_file, "error.data");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[backend]
host = "http://from-file:9200"
"#;
    let host = with_env("LAPIO_BACKEND_HOST", "http://from-env:9200", || {
        let mut config = LapioConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.backend.host
    });
    assert_eq!(host, "http://from-env:9200");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let workers = with_env("LAPIO_BULK_WORKERS", "16", || {
        let mut config = LapioConfig::default();
        config.apply_env_overrides();
        config.bulk.workers
    });
    assert_eq!(workers, 16);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_numeric_keeps_toml_value() {
    let toml = "[bulk]\nmax_retries = 3\n";
    let retries = with_env("LAPIO_BULK_MAX_RETRIES", "lots", || {
        let mut config = LapioConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.bulk.max_retries
    });
    assert_eq!(retries, 3);
}

#[test]
#[serial_test::serial]
fn env_override_status_list() {
    let codes = with_env("LAPIO_BULK_RETRY_ON_STATUS", "500,503", || {
        let mut config = LapioConfig::default();
        config.apply_env_overrides();
        config.bulk.retry_on_status
    });
    assert_eq!(codes, vec![500, 503]);
}

#[test]
#[serial_test::serial]
fn env_override_document_id_policy() {
    let policy = with_env("LAPIO_INGEST_DOCUMENT_ID", "content_and_position", || {
        let mut config = LapioConfig::default();
        config.apply_env_overrides();
        config.ingest.document_id
    });
    assert_eq!(policy, DocumentIdPolicy::ContentAndPosition);
}

#[tokio::test]
#[serial_test::serial]
async fn load_applies_env_then_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lapio.toml");
    std::fs::write(&path, "[bulk]\nworkers = 2\n").expect("write config");

    let original = std::env::var("LAPIO_BULK_WORKERS").ok();
    // SAFETY: 테스트는 serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe { std::env::set_var("LAPIO_BULK_WORKERS", "0") };

    let result = LapioConfig::load(&path).await;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("LAPIO_BULK_WORKERS", val),
            None => std::env::remove_var("LAPIO_BULK_WORKERS"),
        }
    }

    let err = result.expect_err("workers = 0 should fail validation");
    assert!(matches!(
        err,
        LapioError::Config(ConfigError::InvalidValue { .. })
    ));
}

// =============================================================================
// 에러 케이스
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = LapioConfig::parse("").expect("empty should parse");
    config.validate().expect("defaults should validate");
}

#[test]
fn comments_only_parses_with_defaults() {
    let config = LapioConfig::parse("# nothing here\n# at all\n").expect("should parse");
    assert_eq!(config.backend.index, "logs");
}

#[test]
fn wrong_type_for_numeric_field() {
    let err = LapioConfig::parse("[bulk]\nworkers = \"four\"\n").unwrap_err();
    assert!(matches!(
        err,
        LapioError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[future_feature]
enabled = true

[bulk]
workers = 3
"#;
    let config = LapioConfig::parse(toml).expect("unknown sections should be ignored");
    assert_eq!(config.bulk.workers, 3);
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let result = LapioConfig::from_file("/tmp/lapio_test_nonexistent_12345.toml").await;
    assert!(matches!(
        result.unwrap_err(),
        LapioError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn load_example_config_from_disk() {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let example_path = format!("{}/../../lapio.toml.example", manifest_dir);

    let config = LapioConfig::from_file(&example_path)
        .await
        .expect("example should load from disk");
    config.validate().expect("loaded example should validate");
    assert_eq!(config.bulk.drain_timeout_secs, 60);
}

#[test]
fn serialize_and_reparse_roundtrip() {
    let mut config = LapioConfig::default();
    config.backend.username = "elastic".to_owned();
    config.ingest.document_id = DocumentIdPolicy::Backend;

    let toml_str = toml::to_string_pretty(&config).expect("serialize");
    let parsed = LapioConfig::parse(&toml_str).expect("reparse");
    assert_eq!(parsed.backend.username, "elastic");
    assert_eq!(parsed.ingest.document_id, DocumentIdPolicy::Backend);
}
