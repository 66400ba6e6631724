//! 설정 관리 -- lapio.toml 파싱 및 런타임 설정
//!
//! [`LapioConfig`]는 모든 섹션의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LAPIO_BULK_WORKERS=8` 형식)
//! 3. 설정 파일 (`lapio.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), lapio_core::error::LapioError> {
//! use lapio_core::config::LapioConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LapioConfig::load("lapio.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LapioConfig::parse("[bulk]\nworkers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LapioError};

/// 허용되는 워커 수 상한
const MAX_WORKERS: usize = 256;
/// 최소 플러시 바이트 (1 KiB)
const MIN_FLUSH_BYTES: usize = 1024;
/// 플러시 간격 상한 (초)
const MAX_FLUSH_INTERVAL_SECS: u64 = 3600;
/// 재시도 횟수 상한
const MAX_RETRIES_LIMIT: u32 = 20;

/// lapio 통합 설정
///
/// `lapio.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LapioConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 인덱싱 백엔드 설정
    #[serde(default)]
    pub backend: BackendConfig,
    /// 벌크 디스패치 설정
    #[serde(default)]
    pub bulk: BulkConfig,
    /// 수집 설정
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl LapioConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LapioError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에서 시작한다는 점만 [`load`](Self::load)와 다릅니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, LapioError> {
        let mut config = match Self::from_file(path.as_ref()).await {
            Ok(config) => config,
            Err(LapioError::Config(ConfigError::FileNotFound { path })) => {
                warn!(path = %path, "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LapioError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LapioError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LapioError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LapioError> {
        toml::from_str(toml_str).map_err(|e| {
            LapioError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LAPIO_{SECTION}_{FIELD}`
    /// 예: `LAPIO_BACKEND_HOST=http://es:9200`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LAPIO_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LAPIO_GENERAL_LOG_FORMAT");

        // Backend
        override_string(&mut self.backend.host, "LAPIO_BACKEND_HOST");
        override_string(&mut self.backend.username, "LAPIO_BACKEND_USERNAME");
        override_string(&mut self.backend.password, "LAPIO_BACKEND_PASSWORD");
        override_string(&mut self.backend.index, "LAPIO_BACKEND_INDEX");
        override_u64(
            &mut self.backend.request_timeout_secs,
            "LAPIO_BACKEND_REQUEST_TIMEOUT_SECS",
        );

        // Bulk
        override_usize(&mut self.bulk.workers, "LAPIO_BULK_WORKERS");
        override_usize(&mut self.bulk.flush_bytes, "LAPIO_BULK_FLUSH_BYTES");
        override_u64(
            &mut self.bulk.flush_interval_secs,
            "LAPIO_BULK_FLUSH_INTERVAL_SECS",
        );
        override_usize(&mut self.bulk.queue_capacity, "LAPIO_BULK_QUEUE_CAPACITY");
        override_u32(&mut self.bulk.max_retries, "LAPIO_BULK_MAX_RETRIES");
        override_status_csv(&mut self.bulk.retry_on_status, "LAPIO_BULK_RETRY_ON_STATUS");
        override_u64(
            &mut self.bulk.backoff_initial_ms,
            "LAPIO_BULK_BACKOFF_INITIAL_MS",
        );
        override_u64(&mut self.bulk.backoff_max_ms, "LAPIO_BULK_BACKOFF_MAX_MS");
        override_u64(
            &mut self.bulk.drain_timeout_secs,
            "LAPIO_BULK_DRAIN_TIMEOUT_SECS",
        );

        // Ingest
        override_string(&mut self.ingest.error_file, "LAPIO_INGEST_ERROR_FILE");
        override_id_policy(&mut self.ingest.document_id, "LAPIO_INGEST_DOCUMENT_ID");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LapioError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // backend 검증
        if !(self.backend.host.starts_with("http://") || self.backend.host.starts_with("https://"))
        {
            return Err(invalid(
                "backend.host",
                "must start with http:// or https://".to_owned(),
            ));
        }
        if self.backend.index.trim().is_empty() {
            return Err(invalid("backend.index", "must not be empty".to_owned()));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(invalid(
                "backend.request_timeout_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        // bulk 검증
        if self.bulk.workers == 0 || self.bulk.workers > MAX_WORKERS {
            return Err(invalid(
                "bulk.workers",
                format!("must be between 1 and {MAX_WORKERS}"),
            ));
        }
        if self.bulk.flush_bytes < MIN_FLUSH_BYTES {
            return Err(invalid(
                "bulk.flush_bytes",
                format!("must be at least {MIN_FLUSH_BYTES}"),
            ));
        }
        if self.bulk.flush_interval_secs == 0
            || self.bulk.flush_interval_secs > MAX_FLUSH_INTERVAL_SECS
        {
            return Err(invalid(
                "bulk.flush_interval_secs",
                format!("must be between 1 and {MAX_FLUSH_INTERVAL_SECS}"),
            ));
        }
        if self.bulk.queue_capacity == 0 {
            return Err(invalid(
                "bulk.queue_capacity",
                "must be greater than 0".to_owned(),
            ));
        }
        if self.bulk.max_retries > MAX_RETRIES_LIMIT {
            return Err(invalid(
                "bulk.max_retries",
                format!("must be at most {MAX_RETRIES_LIMIT}"),
            ));
        }
        if let Some(status) = self
            .bulk
            .retry_on_status
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(invalid(
                "bulk.retry_on_status",
                format!("{status} is not an HTTP status code"),
            ));
        }
        if self.bulk.backoff_initial_ms == 0 {
            return Err(invalid(
                "bulk.backoff_initial_ms",
                "must be greater than 0".to_owned(),
            ));
        }
        if self.bulk.backoff_initial_ms > self.bulk.backoff_max_ms {
            return Err(invalid(
                "bulk.backoff_max_ms",
                "must be greater than or equal to backoff_initial_ms".to_owned(),
            ));
        }

        // ingest 검증
        if self.ingest.error_file.trim().is_empty() {
            return Err(invalid("ingest.error_file", "must not be empty".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LapioError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 인덱싱 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// 백엔드 base URL (`http://host:9200`)
    pub host: String,
    /// 기본 인증 사용자명 (비어 있으면 인증 없음)
    pub username: String,
    /// 기본 인증 비밀번호
    pub password: String,
    /// 대상 인덱스 이름
    pub index: String,
    /// 요청당 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:9200".to_owned(),
            username: String::new(),
            password: String::new(),
            index: "logs".to_owned(),
            request_timeout_secs: 30,
        }
    }
}

/// 벌크 디스패치 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// 동시 전송 워커 수
    pub workers: usize,
    /// 배치 크기 플러시 임계값 (바이트)
    pub flush_bytes: usize,
    /// 시간 기반 플러시 간격 (초)
    pub flush_interval_secs: u64,
    /// 디스패처 입력 큐 용량 (백프레셔)
    pub queue_capacity: usize,
    /// 배치당 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 대상 HTTP 상태 코드
    pub retry_on_status: Vec<u16>,
    /// 첫 백오프 대기 (밀리초)
    pub backoff_initial_ms: u64,
    /// 백오프 대기 상한 (밀리초)
    pub backoff_max_ms: u64,
    /// 종료 시 드레인 대기 한도 (초)
    pub drain_timeout_secs: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            flush_bytes: 5 * 1024 * 1024,
            flush_interval_secs: 30,
            queue_capacity: 4096,
            max_retries: 5,
            retry_on_status: vec![429, 502, 503, 504],
            backoff_initial_ms: 100,
            backoff_max_ms: 10_000,
            drain_timeout_secs: 60,
        }
    }
}

/// 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 미매칭 라인을 기록할 파일 경로
    pub error_file: String,
    /// 문서 식별자 정책
    pub document_id: DocumentIdPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            error_file: "error.data".to_owned(),
            document_id: DocumentIdPolicy::default(),
        }
    }
}

/// 문서 식별자 정책
///
/// 같은 내용의 라인을 하나의 문서로 합칠지 여부를 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentIdPolicy {
    /// 라인 내용의 다이제스트 (동일 라인은 같은 문서로 합쳐짐)
    #[default]
    Content,
    /// 원본 경로 + 라인 번호 + 내용의 다이제스트
    ContentAndPosition,
    /// 식별자를 보내지 않고 백엔드가 생성
    Backend,
}

impl DocumentIdPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::ContentAndPosition => "content_and_position",
            Self::Backend => "backend",
        }
    }
}

impl fmt::Display for DocumentIdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentIdPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "content_and_position" => Ok(Self::ContentAndPosition),
            "backend" => Ok(Self::Backend),
            other => Err(ConfigError::InvalidValue {
                field: "ingest.document_id".to_owned(),
                reason: format!(
                    "unknown policy '{other}', expected content, content_and_position or backend"
                ),
            }),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_status_csv(target: &mut Vec<u16>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let parsed: Result<Vec<u16>, _> = val
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::parse::<u16>)
            .collect();
        match parsed {
            Ok(codes) => *target = codes,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse status code list from env var, ignoring"
            ),
        }
    }
}

fn override_id_policy(target: &mut DocumentIdPolicy, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<DocumentIdPolicy>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse document id policy from env var, ignoring"
            ),
        }
    }
}
