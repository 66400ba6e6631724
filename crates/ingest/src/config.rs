//! 수집 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`LapioConfig`]에서 파생되며,
//! 디스패처가 사용하는 [`DispatcherConfig`]를 포함합니다.
//!
//! # 사용 예시
//! ```ignore
//! use lapio_core::config::LapioConfig;
//! use lapio_ingest::config::PipelineConfig;
//!
//! let core_config = LapioConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use lapio_core::config::{DocumentIdPolicy, LapioConfig};

use crate::error::IngestError;

const MAX_WORKERS: usize = 256;

/// 벌크 디스패처 설정
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 대상 인덱스
    pub index: String,
    /// 동시 전송 워커 수
    pub workers: usize,
    /// 크기 기반 플러시 임계값 (바이트)
    pub flush_bytes: usize,
    /// 시간 기반 플러시 간격
    pub flush_interval: Duration,
    /// 입력 큐 용량
    pub queue_capacity: usize,
    /// 배치당 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 대상 HTTP 상태 코드
    pub retry_on_status: Vec<u16>,
    /// 첫 백오프 대기
    pub backoff_initial: Duration,
    /// 백오프 대기 상한
    pub backoff_max: Duration,
    /// 종료 시 드레인 대기 한도
    pub drain_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            index: "logs".to_owned(),
            workers: 4,
            flush_bytes: 5 * 1024 * 1024,
            flush_interval: Duration::from_secs(30),
            queue_capacity: 4096,
            max_retries: 5,
            retry_on_status: vec![429, 502, 503, 504],
            backoff_initial: Duration::from_millis(100),
            backoff_max: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(60),
        }
    }
}

impl DispatcherConfig {
    /// core 설정의 `[backend]`/`[bulk]` 섹션에서 디스패처 설정을 생성합니다.
    pub fn from_core(core: &LapioConfig) -> Self {
        Self {
            index: core.backend.index.clone(),
            workers: core.bulk.workers,
            flush_bytes: core.bulk.flush_bytes,
            flush_interval: Duration::from_secs(core.bulk.flush_interval_secs),
            queue_capacity: core.bulk.queue_capacity,
            max_retries: core.bulk.max_retries,
            retry_on_status: core.bulk.retry_on_status.clone(),
            backoff_initial: Duration::from_millis(core.bulk.backoff_initial_ms),
            backoff_max: Duration::from_millis(core.bulk.backoff_max_ms),
            drain_timeout: Duration::from_secs(core.bulk.drain_timeout_secs),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.index.trim().is_empty() {
            return Err(config_error("index", "must not be empty"));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(config_error(
                "workers",
                &format!("must be 1-{MAX_WORKERS}"),
            ));
        }
        if self.flush_bytes == 0 {
            return Err(config_error("flush_bytes", "must be greater than 0"));
        }
        if self.flush_interval.is_zero() {
            return Err(config_error("flush_interval", "must be greater than 0"));
        }
        if self.queue_capacity == 0 {
            return Err(config_error("queue_capacity", "must be greater than 0"));
        }
        if self.backoff_initial > self.backoff_max {
            return Err(config_error(
                "backoff_max",
                "must be greater than or equal to backoff_initial",
            ));
        }
        Ok(())
    }
}

/// 수집 파이프라인 설정
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 미매칭 라인 기록 파일
    pub error_file: PathBuf,
    /// 문서 식별자 정책
    pub document_id: DocumentIdPolicy,
    /// 디스패처 설정
    pub dispatcher: DispatcherConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            error_file: PathBuf::from("error.data"),
            document_id: DocumentIdPolicy::default(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &LapioConfig) -> Self {
        Self {
            error_file: PathBuf::from(&core.ingest.error_file),
            document_id: core.ingest.document_id,
            dispatcher: DispatcherConfig::from_core(core),
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.error_file.as_os_str().is_empty() {
            return Err(config_error("error_file", "must not be empty"));
        }
        self.dispatcher.validate()
    }
}

fn config_error(field: &str, reason: &str) -> IngestError {
    IngestError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// core 설정에서 시작하는 빌더를 생성합니다.
    pub fn from_core(core: &LapioConfig) -> Self {
        Self {
            config: PipelineConfig::from_core(core),
        }
    }

    /// 에러 파일 경로를 설정합니다.
    pub fn error_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.error_file = path.into();
        self
    }

    /// 문서 식별자 정책을 설정합니다.
    pub fn document_id(mut self, policy: DocumentIdPolicy) -> Self {
        self.config.document_id = policy;
        self
    }

    /// 대상 인덱스를 설정합니다.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.config.dispatcher.index = index.into();
        self
    }

    /// 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.dispatcher.workers = workers;
        self
    }

    /// 크기 기반 플러시 임계값을 설정합니다.
    pub fn flush_bytes(mut self, bytes: usize) -> Self {
        self.config.dispatcher.flush_bytes = bytes;
        self
    }

    /// 시간 기반 플러시 간격을 설정합니다.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.dispatcher.flush_interval = interval;
        self
    }

    /// 입력 큐 용량을 설정합니다.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.dispatcher.queue_capacity = capacity;
        self
    }

    /// 재시도 횟수를 설정합니다.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.dispatcher.max_retries = retries;
        self
    }

    /// 백오프 범위를 설정합니다.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.dispatcher.backoff_initial = initial;
        self.config.dispatcher.backoff_max = max;
        self
    }

    /// 드레인 대기 한도를 설정합니다.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.config.dispatcher.drain_timeout = timeout;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, IngestError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
