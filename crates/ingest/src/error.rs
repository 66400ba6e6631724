//! 수집 파이프라인 에러 타입
//!
//! [`IngestError`]는 수집 파이프라인에서 호출자에게 전파되는 에러를 표현합니다.
//! 라인 단위 문제(미매칭, 타임스탬프 파싱 실패, 문서 전달 실패)는 에러로
//! 전파되지 않고 카운터와 로그로만 남습니다.
//!
//! `From<IngestError> for LapioError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use lapio_core::error::{ConfigError, DirectiveError, LapioError, PipelineError};

/// 수집 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 디렉티브 파일 로딩 실패
    #[error("directive load error: {path}: {reason}")]
    DirectiveLoad {
        /// 디렉티브 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 디렉티브 유효성 검증 실패
    #[error("directive validation error: {reason}")]
    DirectiveValidation {
        /// 검증 실패 사유
        reason: String,
    },

    /// 로그 파일을 열거나 읽을 수 없음
    #[error("log file error: {path}: {reason}")]
    LogFile { path: String, reason: String },

    /// 에러 싱크 파일을 열거나 쓸 수 없음
    #[error("error sink error: {path}: {reason}")]
    ErrorSink { path: String, reason: String },

    /// 시작 시 백엔드에 연결할 수 없음
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// 백엔드 클라이언트 구성 실패
    #[error("backend error: {0}")]
    Backend(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 파이프라인 상태 에러 (예: 두 번째 run 호출)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// JSON 직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IngestError> for LapioError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::DirectiveLoad { path, reason } => {
                LapioError::Directive(DirectiveError::Load { path, reason })
            }
            IngestError::DirectiveValidation { reason } => {
                LapioError::Directive(DirectiveError::Validation { reason })
            }
            IngestError::Config { field, reason } => {
                LapioError::Config(ConfigError::InvalidValue { field, reason })
            }
            IngestError::LogFile { path, reason } => {
                LapioError::Pipeline(PipelineError::LogFile { path, reason })
            }
            IngestError::ErrorSink { path, reason } => {
                LapioError::Pipeline(PipelineError::ErrorSink { path, reason })
            }
            IngestError::BackendUnavailable(reason) => {
                LapioError::Pipeline(PipelineError::BackendUnavailable(reason))
            }
            IngestError::Backend(reason) => LapioError::Pipeline(PipelineError::Backend(reason)),
            IngestError::Channel(reason) => LapioError::Pipeline(PipelineError::Channel(reason)),
            IngestError::InvalidState(reason) => {
                LapioError::Pipeline(PipelineError::InvalidState(reason))
            }
            IngestError::Json(e) => LapioError::Pipeline(PipelineError::Backend(e.to_string())),
        }
    }
}
