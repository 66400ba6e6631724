//! 에러 타입 -- 도메인별 에러 정의

/// lapio 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LapioError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집 파이프라인 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 디렉티브 로드/검증 에러
    #[error("directive error: {0}")]
    Directive(#[from] DirectiveError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 로그 파일을 열거나 읽을 수 없음
    #[error("log file error: {path}: {reason}")]
    LogFile { path: String, reason: String },

    /// 에러 싱크(미매칭 라인 파일) 에러
    #[error("error sink error: {path}: {reason}")]
    ErrorSink { path: String, reason: String },

    /// 백엔드 연결 불가 (시작 시 치명적)
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// 백엔드 처리 에러
    #[error("backend error: {0}")]
    Backend(String),

    /// 채널 전송 실패
    #[error("channel error: {0}")]
    Channel(String),

    /// 잘못된 상태 전이
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// 디렉티브 에러
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// 디렉티브 파일 로드 실패
    #[error("failed to load directive '{path}': {reason}")]
    Load { path: String, reason: String },

    /// 디렉티브 내용 검증 실패
    #[error("invalid directive: {reason}")]
    Validation { reason: String },
}
