//! 벌크 백엔드 추상화
//!
//! 디스패처는 [`BulkBackend`] trait만 알고 있으므로
//! 운영 코드는 [`ElasticsearchBackend`](super::ElasticsearchBackend)를,
//! 테스트는 인메모리 mock을 주입할 수 있습니다.
//!
//! ```text
//! ┌────────────────┐
//! │ BulkDispatcher │
//! └───────┬────────┘
//!         ▼
//!   ┌─────────────┐
//!   │ BulkBackend │ (trait)
//!   └─────────────┘
//!      │       │
//!      ▼       ▼
//! Elasticsearch  Mock
//! ```

use std::future::Future;

use super::response::BulkResponse;

/// 벌크 요청 실패
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    /// 연결 실패, 타임아웃 등 전송 계층 에러 (항상 재시도)
    #[error("transport error: {0}")]
    Transport(String),

    /// 백엔드가 요청 전체를 비정상 상태로 응답
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// 응답 본문을 해석할 수 없음 (재시도하지 않음)
    #[error("invalid bulk response: {0}")]
    InvalidResponse(String),
}

impl DeliveryError {
    /// 응답 상태 코드 (있는 경우)
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 벌크 인덱싱 백엔드
///
/// 구현체는 여러 워커 태스크에서 동시에 호출되므로 `Send + Sync`여야 합니다.
pub trait BulkBackend: Send + Sync + 'static {
    /// 백엔드가 요청을 받을 수 있는지 확인합니다.
    ///
    /// 디스패처 시작 시 한 번 호출되며, 실패하면 수집을 시작하지 않습니다.
    fn ping(&self) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    /// NDJSON 본문을 하나의 벌크 요청으로 전송합니다.
    ///
    /// 응답 아이템은 본문의 액션 순서와 같은 순서여야 합니다.
    fn submit(&self, body: String)
    -> impl Future<Output = Result<BulkResponse, DeliveryError>> + Send;
}
