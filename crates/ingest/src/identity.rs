//! 문서 식별자 -- 라인 내용의 SHA-256 다이제스트
//!
//! 같은 바이트의 라인은 실행이 달라도 항상 같은 식별자를 받습니다.
//! 중복 라인을 하나의 문서로 합칠지는 [`DocumentIdPolicy`]로 결정합니다.

use sha2::{Digest, Sha256};

use lapio_core::config::DocumentIdPolicy;
use lapio_core::types::{DocumentId, LogLine};

/// 라인의 원본 바이트만으로 식별자를 계산합니다.
pub fn assign(raw: impl AsRef<[u8]>) -> DocumentId {
    DocumentId::from_digest(&Sha256::digest(raw.as_ref()))
}

/// 원본 경로, 라인 번호, 내용으로 식별자를 계산합니다.
///
/// 같은 파일을 다시 수집해도 식별자는 같고, 파일 안의 반복 라인은 서로 다른 문서가 됩니다.
pub fn assign_positional(line: &LogLine) -> DocumentId {
    let mut hasher = Sha256::new();
    hasher.update(line.origin().as_bytes());
    hasher.update([0u8]);
    hasher.update(line.number().to_be_bytes());
    hasher.update(line.raw_bytes());
    DocumentId::from_digest(&hasher.finalize())
}

/// 정책에 따라 식별자를 부여합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAssigner {
    policy: DocumentIdPolicy,
}

impl IdentityAssigner {
    pub fn new(policy: DocumentIdPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DocumentIdPolicy {
        self.policy
    }

    /// `Backend` 정책이면 `None`을 반환해 백엔드가 ID를 생성하도록 합니다.
    pub fn identify(&self, line: &LogLine) -> Option<DocumentId> {
        match self.policy {
            DocumentIdPolicy::Content => Some(assign(line.raw_bytes())),
            DocumentIdPolicy::ContentAndPosition => Some(assign_positional(line)),
            DocumentIdPolicy::Backend => None,
        }
    }
}
