//! 배치 버퍼 -- NDJSON으로 인코딩된 아이템을 모아 크기 기준으로 플러시합니다.
//!
//! 각 아이템은 액션 라인과 문서 라인 두 줄로 인코딩됩니다.
//! ```text
//! {"index":{"_index":"logs","_id":"ab12..."}}
//! {"message":"...","log_origin":"..."}
//! ```

use serde::Serialize;

use lapio_core::types::{Document, DocumentId};

/// 인코딩된 벌크 아이템
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedItem {
    /// 원본 라인 번호 (로그용)
    pub line_number: u64,
    /// 문서 식별자 (`None`이면 백엔드가 생성)
    pub id: Option<DocumentId>,
    /// 액션 라인 + 문서 라인 (각각 `\n`으로 끝남)
    pub payload: String,
}

#[derive(Serialize)]
struct ActionLine<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

impl EncodedItem {
    /// 문서를 `index` 액션과 함께 NDJSON 두 줄로 인코딩합니다.
    pub fn encode(
        index: &str,
        id: Option<DocumentId>,
        document: &Document,
        line_number: u64,
    ) -> Result<Self, serde_json::Error> {
        let action = ActionLine {
            index: ActionMeta {
                index,
                id: id.as_ref().map(DocumentId::as_str),
            },
        };

        let mut payload = serde_json::to_string(&action)?;
        payload.push('\n');
        payload.push_str(&document.to_json()?);
        payload.push('\n');

        Ok(Self {
            line_number,
            id,
            payload,
        })
    }

    /// 인코딩된 바이트 수
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// 배치 버퍼
///
/// 인코딩된 아이템과 누적 바이트 수를 유지합니다.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    items: Vec<EncodedItem>,
    bytes: usize,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 아이템을 추가합니다.
    pub fn push(&mut self, item: EncodedItem) {
        self.bytes += item.len();
        self.items.push(item);
    }

    /// 누적 바이트가 임계값 이상이면 `true`를 반환합니다.
    pub fn should_flush(&self, flush_bytes: usize) -> bool {
        !self.items.is_empty() && self.bytes >= flush_bytes
    }

    /// 버퍼를 비우고 모은 아이템을 반환합니다.
    pub fn take(&mut self) -> Vec<EncodedItem> {
        self.bytes = 0;
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 누적된 인코딩 바이트 수
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

/// 아이템들을 하나의 벌크 요청 본문으로 이어 붙입니다.
pub fn request_body(items: &[EncodedItem]) -> String {
    let size = items.iter().map(EncodedItem::len).sum();
    let mut body = String::with_capacity(size);
    for item in items {
        body.push_str(&item.payload);
    }
    body
}
