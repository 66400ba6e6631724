//! 벌크 응답 모델 -- `_bulk` 응답 본문의 필요한 부분만 역직렬화합니다.
//!
//! ```json
//! {"took":3,"errors":true,"items":[
//!   {"index":{"_id":"a1","status":201}},
//!   {"index":{"_id":"b2","status":400,"error":{"type":"mapper_parsing_exception","reason":"..."}}}
//! ]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `_bulk` 응답
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    /// 하나 이상의 아이템이 실패했는지 여부
    #[serde(default)]
    pub errors: bool,
    /// 요청 순서와 같은 순서의 아이템 결과
    #[serde(default)]
    pub items: Vec<BulkResponseItem>,
}

/// 아이템 결과 -- 액션 이름(`index`, `create` 등) 하나를 키로 가진 객체
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkResponseItem(BTreeMap<String, BulkItemResult>);

impl BulkResponseItem {
    /// 단일 `index` 액션 결과를 만듭니다.
    pub fn index(result: BulkItemResult) -> Self {
        let mut map = BTreeMap::new();
        map.insert("index".to_owned(), result);
        Self(map)
    }

    /// 액션 종류와 무관하게 결과를 반환합니다.
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.0.values().next()
    }
}

/// 아이템 하나의 처리 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkItemError>,
}

impl BulkItemResult {
    pub fn ok(id: Option<String>, status: u16) -> Self {
        Self {
            id,
            status,
            error: None,
        }
    }

    pub fn failed(status: u16, kind: &str, reason: &str) -> Self {
        Self {
            id: None,
            status,
            error: Some(BulkItemError {
                kind: kind.to_owned(),
                reason: Some(reason.to_owned()),
            }),
        }
    }

    /// 2xx 이고 에러 객체가 없으면 성공입니다.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }

    /// 로그에 남길 실패 사유 (`type: reason`)
    pub fn failure_reason(&self) -> String {
        match self.error {
            Some(ref err) => match err.reason {
                Some(ref reason) => format!("{}: {}", err.kind, reason),
                None => err.kind.clone(),
            },
            None => format!("status {}", self.status),
        }
    }
}

/// 백엔드가 보고한 아이템 에러
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_response() {
        let body = r#"{"took":3,"errors":true,"items":[
            {"index":{"_index":"logs","_id":"a1","status":201,"result":"created"}},
            {"index":{"_index":"logs","_id":"b2","status":400,"error":{"type":"mapper_parsing_exception","reason":"failed to parse field [status]"}}},
            {"index":{"_index":"logs","_id":"c3","status":429,"error":{"type":"es_rejected_execution_exception","reason":"queue full"}}}
        ]}"#;
        let resp: BulkResponse = serde_json::from_str(body).unwrap();
        assert!(resp.errors);
        assert_eq!(resp.items.len(), 3);

        let first = resp.items[0].result().unwrap();
        assert!(first.is_success());
        assert_eq!(first.id.as_deref(), Some("a1"));

        let second = resp.items[1].result().unwrap();
        assert!(!second.is_success());
        assert_eq!(
            second.failure_reason(),
            "mapper_parsing_exception: failed to parse field [status]"
        );

        assert_eq!(resp.items[2].result().unwrap().status, 429);
    }

    #[test]
    fn parses_create_action() {
        let body = r#"{"errors":false,"items":[{"create":{"_id":"x","status":201}}]}"#;
        let resp: BulkResponse = serde_json::from_str(body).unwrap();
        assert!(resp.items[0].result().unwrap().is_success());
    }

    #[test]
    fn failure_reason_without_error_object() {
        let result = BulkItemResult::ok(None, 500);
        assert!(!result.is_success());
        assert_eq!(result.failure_reason(), "status 500");
    }

    #[test]
    fn built_response_serializes_like_backend() {
        let resp = BulkResponse {
            took: 1,
            errors: false,
            items: vec![BulkResponseItem::index(BulkItemResult::ok(
                Some("id1".to_owned()),
                201,
            ))],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"took":1,"errors":false,"items":[{"index":{"_id":"id1","status":201}}]}"#
        );
    }
}
