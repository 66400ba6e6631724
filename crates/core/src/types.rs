//! 도메인 타입 -- 파이프라인 전반에서 공유되는 값 타입
//!
//! - [`LogLine`]: 로그 파일에서 읽은 한 줄 (불변)
//! - [`Document`]: 매칭된 라인에서 추출한 필드의 순서 있는 레코드
//! - [`DocumentId`]: 백엔드 레코드 키로 쓰이는 결정적 식별자
//! - [`RunSummary`]: 한 번의 실행 결과 카운터

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// 원본 라인 전체 텍스트 필드명
pub const FIELD_MESSAGE: &str = "message";
/// 원본 로그 파일 경로 필드명
pub const FIELD_LOG_ORIGIN: &str = "log_origin";
/// 정규화된 타임스탬프 필드명
pub const FIELD_TIMESTAMP: &str = "@timestamp";

/// 로그 파일에서 읽은 한 줄
///
/// 읽은 뒤에는 변경되지 않습니다. 줄 끝의 `\n`/`\r`은 제거된 상태입니다.
/// 원본 바이트와, 잘못된 UTF-8을 대체 문자로 바꾼 텍스트를 함께 가집니다.
/// 식별자와 에러 파일은 바이트를, 매칭과 문서 필드는 텍스트를 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    bytes: Vec<u8>,
    text: String,
    number: u64,
    origin: String,
}

impl LogLine {
    /// UTF-8 텍스트로 라인을 생성합니다. `number`는 1부터 시작합니다.
    pub fn new(raw: impl Into<String>, number: u64, origin: impl Into<String>) -> Self {
        let text = raw.into();
        Self {
            bytes: text.as_bytes().to_vec(),
            text,
            number,
            origin: origin.into(),
        }
    }

    /// 파일에서 읽은 바이트 그대로 라인을 생성합니다.
    pub fn from_bytes(bytes: Vec<u8>, number: u64, origin: impl Into<String>) -> Self {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Self {
            bytes,
            text,
            number,
            origin: origin.into(),
        }
    }

    /// 매칭에 쓰이는 텍스트 (잘못된 UTF-8은 U+FFFD)
    pub fn raw(&self) -> &str {
        &self.text
    }

    /// 파일에 있던 원본 바이트
    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 1부터 시작하는 라인 번호
    pub fn number(&self) -> u64 {
        self.number
    }

    /// 라인을 읽은 파일 경로
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// 순서 있는 문자열 키/값 레코드
///
/// 삽입 순서 그대로 JSON 객체로 직렬화됩니다.
/// 같은 키를 다시 넣으면 기존 위치의 값이 교체되므로 JSON 키가 중복되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: Vec<(String, String)>,
}

impl Document {
    /// 빈 문서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드를 추가하거나 기존 필드 값을 교체합니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// 삽입 순서대로 필드 이름을 반환합니다.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 문서를 한 줄짜리 JSON 객체로 직렬화합니다.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// 백엔드 레코드 키로 쓰이는 문서 식별자 (소문자 hex 다이제스트)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// 다이제스트 바이트를 소문자 hex 문자열로 인코딩합니다.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 한 번의 실행 결과
///
/// 드레인이 끝난 뒤에는 `row_count == indexed_entries + error_count`가 성립합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// 읽은 전체 라인 수
    pub row_count: u64,
    /// 백엔드가 성공을 확인한 문서 수
    pub indexed_entries: u64,
    /// 미매칭 라인 + 전달 실패 문서 수
    pub error_count: u64,
}

impl RunSummary {
    /// 카운터 불변식이 성립하는지 확인합니다.
    pub fn is_balanced(&self) -> bool {
        self.row_count == self.indexed_entries + self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} indexed={} errors={}",
            self.row_count, self.indexed_entries, self.error_count
        )
    }
}
