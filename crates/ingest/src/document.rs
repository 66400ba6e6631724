//! 문서 생성 -- 매칭 결과를 순서 있는 [`Document`]로 변환합니다.
//!
//! 필드 순서: `message`, `log_origin`, `@timestamp`(파싱 성공 시), 이름 있는 그룹(선언 순서).
//! 타임스탬프 필드는 정규화 결과와 별개로 원문 그대로도 복사됩니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use lapio_core::types::{Document, FIELD_LOG_ORIGIN, FIELD_MESSAGE, FIELD_TIMESTAMP, LogLine};

use crate::directive::{CompiledDirective, DirectiveMatch, TimeMapping};

/// 매칭 결과에서 문서를 만드는 빌더
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    time: Option<TimeMapping>,
}

impl DocumentBuilder {
    /// 타임스탬프 매핑 없이 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 디렉티브의 타임스탬프 매핑을 사용하는 빌더를 생성합니다.
    pub fn from_directive(directive: &CompiledDirective) -> Self {
        Self {
            time: directive.time_mapping().cloned(),
        }
    }

    /// 타임스탬프 매핑을 지정합니다.
    pub fn with_time_mapping(mut self, time: TimeMapping) -> Self {
        self.time = Some(time);
        self
    }

    /// 매칭 결과와 원본 라인으로 문서를 생성합니다.
    ///
    /// 타임스탬프 파싱 실패는 경고만 남기고 `@timestamp` 없이 문서를 반환합니다.
    pub fn build(&self, matched: &DirectiveMatch, line: &LogLine) -> Document {
        let mut doc = Document::new();
        doc.insert(FIELD_MESSAGE, matched.whole.as_str());
        doc.insert(FIELD_LOG_ORIGIN, line.origin());

        if let Some(ref time) = self.time {
            if let Some(raw) = matched.field(&time.field) {
                match normalize_timestamp(raw, &time.layout) {
                    Ok(ts) => doc.insert(FIELD_TIMESTAMP, ts),
                    Err(e) => tracing::warn!(
                        line = line.number(),
                        field = %time.field,
                        layout = %time.layout,
                        value = raw,
                        error = %e,
                        "failed to parse timestamp, indexing without @timestamp"
                    ),
                }
            }
        }

        for (name, value) in &matched.fields {
            doc.insert(name.as_str(), value.as_str());
        }

        doc
    }
}

/// 레이아웃에 따라 텍스트를 파싱하고 RFC 3339 (초 단위, UTC `Z`)로 정규화합니다.
///
/// 시도 순서: 오프셋 포함 일시, 오프셋 없는 일시(UTC로 간주), 날짜만(자정 UTC).
pub fn normalize_timestamp(text: &str, layout: &str) -> Result<String, chrono::ParseError> {
    parse_timestamp(text, layout).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn parse_timestamp(text: &str, layout: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(dt) = DateTime::parse_from_str(text, layout) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, layout).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
