//! 디렉티브 데이터 타입
//!
//! YAML 디렉티브 파일에서 역직렬화되는 구조체들을 정의합니다.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// 디렉티브당 최대 규칙 수
const MAX_RULES: usize = 1_000;
/// 규칙 표현식 최대 길이
const MAX_EXPRESSION_LEN: usize = 8 * 1024;

/// 디렉티브 정의 -- 하나의 YAML 파일에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// name: apache-access
/// description: Apache common log
/// regexes:
///   - expression: '^(?P<ip>\S+) (?P<method>\S+) (?P<url>\S+) (?P<status>\d+)$'
///     capture_groups: 4
/// time:
///   field: ts
///   layout: "%d/%b/%Y:%H:%M:%S %z"
/// logfields:
///   - name: ip
///     datatype: ip
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveDefinition {
    /// 디렉티브 이름
    #[serde(default)]
    pub name: String,
    /// 설명
    #[serde(default)]
    pub description: String,
    /// 순서 있는 규칙 목록 (먼저 선언된 규칙이 우선)
    pub regexes: Vec<RegexRule>,
    /// 타임스탬프로 정규화할 캡처 그룹
    #[serde(default)]
    pub time: Option<TimeMapping>,
    /// 필드 메타데이터 (매칭에는 사용하지 않음)
    #[serde(default)]
    pub logfields: Vec<LogField>,
}

/// 단일 규칙 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRule {
    /// 정규식 패턴
    pub expression: String,
    /// 기대 캡처 그룹 수 (그룹 0 제외)
    pub capture_groups: usize,
}

/// 타임스탬프 필드 매핑
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeMapping {
    /// 캡처 그룹 이름
    pub field: String,
    /// chrono strftime 형식 (`%Y-%m-%d %H:%M:%S`)
    pub layout: String,
}

/// 필드 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogField {
    pub name: String,
    #[serde(default)]
    pub datatype: String,
}

impl DirectiveDefinition {
    /// 디렉티브의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.regexes.is_empty() {
            return Err(IngestError::DirectiveValidation {
                reason: "directive must declare at least one regex".to_owned(),
            });
        }

        if self.regexes.len() > MAX_RULES {
            return Err(IngestError::DirectiveValidation {
                reason: format!("too many regexes: max {MAX_RULES}"),
            });
        }

        for (idx, rule) in self.regexes.iter().enumerate() {
            if rule.expression.is_empty() {
                return Err(IngestError::DirectiveValidation {
                    reason: format!("regexes[{idx}]: expression must not be empty"),
                });
            }
            if rule.expression.len() > MAX_EXPRESSION_LEN {
                return Err(IngestError::DirectiveValidation {
                    reason: format!(
                        "regexes[{idx}]: expression exceeds {MAX_EXPRESSION_LEN} characters"
                    ),
                });
            }
        }

        if let Some(ref time) = self.time {
            if time.field.is_empty() {
                return Err(IngestError::DirectiveValidation {
                    reason: "time.field must not be empty".to_owned(),
                });
            }
            if time.layout.is_empty() {
                return Err(IngestError::DirectiveValidation {
                    reason: "time.layout must not be empty".to_owned(),
                });
            }
        }

        Ok(())
    }
}
