//! 규칙 매칭 로직 -- 컴파일된 규칙으로 라인을 분류합니다.
//!
//! [`CompiledRule`]은 디렉티브 로딩 시 한 번만 컴파일되며,
//! 이후 모든 라인에 재사용됩니다.

use regex::Regex;

use super::types::RegexRule;
use crate::error::IngestError;

/// 컴파일된 단일 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 디렉티브 내 선언 순서 (0부터)
    index: usize,
    /// 컴파일된 패턴
    regex: Regex,
    /// 기대 캡처 그룹 수 (그룹 0 제외)
    expected_fields: usize,
    /// 이름 있는 그룹 (선언 순서)
    field_names: Vec<String>,
}

/// 라인이 규칙에 매칭된 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMatch {
    /// 매칭된 규칙의 선언 순서
    pub rule_index: usize,
    /// 전체 매치 텍스트 (그룹 0)
    pub whole: String,
    /// 이름 있는 그룹의 (이름, 값), 선언 순서
    ///
    /// 참여하지 않은 선택적 그룹은 빈 문자열입니다.
    pub fields: Vec<(String, String)>,
}

impl DirectiveMatch {
    /// 이름으로 캡처 값을 조회합니다.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl CompiledRule {
    /// 규칙 정의를 컴파일합니다.
    ///
    /// 패턴의 그룹 수가 `capture_groups + 1`과 다르면 이 규칙은 절대 수락하지 않습니다.
    /// 규칙 인덱스를 유지하기 위해 에러가 아닌 경고로 처리합니다.
    pub fn compile(index: usize, rule: &RegexRule) -> Result<Self, IngestError> {
        let regex =
            Regex::new(&rule.expression).map_err(|e| IngestError::DirectiveValidation {
                reason: format!("regexes[{index}]: invalid expression: {e}"),
            })?;

        let field_names: Vec<String> = regex
            .capture_names()
            .flatten()
            .map(str::to_owned)
            .collect();

        let compiled = Self {
            index,
            regex,
            expected_fields: rule.capture_groups,
            field_names,
        };

        if !compiled.can_accept() {
            tracing::warn!(
                rule_index = index,
                declared = rule.capture_groups,
                actual = compiled.regex.captures_len() - 1,
                "capture_groups does not match the pattern, rule will never accept"
            );
        }

        Ok(compiled)
    }

    /// 선언된 캡처 수와 패턴의 그룹 수가 일치하는지 확인합니다.
    pub fn can_accept(&self) -> bool {
        self.regex.captures_len() == self.expected_fields + 1
    }

    /// 라인에 대해 규칙을 평가합니다.
    ///
    /// 패턴이 스스로 앵커링하지 않으면 라인 내 어디서든 매칭됩니다 (leftmost).
    pub fn try_match(&self, line: &str) -> Option<DirectiveMatch> {
        if !self.can_accept() {
            return None;
        }

        let caps = self.regex.captures(line)?;
        if caps.len() != self.expected_fields + 1 {
            return None;
        }

        let whole = caps
            .get(0)
            .map(|m| m.as_str().to_owned())
            .unwrap_or_default();

        let fields = self
            .field_names
            .iter()
            .map(|name| {
                let value = caps
                    .name(name)
                    .map(|m| m.as_str().to_owned())
                    .unwrap_or_default();
                (name.clone(), value)
            })
            .collect();

        Some(DirectiveMatch {
            rule_index: self.index,
            whole,
            fields,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn expected_fields(&self) -> usize {
        self.expected_fields
    }

    /// 이름 있는 그룹 목록 (선언 순서)
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// 원본 패턴 문자열
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// 패턴의 실제 캡처 그룹 수 (그룹 0 제외)
    pub fn pattern_groups(&self) -> usize {
        self.regex.captures_len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(expression: &str, capture_groups: usize) -> CompiledRule {
        CompiledRule::compile(
            0,
            &RegexRule {
                expression: expression.to_owned(),
                capture_groups,
            },
        )
        .unwrap()
    }

    #[test]
    fn named_groups_in_declaration_order() {
        let r = rule(r"^(?P<b>\w+) (?P<a>\w+)$", 2);
        let m = r.try_match("hello world").unwrap();
        assert_eq!(m.whole, "hello world");
        assert_eq!(
            m.fields,
            vec![
                ("b".to_owned(), "hello".to_owned()),
                ("a".to_owned(), "world".to_owned())
            ]
        );
    }

    #[test]
    fn unanchored_pattern_matches_substring() {
        let r = rule(r"(?P<code>\d{3})", 1);
        let m = r.try_match("status=404 path=/").unwrap();
        assert_eq!(m.whole, "404");
        assert_eq!(m.field("code"), Some("404"));
    }

    #[test]
    fn no_match_returns_none() {
        let r = rule(r"^(?P<n>\d+)$", 1);
        assert!(r.try_match("abc").is_none());
    }

    #[test]
    fn capture_count_mismatch_never_accepts() {
        let r = rule(r"^(?P<a>\w+) (?P<b>\w+)$", 3);
        assert!(!r.can_accept());
        assert!(r.try_match("x y").is_none());
    }

    #[test]
    fn unnamed_groups_count_but_produce_no_field() {
        let r = rule(r"^(\w+)-(?P<id>\d+)$", 2);
        let m = r.try_match("order-17").unwrap();
        assert_eq!(m.fields, vec![("id".to_owned(), "17".to_owned())]);
    }

    #[test]
    fn optional_group_surfaces_empty_string() {
        let r = rule(r"^(?P<a>\w+)(?: (?P<b>\w+))?$", 2);
        let m = r.try_match("solo").unwrap();
        assert_eq!(m.field("a"), Some("solo"));
        assert_eq!(m.field("b"), Some(""));
    }

    #[test]
    fn invalid_regex_fails_compilation() {
        let result = CompiledRule::compile(
            2,
            &RegexRule {
                expression: "(?P<broken".to_owned(),
                capture_groups: 1,
            },
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("regexes[2]"));
    }

    #[test]
    fn empty_line_against_optional_pattern() {
        let r = rule(r"^(?P<all>.*)$", 1);
        let m = r.try_match("").unwrap();
        assert_eq!(m.field("all"), Some(""));
    }
}
