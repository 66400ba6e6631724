//! 디렉티브 -- 순서 있는 정규식 규칙 집합과 타임스탬프 매핑
//!
//! YAML 파일에서 [`DirectiveDefinition`]을 로드하고, 모든 패턴을 한 번 컴파일하여
//! [`CompiledDirective`]를 만듭니다. 라인 분류는 선언 순서대로 규칙을 시도하고
//! 처음 수락한 규칙의 결과를 반환합니다.
//!
//! # 사용 예시
//! ```ignore
//! use lapio_ingest::directive::CompiledDirective;
//!
//! let directive = CompiledDirective::load("apache.yml").await?;
//! if let Some(m) = directive.match_line("127.0.0.1 GET /index.html 200") {
//!     println!("rule {} matched", m.rule_index);
//! }
//! ```

pub mod loader;
pub mod matcher;
pub mod types;

use std::path::Path;

pub use loader::DirectiveLoader;
pub use matcher::{CompiledRule, DirectiveMatch};
pub use types::{DirectiveDefinition, LogField, RegexRule, TimeMapping};

use crate::error::IngestError;

/// 컴파일된 디렉티브
///
/// 생성 이후 불변이므로 `Arc`로 여러 태스크에서 공유할 수 있습니다.
#[derive(Debug, Clone)]
pub struct CompiledDirective {
    name: String,
    description: String,
    rules: Vec<CompiledRule>,
    time: Option<TimeMapping>,
    logfields: Vec<LogField>,
}

impl CompiledDirective {
    /// 디렉티브 파일을 로드하고 컴파일합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let definition = DirectiveLoader::load_file(path).await?;
        Self::compile(definition)
    }

    /// 정의를 검증하고 모든 규칙을 컴파일합니다.
    pub fn compile(definition: DirectiveDefinition) -> Result<Self, IngestError> {
        definition.validate()?;

        let rules = definition
            .regexes
            .iter()
            .enumerate()
            .map(|(idx, rule)| CompiledRule::compile(idx, rule))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(ref time) = definition.time {
            let declared = rules
                .iter()
                .any(|r| r.field_names().iter().any(|n| *n == time.field));
            if !declared {
                tracing::warn!(
                    field = %time.field,
                    "time field is not a named group of any rule, @timestamp will never be set"
                );
            }
        }

        tracing::debug!(
            directive = %definition.name,
            rules = rules.len(),
            "compiled directive"
        );

        Ok(Self {
            name: definition.name,
            description: definition.description,
            rules,
            time: definition.time,
            logfields: definition.logfields,
        })
    }

    /// 라인을 분류합니다. 선언 순서상 처음 수락한 규칙이 이깁니다.
    pub fn match_line(&self, line: &str) -> Option<DirectiveMatch> {
        self.rules.iter().find_map(|rule| rule.try_match(line))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn time_mapping(&self) -> Option<&TimeMapping> {
        self.time.as_ref()
    }

    pub fn logfields(&self) -> &[LogField] {
        &self.logfields
    }

    /// 선언된 캡처 수가 패턴과 맞지 않아 절대 수락하지 않는 규칙 인덱스
    pub fn unreachable_rules(&self) -> Vec<usize> {
        self.rules
            .iter()
            .filter(|r| !r.can_accept())
            .map(CompiledRule::index)
            .collect()
    }
}
