#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use lapio_core::config::DocumentIdPolicy;
use lapio_core::types::LogLine;
use lapio_ingest::directive::{CompiledDirective, DirectiveDefinition, RegexRule};
use lapio_ingest::{DocumentBuilder, IdentityAssigner};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 규칙 목록 (최대 8개로 제한)
    rules: Vec<FuzzRule>,
    line: String,
    line_number: u64,
}

#[derive(Arbitrary, Debug)]
struct FuzzRule {
    expression: String,
    capture_groups: u8,
}

fuzz_target!(|input: FuzzInput| {
    let regexes: Vec<RegexRule> = input
        .rules
        .iter()
        .take(8)
        .map(|r| RegexRule {
            expression: r.expression.clone(),
            capture_groups: usize::from(r.capture_groups),
        })
        .collect();

    let definition = DirectiveDefinition {
        name: "fuzz".to_owned(),
        description: String::new(),
        regexes,
        time: None,
        logfields: Vec::new(),
    };

    let Ok(directive) = CompiledDirective::compile(definition) else {
        return;
    };

    let Some(matched) = directive.match_line(&input.line) else {
        return;
    };

    // 매칭된 규칙은 선언한 수만큼의 필드를 가져야 함
    let rule = &directive.rules()[matched.rule_index];
    assert!(rule.can_accept());

    let line = LogLine::new(input.line.as_str(), input.line_number, "fuzz");
    let document = DocumentBuilder::from_directive(&directive).build(&matched, &line);
    assert_eq!(document.keys().next(), Some("message"));
    assert!(document.to_json().is_ok());

    let id = IdentityAssigner::new(DocumentIdPolicy::Content).identify(&line);
    assert!(id.is_some_and(|id| id.as_str().len() == 64));
});
