#![no_main]

use lapio_ingest::directive::{CompiledDirective, DirectiveLoader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(yaml_str) = std::str::from_utf8(data) else {
        return;
    };
    // 파싱/검증을 통과한 정의는 컴파일도 패닉 없이 끝나야 함
    if let Ok(definition) = DirectiveLoader::parse_yaml(yaml_str, "fuzz-input.yml") {
        let _ = CompiledDirective::compile(definition);
    }
});
