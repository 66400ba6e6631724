#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use lapio_ingest::document::normalize_timestamp;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    text: String,
    layout: String,
}

fuzz_target!(|input: FuzzInput| {
    // 정규화에 성공하면 항상 UTC `Z` 형식
    if let Ok(ts) = normalize_timestamp(&input.text, &input.layout) {
        assert!(ts.ends_with('Z'), "not UTC: {ts}");
    }
});
