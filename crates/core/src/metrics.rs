//! 메트릭 상수 및 설명 등록
//!
//! 수집 파이프라인의 메트릭 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! 레코더가 설치되지 않으면 모든 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `lapio_ingest_`
//! - 접미어: `_total` (counter), `_bytes` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(lapio_core::metrics::INGEST_ROWS_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Ingest 메트릭 ─────────────────────────────────────────────────

/// 읽은 전체 라인 수 (counter)
pub const INGEST_ROWS_READ_TOTAL: &str = "lapio_ingest_rows_read_total";

/// 인덱싱 성공 문서 수 (counter)
pub const INGEST_DOCUMENTS_INDEXED_TOTAL: &str = "lapio_ingest_documents_indexed_total";

/// 전달 실패 문서 수 (counter)
pub const INGEST_DOCUMENTS_FAILED_TOTAL: &str = "lapio_ingest_documents_failed_total";

/// 어떤 규칙에도 매칭되지 않은 라인 수 (counter)
pub const INGEST_LINES_UNMATCHED_TOTAL: &str = "lapio_ingest_lines_unmatched_total";

/// 전송한 벌크 요청 수 (counter, label: result)
pub const INGEST_BULK_REQUESTS_TOTAL: &str = "lapio_ingest_bulk_requests_total";

/// 벌크 재시도 횟수 (counter)
pub const INGEST_BULK_RETRIES_TOTAL: &str = "lapio_ingest_bulk_retries_total";

/// 배치 크기 (histogram, 바이트)
pub const INGEST_BULK_BATCH_BYTES: &str = "lapio_ingest_bulk_batch_bytes";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        INGEST_ROWS_READ_TOTAL,
        "Total number of lines read from the log file"
    );
    describe_counter!(
        INGEST_DOCUMENTS_INDEXED_TOTAL,
        "Documents confirmed as indexed by the backend"
    );
    describe_counter!(
        INGEST_DOCUMENTS_FAILED_TOTAL,
        "Documents that failed delivery after retries"
    );
    describe_counter!(
        INGEST_LINES_UNMATCHED_TOTAL,
        "Lines that matched no directive rule"
    );
    describe_counter!(
        INGEST_BULK_REQUESTS_TOTAL,
        "Bulk requests submitted to the backend"
    );
    describe_counter!(
        INGEST_BULK_RETRIES_TOTAL,
        "Backoff waits performed before resubmitting a bulk request"
    );
    describe_histogram!(
        INGEST_BULK_BATCH_BYTES,
        "Encoded size of each bulk batch in bytes"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        INGEST_ROWS_READ_TOTAL,
        INGEST_DOCUMENTS_INDEXED_TOTAL,
        INGEST_DOCUMENTS_FAILED_TOTAL,
        INGEST_LINES_UNMATCHED_TOTAL,
        INGEST_BULK_REQUESTS_TOTAL,
        INGEST_BULK_RETRIES_TOTAL,
        INGEST_BULK_BATCH_BYTES,
    ];

    #[test]
    fn all_metrics_start_with_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("lapio_ingest_"),
                "Metric '{}' does not start with 'lapio_ingest_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in ALL_METRIC_NAMES
            .iter()
            .filter(|n| **n != INGEST_BULK_BATCH_BYTES)
        {
            assert!(name.ends_with("_total"), "counter '{}' lacks _total", name);
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        assert_eq!(LABEL_RESULT.to_lowercase(), LABEL_RESULT);
    }
}
