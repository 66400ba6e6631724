//! 실행 상태 누적기
//!
//! 읽기 루프와 디스패처 워커가 동시에 갱신하므로 모든 카운터는 원자적입니다.
//! 각 증가는 대응하는 `metrics` 카운터도 함께 올립니다.

use std::sync::atomic::{AtomicU64, Ordering};

use lapio_core::metrics as m;
use lapio_core::types::RunSummary;

use crate::bulk::{DeliveryObserver, EncodedItem};

/// 실행 카운터
#[derive(Debug, Default)]
pub struct RunStatus {
    rows: AtomicU64,
    indexed: AtomicU64,
    errors: AtomicU64,
    in_flight: AtomicU64,
}

impl RunStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 파일에서 한 줄을 읽었습니다.
    pub fn record_row(&self) {
        self.rows.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::INGEST_ROWS_READ_TOTAL).increment(1);
    }

    /// 어떤 규칙에도 매칭되지 않은 줄입니다.
    pub fn record_unmatched(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::INGEST_LINES_UNMATCHED_TOTAL).increment(1);
    }

    /// 문서를 디스패처에 넘겼습니다.
    pub fn record_enqueued(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// `record_enqueued` 이후 디스패처가 받지 못한 문서입니다.
    pub fn record_rejected(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::INGEST_DOCUMENTS_FAILED_TOTAL).increment(1);
        self.settle(1);
    }

    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    pub fn indexed(&self) -> u64 {
        self.indexed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// 전달 결과를 기다리는 문서 수
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// 현재 카운터의 스냅샷을 반환합니다.
    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            row_count: self.rows(),
            indexed_entries: self.indexed(),
            error_count: self.errors(),
        }
    }

    fn settle(&self, count: u64) {
        // 디스패처만 단독으로 쓰는 경우 in_flight가 0일 수 있음
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(count))
            });
    }
}

impl DeliveryObserver for RunStatus {
    fn on_indexed(&self, _item: &EncodedItem) {
        self.indexed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::INGEST_DOCUMENTS_INDEXED_TOTAL).increment(1);
        self.settle(1);
    }

    fn on_failed(&self, _item: &EncodedItem, _reason: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::INGEST_DOCUMENTS_FAILED_TOTAL).increment(1);
        self.settle(1);
    }

    fn on_abandoned(&self, count: u64) {
        self.errors.fetch_add(count, Ordering::Relaxed);
        metrics::counter!(m::INGEST_DOCUMENTS_FAILED_TOTAL).increment(count);
        self.settle(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapio_core::types::Document;

    fn item() -> EncodedItem {
        EncodedItem::encode("logs", None, &Document::new(), 1).unwrap()
    }

    #[test]
    fn snapshot_reflects_counters() {
        let status = RunStatus::new();
        status.record_row();
        status.record_row();
        status.record_row();
        status.record_unmatched();
        status.record_enqueued();
        status.record_enqueued();
        status.on_indexed(&item());
        status.on_failed(&item(), "mapper_parsing_exception");

        let summary = status.snapshot();
        assert_eq!(summary.row_count, 3);
        assert_eq!(summary.indexed_entries, 1);
        assert_eq!(summary.error_count, 2);
        assert!(summary.is_balanced());
        assert_eq!(status.in_flight(), 0);
    }

    #[test]
    fn abandoned_items_count_as_errors() {
        let status = RunStatus::new();
        for _ in 0..4 {
            status.record_row();
            status.record_enqueued();
        }
        status.on_indexed(&item());
        status.on_abandoned(3);

        let summary = status.snapshot();
        assert_eq!(summary.error_count, 3);
        assert!(summary.is_balanced());
        assert_eq!(status.in_flight(), 0);
    }

    #[test]
    fn rejected_document_settles_in_flight() {
        let status = RunStatus::new();
        status.record_row();
        status.record_enqueued();
        status.record_rejected();
        assert_eq!(status.in_flight(), 0);
        assert!(status.snapshot().is_balanced());
    }

    #[test]
    fn in_flight_does_not_underflow() {
        let status = RunStatus::new();
        status.on_indexed(&item());
        assert_eq!(status.in_flight(), 0);
        assert_eq!(status.indexed(), 1);
    }
}
