//! 벌크 디스패처 -- 문서를 배치로 묶어 워커 풀을 통해 백엔드로 전송합니다.
//!
//! # 아키텍처
//!
//! ```text
//! enqueue() ──> [queue mpsc] ──> batcher ──> [batch mpsc] ──> worker 0..N ──> BulkBackend
//!                                  │                               │
//!                          size / interval / close          retry + backoff
//!                                                                  │
//!                                                                  ▼
//!                                                         DeliveryObserver
//! ```
//!
//! 모든 아이템은 정확히 한 번 `on_indexed` 또는 `on_failed`로 완료되며,
//! 드레인 기한을 넘겨 완료되지 못한 아이템은 `on_abandoned`로 한꺼번에 보고됩니다.

pub mod backend;
pub mod batch;
pub mod elasticsearch;
pub mod response;
pub mod retry;

pub use backend::{BulkBackend, DeliveryError};
pub use batch::{BatchBuffer, EncodedItem};
pub use elasticsearch::ElasticsearchBackend;
pub use response::{BulkItemError, BulkItemResult, BulkResponse, BulkResponseItem};
pub use retry::{ExponentialBackoff, RetryPolicy};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lapio_core::metrics as m;
use lapio_core::types::{Document, DocumentId};

use crate::config::DispatcherConfig;
use crate::error::IngestError;

/// 배치 ticker의 최소 주기
const MIN_TICK: Duration = Duration::from_millis(5);

/// 아이템 완료 통지 수신자
pub trait DeliveryObserver: Send + Sync + 'static {
    /// 백엔드가 문서를 인덱싱했습니다.
    fn on_indexed(&self, item: &EncodedItem);

    /// 문서 전달이 최종 실패했습니다.
    fn on_failed(&self, item: &EncodedItem, reason: &str);

    /// 드레인 기한이 지나 `count`개의 아이템이 결과 없이 버려졌습니다.
    fn on_abandoned(&self, count: u64);
}

/// 디스패처 전송 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// 배처가 내보낸 배치 수
    pub batches: u64,
    /// 백엔드로 보낸 요청 수 (재시도 포함)
    pub requests: u64,
    /// 재시도 횟수
    pub retries: u64,
}

/// `close()` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// 기한 안에 모든 태스크가 끝났는지 여부
    pub drained: bool,
    /// 결과 없이 버려진 아이템 수
    pub abandoned: u64,
    pub stats: DispatchStats,
}

/// 아이템 완료와 통계를 한 곳에서 관리합니다.
struct Tracker {
    observer: Arc<dyn DeliveryObserver>,
    in_flight: AtomicU64,
    batches: AtomicU64,
    requests: AtomicU64,
    retries: AtomicU64,
}

impl Tracker {
    fn new(observer: Arc<dyn DeliveryObserver>) -> Self {
        Self {
            observer,
            in_flight: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            retries: AtomicU64::new(0),
        }
    }

    fn resolve_indexed(&self, item: &EncodedItem) {
        self.observer.on_indexed(item);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    fn resolve_failed(&self, item: &EncodedItem, reason: &str) {
        error!(
            line = item.line_number,
            id = item.id.as_ref().map(DocumentId::as_str),
            reason,
            "document delivery failed"
        );
        self.observer.on_failed(item, reason);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    fn fail_all(&self, items: &[EncodedItem], reason: &str) {
        for item in items {
            self.resolve_failed(item, reason);
        }
    }

    fn stats(&self) -> DispatchStats {
        DispatchStats {
            batches: self.batches.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// 벌크 디스패처
///
/// [`start`](Self::start)로 배처와 워커 태스크를 띄우고,
/// [`enqueue`](Self::enqueue)로 문서를 넣은 뒤 [`close`](Self::close)로 드레인합니다.
pub struct BulkDispatcher {
    index: String,
    tx: mpsc::Sender<EncodedItem>,
    tasks: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    tracker: Arc<Tracker>,
}

impl BulkDispatcher {
    /// 백엔드 연결을 확인하고 배처와 워커를 시작합니다.
    ///
    /// ping이 실패하면 어떤 태스크도 띄우지 않고 `BackendUnavailable`을 반환합니다.
    pub async fn start<B: BulkBackend>(
        config: DispatcherConfig,
        backend: Arc<B>,
        observer: Arc<dyn DeliveryObserver>,
    ) -> Result<Self, IngestError> {
        config.validate()?;

        backend
            .ping()
            .await
            .map_err(|e| IngestError::BackendUnavailable(e.to_string()))?;

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<EncodedItem>>(config.workers);
        let batch_rx = Arc::new(Mutex::new(batch_rx));

        let cancel = CancellationToken::new();
        let tracker = Arc::new(Tracker::new(observer));
        let policy = Arc::new(RetryPolicy::new(
            config.backoff_initial,
            config.backoff_max,
            config.max_retries,
            config.retry_on_status.clone(),
        ));

        let mut tasks = Vec::with_capacity(config.workers + 1);
        tasks.push(tokio::spawn(run_batcher(
            rx,
            batch_tx,
            config.flush_bytes,
            config.flush_interval,
            cancel.clone(),
            Arc::clone(&tracker),
        )));

        for worker_id in 0..config.workers {
            tasks.push(tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&batch_rx),
                Arc::clone(&backend),
                Arc::clone(&policy),
                cancel.clone(),
                Arc::clone(&tracker),
            )));
        }

        info!(
            index = %config.index,
            workers = config.workers,
            flush_bytes = config.flush_bytes,
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            "bulk dispatcher started"
        );

        Ok(Self {
            index: config.index,
            tx,
            tasks,
            cancel,
            tracker,
        })
    }

    /// 문서를 인코딩해 큐에 넣습니다. 큐가 가득 차면 대기합니다.
    ///
    /// 자리를 확보한 뒤에만 아이템을 넘기므로, 대기 중에 future를 버려도
    /// 큐와 in-flight 카운트는 바뀌지 않습니다.
    pub async fn enqueue(
        &self,
        id: Option<DocumentId>,
        document: &Document,
        line_number: u64,
    ) -> Result<(), IngestError> {
        let item = EncodedItem::encode(&self.index, id, document, line_number)?;

        let permit = self
            .tx
            .reserve()
            .await
            .map_err(|_| IngestError::Channel("bulk dispatcher queue closed".to_owned()))?;
        self.tracker.in_flight.fetch_add(1, Ordering::Relaxed);
        permit.send(item);
        Ok(())
    }

    /// 아직 완료되지 않은 아이템 수
    pub fn in_flight(&self) -> u64 {
        self.tracker.in_flight.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> DispatchStats {
        self.tracker.stats()
    }

    /// 큐를 닫고 `deadline` 안에 모든 배치가 완료되기를 기다립니다.
    ///
    /// 기한이 지나면 태스크를 취소하고 남은 아이템을 `on_abandoned`로 보고합니다.
    pub async fn close(self, deadline: Duration) -> DrainReport {
        let Self {
            tx,
            mut tasks,
            cancel,
            tracker,
            ..
        } = self;
        drop(tx);

        let drained = tokio::time::timeout(deadline, join_all(&mut tasks))
            .await
            .is_ok();

        if !drained {
            warn!(
                deadline_ms = deadline.as_millis() as u64,
                in_flight = tracker.in_flight.load(Ordering::Relaxed),
                "drain deadline expired, cancelling dispatcher tasks"
            );
            cancel.cancel();
            join_all(&mut tasks).await;
        }

        let abandoned = tracker.in_flight.swap(0, Ordering::Relaxed);
        if abandoned > 0 {
            warn!(abandoned, "documents left unresolved after drain");
            tracker.observer.on_abandoned(abandoned);
        }

        let stats = tracker.stats();
        info!(
            drained,
            abandoned,
            batches = stats.batches,
            requests = stats.requests,
            retries = stats.retries,
            "bulk dispatcher closed"
        );

        DrainReport {
            drained,
            abandoned,
            stats,
        }
    }
}

async fn join_all(tasks: &mut Vec<JoinHandle<()>>) {
    while let Some(task) = tasks.last_mut() {
        if let Err(e) = task.await {
            error!(error = %e, "dispatcher task panicked");
        }
        tasks.pop();
    }
}

fn tick_period(flush_interval: Duration) -> Duration {
    (flush_interval / 4).max(MIN_TICK)
}

async fn run_batcher(
    mut rx: mpsc::Receiver<EncodedItem>,
    batch_tx: mpsc::Sender<Vec<EncodedItem>>,
    flush_bytes: usize,
    flush_interval: Duration,
    cancel: CancellationToken,
    tracker: Arc<Tracker>,
) {
    let mut buffer = BatchBuffer::new();
    let mut ticker = tokio::time::interval(tick_period(flush_interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_flush = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(buffered = buffer.len(), "batcher cancelled");
                return;
            }
            received = rx.recv() => match received {
                Some(item) => {
                    buffer.push(item);
                    if buffer.should_flush(flush_bytes) {
                        if !ship(&batch_tx, &mut buffer, &cancel, &tracker).await {
                            return;
                        }
                        last_flush = Instant::now();
                    }
                }
                None => {
                    if !buffer.is_empty() {
                        ship(&batch_tx, &mut buffer, &cancel, &tracker).await;
                    }
                    debug!("batcher input closed");
                    return;
                }
            },
            _ = ticker.tick() => {
                if !buffer.is_empty() && last_flush.elapsed() >= flush_interval {
                    if !ship(&batch_tx, &mut buffer, &cancel, &tracker).await {
                        return;
                    }
                    last_flush = Instant::now();
                }
            }
        }
    }
}

/// 버퍼를 비워 워커에게 넘깁니다. 취소되면 `false`를 반환합니다.
async fn ship(
    batch_tx: &mpsc::Sender<Vec<EncodedItem>>,
    buffer: &mut BatchBuffer,
    cancel: &CancellationToken,
    tracker: &Tracker,
) -> bool {
    let bytes = buffer.bytes();
    let batch = buffer.take();
    metrics::histogram!(m::INGEST_BULK_BATCH_BYTES).record(bytes as f64);
    tracker.batches.fetch_add(1, Ordering::Relaxed);
    debug!(items = batch.len(), bytes, "shipping batch");

    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = batch_tx.send(batch) => match sent {
            Ok(()) => true,
            Err(mpsc::error::SendError(batch)) => {
                tracker.fail_all(&batch, "no workers available");
                false
            }
        },
    }
}

async fn run_worker<B: BulkBackend>(
    worker_id: usize,
    batches: Arc<Mutex<mpsc::Receiver<Vec<EncodedItem>>>>,
    backend: Arc<B>,
    policy: Arc<RetryPolicy>,
    cancel: CancellationToken,
    tracker: Arc<Tracker>,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            batch = async { batches.lock().await.recv().await } => batch,
        };
        let Some(batch) = next else {
            debug!(worker_id, "worker stopped");
            return;
        };
        deliver(worker_id, batch, backend.as_ref(), &policy, &cancel, &tracker).await;
    }
}

/// 배치 하나를 재시도 에피소드와 함께 전달합니다.
async fn deliver<B: BulkBackend>(
    worker_id: usize,
    batch: Vec<EncodedItem>,
    backend: &B,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    tracker: &Tracker,
) {
    let mut backoff = policy.episode();
    let mut pending = batch;

    while !pending.is_empty() {
        let body = batch::request_body(&pending);
        tracker.requests.fetch_add(1, Ordering::Relaxed);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                tracker.fail_all(&pending, "cancelled");
                return;
            }
            outcome = backend.submit(body) => outcome,
        };

        let (retry, reason) = match outcome {
            Ok(response) => {
                metrics::counter!(m::INGEST_BULK_REQUESTS_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
                if response.items.len() != pending.len() {
                    let reason = format!(
                        "bulk response item count mismatch: sent {}, received {}",
                        pending.len(),
                        response.items.len()
                    );
                    tracker.fail_all(&pending, &reason);
                    return;
                }

                let mut retry = Vec::new();
                let mut last_reason = String::new();
                for (item, result) in pending.into_iter().zip(response.items.iter()) {
                    match result.result() {
                        Some(r) if r.is_success() => tracker.resolve_indexed(&item),
                        Some(r) if policy.is_retryable_status(r.status) => {
                            last_reason = r.failure_reason();
                            retry.push(item);
                        }
                        Some(r) => tracker.resolve_failed(&item, &r.failure_reason()),
                        None => tracker.resolve_failed(&item, "empty bulk response item"),
                    }
                }
                (retry, last_reason)
            }
            Err(e) => {
                metrics::counter!(m::INGEST_BULK_REQUESTS_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                let retryable = match e {
                    DeliveryError::Transport(_) => true,
                    DeliveryError::Status { status, .. } => policy.is_retryable_status(status),
                    DeliveryError::InvalidResponse(_) => false,
                };
                if !retryable {
                    tracker.fail_all(&pending, &e.to_string());
                    return;
                }
                (pending, e.to_string())
            }
        };

        pending = retry;
        if pending.is_empty() {
            return;
        }

        let Some(delay) = backoff.next_backoff() else {
            let reason = format!("retries exhausted: {reason}");
            tracker.fail_all(&pending, &reason);
            return;
        };

        tracker.retries.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::INGEST_BULK_RETRIES_TOTAL).increment(1);
        warn!(
            worker_id,
            attempt = backoff.attempts(),
            items = pending.len(),
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "retrying bulk request"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracker.fail_all(&pending, "cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
