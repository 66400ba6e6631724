//! 수집 파이프라인 드라이버
//!
//! 로그 파일을 한 줄씩 읽어 디렉티브로 매칭하고, 문서를 만들어 디스패처에 넘깁니다.
//!
//! # 상태 전이
//!
//! ```text
//! Idle ──run()──> Running ──EOF / cancel / read error──> Draining ──> Finished
//!   │                                                                  ▲
//!   └──────────── startup failure (log file, error sink, ping) ────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lapio_core::types::{LogLine, RunSummary};

use crate::bulk::{BulkBackend, BulkDispatcher, DeliveryObserver};
use crate::config::PipelineConfig;
use crate::directive::CompiledDirective;
use crate::document::DocumentBuilder;
use crate::error::IngestError;
use crate::error_sink::ErrorSink;
use crate::identity::IdentityAssigner;
use crate::status::RunStatus;

/// 파이프라인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 생성됨, 아직 실행 전
    Idle,
    /// 로그 파일을 읽는 중
    Running,
    /// 디스패처 드레인 중
    Draining,
    /// 실행 완료 (재실행 불가)
    Finished,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Finished => "finished",
        }
    }
}

/// 수집 파이프라인
///
/// 한 번의 [`run`](Self::run)으로 로그 파일 하나를 끝까지 처리합니다.
pub struct IngestPipeline<B: BulkBackend> {
    directive: Arc<CompiledDirective>,
    backend: Arc<B>,
    config: PipelineConfig,
    documents: DocumentBuilder,
    identity: IdentityAssigner,
    status: Arc<RunStatus>,
    cancel: CancellationToken,
    state: PipelineState,
}

impl<B: BulkBackend> IngestPipeline<B> {
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &'static str {
        self.state.as_str()
    }

    /// 실행 카운터 (실행 중에도 읽을 수 있음)
    pub fn status(&self) -> Arc<RunStatus> {
        Arc::clone(&self.status)
    }

    pub fn directive(&self) -> &CompiledDirective {
        &self.directive
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 외부에서 읽기를 중단시킬 때 사용하는 토큰
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 로그 파일 하나를 처리하고 실행 요약을 반환합니다.
    ///
    /// 시작 단계 실패(로그 파일, 에러 파일, 백엔드 ping)만 에러로 반환됩니다.
    /// 줄 단위 실패는 `error_count`로 집계됩니다. 읽기 도중 I/O 에러가 나면
    /// 이미 넘긴 문서를 드레인한 뒤 에러를 반환합니다.
    pub async fn run(&mut self, log_path: impl AsRef<Path>) -> Result<RunSummary, IngestError> {
        if self.state != PipelineState::Idle {
            return Err(IngestError::InvalidState(format!(
                "pipeline cannot run from state '{}'",
                self.state_name()
            )));
        }

        let log_path = log_path.as_ref();
        let origin = log_path.display().to_string();

        let (file, mut sink, dispatcher) = match self.start(log_path, &origin).await {
            Ok(started) => started,
            Err(e) => {
                self.state = PipelineState::Finished;
                return Err(e);
            }
        };

        self.state = PipelineState::Running;
        info!(
            directive = self.directive.name(),
            log = %origin,
            index = %self.config.dispatcher.index,
            document_id = %self.config.document_id,
            "ingest started"
        );

        let read_result = self.read_loop(file, &origin, &mut sink, &dispatcher).await;

        self.state = PipelineState::Draining;
        debug!(in_flight = dispatcher.in_flight(), "draining bulk dispatcher");
        let report = dispatcher.close(self.config.dispatcher.drain_timeout).await;
        if let Err(e) = sink.close().await {
            warn!(error = %e, "failed to close error sink");
        }

        self.state = PipelineState::Finished;
        let summary = self.status.snapshot();
        info!(
            rows = summary.row_count,
            indexed = summary.indexed_entries,
            errors = summary.error_count,
            abandoned = report.abandoned,
            requests = report.stats.requests,
            retries = report.stats.retries,
            "ingest finished"
        );

        read_result.map(|()| summary)
    }

    async fn start(
        &self,
        log_path: &Path,
        origin: &str,
    ) -> Result<(File, ErrorSink, BulkDispatcher), IngestError> {
        let file = File::open(log_path)
            .await
            .map_err(|e| IngestError::LogFile {
                path: origin.to_owned(),
                reason: e.to_string(),
            })?;
        let sink = ErrorSink::open(&self.config.error_file).await?;

        let observer: Arc<dyn DeliveryObserver> = self.status.clone();
        let dispatcher = BulkDispatcher::start(
            self.config.dispatcher.clone(),
            Arc::clone(&self.backend),
            observer,
        )
        .await?;

        Ok((file, sink, dispatcher))
    }

    async fn read_loop(
        &self,
        file: File,
        origin: &str,
        sink: &mut ErrorSink,
        dispatcher: &BulkDispatcher,
    ) -> Result<(), IngestError> {
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut number: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!(lines = number, "ingest cancelled, stopping read loop");
                return Ok(());
            }

            buf.clear();
            let read = tokio::select! {
                _ = self.cancel.cancelled() => continue,
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    debug!(lines = number, "reached end of log file");
                    return Ok(());
                }
                Ok(_) => {
                    number += 1;
                    let raw = strip_line_ending(&buf).to_vec();
                    self.process_line(LogLine::from_bytes(raw, number, origin), sink, dispatcher)
                        .await;
                }
                Err(e) => {
                    warn!(line = number + 1, error = %e, "failed to read log file");
                    return Err(IngestError::LogFile {
                        path: origin.to_owned(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn process_line(&self, line: LogLine, sink: &mut ErrorSink, dispatcher: &BulkDispatcher) {
        self.status.record_row();

        let Some(matched) = self.directive.match_line(line.raw()) else {
            debug!(line = line.number(), "line did not match any rule");
            self.status.record_unmatched();
            if let Err(e) = sink.record(line.raw_bytes()).await {
                warn!(line = line.number(), error = %e, "failed to record unmatched line");
            }
            return;
        };

        let document = self.documents.build(&matched, &line);
        let id = self.identity.identify(&line);

        // 큐가 가득 찬 동안에도 취소는 기다리지 않습니다.
        self.status.record_enqueued();
        tokio::select! {
            result = dispatcher.enqueue(id, &document, line.number()) => {
                if let Err(e) = result {
                    warn!(line = line.number(), error = %e, "failed to enqueue document");
                    self.status.record_rejected();
                }
            }
            _ = self.cancel.cancelled() => {
                warn!(line = line.number(), "ingest cancelled while waiting for queue space, document dropped");
                self.status.record_rejected();
            }
        }
    }
}

/// 줄 끝의 `\n`, `\r`을 뗀 원본 바이트
fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// 수집 파이프라인 빌더
pub struct IngestPipelineBuilder<B: BulkBackend> {
    directive: Arc<CompiledDirective>,
    backend: Arc<B>,
    config: PipelineConfig,
    cancel: Option<CancellationToken>,
}

impl<B: BulkBackend> IngestPipelineBuilder<B> {
    /// 컴파일된 디렉티브와 백엔드로 빌더를 생성합니다.
    pub fn new(directive: impl Into<Arc<CompiledDirective>>, backend: Arc<B>) -> Self {
        Self {
            directive: directive.into(),
            backend,
            config: PipelineConfig::default(),
            cancel: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 외부 취소 토큰을 연결합니다. 설정하지 않으면 새 토큰을 만듭니다.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 설정을 검증하고 파이프라인을 생성합니다.
    pub fn build(self) -> Result<IngestPipeline<B>, IngestError> {
        self.config.validate()?;

        let documents = DocumentBuilder::from_directive(&self.directive);
        let identity = IdentityAssigner::new(self.config.document_id);

        Ok(IngestPipeline {
            directive: self.directive,
            backend: self.backend,
            config: self.config,
            documents,
            identity,
            status: Arc::new(RunStatus::new()),
            cancel: self.cancel.unwrap_or_default(),
            state: PipelineState::Idle,
        })
    }
}
