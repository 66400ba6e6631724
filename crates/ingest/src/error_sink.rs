//! 에러 싱크 -- 어떤 규칙에도 매칭되지 않은 원본 라인을 파일에 기록합니다.
//!
//! 라인은 읽은 순서 그대로, 한 줄에 하나씩 추가됩니다.
//! 기존 파일은 지우지 않고 이어서 씁니다.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::IngestError;

/// 미매칭 라인 기록기
///
/// 읽기 루프만 소유하므로 동기화가 필요 없습니다.
#[derive(Debug)]
pub struct ErrorSink {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl ErrorSink {
    /// 파일을 append 모드로 엽니다. 없으면 생성합니다.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| IngestError::ErrorSink {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        debug!(path = %path.display(), "error sink opened");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// 원본 라인 하나를 바이트 그대로 기록합니다.
    pub async fn record(&mut self, raw: impl AsRef<[u8]>) -> Result<(), IngestError> {
        if let Err(e) = self.write_line(raw.as_ref()).await {
            return Err(self.sink_error(e));
        }
        self.records += 1;
        Ok(())
    }

    /// 버퍼를 비우고 디스크에 동기화합니다. 기록한 라인 수를 반환합니다.
    pub async fn close(mut self) -> Result<u64, IngestError> {
        self.writer.flush().await.map_err(|e| self.sink_error(e))?;
        self.writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| self.sink_error(e))?;
        debug!(path = %self.path.display(), records = self.records, "error sink closed");
        Ok(self.records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 지금까지 기록한 라인 수
    pub fn records(&self) -> u64 {
        self.records
    }

    async fn write_line(&mut self, raw: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(raw).await?;
        self.writer.write_all(b"\n").await
    }

    fn sink_error(&self, e: std::io::Error) -> IngestError {
        IngestError::ErrorSink {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
