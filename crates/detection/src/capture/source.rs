//! JSON 원시 이벤트 소스
//!
//! 줄 단위 JSON(`RawEvent` 하나당 한 줄)을 파일 또는 표준 입력에서 읽어
//! 캡처 세션 채널로 전달합니다. OS 캡처 계층은 이 형식으로 이벤트를 내보냅니다.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netwarden_core::event::RawEvent;

use crate::error::DetectionError;

/// 표준 입력을 뜻하는 경로
pub const STDIN_SOURCE: &str = "-";

/// 줄 단위 JSON 이벤트 소스
pub struct JsonEventSource {
    path: PathBuf,
    tx: mpsc::Sender<RawEvent>,
}

impl JsonEventSource {
    /// 새 소스를 생성합니다. 경로가 `-`이면 표준 입력을 읽습니다.
    pub fn new(path: impl Into<PathBuf>, tx: mpsc::Sender<RawEvent>) -> Self {
        Self {
            path: path.into(),
            tx,
        }
    }

    fn source_type(&self) -> String {
        if self.path.as_os_str() == STDIN_SOURCE {
            "stdin".to_owned()
        } else {
            format!("file:{}", self.path.display())
        }
    }

    /// 입력이 끝나거나 취소될 때까지 이벤트를 전달합니다. 전달한 이벤트 수를 반환합니다.
    ///
    /// 파싱할 수 없는 줄은 경고를 남기고 건너뜁니다.
    pub async fn run(self, cancel: CancellationToken) -> Result<u64, DetectionError> {
        let source_type = self.source_type();

        if self.path.as_os_str() == STDIN_SOURCE {
            let reader = BufReader::new(tokio::io::stdin());
            return forward(reader, &self.tx, &source_type, cancel).await;
        }

        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| DetectionError::Collector {
                source_type: source_type.clone(),
                reason: format!("failed to open: {e}"),
            })?;
        forward(BufReader::new(file), &self.tx, &source_type, cancel).await
    }
}

/// 리더에서 줄을 읽어 원시 이벤트로 변환하여 채널로 보냅니다.
pub async fn forward<R>(
    reader: R,
    tx: &mpsc::Sender<RawEvent>,
    source_type: &str,
    cancel: CancellationToken,
) -> Result<u64, DetectionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;
    let mut forwarded = 0u64;

    info!(source = %source_type, "event source started");

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(source = %source_type, "event source cancelled");
                break;
            }
            line = lines.next_line() => line.map_err(|e| DetectionError::Collector {
                source_type: source_type.to_owned(),
                reason: format!("read failed at line {}: {e}", line_no + 1),
            })?,
        };

        let Some(line) = line else {
            break;
        };
        line_no += 1;

        if line.trim().is_empty() {
            continue;
        }

        let event = match RawEvent::from_json(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(source = %source_type, line = line_no, error = %e, "skipping malformed event");
                continue;
            }
        };

        tx.send(event)
            .await
            .map_err(|e| DetectionError::Channel(format!("capture channel closed: {e}")))?;
        forwarded += 1;
    }

    info!(source = %source_type, forwarded, "event source finished");
    Ok(forwarded)
}
