//! 윈도우 로그 로더 -- 로그 파일을 읽어 시간 범위 내 엔트리를 반환합니다.
//!
//! 호출할 때마다 파일을 처음부터 다시 읽습니다. 캐시는 없습니다.
//! 최근 구간을 가끔 읽는 용도이며 연속 스트리밍용이 아닙니다.
//!
//! # 에러 처리
//! - 디코딩에 실패한 라인은 경고를 남기고 폐기합니다.
//! - 개행으로 끝나지 않은 마지막 라인은 기록 중인 라인으로 보고 폐기합니다.
//! - 열거나 읽을 수 없는 파일은 경고를 남기고 건너뜁니다.
//! - 어느 경우에도 나머지 라인/파일 처리는 계속됩니다.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use netwarden_core::metrics as m;
use netwarden_core::types::{ParsedLogEntry, TimeWindow};

use crate::codec::LogLineDecoder;
use crate::error::DetectionError;

/// 기본 최대 라인 길이 (64KB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// 한 번의 윈도우 로드 결과
#[derive(Debug, Clone, Default)]
pub struct LoadedWindow {
    /// 타임스탬프 오름차순 엔트리 (같은 시각은 읽은 순서 유지)
    pub entries: Vec<ParsedLogEntry>,
    /// 디코딩 실패 또는 길이 초과로 폐기된 라인 수
    pub discarded_lines: usize,
    /// 건너뛴 파일 수
    pub skipped_files: usize,
}

/// 파일 하나를 읽은 결과
#[derive(Debug, Default)]
struct FileScan {
    parsed: usize,
    discarded: usize,
}

/// 윈도우 로그 로더
#[derive(Debug, Clone)]
pub struct WindowedLogLoader {
    log_dir: PathBuf,
    max_line_length: usize,
    decoder: LogLineDecoder,
}

impl WindowedLogLoader {
    /// 새 로더를 생성합니다.
    ///
    /// 파일 이름은 `log_dir` 기준 상대 경로로 해석합니다.
    pub fn new(log_dir: impl Into<PathBuf>, max_line_length: usize) -> Result<Self, DetectionError> {
        if max_line_length == 0 {
            return Err(DetectionError::Config {
                field: "max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(Self {
            log_dir: log_dir.into(),
            max_line_length,
            decoder: LogLineDecoder::new()?,
        })
    }

    /// 로그 디렉토리를 반환합니다.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// 파일 목록을 읽어 `window`에 포함되는 엔트리를 반환합니다.
    ///
    /// 엔트리는 파일 순서, 라인 순서로 모은 뒤 전체를 타임스탬프 기준으로
    /// 안정 정렬합니다. 타임스탬프가 없는 엔트리는 가장 앞에 옵니다.
    pub async fn load(&self, files: &[String], window: TimeWindow) -> LoadedWindow {
        let mut loaded = LoadedWindow::default();

        for name in files {
            let path = self.log_dir.join(name);
            match self.scan_file(&path, window, &mut loaded.entries).await {
                Ok(scan) => {
                    loaded.discarded_lines += scan.discarded;
                    debug!(
                        file = %path.display(),
                        parsed = scan.parsed,
                        discarded = scan.discarded,
                        "log file scanned"
                    );
                }
                Err(e) => {
                    loaded.skipped_files += 1;
                    metrics::counter!(m::LOADER_FILES_SKIPPED_TOTAL).increment(1);
                    warn!(file = %path.display(), error = %e, "error processing log file, skipping");
                }
            }
        }

        loaded.entries.sort_by_key(|entry| entry.timestamp);
        loaded
    }

    async fn scan_file(
        &self,
        path: &Path,
        window: TimeWindow,
        out: &mut Vec<ParsedLogEntry>,
    ) -> Result<FileScan, DetectionError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| DetectionError::LogFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let mut reader = BufReader::new(file);

        let mut scan = FileScan::default();
        let mut buf = Vec::with_capacity(1024);
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| DetectionError::LogFile {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            if read == 0 {
                break;
            }
            line_no += 1;

            // 기록기는 항상 개행으로 레코드를 끝내므로 개행 없는 마지막 조각은 기록 중인 라인
            if !buf.ends_with(b"\n") {
                if !buf.iter().all(u8::is_ascii_whitespace) {
                    scan.discarded += 1;
                    warn!(file = %path.display(), line = line_no, "incomplete final log line, skipping");
                }
                break;
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                scan.discarded += 1;
                warn!(file = %path.display(), line = line_no, "log line is not valid UTF-8, skipping");
                continue;
            };
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            if line.len() > self.max_line_length {
                scan.discarded += 1;
                warn!(
                    file = %path.display(),
                    line = line_no,
                    length = line.len(),
                    max = self.max_line_length,
                    "log line too long, skipping"
                );
                continue;
            }

            match self.decoder.decode(line) {
                Ok(entry) => {
                    scan.parsed += 1;
                    if window.contains(entry.timestamp) {
                        out.push(entry);
                    }
                }
                Err(e) => {
                    scan.discarded += 1;
                    warn!(
                        file = %path.display(),
                        line = line_no,
                        error = %e,
                        "could not process log line, skipping"
                    );
                }
            }
        }

        metrics::counter!(m::LOADER_LINES_PARSED_TOTAL).increment(scan.parsed as u64);
        metrics::counter!(m::LOADER_LINES_DISCARDED_TOTAL).increment(scan.discarded as u64);

        Ok(scan)
    }
}
