//! 캡처 세션 -- 원시 이벤트를 정규화하여 프로바이더별 로그에 기록합니다.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netwarden_core::event::RawEvent;
use netwarden_core::metrics as m;

use super::provider::ProviderSet;
use super::writer::ProviderLogWriter;

/// 세션 종료 시점의 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// 수신한 이벤트 수
    pub received: u64,
    /// 기록한 레코드 수
    pub written: u64,
    /// 알 수 없는 프로바이더로 버린 이벤트 수
    pub unknown_provider: u64,
    /// 추적하지 않는 이벤트 ID로 건너뛴 이벤트 수
    pub untracked: u64,
    /// 기록 실패 수
    pub write_failures: u64,
}

/// 캡처 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 이벤트 소스가 닫힘
    SourceClosed,
    /// 캡처 시간 경과
    DurationElapsed,
    /// 취소 요청
    Cancelled,
}

/// 캡처 세션
pub struct CaptureSession {
    providers: ProviderSet,
    writer: ProviderLogWriter,
    rx: mpsc::Receiver<RawEvent>,
    duration: Option<Duration>,
    stats: CaptureStats,
}

impl CaptureSession {
    /// 새 캡처 세션을 생성합니다. `duration`이 `None`이면 소스가 닫힐 때까지 실행합니다.
    pub fn new(
        providers: ProviderSet,
        writer: ProviderLogWriter,
        rx: mpsc::Receiver<RawEvent>,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            providers,
            writer,
            rx,
            duration,
            stats: CaptureStats::default(),
        }
    }

    /// 소스가 닫히거나 캡처 시간이 지나거나 취소될 때까지 이벤트를 처리합니다.
    pub async fn run(mut self, cancel: CancellationToken) -> (StopReason, CaptureStats) {
        let duration = self.duration;
        let deadline = async move {
            match duration {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        info!(
            providers = self.providers.len(),
            duration_secs = self.duration.map(|d| d.as_secs()),
            "capture session started"
        );

        let reason = loop {
            tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = &mut deadline => break StopReason::DurationElapsed,
                event = self.rx.recv() => match event {
                    Some(event) => self.handle(&event),
                    None => break StopReason::SourceClosed,
                },
            }
        };

        info!(
            reason = ?reason,
            received = self.stats.received,
            written = self.stats.written,
            dropped = self.stats.unknown_provider + self.stats.untracked,
            "capture session stopped"
        );

        (reason, self.stats)
    }

    /// 이벤트 하나를 처리합니다.
    pub fn handle(&mut self, event: &RawEvent) {
        self.stats.received += 1;

        let Some(provider) = self.providers.resolve(event) else {
            self.stats.unknown_provider += 1;
            metrics::counter!(m::CAPTURE_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => "unknown_provider")
                .increment(1);
            warn!(
                provider = %event.system.provider.name,
                guid = %event.system.provider.guid,
                "received an event from a provider that is not configured"
            );
            return;
        };

        metrics::counter!(m::CAPTURE_EVENTS_RECEIVED_TOTAL, m::LABEL_PROVIDER => provider.key.clone())
            .increment(1);

        if !provider.tracks(event.event_id()) {
            self.stats.untracked += 1;
            metrics::counter!(m::CAPTURE_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => "untracked_event")
                .increment(1);
            debug!(provider = %provider.key, event_id = event.event_id(), "event id not tracked");
            return;
        }

        let record = provider.extractor.extract(event, &provider.id);

        match self.writer.write_record(&provider.key, &record) {
            Ok(()) => {
                self.stats.written += 1;
                metrics::counter!(m::CAPTURE_RECORDS_WRITTEN_TOTAL, m::LABEL_PROVIDER => provider.key.clone())
                    .increment(1);
            }
            Err(e) => {
                self.stats.write_failures += 1;
                metrics::counter!(m::CAPTURE_EVENTS_DROPPED_TOTAL, m::LABEL_REASON => "write_failed")
                    .increment(1);
                warn!(provider = %provider.key, error = %e, "failed to write record");
            }
        }
    }

    /// 지금까지의 처리 통계
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }
}
