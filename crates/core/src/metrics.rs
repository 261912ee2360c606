//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `netwarden_`
//! - 모듈명: `capture_`, `loader_`, `engine_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 규칙명 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 프로바이더 레이블 키
pub const LABEL_PROVIDER: &str = "provider";

/// 드롭 사유 레이블 키 (unknown_provider, untracked_event, write_failed)
pub const LABEL_REASON: &str = "reason";

// ─── Capture 메트릭 ────────────────────────────────────────────────

/// Capture: 수신한 원시 이벤트 수 (counter)
pub const CAPTURE_EVENTS_RECEIVED_TOTAL: &str = "netwarden_capture_events_received_total";

/// Capture: 기록된 레코드 수 (counter, label: provider)
pub const CAPTURE_RECORDS_WRITTEN_TOTAL: &str = "netwarden_capture_records_written_total";

/// Capture: 드롭된 이벤트 수 (counter, label: reason)
pub const CAPTURE_EVENTS_DROPPED_TOTAL: &str = "netwarden_capture_events_dropped_total";

// ─── Loader 메트릭 ─────────────────────────────────────────────────

/// Loader: 파싱에 성공한 라인 수 (counter)
pub const LOADER_LINES_PARSED_TOTAL: &str = "netwarden_loader_lines_parsed_total";

/// Loader: 폐기된 라인 수 (counter)
pub const LOADER_LINES_DISCARDED_TOTAL: &str = "netwarden_loader_lines_discarded_total";

/// Loader: 열거나 읽지 못해 건너뛴 파일 수 (counter)
pub const LOADER_FILES_SKIPPED_TOTAL: &str = "netwarden_loader_files_skipped_total";

// ─── Engine 메트릭 ─────────────────────────────────────────────────

/// Engine: 규칙 평가 횟수 (counter, label: rule)
pub const ENGINE_RULE_EVALUATIONS_TOTAL: &str = "netwarden_engine_rule_evaluations_total";

/// Engine: 마지막 평가의 히트 수 (gauge, label: rule)
pub const ENGINE_RULE_HITS: &str = "netwarden_engine_rule_hits";

/// Engine: 전달된 알림 수 (counter, label: rule)
pub const ENGINE_ALERTS_SENT_TOTAL: &str = "netwarden_engine_alerts_sent_total";

/// Engine: 전달 실패한 알림 수 (counter, label: rule)
pub const ENGINE_ALERT_FAILURES_TOTAL: &str = "netwarden_engine_alert_failures_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "netwarden_daemon_uptime_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Capture
    describe_counter!(
        CAPTURE_EVENTS_RECEIVED_TOTAL,
        "Total number of raw events received from the event source"
    );
    describe_counter!(
        CAPTURE_RECORDS_WRITTEN_TOTAL,
        "Normalized records written to provider log files"
    );
    describe_counter!(
        CAPTURE_EVENTS_DROPPED_TOTAL,
        "Raw events dropped (unknown provider, untracked event id, write failure)"
    );

    // Loader
    describe_counter!(
        LOADER_LINES_PARSED_TOTAL,
        "Log lines successfully decoded by the windowed loader"
    );
    describe_counter!(
        LOADER_LINES_DISCARDED_TOTAL,
        "Log lines discarded because they could not be decoded"
    );
    describe_counter!(
        LOADER_FILES_SKIPPED_TOTAL,
        "Log files skipped because they could not be opened or read"
    );

    // Engine
    describe_counter!(
        ENGINE_RULE_EVALUATIONS_TOTAL,
        "Number of rule evaluations performed by the engine"
    );
    describe_gauge!(ENGINE_RULE_HITS, "Hit count of the latest evaluation per rule");
    describe_counter!(ENGINE_ALERTS_SENT_TOTAL, "Alerts delivered to the alert sink");
    describe_counter!(
        ENGINE_ALERT_FAILURES_TOTAL,
        "Alerts the alert sink failed to deliver"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            CAPTURE_EVENTS_RECEIVED_TOTAL,
            CAPTURE_RECORDS_WRITTEN_TOTAL,
            CAPTURE_EVENTS_DROPPED_TOTAL,
            LOADER_LINES_PARSED_TOTAL,
            LOADER_LINES_DISCARDED_TOTAL,
            LOADER_FILES_SKIPPED_TOTAL,
            ENGINE_RULE_EVALUATIONS_TOTAL,
            ENGINE_RULE_HITS,
            ENGINE_ALERTS_SENT_TOTAL,
            ENGINE_ALERT_FAILURES_TOTAL,
            DAEMON_UPTIME_SECONDS,
        ] {
            assert!(name.starts_with("netwarden_"), "{name}");
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
