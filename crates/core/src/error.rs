//! 에러 타입 -- 도메인별 에러 정의
//!
//! 에러 분류:
//! - [`ConfigError`]: 설정 오류 -- 시작 시점에 치명적
//! - [`ParseError`]: 로그 라인 단위 오류 -- 해당 라인만 폐기
//! - [`AlertError`]: 알림 전달 실패 -- 보고만 하고 재시도하지 않음
//! - [`PipelineError`]: 태스크/채널 수준 오류

/// netwarden 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum NetwardenError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 알림 전달 에러
    #[error("alert error: {0}")]
    Alert(#[from] AlertError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("already running")]
    AlreadyRunning,
}

/// 로그 라인 파싱 에러
///
/// 이 에러는 항상 라인 하나에 국한됩니다. 호출자는 해당 라인을 버리고
/// 다음 라인을 계속 처리해야 합니다.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// `time` 값이 RFC 3339 형식이 아님
    #[error("could not parse time '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    /// `msg`의 세 번째 토큰이 정수가 아님
    #[error("could not parse event id '{value}'")]
    EventId { value: String },

    /// 토큰 구조가 깨진 라인 (닫히지 않은 따옴표, 빈 라인 등)
    #[error("malformed line: {reason}")]
    Malformed { reason: String },

    /// 원시 이벤트 역직렬화 실패
    #[error("invalid raw event: {reason}")]
    RawEvent { reason: String },
}

/// 알림 전달 에러
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// 싱크가 메시지를 전달하지 못함
    #[error("alert sink '{sink}' failed: {reason}")]
    Delivery { sink: String, reason: String },
}
