//! 탐지 크레이트 에러 타입
//!
//! [`DetectionError`]는 캡처, 로더, 규칙 엔진 내부에서 발생하는 에러를 표현합니다.
//! `From<DetectionError> for NetwardenError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use netwarden_core::error::{ConfigError, NetwardenError, PipelineError};

/// 탐지 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙명
        rule: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 프로바이더 파일 로딩 실패
    #[error("provider load error: {path}: {reason}")]
    ProviderLoad {
        /// 프로바이더 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 프로바이더 유효성 검증 실패
    #[error("provider validation error: provider '{provider}': {reason}")]
    ProviderValidation {
        /// 문제가 된 프로바이더 키
        provider: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 로그 파일을 열거나 읽지 못함
    #[error("log file error: {path}: {reason}")]
    LogFile {
        /// 로그 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 이벤트 소스 에러
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 소스 유형 (file, stdin)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<DetectionError> for NetwardenError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::RuleLoad { .. }
            | DetectionError::RuleValidation { .. }
            | DetectionError::ProviderLoad { .. }
            | DetectionError::ProviderValidation { .. } => {
                NetwardenError::Config(ConfigError::ParseFailed {
                    reason: err.to_string(),
                })
            }
            DetectionError::Config { field, reason } => {
                NetwardenError::Config(ConfigError::InvalidValue { field, reason })
            }
            DetectionError::Io(e) => NetwardenError::Io(e),
            DetectionError::Channel(reason) => {
                NetwardenError::Pipeline(PipelineError::ChannelSend(reason))
            }
            other => NetwardenError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_load_error_display() {
        let err = DetectionError::RuleLoad {
            path: "config/rules.yml".to_owned(),
            reason: "invalid YAML".to_owned(),
        };
        assert!(err.to_string().contains("rules.yml"));
    }

    #[test]
    fn rule_errors_convert_to_config_error() {
        let err = DetectionError::RuleValidation {
            rule: "scan_detection".to_owned(),
            reason: "alert_threshold must be at least 1".to_owned(),
        };
        let top: NetwardenError = err.into();
        assert!(matches!(top, NetwardenError::Config(_)));
        assert!(top.to_string().contains("scan_detection"));
    }

    #[test]
    fn config_error_keeps_field() {
        let err = DetectionError::Config {
            field: "engine.correlation".to_owned(),
            reason: "unknown policy".to_owned(),
        };
        let top: NetwardenError = err.into();
        assert!(matches!(
            top,
            NetwardenError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "engine.correlation"
        ));
    }

    #[test]
    fn channel_error_converts_to_pipeline() {
        let top: NetwardenError = DetectionError::Channel("receiver closed".to_owned()).into();
        assert!(matches!(
            top,
            NetwardenError::Pipeline(PipelineError::ChannelSend(_))
        ));
    }

    #[test]
    fn log_file_error_display() {
        let err = DetectionError::LogFile {
            path: "logs/tcpip.log".to_owned(),
            reason: "No such file or directory".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("tcpip.log"));
        assert!(msg.contains("No such file"));
    }
}
