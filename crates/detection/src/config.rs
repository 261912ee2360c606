//! 탐지 설정 -- core 설정을 탐지 크레이트의 타입 있는 설정으로 변환합니다.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use netwarden_core::config::NetwardenConfig;

use crate::error::DetectionError;
use crate::loader::DEFAULT_MAX_LINE_LENGTH;
use crate::rule::CorrelationPolicy;

/// 탐지 크레이트 설정
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// 정규화 로그 디렉토리
    pub log_dir: PathBuf,
    /// 프로바이더 정의 파일
    pub providers_file: PathBuf,
    /// 규칙 정의 파일
    pub rules_file: PathBuf,
    /// 규칙 평가 주기
    pub interval: Duration,
    /// 전체 캡처 시간. `None`이면 무기한
    pub capture_duration: Option<Duration>,
    /// RDP 활동 ID 상관관계 정책
    pub correlation: CorrelationPolicy,
    /// 로그 라인 최대 길이 (바이트)
    pub max_line_length: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            providers_file: PathBuf::from("config/providers.yml"),
            rules_file: PathBuf::from("config/rules.yml"),
            interval: Duration::from_secs(30),
            capture_duration: Some(Duration::from_secs(120)),
            correlation: CorrelationPolicy::default(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl DetectionConfig {
    /// core의 `NetwardenConfig`에서 탐지 설정을 생성합니다.
    pub fn from_core(core: &NetwardenConfig) -> Result<Self, DetectionError> {
        let config = Self {
            log_dir: PathBuf::from(&core.capture.log_dir),
            providers_file: PathBuf::from(&core.capture.providers_file),
            rules_file: PathBuf::from(&core.engine.rules_file),
            interval: Duration::from_secs(core.engine.interval_secs),
            capture_duration: (core.capture.duration_secs > 0)
                .then(|| Duration::from_secs(core.capture.duration_secs)),
            correlation: core.engine.correlation.parse()?,
            max_line_length: core.engine.max_line_length,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(DetectionError::Config {
                field: "capture.log_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.interval.is_zero() {
            return Err(DetectionError::Config {
                field: "engine.interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.max_line_length == 0 {
            return Err(DetectionError::Config {
                field: "engine.max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

/// 로그 파일 이름이 로그 디렉토리 안의 상대 경로인지 검증합니다.
///
/// 실패하면 사유를 반환합니다. 호출자가 자기 에러 타입으로 감쌉니다.
pub(crate) fn check_log_file_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("log file name must not be empty".to_owned());
    }

    let path = Path::new(name);

    if path.is_absolute() || path.has_root() {
        return Err(format!("log file '{name}' must be relative to the log directory"));
    }

    if !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(format!(
            "log file '{name}' must not contain '..' or '.' components"
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_core_defaults() {
        let config = DetectionConfig::from_core(&NetwardenConfig::default()).unwrap();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.capture_duration, Some(Duration::from_secs(120)));
        assert_eq!(config.correlation, CorrelationPolicy::AllMatches);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn zero_duration_means_unbounded_capture() {
        let mut core = NetwardenConfig::default();
        core.capture.duration_secs = 0;
        let config = DetectionConfig::from_core(&core).unwrap();
        assert_eq!(config.capture_duration, None);
    }

    #[test]
    fn from_core_parses_first_match() {
        let mut core = NetwardenConfig::default();
        core.engine.correlation = "first_match".to_owned();
        let config = DetectionConfig::from_core(&core).unwrap();
        assert_eq!(config.correlation, CorrelationPolicy::FirstMatch);
    }

    #[test]
    fn from_core_rejects_unknown_policy() {
        let mut core = NetwardenConfig::default();
        core.engine.correlation = "maybe".to_owned();
        assert!(matches!(
            DetectionConfig::from_core(&core),
            Err(DetectionError::Config { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = DetectionConfig {
            interval: Duration::ZERO,
            ..DetectionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_file_names() {
        assert!(check_log_file_name("tcpip.log").is_ok());
        assert!(check_log_file_name("rdp/core.log").is_ok());
        assert!(check_log_file_name("").is_err());
        assert!(check_log_file_name("/var/log/syslog").is_err());
        assert!(check_log_file_name("../etc/passwd").is_err());
        assert!(check_log_file_name("a/../../b").is_err());
        assert!(check_log_file_name("./a.log").is_err());
    }
}
