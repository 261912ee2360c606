//! 설정 관리 -- netwarden.toml 파싱 및 런타임 설정
//!
//! [`NetwardenConfig`]는 데몬의 모든 설정을 담는 최상위 구조체입니다.
//! 규칙(`rules.yml`)과 프로바이더(`providers.yml`) 정의는 이 파일이 가리키는
//! 별도 YAML 파일에 있으며 `netwarden-detection`이 로드합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`NETWARDEN_ENGINE_INTERVAL_SECS=10` 형식)
//! 3. 설정 파일 (`netwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), netwarden_core::error::NetwardenError> {
//! use netwarden_core::config::NetwardenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = NetwardenConfig::load("netwarden.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = NetwardenConfig::parse("[engine]\ninterval_secs = 10")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NetwardenError};

/// Netwarden 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 이벤트 캡처 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 규칙 엔진 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 알림 설정
    #[serde(default)]
    pub alert: AlertConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl NetwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NetwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NetwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NetwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                NetwardenError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, NetwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            NetwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `NETWARDEN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "NETWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "NETWARDEN_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "NETWARDEN_GENERAL_PID_FILE");

        // Capture
        override_bool(&mut self.capture.enabled, "NETWARDEN_CAPTURE_ENABLED");
        override_string(
            &mut self.capture.providers_file,
            "NETWARDEN_CAPTURE_PROVIDERS_FILE",
        );
        override_string(&mut self.capture.log_dir, "NETWARDEN_CAPTURE_LOG_DIR");
        override_u64(
            &mut self.capture.duration_secs,
            "NETWARDEN_CAPTURE_DURATION_SECS",
        );
        override_string(
            &mut self.capture.event_source,
            "NETWARDEN_CAPTURE_EVENT_SOURCE",
        );

        // Engine
        override_bool(&mut self.engine.enabled, "NETWARDEN_ENGINE_ENABLED");
        override_string(&mut self.engine.rules_file, "NETWARDEN_ENGINE_RULES_FILE");
        override_u64(
            &mut self.engine.interval_secs,
            "NETWARDEN_ENGINE_INTERVAL_SECS",
        );
        override_string(&mut self.engine.correlation, "NETWARDEN_ENGINE_CORRELATION");
        override_usize(
            &mut self.engine.max_line_length,
            "NETWARDEN_ENGINE_MAX_LINE_LENGTH",
        );

        // Alert
        override_args(&mut self.alert.command, "NETWARDEN_ALERT_COMMAND");

        // Metrics
        override_bool(&mut self.metrics.enabled, "NETWARDEN_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "NETWARDEN_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "NETWARDEN_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "NETWARDEN_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NetwardenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.capture.enabled {
            if self.capture.providers_file.is_empty() {
                return Err(invalid(
                    "capture.providers_file",
                    "must not be empty when capture is enabled",
                ));
            }
            if self.capture.event_source.is_empty() {
                return Err(invalid(
                    "capture.event_source",
                    "must not be empty when capture is enabled (use \"-\" for stdin)",
                ));
            }
        }

        if self.capture.log_dir.is_empty() {
            return Err(invalid("capture.log_dir", "must not be empty"));
        }

        if self.engine.enabled {
            if self.engine.rules_file.is_empty() {
                return Err(invalid(
                    "engine.rules_file",
                    "must not be empty when engine is enabled",
                ));
            }
            if self.engine.interval_secs == 0 {
                return Err(invalid("engine.interval_secs", "must be greater than 0"));
            }
        }

        let valid_policies = ["all_matches", "first_match"];
        if !valid_policies.contains(&self.engine.correlation.as_str()) {
            return Err(invalid(
                "engine.correlation",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }

        if self.engine.max_line_length == 0 {
            return Err(invalid("engine.max_line_length", "must be greater than 0"));
        }

        if self.alert.command.first().is_some_and(|p| p.trim().is_empty()) {
            return Err(invalid("alert.command", "program must not be empty"));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(invalid("metrics.port", "must be greater than 0"));
            }
            if !self.metrics.endpoint.starts_with('/') {
                return Err(invalid("metrics.endpoint", "must start with '/'"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> NetwardenError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 생성하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 이벤트 캡처 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 프로바이더 정의 YAML 경로
    pub providers_file: String,
    /// 정규화된 로그 파일이 기록되는 디렉토리
    pub log_dir: String,
    /// 전체 캡처 시간 (초). 0이면 시그널이 올 때까지 실행
    pub duration_secs: u64,
    /// 원시 이벤트 NDJSON 스트림 경로 (`-`는 stdin)
    pub event_source: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers_file: "config/providers.yml".to_owned(),
            log_dir: "logs".to_owned(),
            duration_secs: 120,
            event_source: "-".to_owned(),
        }
    }
}

/// 규칙 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 규칙 정의 YAML 경로
    pub rules_file: String,
    /// 평가 주기 (초)
    pub interval_secs: u64,
    /// 활동 ID 상관관계 정책 (all_matches, first_match)
    pub correlation: String,
    /// 로그 라인 최대 길이 (바이트). 초과 라인은 폐기
    pub max_line_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules_file: "config/rules.yml".to_owned(),
            interval_secs: 30,
            correlation: "all_matches".to_owned(),
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

/// 알림 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// 알림 명령 argv. `{message}`는 알림 메시지로 치환. 비어 있으면 로그만 기록
    pub command: Vec<String>,
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

/// 공백으로 구분된 argv. 빈 값은 목록을 비움
fn override_args(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split_whitespace().map(str::to_owned).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = NetwardenConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(config.capture.enabled);
        assert_eq!(config.capture.duration_secs, 120);
        assert_eq!(config.engine.interval_secs, 30);
        assert_eq!(config.engine.correlation, "all_matches");
        assert!(config.alert.command.is_empty());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        NetwardenConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = NetwardenConfig::parse("").unwrap();
        assert_eq!(config.capture.log_dir, "logs");
        assert_eq!(config.engine.rules_file, "config/rules.yml");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[engine]
interval_secs = 10
correlation = "first_match"
"#;
        let config = NetwardenConfig::parse(toml).unwrap();
        assert_eq!(config.engine.interval_secs, 10);
        assert_eq!(config.engine.correlation, "first_match");
        // rules_file은 기본값 유지
        assert_eq!(config.engine.rules_file, "config/rules.yml");
        assert_eq!(config.general.log_format, "json");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
pid_file = "/run/netwarden.pid"

[capture]
enabled = true
providers_file = "/etc/netwarden/providers.yml"
log_dir = "/var/log/netwarden"
duration_secs = 0
event_source = "/var/run/etw.ndjson"

[engine]
enabled = true
rules_file = "/etc/netwarden/rules.yml"
interval_secs = 15
correlation = "first_match"
max_line_length = 4096

[alert]
command = ["notify-send", "netwarden", "{message}"]

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9200
endpoint = "/prom"
"#;
        let config = NetwardenConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.pid_file, "/run/netwarden.pid");
        assert_eq!(config.capture.duration_secs, 0);
        assert_eq!(config.engine.max_line_length, 4096);
        assert_eq!(config.alert.command.len(), 3);
        assert_eq!(config.metrics.port, 9200);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = NetwardenConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            NetwardenError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = NetwardenConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = NetwardenConfig::default();
        config.engine.interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn validate_skips_interval_when_engine_disabled() {
        let mut config = NetwardenConfig::default();
        config.engine.enabled = false;
        config.engine.interval_secs = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_unknown_correlation_policy() {
        let mut config = NetwardenConfig::default();
        config.engine.correlation = "most_matches".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("correlation"));
    }

    #[test]
    fn validate_rejects_empty_event_source_when_capture_enabled() {
        let mut config = NetwardenConfig::default();
        config.capture.event_source = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("event_source"));
    }

    #[test]
    fn validate_rejects_blank_alert_program() {
        let mut config = NetwardenConfig::default();
        config.alert.command = vec![" ".to_owned(), "{message}".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alert.command"));
    }

    #[test]
    fn validate_rejects_bad_metrics_endpoint() {
        let mut config = NetwardenConfig::default();
        config.metrics.enabled = true;
        config.metrics.endpoint = "metrics".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_NETWARDEN_STR", "overridden") };
        override_string(&mut val, "TEST_NETWARDEN_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_NETWARDEN_STR") };
    }

    #[test]
    fn env_override_u64_invalid_keeps_original() {
        let mut val = 30;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_NETWARDEN_U64_BAD", "soon") };
        override_u64(&mut val, "TEST_NETWARDEN_U64_BAD");
        assert_eq!(val, 30);
        unsafe { std::env::remove_var("TEST_NETWARDEN_U64_BAD") };
    }

    #[test]
    fn env_override_args_splits_on_whitespace() {
        let mut val = Vec::new();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_NETWARDEN_ARGS", "notify-send  netwarden {message}") };
        override_args(&mut val, "TEST_NETWARDEN_ARGS");
        assert_eq!(val, vec!["notify-send", "netwarden", "{message}"]);
        unsafe { std::env::remove_var("TEST_NETWARDEN_ARGS") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_NETWARDEN_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = NetwardenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = NetwardenConfig::parse(&toml_str).unwrap();
        assert_eq!(config.engine.interval_secs, parsed.engine.interval_secs);
        assert_eq!(config.capture.log_dir, parsed.capture.log_dir);
        assert_eq!(config.metrics.endpoint, parsed.metrics.endpoint);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = NetwardenConfig::from_file("/nonexistent/path/netwarden.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetwardenError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
