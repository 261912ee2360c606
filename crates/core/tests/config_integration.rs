//! netwarden.toml 통합 설정 테스트
//!
//! - netwarden.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 잘못된 형식 에러 테스트

use netwarden_core::config::NetwardenConfig;
use netwarden_core::error::{ConfigError, NetwardenError};

const EXAMPLE: &str = include_str!("../../../netwarden.toml.example");

// =============================================================================
// netwarden.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let config = NetwardenConfig::parse(EXAMPLE).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let example = NetwardenConfig::parse(EXAMPLE).expect("should parse");
    let defaults = NetwardenConfig::default();

    assert_eq!(example.general.log_level, defaults.general.log_level);
    assert_eq!(example.general.log_format, defaults.general.log_format);
    assert_eq!(example.general.pid_file, defaults.general.pid_file);

    assert_eq!(example.capture.enabled, defaults.capture.enabled);
    assert_eq!(example.capture.providers_file, defaults.capture.providers_file);
    assert_eq!(example.capture.log_dir, defaults.capture.log_dir);
    assert_eq!(example.capture.duration_secs, defaults.capture.duration_secs);
    assert_eq!(example.capture.event_source, defaults.capture.event_source);

    assert_eq!(example.engine.rules_file, defaults.engine.rules_file);
    assert_eq!(example.engine.interval_secs, defaults.engine.interval_secs);
    assert_eq!(example.engine.correlation, defaults.engine.correlation);
    assert_eq!(example.engine.max_line_length, defaults.engine.max_line_length);

    assert_eq!(example.alert.command, defaults.alert.command);

    assert_eq!(example.metrics.enabled, defaults.metrics.enabled);
    assert_eq!(example.metrics.port, defaults.metrics.port);
    assert_eq!(example.metrics.endpoint, defaults.metrics.endpoint);
}

// =============================================================================
// 부분 설정
// =============================================================================

#[test]
fn partial_config_alert_only() {
    let toml = r#"
[alert]
command = ["powershell", "-Command", "New-BurntToastNotification -Text '{message}'"]
"#;
    let config = NetwardenConfig::parse(toml).expect("should parse");
    assert_eq!(config.alert.command[0], "powershell");
    assert_eq!(config.engine.interval_secs, 30);
    assert_eq!(config.capture.duration_secs, 120);
}

#[test]
fn partial_config_two_sections() {
    let toml = r#"
[capture]
log_dir = "/tmp/netwarden-logs"

[metrics]
enabled = true
port = 9300
"#;
    let config = NetwardenConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");
    assert_eq!(config.capture.log_dir, "/tmp/netwarden-logs");
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9300);
    assert_eq!(config.metrics.endpoint, "/metrics");
}

// =============================================================================
// 환경변수 우선순위
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let mut config = NetwardenConfig::parse("[engine]\ninterval_secs = 10").expect("should parse");

    // SAFETY: serial_test로 직렬화되어 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
    unsafe { std::env::set_var("NETWARDEN_ENGINE_INTERVAL_SECS", "5") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("NETWARDEN_ENGINE_INTERVAL_SECS") };

    assert_eq!(config.engine.interval_secs, 5);
}

#[test]
#[serial_test::serial]
fn env_override_bool_and_string_fields() {
    let mut config = NetwardenConfig::default();

    // SAFETY: serial_test로 직렬화되어 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
    unsafe {
        std::env::set_var("NETWARDEN_CAPTURE_ENABLED", "false");
        std::env::set_var("NETWARDEN_ENGINE_CORRELATION", "first_match");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("NETWARDEN_CAPTURE_ENABLED");
        std::env::remove_var("NETWARDEN_ENGINE_CORRELATION");
    }

    assert!(!config.capture.enabled);
    assert_eq!(config.engine.correlation, "first_match");
}

#[test]
#[serial_test::serial]
fn env_override_invalid_value_keeps_toml_value() {
    let mut config = NetwardenConfig::parse("[metrics]\nport = 9300").expect("should parse");

    // SAFETY: serial_test로 직렬화되어 다른 테스트와 동시에 환경변수를 조작하지 않습니다.
    unsafe { std::env::set_var("NETWARDEN_METRICS_PORT", "99999") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("NETWARDEN_METRICS_PORT") };

    assert_eq!(config.metrics.port, 9300);
}

// =============================================================================
// 에러
// =============================================================================

#[test]
fn wrong_type_for_numeric_field() {
    let err = NetwardenConfig::parse("[engine]\ninterval_secs = \"thirty\"").unwrap_err();
    assert!(matches!(
        err,
        NetwardenError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[general]
log_level = "warn"

[future_section]
key = "value"
"#;
    let config = NetwardenConfig::parse(toml).expect("unknown sections should be ignored");
    assert_eq!(config.general.log_level, "warn");
}

#[tokio::test]
#[serial_test::serial]
async fn load_from_disk_applies_validation() {
    let dir = std::env::temp_dir().join(format!("netwarden-config-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.expect("create dir");
    let path = dir.join("netwarden.toml");
    tokio::fs::write(&path, "[engine]\ncorrelation = \"sometimes\"\n")
        .await
        .expect("write config");

    let err = NetwardenConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("engine.correlation"));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let err = NetwardenConfig::from_file("/nonexistent/netwarden.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NetwardenError::Config(ConfigError::FileNotFound { .. })
    ));
}
