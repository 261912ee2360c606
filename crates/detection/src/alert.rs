//! 알림 싱크 -- 규칙 엔진이 만든 알림을 전달합니다.
//!
//! - [`LogAlertSink`]: 진단 로그에 `warn` 이벤트로 기록
//! - [`CommandAlertSink`]: 로그를 남긴 뒤 외부 명령(예: 데스크톱 알림)을 실행
//!
//! 전달 실패는 호출자(규칙 엔진)가 경고로 기록하고 계속 진행합니다.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::warn;

use netwarden_core::config::AlertConfig;
use netwarden_core::error::{AlertError, NetwardenError};
use netwarden_core::pipeline::{AlertSink, BoxFuture};
use netwarden_core::types::Alert;

use crate::error::DetectionError;

/// 명령 인자에서 알림 메시지로 치환되는 자리표시자
pub const MESSAGE_PLACEHOLDER: &str = "{message}";

/// 알림 명령 실행 제한 시간
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

fn log_alert(alert: &Alert) {
    warn!(
        alert_id = %alert.id,
        rule = %alert.rule,
        culprit = %alert.culprit,
        hits = alert.hits,
        "{}",
        alert.message
    );
}

/// 진단 로그로만 알림을 기록하는 싱크
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver<'a>(&'a self, alert: &'a Alert) -> BoxFuture<'a, Result<(), NetwardenError>> {
        Box::pin(async move {
            log_alert(alert);
            Ok(())
        })
    }
}

/// 외부 명령을 실행하는 알림 싱크
///
/// 인자 중 `{message}`는 알림 메시지로 치환됩니다.
///
/// ```text
/// ["powershell", "-Command", "New-BurntToastNotification -Text '{message}'"]
/// ```
#[derive(Debug, Clone)]
pub struct CommandAlertSink {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAlertSink {
    /// argv 템플릿으로 싱크를 생성합니다. 첫 요소가 프로그램입니다.
    pub fn new(argv: Vec<String>) -> Result<Self, DetectionError> {
        let mut parts = argv.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| DetectionError::Config {
                field: "alert.command".to_owned(),
                reason: "program must not be empty".to_owned(),
            })?;

        Ok(Self {
            program,
            args: parts.collect(),
            timeout: COMMAND_TIMEOUT,
        })
    }

    /// 실행 제한 시간을 설정합니다.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 실행할 프로그램
    pub fn program(&self) -> &str {
        &self.program
    }

    /// 메시지를 치환한 인자 목록
    pub fn render_args(&self, message: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(MESSAGE_PLACEHOLDER, message))
            .collect()
    }

    fn failure(&self, reason: impl Into<String>) -> NetwardenError {
        AlertError::Delivery {
            sink: self.program.clone(),
            reason: reason.into(),
        }
        .into()
    }

    async fn run(&self, alert: &Alert) -> Result<(), NetwardenError> {
        let child = Command::new(&self.program)
            .args(self.render_args(&alert.message))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(format!("failed to spawn: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.failure(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| self.failure(format!("failed to wait: {e}")))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(self.failure(format!(
            "exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

impl AlertSink for CommandAlertSink {
    fn name(&self) -> &str {
        "command"
    }

    fn deliver<'a>(&'a self, alert: &'a Alert) -> BoxFuture<'a, Result<(), NetwardenError>> {
        Box::pin(async move {
            log_alert(alert);
            self.run(alert).await
        })
    }
}

/// 알림 설정으로 싱크를 생성합니다. 명령이 비어 있으면 로그 싱크입니다.
pub fn sink_from_config(config: &AlertConfig) -> Result<Arc<dyn AlertSink>, DetectionError> {
    if config.command.is_empty() {
        return Ok(Arc::new(LogAlertSink));
    }
    Ok(Arc::new(CommandAlertSink::new(config.command.clone())?))
}
