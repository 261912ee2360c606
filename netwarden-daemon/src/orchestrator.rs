//! Task orchestration -- assembly, wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `netwarden-daemon`.
//! It validates configuration, loads providers and rules, and runs the
//! capture path and the rule engine as two independent tasks.
//!
//! # Task Layout
//!
//! ```text
//! JsonEventSource --mpsc--> CaptureSession --> <log_dir>/*.log
//!                                                   ^
//!                               RuleEngine (tick) --+--> AlertSink
//! ```
//!
//! The two tasks only meet on the filesystem. A capture failure never
//! stops the engine, and the engine never blocks capture.
//!
//! # Shutdown
//!
//! The daemon stops when the capture session finishes (duration elapsed
//! or source exhausted) or on SIGINT/SIGTERM. The shared cancellation
//! token is then cancelled and the engine task is abandoned, not drained.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use netwarden_core::config::NetwardenConfig;
use netwarden_core::pipeline::AlertSink;
use netwarden_detection::capture::{CaptureStats, DEFAULT_CHANNEL_CAPACITY, StopReason};
use netwarden_detection::{
    CaptureSession, DetectionConfig, JsonEventSource, ProviderLoader, ProviderLogWriter,
    ProviderSet, RuleEngine, RuleLoader, RuleSet, WindowedLogLoader, sink_from_config,
};

use crate::metrics_server;

/// Why the daemon stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// The capture session finished on its own.
    CaptureFinished(StopReason),
    /// A shutdown signal was received.
    Signal(&'static str),
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: NetwardenConfig,
    /// Typed detection settings derived from `config`.
    detection: DetectionConfig,
    /// Capture providers (None when capture is disabled).
    providers: Option<ProviderSet>,
    /// Detection rules (None when the engine is disabled).
    rules: Option<RuleSet>,
    /// Alert delivery.
    sink: Arc<dyn AlertSink>,
    /// Shared cancellation for every spawned task.
    cancel: CancellationToken,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from disk and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration, provider file or rule file
    /// cannot be read, parsed or validated.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = NetwardenConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Every configuration error is fatal here, before any task starts.
    pub async fn build_from_config(config: NetwardenConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let detection = DetectionConfig::from_core(&config)
            .map_err(|e| anyhow::anyhow!("invalid detection config: {}", e))?;

        let providers = if config.capture.enabled {
            Some(
                ProviderLoader::load_file(&detection.providers_file)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to load providers: {}", e))?,
            )
        } else {
            None
        };

        let rules = if config.engine.enabled {
            Some(
                RuleLoader::load_file(&detection.rules_file)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to load rules: {}", e))?,
            )
        } else {
            None
        };

        let sink = sink_from_config(&config.alert)
            .map_err(|e| anyhow::anyhow!("failed to build alert sink: {}", e))?;

        if providers.is_none() && rules.is_none() {
            tracing::warn!("capture and engine are both disabled; waiting for shutdown signal only");
        }

        // Install metrics recorder before any task records
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        tracing::info!(
            capture = providers.is_some(),
            engine = rules.is_some(),
            alert_sink = sink.name(),
            log_dir = %detection.log_dir.display(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            detection,
            providers,
            rules,
            sink,
            cancel: CancellationToken::new(),
            start_time: Instant::now(),
        })
    }

    /// Run until capture finishes or a shutdown signal arrives.
    ///
    /// Writes the PID file first and always removes it afterwards.
    pub async fn run(&mut self) -> Result<ShutdownCause> {
        let pid_file = self.config.general.pid_file.clone();
        if !pid_file.is_empty() {
            write_pid_file(Path::new(&pid_file))?;
        }

        let result = self.run_until(wait_for_shutdown_signal()).await;

        if !pid_file.is_empty() {
            remove_pid_file(Path::new(&pid_file));
        }

        result
    }

    /// Spawn every task and wait for capture to finish or `shutdown` to resolve.
    pub async fn run_until<S>(&mut self, shutdown: S) -> Result<ShutdownCause>
    where
        S: Future<Output = Result<&'static str>>,
    {
        let mut capture_task = match self.providers.take() {
            Some(providers) => Some(self.spawn_capture(providers)?),
            None => None,
        };

        let engine_task = match self.rules.take() {
            Some(rules) => Some(self.spawn_engine(rules)?),
            None => None,
        };

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.cancel.clone()));

        tracing::info!("netwarden running");

        let capture_done = async {
            match capture_task.as_mut() {
                Some(task) => task.await,
                None => std::future::pending().await,
            }
        };

        let cause = tokio::select! {
            joined = capture_done => {
                match joined {
                    Ok((reason, stats)) => {
                        log_capture_stats(reason, &stats);
                        ShutdownCause::CaptureFinished(reason)
                    }
                    Err(e) => {
                        self.cancel.cancel();
                        return Err(anyhow::anyhow!("capture task failed: {}", e));
                    }
                }
            }
            signal = shutdown => {
                match signal {
                    Ok(signal) => {
                        tracing::info!(signal = signal, "shutdown signal received");
                        ShutdownCause::Signal(signal)
                    }
                    Err(e) => {
                        self.cancel.cancel();
                        return Err(e);
                    }
                }
            }
        };

        self.cancel.cancel();

        // The engine is abandoned rather than drained
        if let Some(task) = engine_task {
            task.abort();
        }
        if let Some(task) = uptime_task {
            let _ = task.await;
        }
        if let (ShutdownCause::Signal(_), Some(task)) = (cause, capture_task) {
            match task.await {
                Ok((reason, stats)) => log_capture_stats(reason, &stats),
                Err(e) => tracing::warn!(error = %e, "capture task did not stop cleanly"),
            }
        }

        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            cause = ?cause,
            "netwarden stopped"
        );
        Ok(cause)
    }

    fn spawn_capture(
        &self,
        providers: ProviderSet,
    ) -> Result<JoinHandle<(StopReason, CaptureStats)>> {
        let writer = ProviderLogWriter::open(&self.detection.log_dir, &providers)
            .map_err(|e| anyhow::anyhow!("failed to open provider logs: {}", e))?;
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

        let source = JsonEventSource::new(&self.config.capture.event_source, tx);
        let source_cancel = self.cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = source.run(source_cancel).await {
                tracing::error!(error = %e, "event source failed");
            }
        });

        let session = CaptureSession::new(providers, writer, rx, self.detection.capture_duration);
        Ok(tokio::spawn(session.run(self.cancel.clone())))
    }

    fn spawn_engine(&self, rules: RuleSet) -> Result<JoinHandle<()>> {
        let loader =
            WindowedLogLoader::new(&self.detection.log_dir, self.detection.max_line_length)
                .map_err(|e| anyhow::anyhow!("failed to build log loader: {}", e))?;
        let engine = RuleEngine::new(
            rules,
            loader,
            Arc::clone(&self.sink),
            self.detection.correlation,
        )
        .with_interval(self.detection.interval);

        let cancel = self.cancel.clone();
        Ok(tokio::spawn(async move {
            if let Err(e) = engine.run(cancel).await {
                tracing::error!(error = %e, "rule engine stopped with error");
            }
        }))
    }

    /// Token cancelled when the daemon shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &NetwardenConfig {
        &self.config
    }
}

fn log_capture_stats(reason: StopReason, stats: &CaptureStats) {
    tracing::info!(
        reason = ?reason,
        received = stats.received,
        written = stats.written,
        unknown_provider = stats.unknown_provider,
        untracked = stats.untracked,
        write_failures = stats.write_failures,
        "capture finished"
    );
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("CTRL_C")
}

/// Write the current process PID to a file.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file
/// - Verifies the created file is a regular file
/// - Creates the parent directory with restrictive permissions (0o700)
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(start_time: Instant, cancel: CancellationToken) -> JoinHandle<()> {
    use netwarden_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_write_pid_file_creates_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pid_file = temp_dir.path().join("subdir").join("netwarden.pid");

        write_pid_file(&pid_file).expect("write_pid_file should create parent directory");

        let content = fs::read_to_string(&pid_file).expect("should read PID file");
        assert_eq!(content.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_write_pid_file_fails_if_already_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pid_file = temp_dir.path().join("netwarden.pid");
        fs::write(&pid_file, "12345").expect("should write initial PID file");

        let err_msg = write_pid_file(&pid_file).unwrap_err().to_string();
        assert!(err_msg.contains("already exists"), "got: {}", err_msg);
        assert!(err_msg.contains("12345"), "got: {}", err_msg);
    }

    #[test]
    fn test_remove_pid_file_succeeds() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pid_file = temp_dir.path().join("netwarden.pid");
        fs::write(&pid_file, "99999").expect("should write PID file");

        remove_pid_file(&pid_file);
        assert!(!pid_file.exists(), "PID file should be removed");
    }

    #[test]
    fn test_remove_pid_file_handles_nonexistent_gracefully() {
        let temp_dir = tempfile::tempdir().unwrap();
        remove_pid_file(&temp_dir.path().join("missing.pid"));
    }

    #[tokio::test]
    async fn test_uptime_updater_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let task = spawn_uptime_updater(Instant::now(), cancel.clone());

        cancel.cancel();
        let result = tokio::time::timeout(tokio::time::Duration::from_millis(100), task).await;
        assert!(result.is_ok(), "uptime updater should stop within timeout");
    }
}
