//! CLI argument definitions for netwarden-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// netwarden host network anomaly detector.
///
/// Normalizes raw provider events into per-provider log files and
/// periodically evaluates detection rules over the recent history.
#[derive(Parser, Debug)]
#[command(name = "netwarden-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to netwarden.toml configuration file.
    ///
    /// Built-in defaults (plus `NETWARDEN_*` environment overrides) are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration, providers and rules, then exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply CLI overrides to the `[general]` section.
    pub fn apply_overrides(&self, config: &mut netwarden_core::NetwardenConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file.clone_from(pid_file);
        }
    }
}
