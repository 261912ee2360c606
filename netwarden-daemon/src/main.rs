use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use netwarden_core::NetwardenConfig;
use netwarden_daemon::cli::DaemonCli;
use netwarden_daemon::logging::init_tracing;
use netwarden_daemon::orchestrator::Orchestrator;

/// Grace period for blocking tasks (stdin reader) at exit.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    // A stdin event source may still be parked in a blocking read
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run(cli: DaemonCli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => NetwardenConfig::from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
        None => NetwardenConfig::default(),
    };
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "netwarden-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;

    if cli.validate {
        tracing::info!("configuration, providers and rules are valid");
        println!("configuration is valid");
        return Ok(());
    }

    let cause = orchestrator.run().await?;
    tracing::info!(cause = ?cause, "netwarden-daemon shut down");
    Ok(())
}
