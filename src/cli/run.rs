use crate::config::parse::load_config;
use crate::consumer::{ConsumerError, ConsumerRunner};
use crate::emit::StdoutSink;
use crate::service::{HttpLogService, ServiceError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("consumer error: {0}")]
    Consumer(#[from] ConsumerError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/shardtail/config.yml");
            eprintln!("  /etc/shardtail/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'shardtail config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_consumer(&config_path).await.map_err(|e| e.into())
}

async fn run_consumer(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");

    let config = load_config(config_path)?;

    let service = Arc::new(HttpLogService::new(&config.stream, &config.credentials)?);
    let runner = ConsumerRunner::new(config, service, Box::new(StdoutSink));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handle = tokio::spawn(runner.run(shutdown_rx));

    info!("Consumer started, press Ctrl+C to shutdown");

    let summary = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, draining");
            let _ = shutdown_tx.send(true);
            handle.await??
        }
        result = &mut handle => result??,
    };

    info!(
        records = summary.records_seen,
        actions = summary.actions_extracted,
        reason = %summary.stop_reason,
        "Consumer stopped"
    );

    Ok(())
}
