use std::fs::OpenOptions;
use std::sync::Arc;

use conn_logger::ConnLoggerConfig;
use conn_logger::ConnectionRegistry;
use conn_logger::Error;
use conn_logger::LogConfig;
use conn_logger::ProbedChannel;
use conn_logger::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = ConnLoggerConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.log)?;

    let registry = ConnectionRegistry::new(config.registry.clone());
    for target in &config.connections {
        let channel = ProbedChannel::connect(target.address.clone(), &config.network, &config.probe)?;
        registry.register(target.name.clone(), Arc::new(channel))?;
    }
    info!(
        connections = registry.len(),
        "Application started. Waiting for shutdown signal..."
    );

    if let Err(e) = wait_for_shutdown_signal().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
    }

    if let Err(e) = registry.shutdown().await {
        error!("Registry shutdown incomplete: {}", e);
    }
    info!("Shutdown completed");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    Ok(())
}

/// Logs to `log.dir/log.file_name` through a non-blocking writer, or to stdout
/// when no directory is configured.
fn init_observability(config: &LogConfig) -> Result<WorkerGuard> {
    let (non_blocking, guard) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(&config.file_name))?;
            tracing_appender::non_blocking(log_file)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(base_subscriber)
        .try_init()
        .map_err(|e| Error::Fatal(format!("Failed to install log subscriber: {e}")))?;

    Ok(guard)
}
