//! `tablelink` binary: scanner bridge daemon.
//!
//! Wires the serial connection manager, the retrying backend client and the
//! HTTP gateway around one shutdown token, then waits for Ctrl-C or SIGTERM.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tablelink_core::constants::DEFAULT_CONFIG_FILE;
use tablelink_core::{AppConfig, LoggingSettings, StatusRegister};
use tablelink_hardware::serial::SerialScanner;
use tablelink_hardware::{AnyScannerDevice, ConnectionSettings, DeviceConnectionManager};
use tablelink_network::{
    DispatchClient, DispatchConfig, GrpcBackendConfig, GrpcScanBackend, IngressGateway, router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Bridge a table scanner to the scanner backend.
#[derive(Debug, Parser)]
#[command(name = "tablelink", version, about)]
struct Cli {
    /// TOML configuration file. A missing file leaves defaults and
    /// TABLELINK_* environment variables in effect.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Load and validate the configuration, print it, and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    if cli.check_config {
        println!("{config:#?}");
        return Ok(());
    }

    init_tracing(&config.logging);
    info!(
        version = tablelink_core::VERSION,
        config = %cli.config.display(),
        "Starting tablelink"
    );

    run(config).await
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let (writer, reader) = StatusRegister::new();

    let backend = GrpcScanBackend::connect_lazy(&GrpcBackendConfig::from(&config.backend))
        .context("invalid backend configuration")?;
    let dispatcher = Arc::new(DispatchClient::new(
        backend,
        DispatchConfig::from(&config.backend),
    ));

    let device = AnyScannerDevice::Serial(SerialScanner::new(config.serial.clone()));
    let manager = DeviceConnectionManager::new(
        device,
        Arc::clone(&dispatcher),
        writer,
        ConnectionSettings::from(&config.serial),
    )
    .spawn(shutdown.clone());

    let gateway = Arc::new(IngressGateway::new(
        reader,
        dispatcher,
        config.serial.allow_mock_when_unavailable,
        shutdown.clone(),
    ));

    let listener = TcpListener::bind(&config.gateway.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.gateway.bind_addr))?;

    tokio::spawn(watch_signals(shutdown.clone()));

    let served = tablelink_network::serve(listener, router(gateway), shutdown.clone()).await;

    // The server may also stop on its own error; make sure the device loop follows.
    shutdown.cancel();

    let summary = manager.await.context("connection manager task failed")?;
    info!(
        final_state = %summary.final_state,
        transitions = summary.transition_count,
        open_attempts = summary.open_attempts,
        scans_dispatched = summary.scans_dispatched,
        dispatch_failures = summary.dispatch_failures,
        "Connection manager finished"
    );

    served.context("HTTP gateway failed")?;
    info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }

    shutdown.cancel();
}
