//! RN301 Control
//!
//! Polls one receiver and logs every state change until interrupted.

use rn301_control::adapters::ReceiverAdapter;
use rn301_control::bus::{self, BusEvent};
use rn301_control::config;
use rn301_control::service::ReceiverService;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rn301_control=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting RN301 Control v{} ({})",
        env!("RN301_VERSION"),
        env!("RN301_GIT_SHA")
    );

    let config = config::load_config()?;
    let receiver = config.receiver;
    if receiver.host.trim().is_empty() {
        anyhow::bail!("receiver host is not configured (set RN301_HOST or receiver.host)");
    }
    tracing::info!(
        "Configuration loaded: {} at {} (volume scale {})",
        receiver.name,
        receiver.host,
        receiver.volume_scale.full_scale()
    );

    let adapter = ReceiverAdapter::new(&receiver).context("invalid receiver configuration")?;

    let bus = bus::create_bus();
    let mut events = bus.subscribe();
    let (handle, task) = ReceiverService::spawn(adapter, receiver.poll_interval(), bus);

    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(BusEvent::AdapterStopped { .. }) => break,
                Ok(BusEvent::ReceiverUpdated { .. }) => {}
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::info!("{}", json),
                    Err(e) => tracing::warn!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event logger lagged, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    shutdown_signal().await;

    tracing::info!("Shutting down receiver service...");
    handle.shutdown();
    task.await??;
    let _ = logger.await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
