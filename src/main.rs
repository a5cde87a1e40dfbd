//! taskboard-hub server entry point.
//!
//! Connects to NATS, subscribes to task events, starts the hub and serves
//! the WebSocket and health endpoints until SIGINT/SIGTERM.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use taskboard_hub::app_state::AppState;
use taskboard_hub::bridge::nats::{self, NatsSettings};
use taskboard_hub::bridge::EventBridge;
use taskboard_hub::config::HubConfig;
use taskboard_hub::hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = HubConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting taskboard-hub");

    // Broker subscription: without it there is nothing to distribute.
    let broker = NatsSettings::from(&config);
    let client = nats::connect(&broker).await?;
    let messages = nats::subscribe(&client, &broker.subject).await?;

    // Hub and bridge
    let (hub, handle) = Hub::new(config.hub_queue_capacity);
    let hub_task = tokio::spawn(hub.run());
    let bridge = EventBridge::new(handle.clone());
    let mut bridge_task = tokio::spawn(async move { bridge.run(messages).await });

    // Build router
    let app = taskboard_hub::app(AppState {
        hub: handle.clone(),
        session: config.session_settings(),
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    let outcome = tokio::select! {
        served = server => served.context("http server failed"),
        bridged = &mut bridge_task => match bridged {
            Ok(Ok(forwarded)) => Err(anyhow::anyhow!(
                "broker subscription ended after {forwarded} events"
            )),
            Ok(Err(err)) => Err(err).context("event bridge stopped"),
            Err(err) => Err(err).context("event bridge task failed"),
        },
    };

    tracing::info!("shutting down hub");
    bridge_task.abort();
    handle.shutdown().await;
    let _ = hub_task.await;
    if let Err(err) = client.flush().await {
        tracing::warn!(error = %err, "NATS flush failed");
    }

    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
