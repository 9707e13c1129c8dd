//! SocialPulse node
//!
//! Wires the presence channel, event bus, notification gateway, and the
//! background worker into one process and runs until Ctrl+C or SIGTERM.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing_subscriber::{EnvFilter, fmt};

use pulse_core::config::AppConfig;
use pulse_core::error::AppError;
use pulse_core::traits::TokenBackend;
use pulse_core::types::{InboundMessage, PermissionState};
use pulse_realtime::notification::{HttpTokenBackend, MemoryPushService, MemoryTokenBackend};
use pulse_realtime::presence::MemoryPresenceStore;
use pulse_realtime::{EventBus, NotificationGateway, PresenceChannel};
use pulse_worker::{BackgroundNotificationHandler, BackgroundWorker, LogRenderer};

/// Token issued by the in-process push service.
const LOCAL_DEVICE_TOKEN: &str = "local-device";

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Node error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PULSE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SocialPulse node v{}", env!("CARGO_PKG_VERSION"));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bus = Arc::new(EventBus::new());

    // ── Presence ─────────────────────────────────────────────────
    // Consumers call `track`/`untrack` on this channel; the node itself
    // tracks nobody and only releases what is left at shutdown.
    let presence_store = Arc::new(MemoryPresenceStore::new());
    let presence = PresenceChannel::new(presence_store, config.presence.clone());
    tracing::info!(
        "Presence channel ready (key prefix '{}')",
        config.presence.key_prefix
    );

    // ── Notification gateway ─────────────────────────────────────
    let backend: Arc<dyn TokenBackend> = match &config.notifications.backend_url {
        Some(url) => {
            tracing::info!("Registering device tokens with '{}'", url);
            Arc::new(HttpTokenBackend::new(url.clone()))
        }
        None => {
            tracing::info!("No backend_url configured, keeping device tokens in memory");
            Arc::new(MemoryTokenBackend::new())
        }
    };
    let push = Arc::new(MemoryPushService::new(
        PermissionState::Granted,
        LOCAL_DEVICE_TOKEN,
    ));
    let gateway = Arc::new(NotificationGateway::new(
        push,
        backend,
        Arc::clone(&bus),
        config.notifications.clone(),
    ));

    // Foreground subscriber: log what a UI would render.
    let foreground_log = bus.subscribe_scoped(gateway.event_name(), |payload| {
        match InboundMessage::from_value(payload) {
            Ok(message) => {
                tracing::info!("Foreground notification '{}': {}", message.title, message.body)
            }
            Err(e) => tracing::warn!("Foreground notification with unexpected payload: {}", e),
        }
    });

    let token_events = gateway.spawn_token_events();
    let initial = gateway.start().await;
    tracing::info!("Notification permission at start: {}", initial.as_str());
    let token_refresh = gateway.spawn_token_refresh();

    let prompt_gateway = Arc::clone(&gateway);
    let prompt = tokio::spawn(async move {
        let mut gate = prompt_gateway.prompt_gate();
        if gate.wait().await {
            let state = prompt_gateway.request_permission().await;
            tracing::info!("Permission prompt answered: {}", state.as_str());
        }
    });

    // The platform's foreground and background delivery callbacks push raw
    // payloads into `foreground_tx` and `background_tx`. The in-process push
    // service has no delivery source, so both stay idle until shutdown.
    let (foreground_tx, foreground_rx) = mpsc::channel(config.worker.queue_capacity.max(1));
    let foreground_gateway = Arc::clone(&gateway);
    let foreground = tokio::spawn(async move {
        foreground_gateway.run_foreground(foreground_rx).await;
    });

    // ── Background worker ────────────────────────────────────────
    let handler = Arc::new(BackgroundNotificationHandler::new(
        Arc::new(LogRenderer),
        config.worker.clone(),
    ));
    let worker = BackgroundWorker::new(handler);
    let (background_tx, background_rx) = BackgroundWorker::queue(&config.worker);
    let worker_shutdown = shutdown_rx.clone();
    let worker_task = tokio::spawn(async move { worker.run(background_rx, worker_shutdown).await });

    tracing::info!("SocialPulse node running");

    // ── Graceful shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    gateway.shutdown();
    prompt.abort();
    drop(foreground_tx);
    drop(background_tx);
    foreground_log.release();

    let released = presence.untrack_all().await;
    tracing::info!("Released {} presence subscription(s)", released);

    let _ = foreground.await;
    let _ = token_events.await;
    if let Some(task) = token_refresh {
        let _ = task.await;
    }
    match worker_task.await {
        Ok(handled) => tracing::info!("Background worker handled {} deliveries", handled),
        Err(e) => tracing::warn!("Background worker task failed: {}", e),
    }

    tracing::info!("SocialPulse node shut down complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
