use std::sync::Arc;

use anyhow::{Context, Result};
use company_profile_sync::{
    AppConfig, ChangeNotifier, CompanySyncService, HttpChangeNotifier, InMemoryRecordStore,
    NoopNotifier, build_router,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let notifier: Arc<dyn ChangeNotifier> = match config.notify_url.as_deref() {
        Some(url) => {
            info!(endpoint = %url, "resource changed notifications enabled");
            Arc::new(
                HttpChangeNotifier::new(
                    url,
                    config.notify_api_key.clone(),
                    config.notify_timeout(),
                )
                .context("failed to build resource changed client")?,
            )
        }
        None => {
            warn!("RESOURCE_CHANGED_URL not set, notifications are disabled");
            Arc::new(NoopNotifier)
        }
    };

    let policy = config.policy();
    info!(
        store_timeout_ms = policy.store_timeout.as_millis() as u64,
        cas_retries = policy.cas_retries,
        "sync policy loaded"
    );

    let service = CompanySyncService::new(Arc::new(InMemoryRecordStore::new()), notifier, policy);
    let app = build_router(service);

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, "company profile sync started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("company_profile_sync=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
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
