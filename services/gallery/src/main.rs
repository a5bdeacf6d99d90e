use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use devaintart_gallery::api;
use devaintart_gallery::build_state;
use devaintart_gallery::config::GalleryConfig;
use devaintart_gallery::quota::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GalleryConfig::from_env()?;
    init_tracing(&config.log_level)?;

    let host = config.server_host.clone();
    let port = config.server_port;

    info!(
        host = %host,
        port,
        data_dir = %config.data_dir.display(),
        daily_quota_bytes = config.daily_quota_bytes,
        "starting devaintart gallery"
    );

    let state = build_state(config, Arc::new(SystemClock))?;
    let router = api::create_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("GALLERY_HOST and GALLERY_PORT must form a socket address")?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("devaintart gallery shutting down");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` from the config.
fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
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
