// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orgdrive_server::{
    api::router,
    auth::{JwksManager, WebhookVerifier},
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    drive::Drive,
    purge::PurgeScheduler,
    state::{AppState, AuthConfig, WebhookConfig},
    storage::StoragePaths,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

async fn auth_config(config: &Config) -> Result<AuthConfig, Box<dyn std::error::Error>> {
    let Some(url) = config.clerk_jwks_url.as_deref() else {
        warn!("CLERK_JWKS_URL not set: running in development auth mode (signatures NOT verified)");
        return Ok(AuthConfig {
            jwks: None,
            issuer: config.clerk_issuer.clone(),
            audience: config.clerk_audience.clone(),
        });
    };

    let jwks = JwksManager::new(url)?;
    if let Err(e) = jwks.refresh().await {
        warn!(error = %e, "Initial JWKS fetch failed; will retry on first request");
    }
    Ok(AuthConfig {
        jwks: Some(Arc::new(jwks)),
        issuer: config.clerk_issuer.clone(),
        audience: config.clerk_audience.clone(),
    })
}

fn webhook_config(config: &Config) -> Result<Option<WebhookConfig>, Box<dyn std::error::Error>> {
    match (&config.clerk_webhook_secret, &config.clerk_issuer) {
        (Some(secret), Some(issuer)) => Ok(Some(WebhookConfig {
            verifier: WebhookVerifier::new(secret)?,
            issuer: issuer.clone(),
        })),
        (Some(_), None) => {
            warn!("CLERK_WEBHOOK_SECRET set without CLERK_ISSUER: webhook disabled");
            Ok(None)
        }
        _ => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_tracing(config.log_format);

    info!(data_dir = %config.data_dir.display(), "Starting orgdrive server...");

    let paths = StoragePaths::new(&config.data_dir);
    let drive = Arc::new(Drive::open(&paths, config.drive_settings())?);

    let mut state = AppState::new(drive.clone()).with_auth_config(auth_config(&config).await?);
    if let Some(webhook) = webhook_config(&config)? {
        state = state.with_webhook(webhook);
    }

    let shutdown = CancellationToken::new();
    let scheduler = PurgeScheduler::new(drive)
        .with_interval(config.purge_interval)
        .with_step_timeout(config.purge_step_timeout);
    let purge_task = tokio::spawn(scheduler.run(shutdown.clone()));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        public_base_url = %config.public_base_url,
        "Server listening (docs at /docs)"
    );

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown.cancel();
    if let Err(e) = purge_task.await {
        error!(error = %e, "Purge scheduler task failed");
    }

    served?;
    info!("Server stopped");
    Ok(())
}
