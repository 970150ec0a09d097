//! Credo API Server
//!
//! Loads configuration, picks a credential store, and serves the HTTP API.

use anyhow::Context;
use credo_api::{
    auth::{Argon2Hasher, PasswordConfig},
    create_router,
    state::AppState,
};
use credo_core::{
    AppConfig, CredentialStore, LoggingConfig, MemoryCredentialStore, PgCredentialStore,
    SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);
    config.validate()?;

    let store = open_store(&config).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(
        AppState::new(
            config,
            store,
            Arc::new(Argon2Hasher::new(PasswordConfig::default())),
            Arc::new(SystemClock),
        )
        .context("failed to register metrics")?,
    );

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Credo API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `CREDO_CONFIG` names an optional TOML file; environment variables win over it
fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("CREDO_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},tower_http=info", logging.level))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    if config.database.url.is_none() {
        tracing::warn!("DATABASE_URL not set, using in-memory credential store");
        return Ok(Arc::new(MemoryCredentialStore::new()));
    }

    let store = PgCredentialStore::connect(&config.database).await?;
    if config.database.run_migrations {
        store.migrate().await?;
    }
    Ok(Arc::new(store))
}

/// Resolves on Ctrl-C or SIGTERM and marks the service not ready
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    state.set_ready(false);
    tracing::info!("Shutdown signal received, draining connections");
}
