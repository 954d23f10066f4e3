//! Application startup and lifecycle management.

use axum::Router;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};

use crate::config::CredentialConfig;
use crate::services::{
    CredentialService, JwtService, MongoAccountDirectory, MongoCredentialStore, MongoDb,
};
use crate::utils::PngQrRenderer;
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    shutdown_grace: Duration,
}

impl Application {
    /// Connect to MongoDB, prepare indexes and bind the HTTP listener.
    pub async fn build(config: CredentialConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(
            config.mongodb.uri.expose_secret(),
            &config.mongodb.database,
        )
        .await?;

        let store = MongoCredentialStore::new(&db);
        store.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            AppError::DatabaseError(e)
        })?;
        let directory = MongoAccountDirectory::new(&db);

        let jwt = JwtService::new(&config.session).map_err(AppError::ConfigError)?;

        let credentials = CredentialService::new(
            Arc::new(store),
            Arc::new(directory),
            jwt.clone(),
            Arc::new(PngQrRenderer::default()),
        );

        let state = AppState::new(config.clone(), credentials, jwt);
        let router = build_router(state);

        // Port 0 binds a random port, which integration tests rely on
        let addr = config.common.bind_address();
        let listener = TcpListener::bind(addr.as_str()).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            port,
            "Credential service listening"
        );

        Ok(Self {
            port,
            listener,
            router,
            shutdown_grace: Duration::from_secs(config.common.shutdown_grace_seconds),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM. After the signal the server keeps accepting
    /// connections for `shutdown_grace_seconds`, then stops accepting and waits
    /// for in-flight requests to finish.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(self.shutdown_grace))
        .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

/// Resolves `grace` after SIGINT/SIGTERM. Graceful shutdown begins only once
/// this resolves, so the listener stays open during the grace period.
async fn shutdown_signal(grace: Duration) {
    after_grace_period(wait_for_signal(), grace).await;
}

async fn after_grace_period<F>(signal: F, grace: Duration)
where
    F: std::future::Future<Output = ()>,
{
    signal.await;
    tracing::info!(
        grace_seconds = grace.as_secs(),
        "Still serving for the shutdown grace period"
    );
    tokio::time::sleep(grace).await;
}

async fn wait_for_signal() {
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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
