//! Process lifecycle
//!
//! Open storage, wire the services, start the reconciler, serve HTTP until a
//! shutdown signal, then drain requests and stop the reconciler.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::accrual::{AccrualClient, AccrualReconciler};
use crate::api;
use crate::auth::{JwtConfig, JwtService};
use crate::config::Config;
use crate::db::DbService;
use crate::ledger::Ledger;
use crate::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Loyalty server
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bind `RUN_ADDRESS` and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(&self.config.run_address).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BoxError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = self.config;

        let db = DbService::new(&config.database_uri).await?;
        let ledger = Ledger::new(db.pool.clone());

        let accrual = AccrualClient::new(config.accrual_address.clone(), config.accrual_timeout)?;
        tracing::info!(accrual = %accrual.base_url(), "Accrual service configured");

        let reconciler = AccrualReconciler::new(
            ledger.clone(),
            Arc::new(accrual),
            config.reconciler.clone(),
            CancellationToken::new(),
        )
        .start();

        let jwt = JwtService::new(JwtConfig::new(
            config.secret_token.clone(),
            config.token_ttl_minutes,
        ));
        let state = AppState::new(ledger, jwt, config);
        let app = api::build_app(state);

        tracing::info!(address = %listener.local_addr()?, "Loyalty server listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        tracing::info!("HTTP server stopped, stopping reconciler");
        reconciler.stop().await;
        db.pool.close().await;
        tracing::info!("Shutdown complete");

        served.map_err(Into::into)
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down gracefully"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
}
