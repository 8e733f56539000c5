use actix_web::dev::ServerHandle;
use actix_web::web::Data;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::job::JobService;

/// Handles graceful shutdown of the application
///
/// On SIGTERM or CTRL+C:
/// 1. Stops the HTTP server (no new requests)
/// 2. Sends any pending debounced push right away
/// 3. Closes database connections
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    service: Data<JobService>,
    pool: SqlitePool,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        service: Data<JobService>,
        pool: SqlitePool,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            service,
            pool,
        }
    }

    /// Wait for a shutdown signal, then shut down gracefully
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {:?}", e);
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
                    error!("Failed to install SIGTERM handler: {:?}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;

        match self.server_task.await {
            Ok(Ok(_)) => info!("HTTP server shut down successfully"),
            Ok(Err(e)) => error!("HTTP server encountered error during shutdown: {:?}", e),
            Err(e) => error!("HTTP server task panicked: {:?}", e),
        }

        if self.service.flush_sync().await {
            info!("Flushed pending remote sync");
        }

        info!("Closing database connection pool...");
        self.pool.close().await;

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}
