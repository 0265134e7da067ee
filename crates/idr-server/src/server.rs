use std::future::Future;
use std::sync::Arc;

use idr_store::{ContactStore, InMemoryContactStore, JournalConfig, JournalContactStore, SyncMode};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Identity reconciliation server.
///
/// Owns the contact store for the lifetime of the process: it is opened in
/// [`open`](Self::open) and flushed when [`serve`](Self::serve) returns.
pub struct IdentityServer {
    config: ServerConfig,
    store: Arc<dyn ContactStore>,
    journal: Option<Arc<JournalContactStore>>,
}

impl IdentityServer {
    /// Open the store named by `config`: a journal at `data_path`, or memory.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        match &config.data_path {
            Some(path) => {
                let sync_mode = if config.sync_every_write {
                    SyncMode::EveryWrite
                } else {
                    SyncMode::OsDefault
                };
                let journal = Arc::new(JournalContactStore::open(path, JournalConfig { sync_mode })?);
                let store: Arc<dyn ContactStore> = journal.clone();
                Ok(Self {
                    config,
                    store,
                    journal: Some(journal),
                })
            }
            None => {
                tracing::warn!("no data_path configured; contacts are kept in memory only");
                Ok(Self::with_store(config, Arc::new(InMemoryContactStore::new())))
            }
        }
    }

    /// Serve over a caller-provided store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn ContactStore>) -> Self {
        Self {
            config,
            store,
            journal: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(
            Arc::clone(&self.store),
            self.config.serialize_requests,
        ))
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves, then close the store.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("identity server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        if let Some(journal) = &self.journal {
            journal.close()?;
        }
        tracing::info!("identity server stopped");
        Ok(())
    }
}
