//! # fl-server
//!
//! Axum server for ferrolink.
//!
//! Combines the SAML service-provider endpoints, the STS JSON API and
//! health probes. Registries are opened from the `[registry]` section; the
//! `sql` backend connects to `PostgreSQL` and applies the migrations.
//!
//! ## Usage
//!
//! ```ignore
//! use fl_server::Server;
//!
//! let config = fl_core::Config::load(Some(path))?;
//! Server::new(config).await?.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod digest;
pub mod error;
pub mod router;
pub mod state;
pub mod sts;

pub use router::create_router;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fl_core::config::{RegistryBackend, RegistryConfig};
use fl_core::Config;
use fl_registry::{RegistrySet, RevocationRegistry, TokenRegistry};
use fl_storage_sql::{PgRevocationRegistry, PgTokenRegistry, PoolConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// The ferrolink server.
#[derive(Debug)]
pub struct Server {
    state: AppState,
}

impl Server {
    /// Opens the registries and builds every component.
    ///
    /// # Errors
    ///
    /// Returns an error if a registry cannot be opened, the database is
    /// unreachable or a component rejects its configuration.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let registries = open_registries(&config.registry).await?;
        let state = AppState::build(config, registries)?;
        Ok(Self { state })
    }

    /// Creates a server over already-built state.
    #[must_use]
    pub const fn with_state(state: AppState) -> Self {
        Self { state }
    }

    /// Returns the shared state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates the router without starting the server.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Binds the configured address and serves until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        let server = &self.state.config.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Server listening on http://{}", listener.local_addr()?);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let pruner = spawn_session_pruner(&self.state);
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;
        pruner.abort();
        served?;
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Starts the background task that drops idle SP sessions every
/// `sp.session_prune_interval_secs`.
pub fn spawn_session_pruner(state: &AppState) -> JoinHandle<()> {
    let sp = state.sp.clone();
    let config = &state.config.sp;
    let period = Duration::from_secs(config.session_prune_interval_secs.max(1));
    let max_idle = chrono::Duration::try_seconds(i64::try_from(config.session_idle_secs).unwrap_or(i64::MAX))
        .unwrap_or(chrono::Duration::MAX);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let dropped = sp.prune(max_idle);
            if dropped > 0 {
                tracing::info!(dropped, remaining = sp.session_count(), "Idle SP sessions pruned");
            }
        }
    })
}

/// Opens the registries named by `config`, connecting to the database when
/// either uses the `sql` backend.
///
/// # Errors
///
/// Returns an error if a backend cannot be opened.
pub async fn open_registries(config: &RegistryConfig) -> anyhow::Result<RegistrySet> {
    if !config.uses_sql() {
        return Ok(RegistrySet::open(config)?);
    }

    let pool = fl_storage_sql::create_pool(&PoolConfig::from_registry_config(config)?).await?;
    fl_storage_sql::run_migrations(&pool).await?;
    tracing::info!("Database connection pool created");

    let tokens: Arc<dyn TokenRegistry> = match config.token_backend {
        RegistryBackend::Sql => Arc::new(PgTokenRegistry::new(pool.clone())),
        _ => fl_registry::open_tokens(config)?,
    };
    let revocations: Arc<dyn RevocationRegistry> = match config.revocation_backend {
        RegistryBackend::Sql => Arc::new(PgRevocationRegistry::new(pool)),
        _ => fl_registry::open_revocations(config)?,
    };
    Ok(RegistrySet::new(tokens, revocations))
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install signal handler");
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

    tracing::info!("Shutdown signal received");
}
