//! Service wiring: reads environment configuration, opens the shared
//! Postgres pool, and starts both engines plus the notifier task.

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tracing::info;

use speedgov_autoremove::AutoRemoveEngine;
use speedgov_data::PgStore;
use speedgov_governor::GovernorEngine;
use speedgov_notify::telegram::{self, TelegramNotifier};
use speedgov_ports::Store;
use speedgov_ports::testing::{FakeClientDriver, FakeSiteScraper};
use speedgov_telemetry::{LoggingConfig, Metrics, init_logging};

use crate::error::{AppError, AppResult};

/// Dependencies required to run the application: the two engines, the
/// notifier's background task, and the pool they all share.
///
/// The client-driver and tracker-scraper ports are wired to their in-memory
/// fakes here: a real qBittorrent client and tracker-site scraper are
/// outside this crate's scope, and `DESIGN.md` documents the seam a real
/// adapter would plug into.
pub struct BootstrapDependencies {
    pool: PgPool,
    governor: GovernorEngine,
    autoremove: AutoRemoveEngine,
    notifier_task: JoinHandle<()>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the
    /// binary entrypoint.
    pub(crate) async fn from_env() -> AppResult<Self> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| AppError::MissingEnv { name: "DATABASE_URL" })?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .map_err(|source| AppError::database("pool.connect", source))?;

        let store = Arc::new(
            PgStore::new(pool.clone())
                .await
                .map_err(|source| AppError::store("store.new", source))?,
        );

        let metrics = Metrics::new().map_err(|source| AppError::Metrics { operation: "metrics.new", source })?;

        let (notifier, notifier_task) = telegram::spawn(Arc::clone(&store) as Arc<dyn Store>);
        let notifier: Arc<TelegramNotifier> = Arc::new(notifier);

        let client = Arc::new(FakeClientDriver::new());
        let scraper = Arc::new(FakeSiteScraper::new());

        let governor = GovernorEngine::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&client) as _,
            Arc::clone(&scraper) as _,
            Arc::clone(&notifier) as _,
            metrics.clone(),
        );
        let autoremove = AutoRemoveEngine::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&client) as _,
            Arc::clone(&notifier) as _,
            metrics,
        );

        Ok(Self { pool, governor, autoremove, notifier_task })
    }
}

/// Entry point for the application boot sequence: start both engines, wait
/// for a shutdown signal, then stop them and close the pool.
///
/// # Errors
///
/// Returns an error if dependency construction or either engine fails to
/// start or stop cleanly.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env().await?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies, split out
/// from [`run_app`] so it can be exercised without a real database.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies { pool, governor, autoremove, notifier_task } = dependencies;

    info!("speedgov application bootstrap starting");

    governor.start().await.map_err(|source| AppError::governor("governor.start", source))?;
    autoremove.start().await.map_err(|source| AppError::autoremove("autoremove.start", source))?;

    info!("governor and auto-remove engines running, awaiting shutdown signal");
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");

    let governor_result = governor.stop().await;
    let autoremove_result = autoremove.stop().await;

    if !notifier_task.is_finished() {
        notifier_task.abort();
    }

    pool.close().await;

    governor_result.map_err(|source| AppError::governor("governor.stop", source))?;
    autoremove_result.map_err(|source| AppError::autoremove("autoremove.stop", source))?;

    info!("speedgov application shutdown complete");
    Ok(())
}
