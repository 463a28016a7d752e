use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::Router;
use storefront_core::config::{AppConfig, ConfigError, StorageBackend};
use storefront_core::{Notifier, StorageAdapter};
use storefront_db::{
    connect_lazy_with_settings, connect_with_settings, migrations, DbPool, FileStorage,
    InMemoryStorage, SqlStorage,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::health::{self, HealthState};

pub struct Application {
    pub config: AppConfig,
    pub storage: Arc<dyn StorageAdapter>,
    pub notifier: Arc<Notifier>,
    pub db_pool: Option<DbPool>,
    /// True while the schema could not be applied at startup.
    pub migrations_pending: Arc<AtomicBool>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState::new(self.storage.clone(), self.notifier.clone(), self.config.catalog.settings())
    }

    pub fn router(&self) -> Router {
        let health_state = HealthState {
            backend: self.storage.backend_name(),
            db_pool: self.db_pool.clone(),
            migrations_pending: self.migrations_pending.clone(),
        };
        api::router(self.state()).merge(health::router(health_state))
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        backend = config.storage.backend.as_str(),
        "starting application bootstrap"
    );

    let mut migrations_pending = false;
    let (storage, db_pool): (Arc<dyn StorageAdapter>, Option<DbPool>) =
        match config.storage.backend {
            StorageBackend::Sql => {
                let (pool, migrated) = open_database(&config).await?;
                migrations_pending = !migrated;
                (Arc::new(SqlStorage::new(pool.clone())), Some(pool))
            }
            StorageBackend::File => {
                info!(
                    event_name = "system.bootstrap.file_storage",
                    correlation_id = "bootstrap",
                    data_dir = %config.storage.data_dir.display(),
                    "using flat-file storage"
                );
                (Arc::new(FileStorage::new(&config.storage.data_dir)), None)
            }
            StorageBackend::Memory => (Arc::new(InMemoryStorage::new()), None),
        };

    Ok(Application {
        config,
        storage,
        notifier: Arc::new(Notifier::new()),
        db_pool,
        migrations_pending: Arc::new(AtomicBool::new(migrations_pending)),
    })
}

/// Connects and migrates, returning whether the schema was applied. When the
/// database is unreachable the server still starts on a lazily connecting
/// pool; data operations fail until it is back, and the first successful
/// health check applies the pending migrations.
async fn open_database(config: &AppConfig) -> Result<(DbPool, bool), BootstrapError> {
    let database = &config.database;
    match connect_with_settings(&database.url, database.max_connections, database.timeout_secs)
        .await
    {
        Ok(pool) => {
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                "database connection established"
            );
            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "database migrations applied"
            );
            Ok((pool, true))
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.database_unavailable",
                correlation_id = "bootstrap",
                error = %error,
                "database unreachable, continuing with a lazily connecting pool"
            );
            let pool = connect_lazy_with_settings(
                &database.url,
                database.max_connections,
                database.timeout_secs,
            )
            .map_err(BootstrapError::DatabaseConnect)?;
            Ok((pool, false))
        }
    }
}
