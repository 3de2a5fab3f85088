use std::time::{Duration, Instant};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, error, info};

use crate::{config::AppConfig, errors::ServiceError, migrator::Migrator};

pub type DbPool = DatabaseConnection;

/// Pool tuning, taken from the `db_*` settings of [`AppConfig`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url().to_string(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections.min(cfg.db_max_connections),
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

impl DbConfig {
    fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .sqlx_logging(false);
        opt
    }
}

/// Opens the pool that backs the receiving store (catalog, receipts, ledger).
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg = DbConfig::from(cfg);
    info!(
        max_connections = db_cfg.max_connections,
        "Connecting to receiving database"
    );

    Database::connect(db_cfg.connect_options())
        .await
        .map_err(|e| {
            error!("Database connection establishment failed: {}", e);
            ServiceError::db_error(e)
        })
}

/// Brings the schema up to date.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    match Migrator::up(pool, None).await {
        Ok(()) => {
            info!(elapsed = ?start.elapsed(), "Database migrations applied");
            Ok(())
        }
        Err(e) => {
            error!(elapsed = ?start.elapsed(), "Database migrations failed: {}", e);
            Err(ServiceError::db_error(e))
        }
    }
}

/// Used by the health endpoint.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    let result = pool.ping().await.map_err(ServiceError::db_error);
    match &result {
        Ok(()) => debug!(elapsed = ?start.elapsed(), "Database ping ok"),
        Err(e) => error!(elapsed = ?start.elapsed(), "Database ping failed: {}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config(url: String) -> AppConfig {
        AppConfig::new(url, "127.0.0.1".into(), 8080, "test".into())
    }

    #[test]
    fn db_config_follows_app_config() {
        let mut cfg = sqlite_config("sqlite::memory:".into());
        cfg.db_max_connections = 3;
        cfg.db_min_connections = 5;
        cfg.db_acquire_timeout_secs = 2;

        let db_cfg = DbConfig::from(&cfg);
        assert_eq!(db_cfg.url, "sqlite::memory:");
        assert_eq!(db_cfg.max_connections, 3);
        assert_eq!(db_cfg.min_connections, 3);
        assert_eq!(db_cfg.acquire_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn migrations_run_on_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("db.sqlite").display());
        let mut cfg = sqlite_config(url);
        cfg.db_max_connections = 1;

        let pool = establish_connection_from_app_config(&cfg).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // Second run is a no-op.
        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();
    }
}
