use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    ConnectOptions, PgPool,
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager and the storage layer built on it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Pool exhaustion and refused connections are transient; everything else is a query failure
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionError(_)
                | DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
                | DatabaseError::Sqlx(sqlx::Error::PoolClosed)
                | DatabaseError::Sqlx(sqlx::Error::Io(_))
        )
    }
}

/// Owner of the process-wide Postgres pool
pub struct DatabaseManager;

impl DatabaseManager {
    fn cell() -> &'static OnceCell<PgPool> {
        static POOL: OnceCell<PgPool> = OnceCell::const_new();
        &POOL
    }

    /// Get the main pool, connecting lazily on first use
    pub async fn main_pool() -> Result<PgPool, DatabaseError> {
        Self::cell()
            .get_or_try_init(|| async {
                let url = Self::database_url()?;
                Self::connect(&url).await
            })
            .await
            .cloned()
    }

    /// Build a new pool from a connection string using the configured limits
    pub async fn connect(database_url: &str) -> Result<PgPool, DatabaseError> {
        let settings = &config::config().database;

        let options = PgConnectOptions::from_str(database_url)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?
            .log_statements(Self::statement_log_level(settings.enable_query_logging));

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Created database pool for: {}", Self::redact(database_url)?);
        Ok(pool)
    }

    /// Statements are logged at debug when query logging is on, never otherwise
    fn statement_log_level(enable_query_logging: bool) -> LevelFilter {
        if enable_query_logging {
            LevelFilter::Debug
        } else {
            LevelFilter::Off
        }
    }

    fn database_url() -> Result<String, DatabaseError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
        // Reject garbage early so the error names the variable, not a socket failure
        url::Url::parse(&url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        Ok(url)
    }

    /// Strip credentials from a connection string before it reaches the logs
    fn redact(database_url: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(database_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if url.password().is_some() {
            url.set_password(Some("****"))
                .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        Ok(url.into())
    }

    /// Close the main pool (e.g., on shutdown)
    pub async fn close() {
        if let Some(pool) = Self::cell().get() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
