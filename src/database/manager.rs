use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::BackendConfig;
use crate::filter::FilterError;

/// Errors from the data layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidTableName(name) | FilterError::InvalidColumn(name) => {
                DatabaseError::InvalidIdentifier(name)
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

/// Builds the service-role connection pool to the backend's Postgres
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &BackendConfig) -> Result<PgPool, DatabaseError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let url = url::Url::parse(database_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(url.as_str())
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!(
            "Connected to backend database at {}:{}",
            url.host_str().unwrap_or("localhost"),
            url.port().unwrap_or(5432)
        );
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_requires_database_url() {
        let config = BackendConfig::default();
        assert!(matches!(
            DatabaseManager::connect(&config).await,
            Err(DatabaseError::ConfigMissing("DATABASE_URL"))
        ));
    }

    #[tokio::test]
    async fn connect_rejects_non_postgres_urls() {
        let config = BackendConfig { database_url: Some("mysql://localhost/db".to_string()), ..Default::default() };
        assert!(matches!(DatabaseManager::connect(&config).await, Err(DatabaseError::InvalidDatabaseUrl)));
    }

    #[test]
    fn filter_errors_map_to_identifier_errors() {
        let err: DatabaseError = FilterError::InvalidColumn("bad col".to_string()).into();
        assert!(matches!(err, DatabaseError::InvalidIdentifier(name) if name == "bad col"));
    }
}
